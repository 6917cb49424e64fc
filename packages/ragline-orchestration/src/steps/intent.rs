//! Step 1: intent classification.

use crate::error::Result;
use crate::state::PipelineState;
use crate::steps::{estimate_cost, StepContext};
use serde::Deserialize;
use tracing::{debug, warn};

/// Confidence assigned when the model reply cannot be parsed. Low on
/// purpose: an unreadable classification should trigger the debate.
const FALLBACK_CONFIDENCE: f64 = 0.3;
const FALLBACK_INTENT: &str = "general";

#[derive(Debug, Deserialize)]
struct IntentReply {
    intent: String,
    confidence: f64,
}

pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let prompt = build_prompt(&ctx.request.query);
    let reply = ctx.llm.generate(&prompt).await?;
    state.cost += estimate_cost(&prompt, &reply, &ctx.config.cost);

    let (intent, confidence) = match parse_reply(&reply) {
        Some(parsed) => parsed,
        None => {
            warn!(
                "intent: unparseable classification reply, falling back to '{}'",
                FALLBACK_INTENT
            );
            (FALLBACK_INTENT.to_string(), FALLBACK_CONFIDENCE)
        }
    };

    debug!("intent: '{}' at confidence {:.2}", intent, confidence);
    state.intent = Some(intent);
    state.intent_confidence = Some(confidence.clamp(0.0, 1.0));
    Ok(())
}

fn build_prompt(query: &str) -> String {
    format!(
        "Classify the intent of the following question. Reply with ONLY a JSON \
         object with fields \"intent\" (a short lowercase label such as \
         \"factual_lookup\", \"how_to\", \"comparison\", \"policy\", \"general\") \
         and \"confidence\" (a float in [0, 1]).\n\nQuestion: {}",
        query
    )
}

/// Lenient parse: accept surrounding prose by extracting the first
/// top-level JSON object from the reply.
fn parse_reply(reply: &str) -> Option<(String, f64)> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }

    let parsed: IntentReply = serde_json::from_str(&reply[start..=end]).ok()?;
    if parsed.intent.trim().is_empty() || !parsed.confidence.is_finite() {
        return None;
    }

    Some((parsed.intent, parsed.confidence))
}
