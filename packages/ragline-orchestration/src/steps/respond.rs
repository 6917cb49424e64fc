//! Step 7: final assembly of answer and confidence.

use crate::error::Result;
use crate::state::{AnswerStrategy, PipelineState};
use crate::steps::StepContext;
use tracing::debug;

pub(crate) async fn execute(_ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let draft = state.require_draft()?.to_string();
    let strategy = state.require_strategy()?;

    let confidence = score_confidence(state, strategy);

    debug!(
        "respond: confidence {:.2}, {} citations",
        confidence, state.citations_count
    );

    state.final_answer = Some(draft);
    state.confidence = Some(confidence);
    Ok(())
}

/// Heuristic blend of intent confidence, top-document relevance, and
/// evidence volume, clamped to [0, 1]. Degraded runs are capped low.
fn score_confidence(state: &PipelineState, strategy: AnswerStrategy) -> f64 {
    if strategy == AnswerStrategy::InsufficientEvidence {
        return 0.1;
    }

    let intent = state.intent_confidence.unwrap_or(0.0);
    let relevance = state.top_doc_score().unwrap_or(0.0);
    let volume = (state.retrieved_docs.len() as f64 / 3.0).min(1.0);

    let blended = 0.4 * intent + 0.4 * relevance + 0.2 * volume;
    blended.clamp(0.0, 1.0)
}
