//! Step 3: answer-strategy choice. Pure; no collaborator calls.

use crate::config::ComposeConfig;
use crate::error::Result;
use crate::state::{AnswerStrategy, PipelineState};
use crate::steps::StepContext;
use tracing::debug;

pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let (intent, confidence) = state.require_intent()?;
    let intent = intent.to_string();

    let (strategy, reasoning) = choose_strategy(state, &intent, confidence, &ctx.config.compose);

    debug!("plan: {:?}", strategy);
    state.answer_strategy = Some(strategy);
    state.plan_reasoning = Some(reasoning);
    Ok(())
}

fn choose_strategy(
    state: &PipelineState,
    intent: &str,
    intent_confidence: f64,
    config: &ComposeConfig,
) -> (AnswerStrategy, String) {
    let top_hint = state
        .case_hints
        .first()
        .map(|h| h.similarity_score)
        .unwrap_or(0.0);

    let mut trace = vec![format!(
        "intent='{}' (confidence {:.2}); {} retrieved docs; top case hint {:.2}",
        intent,
        intent_confidence,
        state.retrieved_docs.len(),
        top_hint
    )];

    let strategy = if state.retrieved_docs.is_empty() {
        trace.push("no authorized evidence survived filtering; degrading".to_string());
        AnswerStrategy::InsufficientEvidence
    } else if top_hint >= config.case_adapt_threshold {
        trace.push(format!(
            "case hint above adapt threshold {:.2}; reusing prior case",
            config.case_adapt_threshold
        ));
        AnswerStrategy::CaseAdapted
    } else {
        trace.push("synthesizing from retrieved evidence".to_string());
        AnswerStrategy::Synthesis
    };

    (strategy, trace.join("; "))
}
