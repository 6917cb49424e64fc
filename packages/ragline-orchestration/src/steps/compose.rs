//! Step 5: draft composition.

use crate::error::Result;
use crate::state::{AnswerStrategy, PipelineState};
use crate::steps::{estimate_cost, StepContext};
use tracing::debug;

/// Degraded answer for runs with no authorized evidence. Deterministic:
/// the degraded path must succeed even when the language model cannot.
pub(crate) const INSUFFICIENT_EVIDENCE_ANSWER: &str =
    "I could not find enough authorized sources to answer this reliably. \
     The retrieved material was either out of scope for this session or \
     did not match the question; please narrow the question or contact \
     someone with broader access.";

pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let strategy = state.require_strategy()?;

    if strategy == AnswerStrategy::InsufficientEvidence {
        debug!("compose: degraded answer, no evidence");
        state.draft_answer = Some(INSUFFICIENT_EVIDENCE_ANSWER.to_string());
        return Ok(());
    }

    let prompt = build_prompt(ctx, state, strategy);
    let reply = ctx.llm.generate(&prompt).await?;
    state.cost += estimate_cost(&prompt, &reply, &ctx.config.cost);

    state.draft_answer = Some(reply);
    Ok(())
}

fn build_prompt(ctx: &StepContext<'_>, state: &PipelineState, strategy: AnswerStrategy) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Answer the question strictly from the numbered evidence below. \
         Mark every supported claim with its evidence number like [1]. \
         If the evidence does not cover part of the question, say so.\n\n",
    );

    for (i, doc) in state
        .retrieved_docs
        .iter()
        .take(ctx.config.compose.max_evidence)
        .enumerate()
    {
        prompt.push_str(&format!("[{}] {}\n", i + 1, doc.text));
    }

    if strategy == AnswerStrategy::CaseAdapted {
        if let Some(hint) = state.case_hints.first() {
            prompt.push_str(&format!(
                "\nA previous answer to a very similar question (adapt it to the \
                 current question and evidence):\n{}\n",
                hint.answer
            ));
        }
    }

    if !state.deliberation_notes.is_empty() {
        prompt.push_str("\nDeliberation notes to weigh:\n");
        for note in &state.deliberation_notes {
            prompt.push_str(&format!("- {}\n", note));
        }
    }

    prompt.push_str(&format!("\nQuestion: {}\n", ctx.request.query));
    prompt
}
