//! Step 4: conditional deliberation.
//!
//! The activation policy is evaluated exactly once, from state
//! accumulated through step 3. When active, the configured tools fan out
//! concurrently and fan back in before composition; a failed tool is
//! logged and skipped, never fatal.

use crate::config::DebateConfig;
use crate::error::Result;
use crate::state::PipelineState;
use crate::steps::StepContext;
use serde_json::json;
use tracing::{debug, info, warn};

pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let decision = should_activate(&ctx.request.query, state, &ctx.config.debate);

    let Some(reason) = decision else {
        debug!("tools_debate: not activated");
        state.debate_activated = false;
        return Ok(());
    };

    info!("tools_debate: activated ({})", reason);
    state.debate_activated = true;
    state.tools_used = ctx.config.debate.tools.clone();

    let evidence: Vec<&str> = state
        .retrieved_docs
        .iter()
        .take(ctx.config.compose.max_evidence)
        .map(|d| d.text.as_str())
        .collect();

    let payload = json!({
        "query": ctx.request.query,
        "intent": state.intent,
        "evidence": evidence,
    });

    let calls = ctx.config.debate.tools.iter().map(|name| {
        let payload = payload.clone();
        async move { (name.clone(), ctx.llm.invoke_tool(name, &payload).await) }
    });

    for (name, outcome) in futures::future::join_all(calls).await {
        match outcome {
            Ok(value) => {
                let note = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                state.deliberation_notes.push(format!("{}: {}", name, note));
            }
            Err(e) => {
                warn!("tools_debate: tool '{}' failed, skipping: {}", name, e);
            }
        }
    }

    Ok(())
}

/// Activation reason, or `None` to skip the debate.
fn should_activate(query: &str, state: &PipelineState, config: &DebateConfig) -> Option<String> {
    let confidence = state.intent_confidence.unwrap_or(0.0);
    if confidence < config.min_intent_confidence {
        return Some(format!(
            "intent confidence {:.2} < {:.2}",
            confidence, config.min_intent_confidence
        ));
    }

    if state.retrieved_docs.is_empty() {
        return Some("no retrieved documents".to_string());
    }

    let top_score = state.top_doc_score().unwrap_or(0.0);
    if top_score < config.low_relevance_threshold && is_multi_part(query, config) {
        return Some(format!(
            "top relevance {:.2} < {:.2} on a multi-part query",
            top_score, config.low_relevance_threshold
        ));
    }

    None
}

/// Multi-part heuristic: enough question marks, or enough clauses split
/// on the configured markers. Tunable, deliberately coarse.
fn is_multi_part(query: &str, config: &DebateConfig) -> bool {
    if query.matches('?').count() >= config.multipart_min_clauses {
        return true;
    }

    let mut clauses = 1;
    for marker in &config.multipart_markers {
        clauses += query.to_lowercase().matches(marker.as_str()).count();
    }

    clauses >= config.multipart_min_clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::RetrievedChunk;

    fn doc(score: f64) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: "d1".to_string(),
            text: "text".to_string(),
            taxonomy_path: vec!["Public".to_string()],
            score,
        }
    }

    fn confident_state(docs: Vec<RetrievedChunk>) -> PipelineState {
        let mut state = PipelineState::new();
        state.intent = Some("how_to".to_string());
        state.intent_confidence = Some(0.9);
        state.retrieved_docs = docs;
        state
    }

    #[test]
    fn test_low_confidence_activates() {
        let mut state = confident_state(vec![doc(0.9)]);
        state.intent_confidence = Some(0.5);
        assert!(should_activate("simple question", &state, &DebateConfig::default()).is_some());
    }

    #[test]
    fn test_empty_docs_activate() {
        let state = confident_state(vec![]);
        assert!(should_activate("simple question", &state, &DebateConfig::default()).is_some());
    }

    #[test]
    fn test_low_relevance_multipart_activates() {
        let state = confident_state(vec![doc(0.2)]);
        let query = "what is the policy and how do I apply for it";
        assert!(should_activate(query, &state, &DebateConfig::default()).is_some());
    }

    #[test]
    fn test_low_relevance_single_part_does_not_activate() {
        let state = confident_state(vec![doc(0.2)]);
        assert!(should_activate("what is the policy", &state, &DebateConfig::default()).is_none());
    }

    #[test]
    fn test_confident_well_supported_run_skips_debate() {
        let state = confident_state(vec![doc(0.9)]);
        assert!(should_activate("what is the policy", &state, &DebateConfig::default()).is_none());
    }

    #[test]
    fn test_multi_part_by_question_marks() {
        let config = DebateConfig::default();
        assert!(is_multi_part("what is X? and why Y?", &config));
        assert!(!is_multi_part("what is X", &config));
    }
}
