use crate::collaborators::RetrievedChunk;
use crate::error::{PipelineError, Result};
use crate::response::SourceRef;
use ragline_casebank::SimilarityResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pipeline step identifier. The seven steps run strictly in this order,
/// exactly once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Intent,
    Retrieve,
    Plan,
    ToolsDebate,
    Compose,
    Cite,
    Respond,
}

impl StepId {
    pub const ALL: [StepId; 7] = [
        StepId::Intent,
        StepId::Retrieve,
        StepId::Plan,
        StepId::ToolsDebate,
        StepId::Compose,
        StepId::Cite,
        StepId::Respond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Intent => "intent",
            StepId::Retrieve => "retrieve",
            StepId::Plan => "plan",
            StepId::ToolsDebate => "tools_debate",
            StepId::Compose => "compose",
            StepId::Cite => "cite",
            StepId::Respond => "respond",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer strategy chosen by the plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    /// Synthesize from retrieved evidence.
    Synthesis,
    /// Adapt a high-similarity prior case.
    CaseAdapted,
    /// No usable evidence; produce a degraded, non-error answer.
    InsufficientEvidence,
}

/// Mutable accumulator owned exclusively by one run.
///
/// One optional field per value a step produces; later steps validate the
/// presence of their inputs instead of trusting call order blindly.
/// Created at step 1, discarded after response assembly.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub intent: Option<String>,
    pub intent_confidence: Option<f64>,

    pub retrieved_docs: Vec<RetrievedChunk>,
    pub retrieval_filter_applied: bool,
    pub case_hints: Vec<SimilarityResult>,

    pub answer_strategy: Option<AnswerStrategy>,
    pub plan_reasoning: Option<String>,

    pub debate_activated: bool,
    pub tools_used: Vec<String>,
    pub deliberation_notes: Vec<String>,

    pub draft_answer: Option<String>,
    pub sources: Vec<SourceRef>,
    pub citations_count: usize,

    pub final_answer: Option<String>,
    pub confidence: Option<f64>,

    pub step_timings: HashMap<StepId, f64>,
    pub cost: f64,
    pub latency: f64,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_timing(&mut self, step: StepId, seconds: f64) {
        self.step_timings.insert(step, seconds.max(0.0));
    }

    pub fn require_intent(&self) -> Result<(&str, f64)> {
        match (&self.intent, self.intent_confidence) {
            (Some(intent), Some(confidence)) => Ok((intent, confidence)),
            _ => Err(PipelineError::MissingStepOutput {
                step: "plan",
                field: "intent",
            }),
        }
    }

    pub fn require_strategy(&self) -> Result<AnswerStrategy> {
        self.answer_strategy
            .ok_or(PipelineError::MissingStepOutput {
                step: "compose",
                field: "answer_strategy",
            })
    }

    pub fn require_draft(&self) -> Result<&str> {
        self.draft_answer
            .as_deref()
            .ok_or(PipelineError::MissingStepOutput {
                step: "cite",
                field: "draft_answer",
            })
    }

    /// Relevance of the best post-filter document, if any.
    pub fn top_doc_score(&self) -> Option<f64> {
        self.retrieved_docs
            .iter()
            .map(|d| d.score)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_names() {
        let names: Vec<&str> = StepId::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec!["intent", "retrieve", "plan", "tools_debate", "compose", "cite", "respond"],
        );
    }

    #[test]
    fn test_require_intent_missing() {
        let state = PipelineState::new();
        assert!(state.require_intent().is_err());
    }

    #[test]
    fn test_record_timing_clamps_negative() {
        let mut state = PipelineState::new();
        state.record_timing(StepId::Intent, -1.0);
        assert_eq!(state.step_timings[&StepId::Intent], 0.0);
    }

    #[test]
    fn test_top_doc_score_empty() {
        assert!(PipelineState::new().top_doc_score().is_none());
    }
}
