//! The seven pipeline steps.
//!
//! Each step is an async function over the shared [`StepContext`] and the
//! run's [`PipelineState`]; the orchestrator sequences and times them.

pub mod cite;
pub mod compose;
pub mod debate;
pub mod intent;
pub mod plan;
pub mod respond;
pub mod retrieve;

use crate::collaborators::{HybridRetriever, LanguageModel, QueryEmbedder};
use crate::config::{CostConfig, PipelineConfig};
use crate::request::{PipelineRequest, SessionScope};
use crate::scope::ScopedRetrieval;
use ragline_casebank::{RecommendationEngine, UsageLogger};
use std::sync::Arc;

/// Case-bank consultation bundle: the engine, the query embedder feeding
/// it, and the usage log recording every lookup.
pub struct CasebankHandle {
    pub engine: Arc<RecommendationEngine>,
    pub embedder: Arc<dyn QueryEmbedder>,
    pub usage_log: Arc<UsageLogger>,
}

/// Read-only context shared by every step of one run.
pub struct StepContext<'a> {
    pub request: &'a PipelineRequest,
    pub request_id: &'a str,
    pub scope: &'a SessionScope,
    pub config: &'a PipelineConfig,
    pub retriever: &'a dyn HybridRetriever,
    pub llm: &'a dyn LanguageModel,
    pub scoped: &'a ScopedRetrieval,
    pub casebank: Option<&'a CasebankHandle>,
}

/// Flat-rate spend estimate for one LLM exchange, chars/4 as tokens.
pub(crate) fn estimate_cost(prompt: &str, reply: &str, cost: &CostConfig) -> f64 {
    let tokens = (prompt.len() + reply.len()) as f64 / 4.0;
    (tokens / 1000.0) * cost.usd_per_1k_tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_scales_with_text_volume() {
        let cost = CostConfig {
            usd_per_1k_tokens: 1.0,
        };
        // 4000 chars => ~1000 tokens => 1.0 USD.
        let prompt = "x".repeat(3000);
        let reply = "y".repeat(1000);
        assert!((estimate_cost(&prompt, &reply, &cost) - 1.0).abs() < 1e-9);
    }
}
