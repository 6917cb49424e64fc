//! Pipeline configuration.
//!
//! Every tunable the steps consult lives here with the standard
//! defaults. The debate-trigger thresholds in particular are defaults,
//! not contractual constants.

use crate::resilience::{MemoryThreshold, RetryConfig};
use ragline_casebank::EngineConfig;
use serde::{Deserialize, Serialize};

/// Debate-activation policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Activate when intent confidence falls below this.
    pub min_intent_confidence: f64,
    /// "Low relevance" bound on the top document's score.
    pub low_relevance_threshold: f64,
    /// Minimum clause count for a query to read as multi-part.
    pub multipart_min_clauses: usize,
    /// Clause separators for the multi-part heuristic.
    pub multipart_markers: Vec<String>,
    /// Deliberation tools to fan out when the debate activates.
    pub tools: Vec<String>,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            min_intent_confidence: 0.7,
            low_relevance_threshold: 0.45,
            multipart_min_clauses: 2,
            multipart_markers: vec![
                "; ".to_string(),
                " and ".to_string(),
                " also ".to_string(),
                " then ".to_string(),
            ],
            tools: vec!["counter_argument".to_string(), "evidence_review".to_string()],
        }
    }
}

/// Strategy and composition knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// How many evidence chunks the composition prompt carries.
    pub max_evidence: usize,
    /// Case-hint similarity above which the plan adapts the prior case.
    pub case_adapt_threshold: f64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            max_evidence: 5,
            case_adapt_threshold: 0.9,
        }
    }
}

/// Flat-rate cost estimation for LLM traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    pub usd_per_1k_tokens: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            usd_per_1k_tokens: 0.002,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub debate: DebateConfig,
    pub compose: ComposeConfig,
    pub cost: CostConfig,
    pub retry: RetryConfig,
    pub memory: MemoryThreshold,
    pub cbr: EngineConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_thresholds() {
        let config = PipelineConfig::default();
        assert_eq!(config.debate.min_intent_confidence, 0.7);
        assert_eq!(config.cbr.k, 5);
        assert_eq!(config.cbr.threshold, 0.7);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.debate.tools, config.debate.tools);
        assert_eq!(parsed.memory.max_mb, config.memory.max_mb);
    }
}
