use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cited source in the final response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
}

/// Final pipeline output handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub answer: String,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
    pub sources: Vec<SourceRef>,
    pub citations_count: usize,
    /// Estimated spend for this run, in USD.
    pub cost: f64,
    /// Wall-clock seconds for the whole run.
    pub latency: f64,
    pub intent: String,
    /// Per-step wall-clock seconds, keyed by step name.
    pub step_timings: HashMap<String, f64>,
    pub debate_activated: bool,
}
