/*
 * Ragline Casebank - Case-Based Reasoning Subsystem
 *
 * Prior (query, answer) cases retrieved by vector similarity to hint
 * answer composition in the orchestration pipeline.
 *
 * Architecture:
 * - Similarity metrics (cosine, euclidean; [0, 1], total on bad input)
 * - Taxonomy path matching (shared with retrieval scoping)
 * - Case bank store (read-mostly, insertion-ordered, JSON-lines backed)
 * - k-NN recommendation engine (filter -> score -> rank)
 * - Append-only usage logs (queries, feedback)
 */

pub mod engine;
pub mod error;
pub mod similarity;
pub mod store;
pub mod taxonomy;
pub mod usage_log;

pub use engine::{
    filter_by_category, EngineConfig, RecommendationEngine, SimilarityMethod, SimilarityResult,
};
pub use error::{CasebankError, Result};
pub use store::{CaseBankStore, CaseRecord};
pub use taxonomy::path_starts_with;
pub use usage_log::{FeedbackLogRecord, QueryLogRecord, UsageLogger};
