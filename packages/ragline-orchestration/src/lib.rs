/*
 * Ragline Orchestration - Answer Pipeline
 *
 * Turns one user query into one cited answer: a 7-step orchestration
 * state machine over scoped retrieval, optional case-based-reasoning
 * hints, and external retriever/LLM/tool collaborators, the whole run
 * wrapped by a resilience layer (bounded retry with backoff/jitter plus
 * memory-pressure governance).
 *
 * Architecture:
 * - Scoped retrieval (category filter, bypass denylist, audit log)
 * - Resilience (RetryExecutor, MemoryGovernor, ResilienceManager)
 * - Orchestrator (intent -> retrieve -> plan -> tools_debate ->
 *   compose -> cite -> respond)
 * - Collaborator traits (retriever, language model, embedder)
 */

pub mod collaborators;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod resilience;
pub mod scope;
pub mod state;
pub mod steps;

pub use collaborators::{
    HybridRetriever, LanguageModel, QueryEmbedder, RetrievalFilters, RetrievedChunk,
};
pub use config::{ComposeConfig, CostConfig, DebateConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use orchestrator::Orchestrator;
pub use request::{PipelineRequest, RequestOptions, SessionScope};
pub use response::{PipelineResponse, SourceRef};
pub use resilience::{
    MemoryGovernor, MemorySnapshot, MemoryThreshold, MonitorHandle, PressureState,
    ResilienceManager, RetryConfig, RetryExecutor,
};
pub use scope::{AuditLogger, AuditRecord, BypassRuleSet, FilterResult, ScopedRetrieval};
pub use state::{AnswerStrategy, PipelineState, StepId};
pub use steps::CasebankHandle;
