//! The 7-step answer orchestration state machine.

use crate::error::{PipelineError, Result};
use crate::request::{PipelineRequest, SessionScope};
use crate::response::PipelineResponse;
use crate::state::{PipelineState, StepId};
use crate::steps::{self, CasebankHandle, StepContext};
use crate::collaborators::{HybridRetriever, LanguageModel};
use crate::config::PipelineConfig;
use crate::scope::ScopedRetrieval;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Drives one [`PipelineRequest`] through the strict, non-repeating
/// linear step sequence over a single [`PipelineState`], timing each
/// step.
///
/// Runs are usually invoked inside
/// [`ResilienceManager::execute_with_resilience`](crate::resilience::ResilienceManager::execute_with_resilience);
/// state is not persisted here, so a retried run restarts from step 1.
pub struct Orchestrator {
    retriever: Arc<dyn HybridRetriever>,
    llm: Arc<dyn LanguageModel>,
    scoped: ScopedRetrieval,
    casebank: Option<CasebankHandle>,
    scope: SessionScope,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        retriever: Arc<dyn HybridRetriever>,
        llm: Arc<dyn LanguageModel>,
        scoped: ScopedRetrieval,
        scope: SessionScope,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            llm,
            scoped,
            casebank: None,
            scope,
            config,
        }
    }

    /// Attach a case bank to consult during retrieval.
    pub fn with_casebank(mut self, casebank: CasebankHandle) -> Self {
        self.casebank = Some(casebank);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one full run.
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineResponse> {
        let request_id = Uuid::new_v4().to_string();
        let run_start = Instant::now();

        info!(
            "Starting run {} for query ({} chars, taxonomy {})",
            request_id,
            request.query.len(),
            request.taxonomy_version
        );

        let mut state = PipelineState::new();
        let ctx = StepContext {
            request,
            request_id: &request_id,
            scope: &self.scope,
            config: &self.config,
            retriever: self.retriever.as_ref(),
            llm: self.llm.as_ref(),
            scoped: &self.scoped,
            casebank: self.casebank.as_ref(),
        };

        for step in StepId::ALL {
            let step_start = Instant::now();
            self.execute_step(step, &ctx, &mut state).await?;
            let seconds = step_start.elapsed().as_secs_f64();
            state.record_timing(step, seconds);
            debug!("Run {}: step {} took {:.3}s", request_id, step, seconds);
        }

        state.latency = run_start.elapsed().as_secs_f64();
        let response = build_response(state)?;

        info!(
            "Run {} completed: confidence {:.2}, {} citations, {:.3}s, debate={}",
            request_id,
            response.confidence,
            response.citations_count,
            response.latency,
            response.debate_activated
        );

        Ok(response)
    }

    async fn execute_step(
        &self,
        step: StepId,
        ctx: &StepContext<'_>,
        state: &mut PipelineState,
    ) -> Result<()> {
        match step {
            StepId::Intent => steps::intent::execute(ctx, state).await,
            StepId::Retrieve => steps::retrieve::execute(ctx, state).await,
            StepId::Plan => steps::plan::execute(ctx, state).await,
            StepId::ToolsDebate => steps::debate::execute(ctx, state).await,
            StepId::Compose => steps::compose::execute(ctx, state).await,
            StepId::Cite => steps::cite::execute(ctx, state).await,
            StepId::Respond => steps::respond::execute(ctx, state).await,
        }
    }
}

/// Turn the run's final state into the caller-facing response. Consumes
/// the state; nothing of the run survives past this point.
fn build_response(state: PipelineState) -> Result<PipelineResponse> {
    let answer = state.final_answer.ok_or(PipelineError::MissingStepOutput {
        step: "respond",
        field: "final_answer",
    })?;
    let confidence = state.confidence.ok_or(PipelineError::MissingStepOutput {
        step: "respond",
        field: "confidence",
    })?;

    Ok(PipelineResponse {
        answer,
        confidence,
        sources: state.sources,
        citations_count: state.citations_count,
        cost: state.cost,
        latency: state.latency,
        intent: state.intent.unwrap_or_default(),
        step_timings: state
            .step_timings
            .iter()
            .map(|(step, secs)| (step.as_str().to_string(), *secs))
            .collect(),
        debate_activated: state.debate_activated,
    })
}
