//! Step 2: scoped retrieval, optionally consulting the case bank.

use crate::collaborators::RetrievalFilters;
use crate::error::Result;
use crate::scope::is_path_allowed;
use crate::state::PipelineState;
use crate::steps::{CasebankHandle, StepContext};
use chrono::Utc;
use ragline_casebank::QueryLogRecord;
use tracing::{debug, warn};

pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let filters = RetrievalFilters {
        category_paths: ctx.scope.allowed_paths.clone(),
    };

    let results = ctx
        .retriever
        .search(&ctx.request.query, Some(&filters), ctx.request.options.top_k)
        .await?;

    // Defense in depth: the retriever already saw the scope filters, but
    // its output is partitioned again and the access audited either way.
    let outcome = ctx
        .scoped
        .filter(ctx.request_id, &ctx.request.query, results, ctx.scope);

    debug!(
        "retrieve: {} docs allowed, {} blocked",
        outcome.filtered_count(),
        outcome.blocked_count()
    );

    state.retrieved_docs = outcome.allowed;
    state.retrieval_filter_applied = true;

    if ctx.request.options.consult_casebank {
        if let Some(casebank) = ctx.casebank {
            consult_casebank(ctx, casebank, state).await;
        }
    }

    Ok(())
}

/// Case hints are advisory; any failure here degrades to "no hints"
/// rather than failing the run.
async fn consult_casebank(
    ctx: &StepContext<'_>,
    casebank: &CasebankHandle,
    state: &mut PipelineState,
) {
    let query_vector = match casebank.embedder.embed(&ctx.request.query).await {
        Ok(v) => v,
        Err(e) => {
            warn!("retrieve: query embedding failed, skipping case hints: {}", e);
            return;
        }
    };

    let mut hints = casebank.engine.recommend(&query_vector, None);

    // Hints obey the session scope as well: a prior case from an
    // unauthorized category must not leak through the answer.
    hints.retain(|hint| is_path_allowed(&hint.category_path, &ctx.scope.allowed_paths));

    debug!("retrieve: {} case hints after scope filter", hints.len());

    let record = QueryLogRecord {
        request_id: ctx.request_id.to_string(),
        timestamp: Utc::now(),
        query: ctx.request.query.clone(),
        category_path: Vec::new(),
        picked_case_ids: hints.iter().map(|h| h.case_id.clone()).collect(),
        similarity_scores: hints.iter().map(|h| h.similarity_score).collect(),
        user_id: ctx.scope.user_id.clone(),
    };
    if let Err(e) = casebank.usage_log.log_query(&record) {
        warn!("retrieve: case-bank query log failed: {}", e);
    }

    state.case_hints = hints;
}
