//! Step 6: source attribution.

use crate::collaborators::RetrievedChunk;
use crate::error::Result;
use crate::response::SourceRef;
use crate::state::{AnswerStrategy, PipelineState};
use crate::steps::StepContext;
use std::collections::BTreeSet;
use tracing::debug;

const TITLE_MAX_CHARS: usize = 60;

pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut PipelineState) -> Result<()> {
    let draft = state.require_draft()?.to_string();

    if state.require_strategy()? == AnswerStrategy::InsufficientEvidence {
        state.sources = Vec::new();
        state.citations_count = 0;
        return Ok(());
    }

    let used: Vec<&RetrievedChunk> = state
        .retrieved_docs
        .iter()
        .take(ctx.config.compose.max_evidence)
        .collect();

    // Prefer the evidence the draft actually marked; when the model
    // produced no markers, attribute every chunk the prompt carried.
    let marked = referenced_indices(&draft, used.len());
    let picked: Vec<&RetrievedChunk> = if marked.is_empty() {
        used
    } else {
        marked.into_iter().map(|i| used[i]).collect()
    };

    state.sources = picked
        .into_iter()
        .map(|doc| SourceRef {
            id: doc.chunk_id.clone(),
            title: title_of(doc),
        })
        .collect();
    state.citations_count = state.sources.len();

    debug!("cite: {} sources", state.citations_count);
    Ok(())
}

/// 0-based indices of `[n]` markers present in the draft, in evidence
/// order, bounded by the evidence actually offered.
fn referenced_indices(draft: &str, evidence_count: usize) -> Vec<usize> {
    let mut found = BTreeSet::new();

    for n in 1..=evidence_count {
        if draft.contains(&format!("[{}]", n)) {
            found.insert(n - 1);
        }
    }

    found.into_iter().collect()
}

fn title_of(doc: &RetrievedChunk) -> String {
    let first_line = doc.text.lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return doc.chunk_id.clone();
    }

    let mut title: String = first_line.chars().take(TITLE_MAX_CHARS).collect();
    if first_line.chars().count() > TITLE_MAX_CHARS {
        title.push('…');
    }
    title
}
