//! Category-path filtering of retrieval results.

use crate::collaborators::RetrievedChunk;
use ragline_casebank::path_starts_with;

/// Partition of retrieval results into allowed and blocked, preserving
/// the retriever's order on both sides.
#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    pub allowed: Vec<RetrievedChunk>,
    pub blocked: Vec<RetrievedChunk>,
}

impl FilterResult {
    pub fn filtered_count(&self) -> usize {
        self.allowed.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    /// Everything blocked, nothing allowed. Used when a bypass attempt
    /// fails the whole call closed.
    pub fn all_blocked(results: Vec<RetrievedChunk>) -> Self {
        Self {
            allowed: Vec::new(),
            blocked: results,
        }
    }
}

/// True iff some allowed path is a case-insensitive, segment-wise prefix
/// of `doc_path`. An empty `doc_path` is never allowed; an empty allowed
/// set allows nothing.
pub fn is_path_allowed(doc_path: &[String], allowed_paths: &[Vec<String>]) -> bool {
    if doc_path.is_empty() {
        return false;
    }

    allowed_paths
        .iter()
        .any(|allowed| !allowed.is_empty() && path_starts_with(doc_path, allowed))
}

/// Partition `results` by `is_path_allowed`, preserving order.
///
/// `filtered_count + blocked_count == original_count` always holds.
pub fn filter_search_results(
    results: Vec<RetrievedChunk>,
    allowed_paths: &[Vec<String>],
) -> FilterResult {
    let mut out = FilterResult::default();

    for chunk in results {
        if is_path_allowed(&chunk.taxonomy_path, allowed_paths) {
            out.allowed.push(chunk);
        } else {
            out.blocked.push(chunk);
        }
    }

    out
}
