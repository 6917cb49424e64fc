//! Scoped retrieval: category filtering, bypass detection, audit logging.
//!
//! Retrieval results are limited to a pre-authorized set of taxonomy
//! category paths. Suspected bypass attempts fail closed: the caller sees
//! zero results, never an error, and the audit log records the full
//! blocked count.

pub mod audit;
pub mod category;
pub mod security;

pub use audit::{AuditLogger, AuditRecord};
pub use category::{filter_search_results, is_path_allowed, FilterResult};
pub use security::{sanitize_query, BypassKind, BypassRule, BypassRuleSet};

use crate::collaborators::RetrievedChunk;
use crate::request::SessionScope;
use chrono::Utc;
use tracing::{info, warn};

/// Scope enforcement for one deployment: the bypass rule table plus the
/// audit sink.
pub struct ScopedRetrieval {
    rules: BypassRuleSet,
    audit: AuditLogger,
}

impl ScopedRetrieval {
    pub fn new(rules: BypassRuleSet, audit: AuditLogger) -> Self {
        Self { rules, audit }
    }

    /// Filter retriever output against the session scope.
    ///
    /// If a bypass rule fires, the call short-circuits: zero results,
    /// every input counted as blocked, and the audit record carries the
    /// full blocked count. Otherwise results are partitioned by category
    /// and the outcome audited. Exactly one audit record per call, even
    /// when nothing was blocked; audit-write failures are logged and
    /// swallowed so policy enforcement never turns into a caller error.
    pub fn filter(
        &self,
        request_id: &str,
        query: &str,
        results: Vec<RetrievedChunk>,
        scope: &SessionScope,
    ) -> FilterResult {
        let filter_spec = filter_spec_display(&scope.allowed_paths);

        let outcome = match self.rules.detect_bypass_attempt(query, &filter_spec) {
            Some(rule) => {
                warn!(
                    "ScopedRetrieval: bypass attempt matched rule '{}' ({:?}), failing closed",
                    rule.id, rule.kind
                );
                FilterResult::all_blocked(results)
            }
            None => filter_search_results(results, &scope.allowed_paths),
        };

        if outcome.blocked_count() > 0 {
            info!(
                "ScopedRetrieval: {} allowed, {} blocked for request {}",
                outcome.filtered_count(),
                outcome.blocked_count(),
                request_id
            );
        }

        let record = AuditRecord {
            event: AuditRecord::RETRIEVAL_ACCESS.to_string(),
            user_id: scope.user_id.clone(),
            query: sanitize_query(query),
            allowed_paths: scope.allowed_paths.clone(),
            result_count: outcome.filtered_count(),
            blocked_count: outcome.blocked_count(),
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.audit.log_access(&record) {
            warn!("ScopedRetrieval: audit write failed: {}", e);
        }

        outcome
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }
}

fn filter_spec_display(allowed_paths: &[Vec<String>]) -> String {
    allowed_paths
        .iter()
        .map(|p| p.join("/"))
        .collect::<Vec<_>>()
        .join(",")
}
