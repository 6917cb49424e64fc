//! k-NN recommendation over the case bank.

use crate::similarity;
use crate::store::{CaseBankStore, CaseRecord};
use crate::taxonomy::path_starts_with;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Scoring method for case similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    Cosine,
    Euclidean,
}

impl SimilarityMethod {
    pub fn score(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            SimilarityMethod::Cosine => similarity::cosine(a, b),
            SimilarityMethod::Euclidean => similarity::euclidean(a, b),
        }
    }
}

/// Engine configuration with the standard lookup defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub k: usize,
    pub threshold: f64,
    pub method: SimilarityMethod,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k: 5,
            threshold: 0.7,
            method: SimilarityMethod::Cosine,
        }
    }
}

/// One ranked prior case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub case_id: String,
    pub similarity_score: f64,
    pub answer: String,
    pub category_path: Vec<String>,
    pub quality: f64,
}

/// Per-case scoring outcome, aggregated by the engine instead of
/// defaulting bad records to a score in the ranking hot loop.
enum ScoreOutcome {
    Scored(f64),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    EmptyVector,
    BelowThreshold,
}

/// Keep cases whose `category_path` has `path` as a case-insensitive
/// prefix. An empty `path` passes everything.
pub fn filter_by_category<'a>(
    cases: &'a [CaseRecord],
    path: &[String],
) -> Vec<&'a CaseRecord> {
    cases
        .iter()
        .filter(|case| path_starts_with(&case.category_path, path))
        .collect()
}

/// k-NN lookup over a shared, read-mostly case bank.
pub struct RecommendationEngine {
    store: Arc<CaseBankStore>,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(store: Arc<CaseBankStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find the k most similar prior cases.
    ///
    /// Filter by category first, score second, drop below `threshold`,
    /// sort descending with a stable tie-break by original bank order,
    /// truncate to `k`. Cases with missing/empty vectors are skipped
    /// silently (counted for diagnostics only); `k == 0` yields nothing;
    /// `threshold == 0.0` ranks every filtered case.
    pub fn find_similar_cases(
        &self,
        query_vector: &[f32],
        category_path: Option<&[String]>,
        k: usize,
        threshold: f64,
    ) -> Vec<SimilarityResult> {
        if k == 0 || query_vector.is_empty() {
            return Vec::new();
        }

        let records = self.store.all();
        let empty_path: Vec<String> = Vec::new();
        let candidates = filter_by_category(
            &records,
            category_path.unwrap_or(empty_path.as_slice()),
        );

        let method = self.config.method;
        let outcomes: Vec<(usize, ScoreOutcome)> = candidates
            .par_iter()
            .enumerate()
            .map(|(pos, case)| {
                if case.query_vector.is_empty() {
                    return (pos, ScoreOutcome::Skipped(SkipReason::EmptyVector));
                }
                let score = method.score(query_vector, &case.query_vector);
                if score < threshold {
                    (pos, ScoreOutcome::Skipped(SkipReason::BelowThreshold))
                } else {
                    (pos, ScoreOutcome::Scored(score))
                }
            })
            .collect();

        let skipped_empty = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ScoreOutcome::Skipped(SkipReason::EmptyVector)))
            .count();
        if skipped_empty > 0 {
            debug!(
                "RecommendationEngine: skipped {} cases with empty vectors",
                skipped_empty
            );
        }

        // Outcomes arrive in candidate order, so the stable sort below
        // preserves original order among equal scores.
        let mut ranked: Vec<(f64, &CaseRecord)> = outcomes
            .into_iter()
            .filter_map(|(pos, outcome)| match outcome {
                ScoreOutcome::Scored(score) => Some((score, candidates[pos])),
                ScoreOutcome::Skipped(_) => None,
            })
            .collect();

        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(score, case)| SimilarityResult {
                case_id: case.case_id.clone(),
                similarity_score: score,
                answer: case.answer.clone(),
                category_path: case.category_path.clone(),
                quality: case.quality,
            })
            .collect()
    }

    /// Lookup with the engine's configured `k` and `threshold`.
    pub fn recommend(
        &self,
        query_vector: &[f32],
        category_path: Option<&[String]>,
    ) -> Vec<SimilarityResult> {
        self.find_similar_cases(
            query_vector,
            category_path,
            self.config.k,
            self.config.threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(case_id: &str, vector: Vec<f32>, category: &[&str]) -> CaseRecord {
        CaseRecord::new(
            case_id,
            vector,
            format!("answer for {}", case_id),
            category.iter().map(|s| s.to_string()).collect(),
            0.8,
        )
    }

    fn engine_with(cases: Vec<CaseRecord>) -> RecommendationEngine {
        let store = Arc::new(CaseBankStore::new());
        for c in cases {
            store.upsert(c);
        }
        RecommendationEngine::new(store, EngineConfig::default())
    }

    #[test]
    fn test_identical_vector_scores_one() {
        let engine = engine_with(vec![case("c1", vec![1.0, 0.0, 0.0, 0.0, 0.0], &["Public"])]);

        let results =
            engine.find_similar_cases(&[1.0, 0.0, 0.0, 0.0, 0.0], None, 1, 0.0);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, "c1");
        assert!((results[0].similarity_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_results_bounded_by_k_and_sorted() {
        let engine = engine_with(vec![
            case("far", vec![-1.0, 0.2], &["Public"]),
            case("near", vec![1.0, 0.0], &["Public"]),
            case("mid", vec![1.0, 1.0], &["Public"]),
        ]);

        let results = engine.find_similar_cases(&[1.0, 0.0], None, 2, 0.0);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].case_id, "near");
        assert_eq!(results[1].case_id, "mid");
        assert!(results[0].similarity_score >= results[1].similarity_score);
    }

    #[test]
    fn test_threshold_drops_low_scores() {
        let engine = engine_with(vec![
            case("near", vec![1.0, 0.0], &["Public"]),
            case("opposite", vec![-1.0, 0.0], &["Public"]),
        ]);

        let results = engine.find_similar_cases(&[1.0, 0.0], None, 5, 0.7);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, "near");
        for r in &results {
            assert!(r.similarity_score >= 0.7);
        }
    }

    #[test]
    fn test_category_filter_applies_before_scoring() {
        let engine = engine_with(vec![
            case("hr", vec![1.0, 0.0], &["Internal", "HR"]),
            case("pub", vec![1.0, 0.0], &["Public", "FAQ"]),
        ]);

        let category = vec!["public".to_string()];
        let results = engine.find_similar_cases(&[1.0, 0.0], Some(&category), 5, 0.0);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, "pub");
    }

    #[test]
    fn test_k_zero_is_empty() {
        let engine = engine_with(vec![case("c1", vec![1.0], &["Public"])]);
        assert!(engine.find_similar_cases(&[1.0], None, 0, 0.0).is_empty());
    }

    #[test]
    fn test_empty_vector_cases_skipped_silently() {
        let engine = engine_with(vec![
            case("empty", vec![], &["Public"]),
            case("ok", vec![1.0, 0.0], &["Public"]),
        ]);

        let results = engine.find_similar_cases(&[1.0, 0.0], None, 5, 0.0);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, "ok");
    }

    #[test]
    fn test_stable_tie_break_preserves_bank_order() {
        // Two identical vectors tie exactly; bank order must decide.
        let engine = engine_with(vec![
            case("first", vec![1.0, 0.0], &["Public"]),
            case("second", vec![1.0, 0.0], &["Public"]),
        ]);

        let results = engine.find_similar_cases(&[1.0, 0.0], None, 2, 0.0);

        assert_eq!(results[0].case_id, "first");
        assert_eq!(results[1].case_id, "second");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn results_never_exceed_k_and_respect_threshold(
                vectors in prop::collection::vec(
                    prop::collection::vec(-10.0f32..10.0, 3),
                    0..20,
                ),
                k in 0usize..8,
                threshold in 0.0f64..1.0,
            ) {
                let cases: Vec<CaseRecord> = vectors
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| case(&format!("c{}", i), v, &["Public"]))
                    .collect();
                let engine = engine_with(cases);

                let results = engine.find_similar_cases(&[1.0, 0.0, 0.0], None, k, threshold);

                prop_assert!(results.len() <= k);
                for pair in results.windows(2) {
                    prop_assert!(pair[0].similarity_score >= pair[1].similarity_score);
                }
                for r in &results {
                    prop_assert!(r.similarity_score >= threshold);
                }
            }
        }
    }
}
