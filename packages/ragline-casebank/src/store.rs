//! Case bank storage.
//!
//! The bank is read-mostly: concurrent similarity lookups read it freely
//! while feedback events (the only writers) update usage counters on
//! individual records. Persistence is flat JSON-lines keyed by `case_id`,
//! append-friendly so external tooling can add cases without rewriting
//! the file.

use crate::error::{CasebankError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::warn;

/// One prior (query, answer) case.
///
/// Immutable except the usage/feedback fields (`usage_count`,
/// `success_rate`, `last_used_at`), which only feedback events touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub query_vector: Vec<f32>,
    pub answer: String,
    pub category_path: Vec<String>,
    pub quality: f64,
    pub usage_count: u64,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl CaseRecord {
    pub fn new(
        case_id: impl Into<String>,
        query_vector: Vec<f32>,
        answer: impl Into<String>,
        category_path: Vec<String>,
        quality: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            case_id: case_id.into(),
            query_vector,
            answer: answer.into(),
            category_path,
            quality,
            usage_count: 0,
            success_rate: 0.0,
            created_at: now,
            last_used_at: now,
        }
    }
}

/// In-memory case bank preserving insertion order.
///
/// Insertion order is load-bearing: the recommendation engine breaks
/// similarity ties by original position, so the backing store must not
/// reorder records behind its back.
pub struct CaseBankStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Vec<CaseRecord>,
    index: HashMap<String, usize>,
}

impl Default for CaseBankStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseBankStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Load a bank from a JSON-lines file.
    ///
    /// Corrupt lines are skipped with a warning; one bad record must not
    /// abort the load. A duplicate `case_id` replaces the earlier record
    /// in place (append-friendly upsert).
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let store = Self::new();

        if !path.exists() {
            return Ok(store);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<CaseRecord>(&line) {
                Ok(record) => store.upsert(record),
                Err(e) => {
                    warn!(
                        "CaseBankStore: skipping corrupt record at line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        Ok(store)
    }

    /// Append every record to a JSON-lines file, one line per record.
    pub fn append_jsonl(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let inner = self.inner.read();
        for record in &inner.records {
            let line =
                serde_json::to_string(record).map_err(CasebankError::serialization)?;
            writeln!(file, "{}", line)?;
        }

        Ok(())
    }

    /// Insert or replace a record, keeping the original position on replace.
    pub fn upsert(&self, record: CaseRecord) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if let Some(&pos) = inner.index.get(&record.case_id) {
            inner.records[pos] = record;
        } else {
            let pos = inner.records.len();
            inner.index.insert(record.case_id.clone(), pos);
            inner.records.push(record);
        }
    }

    pub fn get(&self, case_id: &str) -> Option<CaseRecord> {
        let inner = self.inner.read();
        inner.index.get(case_id).map(|&pos| inner.records[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Snapshot of all records in insertion order.
    pub fn all(&self) -> Vec<CaseRecord> {
        self.inner.read().records.clone()
    }

    /// Apply a feedback event to one case.
    ///
    /// Updates `usage_count`, `success_rate` (running mean of success
    /// flags) and `last_used_at`; every other field stays untouched.
    pub fn apply_feedback(&self, case_id: &str, success: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let pos = *inner
            .index
            .get(case_id)
            .ok_or_else(|| CasebankError::CaseNotFound(case_id.to_string()))?;

        let record = &mut inner.records[pos];
        let successes = record.success_rate * record.usage_count as f64
            + if success { 1.0 } else { 0.0 };
        record.usage_count += 1;
        record.success_rate = successes / record.usage_count as f64;
        record.last_used_at = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(case_id: &str) -> CaseRecord {
        CaseRecord::new(
            case_id,
            vec![1.0, 0.0],
            "answer",
            vec!["Public".to_string()],
            0.9,
        )
    }

    #[test]
    fn test_upsert_and_get() {
        let store = CaseBankStore::new();
        store.upsert(sample("c1"));

        let got = store.get("c1").unwrap();
        assert_eq!(got.answer, "answer");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = CaseBankStore::new();
        store.upsert(sample("c1"));
        store.upsert(sample("c2"));

        let mut replacement = sample("c1");
        replacement.answer = "updated".to_string();
        store.upsert(replacement);

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].case_id, "c1");
        assert_eq!(all[0].answer, "updated");
        assert_eq!(all[1].case_id, "c2");
    }

    #[test]
    fn test_feedback_updates_only_usage_fields() {
        let store = CaseBankStore::new();
        store.upsert(sample("c1"));

        store.apply_feedback("c1", true).unwrap();
        store.apply_feedback("c1", false).unwrap();

        let got = store.get("c1").unwrap();
        assert_eq!(got.usage_count, 2);
        assert!((got.success_rate - 0.5).abs() < 1e-9);
        assert_eq!(got.answer, "answer");
        assert_eq!(got.quality, 0.9);
    }

    #[test]
    fn test_feedback_for_unknown_case_errors() {
        let store = CaseBankStore::new();
        assert!(store.apply_feedback("missing", true).is_err());
    }

    #[test]
    fn test_jsonl_roundtrip_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.jsonl");

        let store = CaseBankStore::new();
        store.upsert(sample("c1"));
        store.upsert(sample("c2"));
        store.append_jsonl(&path).unwrap();

        // Corrupt the file with a broken line between valid records.
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{not json}\n");
        std::fs::write(&path, contents).unwrap();

        let loaded = CaseBankStore::load_jsonl(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.get("c1").is_some());
        assert!(loaded.get("c2").is_some());
    }

    #[test]
    fn test_load_missing_file_is_empty_bank() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CaseBankStore::load_jsonl(&dir.path().join("absent.jsonl")).unwrap();
        assert!(loaded.is_empty());
    }
}
