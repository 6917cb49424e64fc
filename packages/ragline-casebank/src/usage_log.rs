//! Append-only CBR usage logging.
//!
//! Two JSON-lines streams: one record per similarity lookup, one per
//! feedback event. Records are never mutated after the fact; each append
//! is a single line write so concurrent writers interleave whole records.

use crate::error::{CasebankError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One similarity-lookup record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogRecord {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub category_path: Vec<String>,
    pub picked_case_ids: Vec<String>,
    pub similarity_scores: Vec<f64>,
    pub user_id: Option<String>,
}

/// One feedback-event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackLogRecord {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub selected_case_ids: Vec<String>,
    pub user_rating: Option<f64>,
    pub success_flag: bool,
    pub feedback_text: Option<String>,
    pub user_id: Option<String>,
}

/// Append-only logger for CBR queries and feedback.
pub struct UsageLogger {
    query_log: PathBuf,
    feedback_log: PathBuf,
}

impl UsageLogger {
    /// Logger writing `cbr_queries.jsonl` and `cbr_feedback.jsonl` under `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            query_log: dir.join("cbr_queries.jsonl"),
            feedback_log: dir.join("cbr_feedback.jsonl"),
        }
    }

    pub fn log_query(&self, record: &QueryLogRecord) -> Result<()> {
        append_line(&self.query_log, record)
    }

    pub fn log_feedback(&self, record: &FeedbackLogRecord) -> Result<()> {
        append_line(&self.feedback_log, record)
    }

    /// Load all query records; corrupt lines are skipped with a warning.
    pub fn load_queries(&self) -> Result<Vec<QueryLogRecord>> {
        load_lines(&self.query_log)
    }

    /// Load all feedback records; corrupt lines are skipped with a warning.
    pub fn load_feedback(&self) -> Result<Vec<FeedbackLogRecord>> {
        load_lines(&self.feedback_log)
    }
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(record).map_err(CasebankError::serialization)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

fn load_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    "UsageLogger: skipping corrupt entry at {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    e
                );
            }
        }
    }

    Ok(records)
}
