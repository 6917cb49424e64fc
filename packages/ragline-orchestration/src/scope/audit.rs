//! Append-only retrieval-access audit log.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One retrieval-access audit record. Written unconditionally for every
/// scoped-retrieval call, blocked or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: String,
    pub user_id: Option<String>,
    /// Sanitized query, for display only.
    pub query: String,
    pub allowed_paths: Vec<Vec<String>>,
    pub result_count: usize,
    pub blocked_count: usize,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub const RETRIEVAL_ACCESS: &'static str = "retrieval_access";
}

/// JSON-lines audit logger; one line per record, append-only.
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn log_access(&self, record: &AuditRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(record).map_err(PipelineError::serialization)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Load all records; corrupt lines are skipped with a warning.
    pub fn load(&self) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        "AuditLogger: skipping corrupt record at line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        Ok(records)
    }
}
