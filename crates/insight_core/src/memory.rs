//! Long-term memory bank.
//!
//! KPI snapshots are appended to a JSON-lines file that survives across runs:
//!
//! ```text
//! insightflow_logs/memory_bank.jsonl
//! {"id":"…","recorded_at":"…","source":"sales.csv","run_id":"…","values":{…}}
//! {"id":"…","recorded_at":"…","source":"sales.csv","run_id":"…","values":{…}}
//! ```
//!
//! The bank assumes a single writer process. Entries are never pruned.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// A recorded KPI snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    /// Dataset the snapshot was computed from
    pub source: String,
    /// Pipeline run that produced the snapshot
    pub run_id: Uuid,
    /// Scalar KPI values keyed by name
    pub values: BTreeMap<String, f64>,
}

impl MemoryEntry {
    pub fn new(source: impl Into<String>, run_id: Uuid, values: BTreeMap<String, f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            source: source.into(),
            run_id,
            values,
        }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// File-backed, append-only store of KPI snapshots.
pub struct LongTermMemoryBank {
    path: PathBuf,
    entries: Vec<MemoryEntry>,
    writer: BufWriter<File>,
}

impl LongTermMemoryBank {
    /// Open (or create) the bank at `path` and load its history.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            Self::read_entries(&path)?
        } else {
            Vec::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened memory bank {:?} ({} entries)", path, entries.len());

        Ok(Self {
            path,
            entries,
            writer: BufWriter::new(file),
        })
    }

    fn read_entries(path: &Path) -> CoreResult<Vec<MemoryEntry>> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: MemoryEntry = serde_json::from_str(&line).map_err(|e| {
                CoreError::Serialization(format!("{}:{}: {}", path.display(), index + 1, e))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Append an entry. Write failures are returned as-is.
    pub fn record(&mut self, entry: MemoryEntry) -> CoreResult<()> {
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        debug!("Recorded memory entry {} for {}", entry.id, entry.source);
        self.entries.push(entry);
        Ok(())
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[MemoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Most recent entry recorded for `source`.
    pub fn latest_for(&self, source: &str) -> Option<&MemoryEntry> {
        self.entries.iter().rev().find(|e| e.source == source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flush and sync the backing file.
    pub fn close(mut self) -> CoreResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        debug!("Closed memory bank {:?}", self.path);
        Ok(())
    }
}

impl std::fmt::Debug for LongTermMemoryBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongTermMemoryBank")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}
