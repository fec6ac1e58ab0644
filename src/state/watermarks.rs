use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::utils::constants::MINUTE_FORMAT;

/// Outcome of a watermark advance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Cursor moved to the cycle's max event time
    Advanced(NaiveDateTime),
    /// Max event time was in the future; cursor capped at the present
    CappedToPresent(NaiveDateTime),
    /// Candidate did not exceed the current cursor; nothing written
    Unchanged,
}

/// Persistent cursor store for incremental ingestion, keyed by
/// (resource name, partition id).
///
/// The store is the sole owner of watermark state. Cursors start at the
/// configured initial value, advance only after a successful load cycle, never
/// regress, and never exceed the present time of the advance. Persistence is a
/// whole-file JSON rewrite through a temp file and atomic rename, performed
/// under the same lock as the in-memory update.
pub struct WatermarkStore {
    path: PathBuf,
    initial: NaiveDateTime,
    entries: Mutex<BTreeMap<String, NaiveDateTime>>,
}

impl WatermarkStore {
    /// Open (or create) the store backing file. Malformed persisted entries
    /// are a startup error, not a silently reset cursor.
    pub fn open(path: &Path, initial: NaiveDateTime) -> Result<Self> {
        let mut entries = BTreeMap::new();

        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let persisted: BTreeMap<String, String> = serde_json::from_str(&raw)?;
            for (key, value) in persisted {
                let parsed =
                    NaiveDateTime::parse_from_str(&value, MINUTE_FORMAT).map_err(|_| {
                        IngestError::Config(format!(
                            "corrupt watermark '{}' for '{}' in {}",
                            value,
                            key,
                            path.display()
                        ))
                    })?;
                entries.insert(key, parsed);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            initial,
            entries: Mutex::new(entries),
        })
    }

    fn key(resource: &str, partition_id: &str) -> String {
        format!("{}:{}", resource, partition_id)
    }

    /// Current cursor for a (resource, partition) pair, initializing to the
    /// configured start value on first access.
    pub fn cursor(&self, resource: &str, partition_id: &str) -> NaiveDateTime {
        let entries = self.entries.lock().expect("watermark lock poisoned");
        entries
            .get(&Self::key(resource, partition_id))
            .copied()
            .unwrap_or(self.initial)
    }

    /// Advance a cursor after a successful load cycle.
    ///
    /// `candidate` is the max event time among the loaded records; the new
    /// cursor is `min(candidate, now)` so future-dated upstream data (clock
    /// skew, forecast bleed) can never push the cursor past real time. A
    /// candidate at or below the current cursor leaves it unchanged.
    pub fn advance(
        &self,
        resource: &str,
        partition_id: &str,
        candidate: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Advance> {
        let capped = candidate.min(now);
        let key = Self::key(resource, partition_id);

        let mut entries = self.entries.lock().expect("watermark lock poisoned");
        let current = entries.get(&key).copied().unwrap_or(self.initial);

        if capped <= current {
            debug!(%key, cursor = %current, "watermark unchanged");
            return Ok(Advance::Unchanged);
        }

        entries.insert(key.clone(), capped);
        self.persist(&entries)?;

        if capped < candidate {
            info!(%key, cursor = %capped, max_event = %candidate, "watermark capped at present");
            Ok(Advance::CappedToPresent(capped))
        } else {
            debug!(%key, cursor = %capped, "watermark advanced");
            Ok(Advance::Advanced(capped))
        }
    }

    /// Snapshot of every cursor, for status reporting.
    pub fn snapshot(&self) -> Vec<(String, NaiveDateTime)> {
        let entries = self.entries.lock().expect("watermark lock poisoned");
        entries.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    fn persist(&self, entries: &BTreeMap<String, NaiveDateTime>) -> Result<()> {
        let serializable: BTreeMap<&String, String> = entries
            .iter()
            .map(|(k, v)| (k, v.format(MINUTE_FORMAT).to_string()))
            .collect();

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(&serializable)?.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
