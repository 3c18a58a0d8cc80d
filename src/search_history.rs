//! Durable per-instance record of when items were last searched.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct HistoryFile {
    #[serde(rename = "searchHistory", default)]
    search_history: HashMap<i64, u64>,
}

/// JSON-file-backed search history for one instance.
///
/// Timestamps are Unix epoch milliseconds. Mutations stay in memory until
/// [`JsonSearchHistoryStore::save`], which prunes entries older than the
/// frequency window and replaces the file atomically via a temp-file rename,
/// so a crash mid-write never leaves a corrupt file behind.
pub struct JsonSearchHistoryStore {
    file_path: PathBuf,
    max_age_ms: u64,
    entries: HashMap<i64, u64>,
}

impl JsonSearchHistoryStore {
    /// Opens the history for `instance_name` under `data_dir`, creating the
    /// directory if needed. A missing or unreadable file is an empty history.
    pub fn new(data_dir: &Path, instance_name: &str, frequency_hours: f64) -> Self {
        if let Err(err) = fs::create_dir_all(data_dir) {
            warn!(
                "Failed to create data directory {}: {}",
                data_dir.display(),
                err
            );
        }
        let file_path = data_dir.join(format!("{instance_name}.json"));
        let entries = Self::load(&file_path);
        Self {
            file_path,
            max_age_ms: (frequency_hours * MILLIS_PER_HOUR) as u64,
            entries,
        }
    }

    fn load(file_path: &Path) -> HashMap<i64, u64> {
        let Ok(raw) = fs::read_to_string(file_path) else {
            return HashMap::new();
        };
        match serde_json::from_str::<HistoryFile>(&raw) {
            Ok(parsed) => parsed.search_history,
            Err(err) => {
                warn!(
                    "Ignoring unreadable search history {}: {}",
                    file_path.display(),
                    err
                );
                HashMap::new()
            }
        }
    }

    /// Returns the subset of `ids` searched within the frequency window.
    pub fn filter_recent(&self, ids: &[i64]) -> Vec<i64> {
        self.filter_recent_at(ids, current_unix_ms())
    }

    fn filter_recent_at(&self, ids: &[i64], now_ms: u64) -> Vec<i64> {
        let cutoff = now_ms.saturating_sub(self.max_age_ms);
        ids.iter()
            .copied()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|last_searched| *last_searched > cutoff)
            })
            .collect()
    }

    /// Marks every id in the batch as searched now, overwriting prior entries.
    pub fn record(&mut self, ids: &[i64]) {
        self.record_at(ids, current_unix_ms());
    }

    fn record_at(&mut self, ids: &[i64], now_ms: u64) {
        for id in ids {
            self.entries.insert(*id, now_ms);
        }
    }

    /// Prunes entries outside the frequency window and persists the rest.
    pub fn save(&mut self) -> Result<(), String> {
        self.save_at(current_unix_ms())
    }

    fn save_at(&mut self, now_ms: u64) -> Result<(), String> {
        let cutoff = now_ms.saturating_sub(self.max_age_ms);
        self.entries.retain(|_, last_searched| *last_searched > cutoff);

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
        }
        let file_data = HistoryFile {
            search_history: self.entries.clone(),
        };
        let serialized = serde_json::to_string_pretty(&file_data)
            .map_err(|err| format!("failed to serialize search history: {}", err))?;
        let temp_path = self.file_path.with_extension("json.tmp");
        fs::write(&temp_path, serialized)
            .map_err(|err| format!("failed to write {}: {}", temp_path.display(), err))?;
        fs::rename(&temp_path, &self.file_path)
            .map_err(|err| format!("failed to replace {}: {}", self.file_path.display(), err))?;
        Ok(())
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
