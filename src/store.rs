use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::{AccessionId, RequestSet, SequenceRecord};
use crate::error::StoreError;

const TABLE_SCHEMA_VERSION: u32 = 1;

/// Keyed persistence for sequence records.
///
/// `lookup` returns only the ids that exist. `upsert` replaces description and
/// sequence per key (last write wins) and must not write anything for an empty
/// batch.
pub trait SequenceStore: Send + Sync {
    fn lookup(
        &self,
        ids: &RequestSet,
    ) -> Result<BTreeMap<AccessionId, SequenceRecord>, StoreError>;

    fn upsert(&self, records: &[SequenceRecord]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRow {
    pub accession_id: AccessionId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub updated_at: String,
}

impl From<StoredRow> for SequenceRecord {
    fn from(row: StoredRow) -> Self {
        SequenceRecord {
            accession_id: row.accession_id,
            description: row.description,
            sequence: row.sequence,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    schema_version: u32,
    #[serde(default)]
    records: Vec<StoredRow>,
}

/// A sequence table kept as one JSON document on disk.
///
/// Writers serialize through a sidecar lock file, so several processes can
/// share one table.
#[derive(Debug)]
pub struct JsonTableStore {
    path: Utf8PathBuf,
    write_guard: Mutex<()>,
}

impl JsonTableStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn lock_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.lock", self.path))
    }

    /// Every stored row, including unresolved placeholders.
    pub fn rows(&self) -> Result<Vec<StoredRow>, StoreError> {
        Ok(self.read_table()?.into_values().collect())
    }

    fn parent_dir(&self) -> Utf8PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        }
    }

    fn io_error(&self, err: impl ToString) -> StoreError {
        StoreError::Io {
            path: self.path.to_string(),
            message: err.to_string(),
        }
    }

    fn read_table(&self) -> Result<BTreeMap<AccessionId, StoredRow>, StoreError> {
        if !self.path.as_std_path().exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            fs::read_to_string(self.path.as_std_path()).map_err(|err| self.io_error(err))?;
        let table: TableFile =
            serde_json::from_str(&content).map_err(|err| StoreError::Corrupt {
                path: self.path.to_string(),
                message: err.to_string(),
            })?;
        if table.schema_version != TABLE_SCHEMA_VERSION {
            return Err(StoreError::Corrupt {
                path: self.path.to_string(),
                message: format!("unsupported schema version {}", table.schema_version),
            });
        }
        Ok(table
            .records
            .into_iter()
            .map(|row| (row.accession_id.clone(), row))
            .collect())
    }

    fn write_table(&self, rows: BTreeMap<AccessionId, StoredRow>) -> Result<(), StoreError> {
        let parent = self.parent_dir();
        fs::create_dir_all(parent.as_std_path()).map_err(|err| self.io_error(err))?;
        let table = TableFile {
            schema_version: TABLE_SCHEMA_VERSION,
            records: rows.into_values().collect(),
        };
        let content = serde_json::to_vec_pretty(&table).map_err(|err| self.io_error(err))?;
        let mut temp = Builder::new()
            .prefix(".seqvault-table")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| self.io_error(err))?;
        temp.write_all(&content).map_err(|err| self.io_error(err))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| self.io_error(err))?;
        temp.persist(self.path.as_std_path())
            .map_err(|err| self.io_error(err))?;
        Ok(())
    }

    fn acquire_file_lock(&self) -> Result<File, StoreError> {
        fs::create_dir_all(self.parent_dir().as_std_path()).map_err(|err| self.io_error(err))?;
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path().as_std_path())
            .map_err(|err| self.io_error(err))?;
        file.lock().map_err(|err| self.io_error(err))?;
        Ok(file)
    }
}

impl SequenceStore for JsonTableStore {
    fn lookup(
        &self,
        ids: &RequestSet,
    ) -> Result<BTreeMap<AccessionId, SequenceRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut table = self.read_table()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                table
                    .remove(id)
                    .map(|row| (id.clone(), SequenceRecord::from(row)))
            })
            .collect())
    }

    fn upsert(&self, records: &[SequenceRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StoreError::Backend("store write lock poisoned".to_string()))?;
        // Held until the new table is in place; dropping the handle unlocks.
        let _lock = self.acquire_file_lock()?;

        let mut table = self.read_table()?;
        let updated_at = chrono::Utc::now().to_rfc3339();
        for record in records {
            table.insert(
                record.accession_id.clone(),
                StoredRow {
                    accession_id: record.accession_id.clone(),
                    description: record.description.clone(),
                    sequence: record.sequence.clone(),
                    updated_at: updated_at.clone(),
                },
            );
        }
        self.write_table(table)?;
        tracing::debug!(path = %self.path, count = records.len(), "upserted records");
        Ok(())
    }
}

/// In-process table with the same semantics as [`JsonTableStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<AccessionId, SequenceRecord>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SequenceRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.accession_id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of non-empty upsert batches applied so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &AccessionId) -> Option<SequenceRecord> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(id).cloned())
    }
}

impl SequenceStore for MemoryStore {
    fn lookup(
        &self,
        ids: &RequestSet,
    ) -> Result<BTreeMap<AccessionId, SequenceRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Backend("memory store poisoned".to_string()))?;
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).map(|record| (id.clone(), record.clone())))
            .collect())
    }

    fn upsert(&self, records: &[SequenceRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut table = self
            .records
            .write()
            .map_err(|_| StoreError::Backend("memory store poisoned".to_string()))?;
        for record in records {
            table.insert(record.accession_id.clone(), record.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> AccessionId {
        value.parse().unwrap()
    }

    #[test]
    fn lookup_on_missing_file_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("table.json")).unwrap();
        let store = JsonTableStore::new(path);
        let ids = [id("P1")].into_iter().collect::<RequestSet>();
        assert!(store.lookup(&ids).unwrap().is_empty());
    }

    #[test]
    fn memory_store_counts_only_real_writes() {
        let store = MemoryStore::new();
        store.upsert(&[]).unwrap();
        assert_eq!(store.write_count(), 0);
        store
            .upsert(&[SequenceRecord::new(id("P1"), "d", "MK")])
            .unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get(&id("P1")).unwrap().sequence, "MK");
    }
}
