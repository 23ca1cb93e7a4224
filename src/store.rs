use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StorageError, StoreError};
use crate::record::{new_id, now_millis, LoadedEntry, Record, RecordForm, RecordId};
use crate::report::Report;
use crate::storage::KeyValueStore;
use crate::totals::{RecordBreakdown, Totals};

/// Result of a mutation that was applied in memory. `storage` holds the
/// persist failure, if any; the mutation stands either way.
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    pub value: T,
    pub storage: Option<StorageError>,
}

impl<T> Applied<T> {
    pub fn is_durable(&self) -> bool {
        self.storage.is_none()
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] when the write to storage failed.
    pub fn durable(self) -> Result<T, StoreError> {
        match self.storage {
            None => Ok(self.value),
            Some(err) => Err(StoreError::Storage(err)),
        }
    }
}

/// Ordered school records mirrored into a [`KeyValueStore`].
#[derive(Debug)]
pub struct RecordStore<S> {
    storage: S,
    config: StoreConfig,
    records: Vec<Record>,
    issued: HashSet<RecordId>,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Builds a store and loads whatever `storage` holds. Load failures are
    /// logged and leave the store empty.
    pub fn open(storage: S, config: StoreConfig) -> Self {
        let mut store = Self {
            storage,
            config,
            records: Vec::new(),
            issued: HashSet::new(),
        };
        if let Err(err) = store.load() {
            warn!(key = %store.config.storage_key, error = %err, "starting with an empty store");
        }
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Replaces the in-memory records with the persisted ones and returns
    /// how many were loaded.
    ///
    /// # Errors
    ///
    /// On a read failure or a corrupt payload the store is emptied and the
    /// [`StorageError`] is returned; the store stays usable.
    pub fn load(&mut self) -> Result<usize, StorageError> {
        let key = self.config.storage_key.clone();
        self.records.clear();

        let raw = match self.storage.get(key.as_str())? {
            Some(raw) => raw,
            None => {
                info!(key = %key, "no saved records");
                return Ok(0);
            }
        };
        let entries = match serde_json::from_str::<serde_json::Value>(raw.as_str()) {
            Ok(serde_json::Value::Array(entries)) => entries,
            Ok(_) => {
                return Err(StorageError::Corrupt {
                    key,
                    reason: "expected an array of records".to_string(),
                })
            }
            Err(err) => {
                return Err(StorageError::Corrupt {
                    key,
                    reason: err.to_string(),
                })
            }
        };

        let mut seen: HashSet<RecordId> = HashSet::new();
        for (position, value) in entries.iter().enumerate() {
            let Some(entry) = LoadedEntry::from_value(value) else {
                warn!(key = %key, position, "skipping unreadable record");
                continue;
            };
            let id = match entry.id {
                Some(id) if !seen.contains(&id) => id,
                _ => self.fresh_id(&seen),
            };
            seen.insert(id.clone());
            self.records.push(Record {
                id,
                name: entry.fields.name,
                large: entry.fields.large,
                small: entry.fields.small,
                created_at: entry.created_at,
            });
        }
        self.issued.extend(seen);
        info!(key = %key, count = self.records.len(), "loaded records");
        Ok(self.records.len())
    }

    /// Writes the full record list under the configured key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when serialization or the write fails.
    pub fn persist(&mut self) -> Result<(), StorageError> {
        let content = serde_json::to_string(&self.records).map_err(StorageError::Serialize)?;
        self.storage
            .set(self.config.storage_key.as_str(), content.as_str())
    }

    /// Appends a record built from `form`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] without touching the store.
    pub fn create(&mut self, form: &RecordForm) -> Result<Applied<Record>, StoreError> {
        let fields = form.validate()?;
        let id = self.fresh_id(&HashSet::new());
        self.issued.insert(id.clone());
        let record = Record {
            id,
            name: fields.name,
            large: fields.large,
            small: fields.small,
            created_at: now_millis(),
        };
        self.records.push(record.clone());
        debug!(id = %record.id, name = %record.name, "record created");
        Ok(self.commit(record))
    }

    /// Replaces the fields of the record at `index`, keeping its id and
    /// position. The timestamp becomes the time of this write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a stale index and
    /// [`StoreError::Validation`] for bad input; neither mutates the store.
    pub fn update(
        &mut self,
        index: usize,
        form: &RecordForm,
    ) -> Result<Applied<Record>, StoreError> {
        self.check_index(index)?;
        let fields = form.validate()?;
        let record = &mut self.records[index];
        record.name = fields.name;
        record.large = fields.large;
        record.small = fields.small;
        record.created_at = now_millis();
        let record = record.clone();
        debug!(id = %record.id, index, "record updated");
        Ok(self.commit(record))
    }

    /// Removes and returns the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a stale index.
    pub fn delete(&mut self, index: usize) -> Result<Applied<Record>, StoreError> {
        self.check_index(index)?;
        let removed = self.records.remove(index);
        debug!(id = %removed.id, index, "record deleted");
        Ok(self.commit(removed))
    }

    /// Drops every record and returns how many there were. Confirmation is
    /// the caller's job.
    pub fn clear(&mut self) -> Applied<usize> {
        let removed = self.records.len();
        self.records.clear();
        debug!(removed, "records cleared");
        self.commit(removed)
    }

    /// Detached copy of the records in display order.
    pub fn list(&self) -> Vec<Record> {
        self.records.clone()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn breakdown(&self, index: usize) -> Option<RecordBreakdown> {
        self.records
            .get(index)
            .map(|record| RecordBreakdown::of(record, self.config.bundle_size))
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(self.records.as_slice(), self.config.bundle_size)
    }

    pub fn report(&self, title: &str) -> Report {
        Report::new(title, self.records.as_slice(), self.config.bundle_size)
    }

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index < self.records.len() {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                index,
                len: self.records.len(),
            })
        }
    }

    fn fresh_id(&self, pending: &HashSet<RecordId>) -> RecordId {
        loop {
            let id = new_id();
            if !self.issued.contains(&id) && !pending.contains(&id) {
                return id;
            }
        }
    }

    fn commit<T>(&mut self, value: T) -> Applied<T> {
        let storage = match self.persist() {
            Ok(()) => None,
            Err(err) => {
                warn!(key = %self.config.storage_key, error = %err, "failed to save records");
                Some(err)
            }
        };
        Applied { value, storage }
    }
}
