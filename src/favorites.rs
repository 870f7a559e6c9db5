use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::photo::PhotoRecord;
use crate::store::KeyValueStore;

/// Storage key holding the JSON array of favorite records.
pub const FAVORITES_KEY: &str = "favorites";

/// User-curated photos, unique by id, mirrored to a [`KeyValueStore`].
///
/// Every mutation rewrites the stored array before returning.
#[derive(Debug)]
pub struct Favorites<S> {
    records: Vec<PhotoRecord>,
    store: S,
}

impl<S: KeyValueStore> Favorites<S> {
    /// Read the persisted list once. A missing key is an empty list; a value
    /// that does not parse is reported as [`StoreError::Corrupt`].
    pub fn load(store: S) -> Result<Self, StoreError> {
        let records = match store.get(FAVORITES_KEY)? {
            Some(raw) => {
                let parsed: Vec<PhotoRecord> =
                    serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                        key: FAVORITES_KEY.to_string(),
                        source,
                    })?;
                let mut seen = HashSet::new();
                let total = parsed.len();
                let unique: Vec<_> = parsed
                    .into_iter()
                    .filter(|p| seen.insert(p.id.clone()))
                    .collect();
                if unique.len() != total {
                    warn!(
                        dropped = total - unique.len(),
                        "favorites: duplicate ids in stored list"
                    );
                }
                unique
            }
            None => Vec::new(),
        };
        info!(count = records.len(), "favorites loaded");
        Ok(Self { records, store })
    }

    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&PhotoRecord> {
        self.records.iter().find(|p| p.id == id)
    }

    /// Append `record` unless its id is already present. Returns whether the
    /// list changed.
    pub fn add(&mut self, record: PhotoRecord) -> Result<bool, StoreError> {
        if self.contains(&record.id) {
            debug!(id = %record.id, "favorites: already present");
            return Ok(false);
        }
        debug!(id = %record.id, "favorites: add");
        self.records.push(record);
        self.persist()?;
        Ok(true)
    }

    /// Drop every record with `id` and persist. Returns whether anything matched.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.records.len();
        self.records.retain(|p| p.id != id);
        let removed = self.records.len() != before;
        debug!(id, removed, "favorites: remove");
        self.persist()?;
        Ok(removed)
    }

    /// Remove `record` if present, otherwise add it. Returns whether it is a
    /// favorite afterwards.
    pub fn toggle(&mut self, record: PhotoRecord) -> Result<bool, StoreError> {
        if self.contains(&record.id) {
            self.remove(&record.id)?;
            Ok(false)
        } else {
            self.add(record)?;
            Ok(true)
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.records).map_err(|source| StoreError::Encode {
            key: FAVORITES_KEY.to_string(),
            source,
        })?;
        self.store.set(FAVORITES_KEY, &raw)
    }
}
