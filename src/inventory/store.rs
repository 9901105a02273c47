//! Availability records keyed by event id, persisted as one JSON map.
//!
//! The store is the sole arbiter of inventory truth. It does no basket
//! validation; that belongs to [`crate::reserve::ReservationEngine`].

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    persist::{KvStore, PersistError},
    types::{EventId, Quantity, Version},
};

/// Key under which the whole availability map is persisted.
pub const AVAILABILITY_KEY: &str = "ticket_availability";

/// Inventory counters for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// Inventory ceiling, fixed at event creation or resize.
    pub total: Quantity,
    /// Tickets still sellable; never negative, never above `total`.
    pub available: Quantity,
    /// Optimistic-concurrency token; bumped on every committed write.
    pub version: Version,
}

/// Availability store failure.
#[derive(Debug)]
pub enum StoreError {
    /// No record exists for the event.
    MissingEvent(EventId),
    /// A checked write lost the version race.
    VersionConflict {
        /// Event whose record moved underneath the writer.
        event_id: EventId,
        /// Version the writer expected.
        expected: Version,
        /// Version actually persisted.
        actual: Version,
    },
    /// Underlying persistence failure.
    Persist(PersistError),
}

impl From<PersistError> for StoreError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

/// Versioned availability map over a [`KvStore`] collaborator.
pub struct AvailabilityStore {
    kv: Box<dyn KvStore>,
}

impl AvailabilityStore {
    /// Wraps a key-value collaborator.
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Fetches the record for `event_id`.
    pub fn get(&self, event_id: &str) -> Result<AvailabilityRecord, StoreError> {
        self.load_map()?
            .remove(event_id)
            .ok_or_else(|| StoreError::MissingEvent(event_id.to_string()))
    }

    /// Fetches every record.
    pub fn get_all(&self) -> Result<HashMap<EventId, AvailabilityRecord>, StoreError> {
        self.load_map()
    }

    /// Unconditional overwrite.
    ///
    /// Reserved for event management; reservation and compensation go
    /// through [`Self::put_checked`].
    pub fn put(&mut self, event_id: &str, record: AvailabilityRecord) -> Result<(), StoreError> {
        let mut map = self.load_map()?;
        map.insert(event_id.to_string(), record);
        self.save_map(&map)
    }

    /// Compare-and-swap write of `available`.
    ///
    /// Fails with [`StoreError::VersionConflict`] when the persisted
    /// version differs from `expected_version`; otherwise writes the
    /// new count and bumps the version, returning the stored record.
    pub fn put_checked(
        &mut self,
        event_id: &str,
        available: Quantity,
        expected_version: Version,
    ) -> Result<AvailabilityRecord, StoreError> {
        let mut map = self.load_map()?;
        let rec = map
            .get_mut(event_id)
            .ok_or_else(|| StoreError::MissingEvent(event_id.to_string()))?;
        if rec.version != expected_version {
            return Err(StoreError::VersionConflict {
                event_id: event_id.to_string(),
                expected: expected_version,
                actual: rec.version,
            });
        }
        rec.available = available.min(rec.total);
        rec.version += 1;
        let out = rec.clone();
        self.save_map(&map)?;
        Ok(out)
    }

    /// Seeds a fresh record at event creation: fully available, version 1.
    ///
    /// Replaces any existing record; resizing a live event should use
    /// [`Self::resize_total`] instead.
    pub fn create_event(
        &mut self,
        event_id: &str,
        total: Quantity,
    ) -> Result<AvailabilityRecord, StoreError> {
        let record = AvailabilityRecord {
            total,
            available: total,
            version: 1,
        };
        self.put(event_id, record.clone())?;
        Ok(record)
    }

    /// Applies a new inventory ceiling after an event edit.
    ///
    /// Sold tickets are preserved: `available` becomes the new total
    /// minus tickets already gone, clamped at zero.
    pub fn resize_total(
        &mut self,
        event_id: &str,
        new_total: Quantity,
    ) -> Result<AvailabilityRecord, StoreError> {
        let mut map = self.load_map()?;
        let rec = map
            .get_mut(event_id)
            .ok_or_else(|| StoreError::MissingEvent(event_id.to_string()))?;
        let sold = rec.total - rec.available;
        rec.total = new_total;
        rec.available = new_total.saturating_sub(sold);
        rec.version += 1;
        let out = rec.clone();
        self.save_map(&map)?;
        Ok(out)
    }

    /// Deletes the record when its event is deleted.
    ///
    /// Returns true when a record existed.
    pub fn remove_event(&mut self, event_id: &str) -> Result<bool, StoreError> {
        let mut map = self.load_map()?;
        let existed = map.remove(event_id).is_some();
        if existed {
            self.save_map(&map)?;
        }
        Ok(existed)
    }

    fn load_map(&self) -> Result<HashMap<EventId, AvailabilityRecord>, StoreError> {
        match self.kv.read(AVAILABILITY_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Persist(PersistError::Serde(e))),
            None => Ok(HashMap::new()),
        }
    }

    fn save_map(&mut self, map: &HashMap<EventId, AvailabilityRecord>) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(map).map_err(|e| StoreError::Persist(PersistError::Serde(e)))?;
        self.kv.write(AVAILABILITY_KEY, &raw)?;
        Ok(())
    }
}
