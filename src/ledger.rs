//! Per-requester booking ledger over the key-value collaborator.

use crate::{
    booking::Booking,
    persist::{KvStore, PersistError, PersistResult},
};

fn ledger_key(requester: &str) -> String {
    format!("bookings_{requester}")
}

/// Append-only list of bookings per requester.
pub struct BookingLedger {
    kv: Box<dyn KvStore>,
}

impl BookingLedger {
    /// Wraps a key-value collaborator.
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Appends bookings to the requester's list.
    pub fn append_bookings(&mut self, requester: &str, bookings: &[Booking]) -> PersistResult<()> {
        if bookings.is_empty() {
            return Ok(());
        }
        let mut all = self.list_bookings(requester)?;
        all.extend_from_slice(bookings);
        let raw = serde_json::to_string(&all).map_err(PersistError::Serde)?;
        self.kv.write(&ledger_key(requester), &raw)
    }

    /// Lists the requester's bookings in append order.
    pub fn list_bookings(&self, requester: &str) -> PersistResult<Vec<Booking>> {
        match self.kv.read(&ledger_key(requester))? {
            Some(raw) => serde_json::from_str(&raw).map_err(PersistError::Serde),
            None => Ok(Vec::new()),
        }
    }
}
