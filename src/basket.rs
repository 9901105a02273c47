//! Advisory basket of pending ticket lines.
//!
//! A basket never mutates inventory. It is owned by the requesting
//! session; the only transition to authoritative state is through
//! [`crate::reserve::ReservationEngine::reserve`].

use serde::{Deserialize, Serialize};

use crate::types::{Cents, EventId, Quantity, Version};

/// One pending purchase line for a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketLine {
    /// Event this line buys tickets for.
    pub event_id: EventId,
    /// Requested ticket count, always at least 1.
    pub quantity: Quantity,
    /// Price per ticket in minor units; 0 for free tickets.
    pub unit_price: Cents,
    /// Availability version observed when the line was first added.
    pub version_seen: Version,
}

/// A requester's set of not-yet-purchased lines, one per event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Basket {
    lines: Vec<BasketLine>,
}

impl Basket {
    /// Creates an empty basket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the basket holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines in insertion order.
    pub fn lines(&self) -> &[BasketLine] {
        &self.lines
    }

    /// Current quantity held for `event_id`, 0 when absent.
    pub fn quantity_for(&self, event_id: &str) -> Quantity {
        self.lines
            .iter()
            .find(|l| l.event_id == event_id)
            .map_or(0, |l| l.quantity)
    }

    /// Adds tickets for an event, merging into an existing line.
    ///
    /// A merged line keeps the unit price and `version_seen` captured
    /// when the event first entered the basket.
    pub fn add_line(
        &mut self,
        event_id: EventId,
        quantity: Quantity,
        unit_price: Cents,
        version_seen: Version,
    ) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.event_id == event_id) {
            line.quantity += quantity;
            return;
        }
        self.lines.push(BasketLine {
            event_id,
            quantity,
            unit_price,
            version_seen,
        });
    }

    /// Replaces the quantity on an existing line.
    ///
    /// Quantities below 1 are ignored; returns true when a line changed.
    pub fn set_quantity(&mut self, event_id: &str, quantity: Quantity) -> bool {
        if quantity < 1 {
            return false;
        }
        match self.lines.iter_mut().find(|l| l.event_id == event_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Drops the line for `event_id`; returns true when one existed.
    pub fn remove(&mut self, event_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.event_id != event_id);
        self.lines.len() != before
    }

    /// Basket total in minor units.
    pub fn total_cents(&self) -> Cents {
        self.lines
            .iter()
            .map(|l| l.unit_price * Cents::from(l.quantity))
            .sum()
    }

    /// Removes every line. Called by the workflow only after `Booked`.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
