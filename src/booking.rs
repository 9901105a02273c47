//! Immutable booking records created after a successful checkout.

use serde::{Deserialize, Serialize};

use crate::types::{Cents, EventId, Quantity};

/// Gateway capture details attached to a paid booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReference {
    /// Gateway transaction reference.
    pub reference: String,
    /// Payer name reported by the gateway.
    pub payer_name: String,
}

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// The only status: bookings are written once, after commit.
    Confirmed,
}

/// Persisted record of a completed purchase for one event.
///
/// Created by the checkout workflow only after the reservation commit
/// (and gateway approval when the basket had a nonzero total); never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Event the tickets belong to.
    pub event_id: EventId,
    /// Number of tickets purchased.
    pub quantity: Quantity,
    /// Price per ticket in minor units.
    pub unit_price: Cents,
    /// Booking timestamp in milliseconds since epoch.
    pub booked_at_ms: u64,
    /// Capture details; `None` for free tickets.
    pub payment: Option<PaymentReference>,
    /// Always [`BookingStatus::Confirmed`].
    pub status: BookingStatus,
}
