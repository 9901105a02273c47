//! Shared identifier aliases, money primitives, and currency codes.

use serde::{Deserialize, Serialize};

/// Event identifier (slug or title used as the availability key).
pub type EventId = String;
/// Requester identity passed explicitly into every core operation.
pub type RequesterId = String;
/// Monotonic per-engine reservation identifier.
pub type ReservationId = u64;
/// Optimistic-concurrency version token.
pub type Version = u64;
/// Monetary amount in minor units.
pub type Cents = u64;
/// Ticket count.
pub type Quantity = u32;

/// Settlement currency handed to the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// United States dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
    /// Saudi riyal.
    Sar,
}

impl Currency {
    /// ISO 4217 code for gateway requests.
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Sar => "SAR",
        }
    }
}
