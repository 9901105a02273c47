//! Checkout event stream payloads.
//!
//! UI side effects (re-rendering the basket, redirecting to the
//! bookings page) subscribe here instead of being entangled with the
//! workflow.

use crate::types::Cents;

/// Events emitted as a checkout attempt moves through its states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// Reservation started.
    Reserving,
    /// Inventory is held; waiting on the payment gateway.
    AwaitingPayment {
        /// Amount handed to the gateway, in minor units.
        amount: Cents,
    },
    /// Bookings were written; the attempt is complete.
    Booked {
        /// Number of bookings written.
        bookings: usize,
    },
    /// The attempt ended without a booking.
    Rejected,
    /// Reserved inventory is being added back.
    Compensating,
    /// Compensation finished; inventory is restored.
    Compensated,
    /// Compensation gave up after bounded retries.
    CompensationFailed,
}
