//! Checkout orchestration: reservation, payment, booking.

/// Observable checkout state transitions.
pub mod events;
/// Workflow state machine and the payment gateway contract.
pub mod workflow;
