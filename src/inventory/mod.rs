//! Durable ticket inventory.

/// Availability records and the versioned key-value store around them.
pub mod store;
