//! Local-first event-ticketing core: optimistic inventory reservation
//! with compensating release and an async checkout workflow.
//!
//! # Examples
//!
//! In-memory reservation with [`reserve::ReservationEngine`]:
//! ```
//! use boxoffice::{
//!     basket::Basket,
//!     inventory::store::AvailabilityStore,
//!     persist::memory::MemoryKv,
//!     reserve::ReservationEngine,
//! };
//!
//! let mut store = AvailabilityStore::new(Box::new(MemoryKv::new()));
//! store.create_event("tech-conf-2025", 100).expect("create");
//!
//! let mut engine = ReservationEngine::new(store);
//! let mut basket = Basket::new();
//! engine
//!     .stage_line(&mut basket, "tech-conf-2025", 3, 2_500)
//!     .expect("stage");
//!
//! let reservation = engine.reserve(&basket).expect("reserve");
//! assert_eq!(reservation.records[0].1.available, 97);
//! assert_eq!(reservation.records[0].1.version, 2);
//! ```
//!
//! Checkout against a payment gateway and SQLite persistence:
//! ```no_run
//! use std::{future::Future, pin::Pin, sync::Arc};
//!
//! use boxoffice::{
//!     basket::Basket,
//!     checkout::workflow::{CheckoutConfig, CheckoutWorkflow, PaymentGateway, PaymentOutcome},
//!     inventory::store::AvailabilityStore,
//!     ledger::BookingLedger,
//!     persist::sqlite::SqliteKv,
//!     reserve::ReservationEngine,
//!     types::{Cents, Currency},
//! };
//!
//! struct ApproveAll;
//!
//! impl PaymentGateway for ApproveAll {
//!     fn collect(
//!         &self,
//!         _amount: Cents,
//!         _currency: Currency,
//!     ) -> Pin<Box<dyn Future<Output = PaymentOutcome> + Send>> {
//!         Box::pin(async {
//!             PaymentOutcome::Approved {
//!                 reference: "PAY-123".to_string(),
//!                 payer_name: "Dana".to_string(),
//!             }
//!         })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut store =
//!     AvailabilityStore::new(Box::new(SqliteKv::open("boxoffice.db").expect("open")));
//! store.create_event("tech-conf-2025", 100).expect("create");
//! let ledger = BookingLedger::new(Box::new(SqliteKv::open("boxoffice.db").expect("open")));
//!
//! let mut workflow = CheckoutWorkflow::new(
//!     ReservationEngine::new(store),
//!     ledger,
//!     Arc::new(ApproveAll),
//!     CheckoutConfig::default(),
//! );
//!
//! let mut basket = Basket::new();
//! workflow
//!     .engine()
//!     .stage_line(&mut basket, "tech-conf-2025", 2, 2_500)
//!     .expect("stage");
//! let bookings = workflow
//!     .checkout("dana@example.com", &mut basket)
//!     .await
//!     .expect("checkout");
//! assert_eq!(bookings.len(), 1);
//! # }
//! ```
#![deny(missing_docs)]

/// Advisory per-requester basket of pending ticket lines.
pub mod basket;
/// Immutable booking records written after a successful checkout.
pub mod booking;
/// Checkout workflow, payment gateway contract, and event stream.
pub mod checkout;
/// Durable availability records with compare-and-swap writes.
pub mod inventory;
/// Per-requester booking ledger.
pub mod ledger;
/// Key-value persistence abstraction with SQLite and in-memory backends.
pub mod persist;
/// Two-phase reservation engine and compensation path.
pub mod reserve;
/// Shared identifier aliases and money primitives.
pub mod types;
