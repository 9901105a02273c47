//! Checkout state machine over the reservation engine, payment
//! gateway, and booking ledger.
//!
//! Inventory is decremented before the gateway round trip and no lock
//! is held across it; the engine's version check turns interleaved
//! writers into retryable conflicts instead of oversells. Any payment
//! outcome other than approval releases the reservation, as does an
//! attempt abandoned mid-payment (see [`CheckoutWorkflow::reconcile`]).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use crate::{
    basket::Basket,
    booking::{Booking, BookingStatus, PaymentReference},
    inventory::store::StoreError,
    ledger::BookingLedger,
    persist::PersistError,
    reserve::{
        RELEASE_RETRY_CAP, Reservation, ReservationEngine, ReservationIssue, ReleaseError,
        ReserveError,
    },
    types::{Cents, Currency, EventId},
};

use super::events::CheckoutEvent;

/// Terminal resolution of one gateway round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The payment was captured.
    Approved {
        /// Gateway transaction reference.
        reference: String,
        /// Payer name reported by the gateway.
        payer_name: String,
    },
    /// The user backed out before capture.
    Cancelled,
    /// The gateway reported an error.
    Failed {
        /// Gateway-supplied reason.
        reason: String,
    },
}

/// External payment collaborator.
///
/// Given an amount and currency, resolves asynchronously to one of the
/// three [`PaymentOutcome`]s. The core never builds UI for it.
pub trait PaymentGateway: Send + Sync {
    /// Runs one payment round trip for `amount` in `currency`.
    fn collect(
        &self,
        amount: Cents,
        currency: Currency,
    ) -> Pin<Box<dyn Future<Output = PaymentOutcome> + Send>>;

    /// Voids a captured payment after a downstream failure.
    ///
    /// Best effort; the default does nothing.
    fn void(&self, _reference: &str) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Workflow tuning knobs.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Currency handed to the gateway.
    pub currency: Currency,
    /// Compensation retries per record before surfacing a fatal error.
    pub compensation_retry_cap: usize,
    /// Capacity of the checkout event channel.
    pub events_capacity: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::Usd,
            compensation_retry_cap: RELEASE_RETRY_CAP,
            events_capacity: 64,
        }
    }
}

/// State of the most recent checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    /// No attempt has run yet.
    Idle,
    /// Reserving inventory.
    Reserving,
    /// Inventory held, gateway round trip in flight.
    AwaitingPayment,
    /// Releasing reserved inventory after a failed payment.
    Compensating,
    /// Terminal: bookings written.
    Booked,
    /// Terminal: no booking; inventory restored if it was held.
    Rejected,
}

/// Checkout failure.
#[derive(Debug)]
pub enum CheckoutError {
    /// Nothing to check out.
    EmptyBasket,
    /// Reservation validation failed; all line problems included.
    Rejected(Vec<ReservationIssue>),
    /// Inventory moved between validation and commit; retry the basket.
    VersionConflict {
        /// First conflicting event.
        event_id: EventId,
    },
    /// The user cancelled payment. Nothing was charged.
    PaymentCancelled,
    /// The gateway failed. Nothing was charged.
    PaymentFailed {
        /// Gateway-supplied reason.
        reason: String,
    },
    /// Compensation exhausted its retries; inventory may be
    /// inconsistent and needs manual reconciliation.
    CompensationFailed {
        /// Event whose record could not be restored.
        event_id: EventId,
    },
    /// The booking ledger write failed; any charge was voided.
    Ledger(PersistError),
    /// Availability store failure.
    Store(StoreError),
}

impl fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBasket => write!(f, "basket is empty"),
            Self::Rejected(issues) => {
                write!(f, "reservation rejected: ")?;
                for (i, issue) in issues.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{issue}")?;
                }
                Ok(())
            }
            Self::VersionConflict { event_id } => {
                write!(
                    f,
                    "availability for {event_id} changed while reserving; please retry"
                )
            }
            Self::PaymentCancelled => write!(
                f,
                "payment was cancelled; nothing was charged and the tickets were released"
            ),
            Self::PaymentFailed { reason } => write!(
                f,
                "payment failed ({reason}); nothing was charged and the tickets were released"
            ),
            Self::CompensationFailed { event_id } => write!(
                f,
                "failed to restore availability for {event_id} after an aborted payment; \
                 inventory needs manual reconciliation"
            ),
            Self::Ledger(err) => write!(
                f,
                "booking ledger write failed ({err:?}); the payment was voided and the tickets released"
            ),
            Self::Store(err) => write!(f, "availability store error: {err:?}"),
        }
    }
}

impl std::error::Error for CheckoutError {}

/// Drives one checkout attempt at a time.
pub struct CheckoutWorkflow {
    engine: ReservationEngine,
    ledger: BookingLedger,
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
    events_tx: broadcast::Sender<CheckoutEvent>,
    pending: Option<Reservation>,
    state: CheckoutState,
}

impl CheckoutWorkflow {
    /// Builds a workflow over its three collaborators.
    pub fn new(
        engine: ReservationEngine,
        ledger: BookingLedger,
        gateway: Arc<dyn PaymentGateway>,
        config: CheckoutConfig,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(config.events_capacity.max(1));
        Self {
            engine,
            ledger,
            gateway,
            config,
            events_tx,
            pending: None,
            state: CheckoutState::Idle,
        }
    }

    /// Subscribes to checkout state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.events_tx.subscribe()
    }

    /// State of the most recent attempt.
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Read access to the reservation engine.
    pub fn engine(&self) -> &ReservationEngine {
        &self.engine
    }

    /// Mutable engine access for staging lines and event management.
    pub fn engine_mut(&mut self) -> &mut ReservationEngine {
        &mut self.engine
    }

    /// Read access to the booking ledger.
    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    /// Releases a reservation left behind by an abandoned attempt.
    ///
    /// An attempt whose future was dropped while `AwaitingPayment` is
    /// equivalent to a cancelled payment; callers run this before
    /// retrying (checkout does so itself). Returns true when a pending
    /// reservation was released. Safe to call repeatedly.
    pub fn reconcile(&mut self) -> Result<bool, CheckoutError> {
        let Some(reservation) = self.pending.take() else {
            return Ok(false);
        };
        tracing::warn!(
            reservation = reservation.id,
            "releasing reservation from abandoned checkout"
        );
        self.compensate(&reservation)?;
        self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
        Ok(true)
    }

    /// Runs one checkout attempt for `requester`.
    ///
    /// Reserves the basket, collects payment when the total is
    /// nonzero, writes bookings, and clears the basket. On any payment
    /// failure the reservation is released before the error is
    /// returned, so end-to-end inventory is unchanged.
    pub async fn checkout(
        &mut self,
        requester: &str,
        basket: &mut Basket,
    ) -> Result<Vec<Booking>, CheckoutError> {
        self.reconcile()?;

        if basket.is_empty() {
            self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
            return Err(CheckoutError::EmptyBasket);
        }

        self.transition(CheckoutState::Reserving, CheckoutEvent::Reserving);
        let reservation = match self.engine.reserve(basket) {
            Ok(reservation) => reservation,
            Err(err) => {
                self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
                return Err(match err {
                    ReserveError::Rejected(issues) => CheckoutError::Rejected(issues),
                    ReserveError::VersionConflict { event_id } => {
                        CheckoutError::VersionConflict { event_id }
                    }
                    ReserveError::Store(e) => CheckoutError::Store(e),
                });
            }
        };

        let total = basket.total_cents();
        if total == 0 {
            let bookings = build_bookings(basket, None);
            if let Err(e) = self.ledger.append_bookings(requester, &bookings) {
                self.compensate(&reservation)?;
                self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
                return Err(CheckoutError::Ledger(e));
            }
            basket.clear();
            self.transition(
                CheckoutState::Booked,
                CheckoutEvent::Booked {
                    bookings: bookings.len(),
                },
            );
            tracing::info!(requester, count = bookings.len(), "booked free tickets");
            return Ok(bookings);
        }

        // Hold the reservation where reconcile() can find it if this
        // future is dropped during the gateway round trip.
        self.pending = Some(reservation.clone());
        self.transition(
            CheckoutState::AwaitingPayment,
            CheckoutEvent::AwaitingPayment { amount: total },
        );
        let outcome = self.gateway.collect(total, self.config.currency).await;
        self.pending = None;

        match outcome {
            PaymentOutcome::Approved {
                reference,
                payer_name,
            } => {
                let payment = PaymentReference {
                    reference: reference.clone(),
                    payer_name,
                };
                let bookings = build_bookings(basket, Some(payment));
                if let Err(e) = self.ledger.append_bookings(requester, &bookings) {
                    // Mirror of the gateway's order-void path: undo the
                    // charge, then the reservation.
                    self.gateway.void(&reference).await;
                    self.compensate(&reservation)?;
                    self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
                    return Err(CheckoutError::Ledger(e));
                }
                basket.clear();
                self.transition(
                    CheckoutState::Booked,
                    CheckoutEvent::Booked {
                        bookings: bookings.len(),
                    },
                );
                tracing::info!(
                    requester,
                    count = bookings.len(),
                    reference,
                    "booked paid tickets"
                );
                Ok(bookings)
            }
            PaymentOutcome::Cancelled => {
                tracing::warn!(requester, "payment cancelled; releasing reservation");
                self.compensate(&reservation)?;
                self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
                Err(CheckoutError::PaymentCancelled)
            }
            PaymentOutcome::Failed { reason } => {
                tracing::warn!(requester, reason, "payment failed; releasing reservation");
                self.compensate(&reservation)?;
                self.transition(CheckoutState::Rejected, CheckoutEvent::Rejected);
                Err(CheckoutError::PaymentFailed { reason })
            }
        }
    }

    fn compensate(&mut self, reservation: &Reservation) -> Result<(), CheckoutError> {
        self.transition(CheckoutState::Compensating, CheckoutEvent::Compensating);
        match self
            .engine
            .release(reservation, self.config.compensation_retry_cap)
        {
            Ok(_) => {
                let _ = self.events_tx.send(CheckoutEvent::Compensated);
                Ok(())
            }
            Err(ReleaseError::Exhausted { event_id, attempts }) => {
                tracing::error!(
                    event_id,
                    attempts,
                    "compensation exhausted retries; inventory may be inconsistent"
                );
                let _ = self.events_tx.send(CheckoutEvent::CompensationFailed);
                Err(CheckoutError::CompensationFailed { event_id })
            }
            Err(ReleaseError::Store(e)) => Err(CheckoutError::Store(e)),
        }
    }

    fn transition(&mut self, state: CheckoutState, event: CheckoutEvent) {
        self.state = state;
        let _ = self.events_tx.send(event);
    }
}

fn build_bookings(basket: &Basket, payment: Option<PaymentReference>) -> Vec<Booking> {
    let booked_at_ms = now_ms();
    basket
        .lines()
        .iter()
        .map(|line| Booking {
            event_id: line.event_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            booked_at_ms,
            payment: payment.clone(),
            status: BookingStatus::Confirmed,
        })
        .collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
