//! Two-phase basket reservation under optimistic versioning.
//!
//! `validate` collects every problem in the basket before failing so
//! callers can report them all at once; `commit` re-checks the version
//! captured during validation and decrements availability
//! all-or-nothing. `release` is the compensation path: it adds
//! reserved quantities back with the same read-version-write
//! discipline and is idempotent per reservation id.

use std::fmt;

use hashbrown::HashSet;

use crate::{
    basket::Basket,
    inventory::store::{AvailabilityRecord, AvailabilityStore, StoreError},
    types::{Cents, EventId, Quantity, ReservationId, Version},
};

/// Compensation attempts before giving up on a conflicting record.
pub const RELEASE_RETRY_CAP: usize = 5;

/// Why a basket line failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// No availability record exists for the event.
    EventNotFound,
    /// Fewer tickets remain than the line requests.
    InsufficientAvailability {
        /// Tickets the line asked for.
        requested: Quantity,
        /// Tickets actually available.
        available: Quantity,
    },
}

/// One validation problem, tied to its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationIssue {
    /// Event the problem applies to.
    pub event_id: EventId,
    /// Problem detail.
    pub kind: IssueKind,
}

impl fmt::Display for ReservationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::EventNotFound => write!(f, "{}: event not found", self.event_id),
            IssueKind::InsufficientAvailability {
                requested,
                available,
            } => write!(
                f,
                "{}: only {available} tickets available (requested {requested})",
                self.event_id
            ),
        }
    }
}

/// Reservation failure.
#[derive(Debug)]
pub enum ReserveError {
    /// Validation failed; carries every line's problem.
    Rejected(Vec<ReservationIssue>),
    /// Another writer mutated inventory between validation and commit.
    /// Retryable: restart from validation, not from commit.
    VersionConflict {
        /// First event whose version moved.
        event_id: EventId,
    },
    /// Availability store failure.
    Store(StoreError),
}

impl From<StoreError> for ReserveError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Compensation failure.
#[derive(Debug)]
pub enum ReleaseError {
    /// The compensating write kept losing the version race.
    /// Inventory may be inconsistent; surface for manual reconciliation.
    Exhausted {
        /// Event whose record could not be restored.
        event_id: EventId,
        /// Attempts made before giving up.
        attempts: usize,
    },
    /// Availability store failure.
    Store(StoreError),
}

/// One validated line with the version captured for the commit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    /// Event to decrement.
    pub event_id: EventId,
    /// Tickets to take.
    pub quantity: Quantity,
    /// Availability after the decrement.
    pub new_available: Quantity,
    /// Record version observed during validation.
    pub version: Version,
}

/// Output of the validation pass, input to the commit pass.
#[derive(Debug, Clone)]
pub struct ReservationPlan {
    lines: Vec<PlannedLine>,
}

impl ReservationPlan {
    /// Validated lines in basket order.
    pub fn lines(&self) -> &[PlannedLine] {
        &self.lines
    }
}

/// A committed decrement, one per basket line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedLine {
    /// Event that was decremented.
    pub event_id: EventId,
    /// Tickets taken.
    pub quantity: Quantity,
}

/// A committed reservation, the unit of release.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Engine-local identifier used by the release-once guard.
    pub id: ReservationId,
    /// Quantities taken per event.
    pub lines: Vec<ReservedLine>,
    /// Records as stored by the commit, in basket order.
    pub records: Vec<(EventId, AvailabilityRecord)>,
}

/// Validates and commits baskets against an [`AvailabilityStore`].
pub struct ReservationEngine {
    store: AvailabilityStore,
    next_reservation_id: ReservationId,
    released: HashSet<ReservationId>,
}

impl ReservationEngine {
    /// Wraps an availability store.
    pub fn new(store: AvailabilityStore) -> Self {
        Self {
            store,
            next_reservation_id: 1,
            released: HashSet::new(),
        }
    }

    /// Read access to the availability store.
    pub fn store(&self) -> &AvailabilityStore {
        &self.store
    }

    /// Mutable access for event management (create/resize/remove).
    pub fn store_mut(&mut self) -> &mut AvailabilityStore {
        &mut self.store
    }

    /// Adds tickets to a basket after an advisory availability check.
    ///
    /// The merged quantity (what the basket already holds for the
    /// event plus `quantity`) must not exceed current availability.
    /// Quantities below 1 coerce to a single ticket. Records the
    /// availability version seen at add time on the line.
    pub fn stage_line(
        &self,
        basket: &mut Basket,
        event_id: &str,
        quantity: Quantity,
        unit_price: Cents,
    ) -> Result<(), ReserveError> {
        let quantity = quantity.max(1);
        let record = match self.store.get(event_id) {
            Ok(rec) => rec,
            Err(StoreError::MissingEvent(id)) => {
                return Err(ReserveError::Rejected(vec![ReservationIssue {
                    event_id: id,
                    kind: IssueKind::EventNotFound,
                }]));
            }
            Err(other) => return Err(ReserveError::Store(other)),
        };

        let requested = basket.quantity_for(event_id) + quantity;
        if requested > record.available {
            return Err(ReserveError::Rejected(vec![ReservationIssue {
                event_id: event_id.to_string(),
                kind: IssueKind::InsufficientAvailability {
                    requested,
                    available: record.available,
                },
            }]));
        }

        basket.add_line(event_id.to_string(), quantity, unit_price, record.version);
        Ok(())
    }

    /// Validation pass: checks every line, performing no writes.
    ///
    /// Collects all issues instead of short-circuiting so the whole
    /// basket's problems come back in one response.
    pub fn validate(&self, basket: &Basket) -> Result<ReservationPlan, ReserveError> {
        let mut issues = Vec::new();
        let mut lines = Vec::new();

        for line in basket.lines() {
            match self.store.get(&line.event_id) {
                Err(StoreError::MissingEvent(id)) => {
                    issues.push(ReservationIssue {
                        event_id: id,
                        kind: IssueKind::EventNotFound,
                    });
                }
                Err(other) => return Err(ReserveError::Store(other)),
                Ok(rec) => {
                    if line.quantity > rec.available {
                        issues.push(ReservationIssue {
                            event_id: line.event_id.clone(),
                            kind: IssueKind::InsufficientAvailability {
                                requested: line.quantity,
                                available: rec.available,
                            },
                        });
                    } else {
                        lines.push(PlannedLine {
                            event_id: line.event_id.clone(),
                            quantity: line.quantity,
                            new_available: rec.available - line.quantity,
                            version: rec.version,
                        });
                    }
                }
            }
        }

        if !issues.is_empty() {
            return Err(ReserveError::Rejected(issues));
        }
        Ok(ReservationPlan { lines })
    }

    /// Commit pass: re-checks every version, then decrements all lines.
    ///
    /// Any version mismatch aborts the whole commit before the first
    /// write. A record deleted between the passes counts as a conflict
    /// too; the interleaved writer wins either way.
    pub fn commit(&mut self, plan: ReservationPlan) -> Result<Reservation, ReserveError> {
        for line in &plan.lines {
            let rec = match self.store.get(&line.event_id) {
                Ok(rec) => rec,
                Err(StoreError::MissingEvent(id)) => {
                    return Err(ReserveError::VersionConflict { event_id: id });
                }
                Err(other) => return Err(ReserveError::Store(other)),
            };
            if rec.version != line.version {
                return Err(ReserveError::VersionConflict {
                    event_id: line.event_id.clone(),
                });
            }
        }

        let mut records = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            match self
                .store
                .put_checked(&line.event_id, line.new_available, line.version)
            {
                Ok(rec) => records.push((line.event_id.clone(), rec)),
                Err(StoreError::VersionConflict { event_id, .. }) => {
                    return Err(ReserveError::VersionConflict { event_id });
                }
                Err(other) => return Err(ReserveError::Store(other)),
            }
        }

        let id = self.next_reservation_id;
        self.next_reservation_id += 1;
        Ok(Reservation {
            id,
            lines: plan
                .lines
                .into_iter()
                .map(|l| ReservedLine {
                    event_id: l.event_id,
                    quantity: l.quantity,
                })
                .collect(),
            records,
        })
    }

    /// Validates and commits in one call.
    pub fn reserve(&mut self, basket: &Basket) -> Result<Reservation, ReserveError> {
        let plan = self.validate(basket)?;
        self.commit(plan)
    }

    /// Compensation: adds reserved quantities back into availability.
    ///
    /// Each line retries its read-modify-write up to `retry_cap` times
    /// on version conflict, then fails with [`ReleaseError::Exhausted`].
    /// Returns false without touching inventory when the reservation
    /// was already released; the guard is marked before the first
    /// write, so a retry after a partial failure cannot double-add.
    pub fn release(
        &mut self,
        reservation: &Reservation,
        retry_cap: usize,
    ) -> Result<bool, ReleaseError> {
        if !self.released.insert(reservation.id) {
            return Ok(false);
        }

        for line in &reservation.lines {
            let mut attempts = 0;
            loop {
                attempts += 1;
                let rec = match self.store.get(&line.event_id) {
                    Ok(rec) => rec,
                    // Event deleted while the reservation was pending:
                    // nothing left to restore for this line.
                    Err(StoreError::MissingEvent(_)) => break,
                    Err(other) => return Err(ReleaseError::Store(other)),
                };
                let restored = rec.available.saturating_add(line.quantity).min(rec.total);
                match self.store.put_checked(&line.event_id, restored, rec.version) {
                    Ok(_) => break,
                    Err(StoreError::VersionConflict { .. }) if attempts < retry_cap => continue,
                    Err(StoreError::VersionConflict { event_id, .. }) => {
                        return Err(ReleaseError::Exhausted { event_id, attempts });
                    }
                    Err(other) => return Err(ReleaseError::Store(other)),
                }
            }
        }
        Ok(true)
    }
}
