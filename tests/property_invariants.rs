use std::collections::BTreeMap;

use proptest::prelude::*;

use boxoffice::{
    basket::Basket,
    inventory::store::AvailabilityStore,
    persist::memory::MemoryKv,
    reserve::{Reservation, ReservationEngine, ReserveError},
};

const EVENTS: [(&str, u32); 3] = [("tech-conf", 8), ("meetup", 5), ("marathon", 12)];

#[derive(Debug, Clone)]
enum Action {
    Reserve { event: u8, qty: u8 },
    ReservePair { qty_a: u8, qty_b: u8 },
    Release { target: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..3, 1u8..7).prop_map(|(event, qty)| Action::Reserve { event, qty }),
        (1u8..7, 1u8..7).prop_map(|(qty_a, qty_b)| Action::ReservePair { qty_a, qty_b }),
        (0u8..16).prop_map(|target| Action::Release { target }),
    ]
}

fn snapshot(engine: &ReservationEngine) -> BTreeMap<String, (u32, u32, u64)> {
    engine
        .store()
        .get_all()
        .expect("get_all")
        .into_iter()
        .map(|(id, rec)| (id, (rec.total, rec.available, rec.version)))
        .collect()
}

proptest! {
    #[test]
    fn random_reserve_release_sequences_conserve_inventory(
        actions in prop::collection::vec(action_strategy(), 1..120)
    ) {
        let kv = MemoryKv::new();
        let mut store = AvailabilityStore::new(Box::new(kv));
        for (id, total) in EVENTS {
            store.create_event(id, total).expect("create");
        }
        let mut engine = ReservationEngine::new(store);

        // Model: outstanding (unreleased) tickets per event.
        let mut outstanding: BTreeMap<String, u32> = BTreeMap::new();
        let mut live: Vec<Reservation> = Vec::new();

        for action in actions {
            let before = snapshot(&engine);

            match action {
                Action::Reserve { event, qty } => {
                    let (id, _) = EVENTS[usize::from(event) % EVENTS.len()];
                    let mut basket = Basket::new();
                    basket.add_line(id.to_string(), u32::from(qty), 100, 1);

                    match engine.reserve(&basket) {
                        Ok(reservation) => {
                            *outstanding.entry(id.to_string()).or_default() += u32::from(qty);
                            live.push(reservation);
                        }
                        Err(ReserveError::Rejected(_)) => {
                            // A rejected basket must leave every record untouched.
                            prop_assert_eq!(snapshot(&engine), before.clone());
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                    }
                }
                Action::ReservePair { qty_a, qty_b } => {
                    let mut basket = Basket::new();
                    basket.add_line(EVENTS[0].0.to_string(), u32::from(qty_a), 100, 1);
                    basket.add_line(EVENTS[1].0.to_string(), u32::from(qty_b), 100, 1);

                    match engine.reserve(&basket) {
                        Ok(reservation) => {
                            *outstanding.entry(EVENTS[0].0.to_string()).or_default() +=
                                u32::from(qty_a);
                            *outstanding.entry(EVENTS[1].0.to_string()).or_default() +=
                                u32::from(qty_b);
                            live.push(reservation);
                        }
                        Err(ReserveError::Rejected(_)) => {
                            // All-or-nothing: the valid half commits nothing.
                            prop_assert_eq!(snapshot(&engine), before.clone());
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                    }
                }
                Action::Release { target } => {
                    if live.is_empty() {
                        continue;
                    }
                    let reservation = live[usize::from(target) % live.len()].clone();
                    let released = engine.release(&reservation, 5).expect("release");
                    if released {
                        for line in &reservation.lines {
                            let held = outstanding.entry(line.event_id.clone()).or_default();
                            *held -= line.quantity;
                        }
                    } else {
                        // Double release must be a no-op.
                        prop_assert_eq!(snapshot(&engine), before.clone());
                    }
                }
            }

            // Inventory conservation and bounds after every step.
            let after = snapshot(&engine);
            for (id, total) in EVENTS {
                let (stored_total, available, _) = after[id];
                let held = outstanding.get(id).copied().unwrap_or(0);
                prop_assert_eq!(stored_total, total);
                prop_assert!(available <= total);
                prop_assert_eq!(available, total - held);
            }

            // Versions never move backwards.
            for (id, (_, _, version)) in &after {
                prop_assert!(*version >= before[id].2);
            }
        }
    }
}
