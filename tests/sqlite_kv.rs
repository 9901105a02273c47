use tempfile::TempDir;

use boxoffice::{
    basket::Basket,
    booking::{Booking, BookingStatus},
    inventory::store::AvailabilityStore,
    ledger::BookingLedger,
    persist::sqlite::SqliteKv,
    reserve::{ReservationEngine, ReserveError},
};

fn basket_of(lines: &[(&str, u32, u64)]) -> Basket {
    let mut basket = Basket::new();
    for (id, qty, price) in lines {
        basket.add_line((*id).to_string(), *qty, *price, 1);
    }
    basket
}

#[test]
fn availability_survives_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("boxoffice.db");

    {
        let mut store =
            AvailabilityStore::new(Box::new(SqliteKv::open(&db_path).expect("open")));
        store.create_event("tech-conf", 100).expect("create");
        store.create_event("meetup", 50).expect("create");

        let mut engine = ReservationEngine::new(store);
        engine
            .reserve(&basket_of(&[("tech-conf", 30, 2_500), ("meetup", 5, 0)]))
            .expect("reserve");
    }

    let store = AvailabilityStore::new(Box::new(SqliteKv::open(&db_path).expect("reopen")));
    let tech = store.get("tech-conf").expect("get");
    let meetup = store.get("meetup").expect("get");
    assert_eq!((tech.total, tech.available, tech.version), (100, 70, 2));
    assert_eq!((meetup.total, meetup.available, meetup.version), (50, 45, 2));
}

#[test]
fn two_connections_race_like_two_tabs() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("shared.db");

    let mut store_a = AvailabilityStore::new(Box::new(SqliteKv::open(&db_path).expect("open a")));
    store_a.create_event("marathon", 10).expect("create");
    let mut engine_a = ReservationEngine::new(store_a);
    let mut engine_b = ReservationEngine::new(AvailabilityStore::new(Box::new(
        SqliteKv::open(&db_path).expect("open b"),
    )));

    let basket_a = basket_of(&[("marathon", 3, 1_500)]);
    let basket_b = basket_of(&[("marathon", 5, 1_500)]);

    let plan_a = engine_a.validate(&basket_a).expect("validate a");
    let plan_b = engine_b.validate(&basket_b).expect("validate b");

    engine_a.commit(plan_a).expect("commit a");
    match engine_b.commit(plan_b) {
        Err(ReserveError::VersionConflict { event_id }) => assert_eq!(event_id, "marathon"),
        other => panic!("expected version conflict, got {other:?}"),
    }

    let retry = engine_b.reserve(&basket_b).expect("retry");
    assert_eq!(retry.records[0].1.available, 2);
}

#[test]
fn ledger_appends_accumulate_in_order() {
    let mut ledger = BookingLedger::new(Box::new(SqliteKv::open_in_memory().expect("open")));

    let first = vec![
        Booking {
            event_id: "gala".to_string(),
            quantity: 2,
            unit_price: 5_000,
            booked_at_ms: 1,
            payment: None,
            status: BookingStatus::Confirmed,
        },
        Booking {
            event_id: "expo".to_string(),
            quantity: 1,
            unit_price: 0,
            booked_at_ms: 1,
            payment: None,
            status: BookingStatus::Confirmed,
        },
    ];
    ledger
        .append_bookings("dana@example.com", &first)
        .expect("append");

    let second = vec![Booking {
        event_id: "concert".to_string(),
        quantity: 4,
        unit_price: 2_000,
        booked_at_ms: 2,
        payment: None,
        status: BookingStatus::Confirmed,
    }];
    ledger
        .append_bookings("dana@example.com", &second)
        .expect("append more");

    let listed = ledger.list_bookings("dana@example.com").expect("list");
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].event_id, "gala");
    assert_eq!(listed[2].event_id, "concert");

    // Ledgers are per requester.
    assert!(
        ledger
            .list_bookings("other@example.com")
            .expect("list other")
            .is_empty()
    );
}

#[test]
fn event_management_round_trips() {
    let mut store = AvailabilityStore::new(Box::new(SqliteKv::open_in_memory().expect("open")));

    store.create_event("art-expo", 80).expect("create");
    store.put_checked("art-expo", 60, 1).expect("sell 20");

    // Resizing keeps the 20 sold tickets accounted for.
    let resized = store.resize_total("art-expo", 30).expect("resize");
    assert_eq!((resized.total, resized.available, resized.version), (30, 10, 3));

    assert!(store.remove_event("art-expo").expect("remove"));
    assert!(!store.remove_event("art-expo").expect("remove again"));
    assert!(store.get("art-expo").is_err());
}
