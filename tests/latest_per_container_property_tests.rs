//! Property-based tests for "latest per container" and history reads
//!
//! The ledger never stores a current-location column; latest is read off the
//! (container, time, id) index every time. These properties insert rows with
//! shuffled ids and colliding timestamps and check the ranking against a
//! brute-force answer.
//!
//! What these tests DON'T cover (deliberately):
//!
//! - Status derivation (see derivation_property_tests.rs)
//! - Catalog joins (scenario tests)
//!

use container_movements::{
    MovementDraft, MovementEvent, MovementLedger, MovementStatus,
    config::LedgerConfig,
    types::{EventId, InventoryId, PortId, TimeStamp},
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tempfile::{TempDir, tempdir};

fn open_ledger() -> (TempDir, MovementLedger) {
    let temp_dir = tempdir().expect("temp dir");
    let config = LedgerConfig {
        temporary: true,
        flush_every_ms: None,
        ..LedgerConfig::with_path(temp_dir.path().join("movements.db"))
    };
    let db = config.open().expect("open store");
    (temp_dir, MovementLedger::new(db))
}

/// Strategy for rows of (container, seconds offset) with distinct shuffled ids.
/// Few containers and few distinct times, so ties are common.
fn rows_strategy() -> impl Strategy<Value = Vec<(u64, i64, u64)>> {
    prop::collection::vec((0u64..5, -3i64..6), 1..40).prop_flat_map(|rows| {
        let ids: Vec<u64> = (0..rows.len() as u64).map(|i| i * 7 + 3).collect();
        (Just(rows), Just(ids).prop_shuffle()).prop_map(|(rows, ids)| {
            rows.into_iter()
                .zip(ids)
                .map(|((inventory, secs), id)| (inventory, secs, id))
                .collect()
        })
    })
}

fn insert(ledger: &MovementLedger, rows: &[(u64, i64, u64)]) -> Vec<MovementEvent> {
    let base = TimeStamp::new_with(2024, 6, 15, 10, 30, 0).nanos();
    rows.iter()
        .map(|(inventory, secs, id)| {
            ledger
                .append(
                    MovementDraft::new(InventoryId(*inventory), MovementStatus::Available, PortId((*secs + 10) as u64))
                        .with_id(EventId(*id))
                        .at(TimeStamp::from_nanos(base + secs * 1_000_000_000)),
                )
                .expect("append")
        })
        .collect()
}

/// The answer computed the slow way: max (occurred_at, id) per container.
fn expected_latest(events: &[MovementEvent]) -> BTreeMap<InventoryId, EventId> {
    let mut best: BTreeMap<InventoryId, &MovementEvent> = BTreeMap::new();
    for event in events {
        let replace = match best.get(&event.inventory_id) {
            Some(current) => (event.occurred_at, event.id) > (current.occurred_at, current.id),
            None => true,
        };
        if replace {
            best.insert(event.inventory_id, event);
        }
    }
    best.into_iter().map(|(inventory, event)| (inventory, event.id)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: latest_per_container() has exactly one row per container, and
    /// that row is the max (occurred_at, id) row
    #[test]
    fn prop_latest_per_container_is_rank_one(rows in rows_strategy()) {
        let (_dir, ledger) = open_ledger();
        let events = insert(&ledger, &rows);

        let latest = ledger.latest_per_container().expect("latest");
        let containers: BTreeSet<_> = latest.iter().map(|e| e.inventory_id).collect();
        prop_assert_eq!(containers.len(), latest.len(), "one row per container");

        let found: BTreeMap<_, _> = latest.iter().map(|e| (e.inventory_id, e.id)).collect();
        prop_assert_eq!(found, expected_latest(&events));
    }

    /// Property: latest_for() agrees with latest_per_container()
    #[test]
    fn prop_latest_for_matches_bulk_latest(rows in rows_strategy()) {
        let (_dir, ledger) = open_ledger();
        insert(&ledger, &rows);

        for event in ledger.latest_per_container().expect("latest") {
            let single = ledger.latest_for(event.inventory_id).expect("latest_for");
            prop_assert_eq!(single, Some(event));
        }
    }

    /// Property: history() is newest first, complete, and the same on every read
    #[test]
    fn prop_history_is_ordered_and_idempotent(rows in rows_strategy()) {
        let (_dir, ledger) = open_ledger();
        let events = insert(&ledger, &rows);

        for inventory in 0u64..5 {
            let inventory = InventoryId(inventory);
            let first = ledger.history(inventory).expect("history");
            let second = ledger.history(inventory).expect("history");
            prop_assert_eq!(&first, &second, "repeated reads must match");

            let expected = events.iter().filter(|e| e.inventory_id == inventory).count();
            prop_assert_eq!(first.len(), expected);

            for pair in first.windows(2) {
                prop_assert!(
                    (pair[0].occurred_at, pair[0].id) > (pair[1].occurred_at, pair[1].id),
                    "history must be strictly newest first"
                );
            }
        }
    }
}
