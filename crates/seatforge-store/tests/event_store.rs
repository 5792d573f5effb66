//! Concurrency tests for the event store.
//!
//! These run on the multi-threaded runtime so that spawned tasks really do
//! race for the structural and per-event locks.

use std::sync::Arc;
use std::time::Duration;

use seatforge_protocol::{EventId, Seat};
use seatforge_store::{DumpFormat, EventStore, StoreConfig, StoreError};

fn seats(list: &[(usize, usize)]) -> Vec<Seat> {
    list.iter().map(|(r, c)| Seat::new(*r, *c)).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disjoint_reservations_both_succeed() {
    let store = Arc::new(EventStore::default());
    store.create(EventId(1), 2, 2).await.unwrap();

    let a = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.reserve(EventId(1), &seats(&[(1, 1), (1, 2)])).await }
    });
    let b = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.reserve(EventId(1), &seats(&[(2, 1), (2, 2)])).await }
    });

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_ne!(a, b);
    let mut ids = [a, b];
    ids.sort_unstable();
    assert_eq!(ids, [1, 2]);

    let map = store.show(EventId(1)).await.unwrap();
    assert_eq!(map.seats, vec![a, a, b, b]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_reservations_exactly_one_wins() {
    for round in 0..50u32 {
        let store = Arc::new(EventStore::default());
        store.create(EventId(round), 1, 3).await.unwrap();

        let left = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.reserve(EventId(round), &seats(&[(1, 1), (1, 2)])).await }
        });
        let right = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.reserve(EventId(round), &seats(&[(1, 2), (1, 3)])).await }
        });

        let results = [left.await.unwrap(), right.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "round {round}: {results:?}");
        assert!(results.iter().any(|r| matches!(r, Err(StoreError::AlreadyReserved { .. }))));

        let map = store.show(EventId(round)).await.unwrap();
        assert_eq!(map.seats.iter().filter(|s| **s == 1).count(), 2);
        assert_eq!(map.seats.iter().filter(|s| **s == 0).count(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_of_same_id_exactly_one_wins() {
    let store = Arc::new(EventStore::new(StoreConfig::with_access_delay(
        Duration::from_millis(1),
    )));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move { store.create(EventId(42), 2, 2).await }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => created += 1,
            Err(e) => assert_eq!(e, StoreError::AlreadyExists(EventId(42))),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.list().await, vec![EventId(42)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_reservations_keep_ids_strictly_increasing() {
    let store = Arc::new(EventStore::default());
    store.create(EventId(1), 10, 10).await.unwrap();

    let mut tasks = Vec::new();
    for row in 1..=10 {
        for col in 1..=10 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.reserve(EventId(1), &[Seat::new(row, col)]).await
            }));
        }
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=100).collect::<Vec<_>>());

    let map = store.show(EventId(1)).await.unwrap();
    assert_eq!(map.seats.len(), 100);
    assert!(map.seats.iter().all(|s| *s != 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stalled_dump_blocks_neither_create_nor_reserve() {
    let store = Arc::new(EventStore::default());
    store.create(EventId(1), 50, 50).await.unwrap();
    store.create(EventId(2), 50, 50).await.unwrap();

    // A tiny pipe nobody reads from: the dump stalls on its first write.
    let (mut writer, _reader) = tokio::io::duplex(8);
    let dump = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.dump_all(&mut writer, DumpFormat::Text).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!dump.is_finished());

    let ops = async {
        store.create(EventId(3), 1, 1).await.unwrap();
        store.reserve(EventId(1), &[Seat::new(1, 1)]).await.unwrap();
        store.reserve(EventId(2), &[Seat::new(1, 1)]).await.unwrap();
    };
    tokio::time::timeout(Duration::from_secs(5), ops)
        .await
        .expect("writers must not wait for a stalled dump");

    dump.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_show_during_reservations_sees_whole_reservations_only() {
    let store = Arc::new(EventStore::default());
    store.create(EventId(1), 1, 64).await.unwrap();

    let writer = tokio::spawn({
        let store = Arc::clone(&store);
        async move {
            for pair in 0..32 {
                let col = pair * 2 + 1;
                store
                    .reserve(EventId(1), &[Seat::new(1, col), Seat::new(1, col + 1)])
                    .await
                    .unwrap();
            }
        }
    });

    for _ in 0..32 {
        let map = store.show(EventId(1)).await.unwrap();
        // Seats are reserved in pairs, so a consistent snapshot never
        // shows half a pair.
        for pair in map.seats.chunks(2) {
            assert_eq!(pair[0], pair[1]);
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}
