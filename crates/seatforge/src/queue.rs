//! The admission queue between the dispatcher and the worker pool.
//!
//! A bounded multi-consumer FIFO: one [`Admitter`] pushes registered
//! clients, every worker pulls from a clone of the [`AdmissionQueue`].

use std::fmt;
use std::sync::Arc;

use seatforge_protocol::SessionId;
use tokio::sync::{Mutex, mpsc};

/// A registered client waiting for a worker.
#[derive(Debug)]
pub struct ClientHandle<T> {
    /// Id assigned at registration.
    pub session_id: SessionId,
    /// The client's not-yet-opened channels.
    pub channels: T,
}

/// Returned by [`Admitter::enqueue`] when no worker will ever dequeue
/// again. Carries the item back.
#[derive(Debug)]
pub struct QueueClosed<T>(pub T);

impl<T> fmt::Display for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("admission queue closed")
    }
}

impl<T: fmt::Debug> std::error::Error for QueueClosed<T> {}

/// The producing end of an admission queue. Dropping it closes the queue:
/// workers drain what is left, then [`AdmissionQueue::dequeue`] returns
/// `None`.
#[derive(Debug)]
pub struct Admitter<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Admitter<T> {
    /// Appends `item`, waiting while the queue is full.
    pub async fn enqueue(&self, item: T) -> Result<(), QueueClosed<T>> {
        self.tx.send(item).await.map_err(|e| QueueClosed(e.0))
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }
}

/// The consuming end of an admission queue, shared by every worker.
///
/// Items come out in the order they went in. Waiting workers take turns
/// through a fair lock, so the longest-waiting worker gets the next item.
pub struct AdmissionQueue<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> AdmissionQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> (Admitter<T>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Admitter { tx },
            Self {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Removes the oldest item, waiting while the queue is empty.
    ///
    /// Returns `None` once the [`Admitter`] is gone and the queue is
    /// drained.
    pub async fn dequeue(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

impl<T> Clone for AdmissionQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> fmt::Debug for AdmissionQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionQueue").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (admitter, queue) = AdmissionQueue::new(8);
        for i in 0..5 {
            admitter.enqueue(i).await.unwrap();
        }
        for i in 0..5 {
            assert_eq!(queue.dequeue().await, Some(i));
        }
    }

    #[tokio::test]
    async fn test_enqueue_waits_while_full() {
        let (admitter, queue) = AdmissionQueue::new(2);
        admitter.enqueue(1).await.unwrap();
        admitter.enqueue(2).await.unwrap();
        assert_eq!(admitter.available(), 0);

        let blocked = tokio::time::timeout(Duration::from_millis(50), admitter.enqueue(3)).await;
        assert!(blocked.is_err(), "enqueue into a full queue should wait");

        assert_eq!(queue.dequeue().await, Some(1));
        admitter.enqueue(3).await.unwrap();
        assert_eq!(queue.dequeue().await, Some(2));
        assert_eq!(queue.dequeue().await, Some(3));
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_item() {
        let (admitter, queue) = AdmissionQueue::new(1);
        let consumer = tokio::spawn(async move { queue.dequeue().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        admitter.enqueue("client").await.unwrap();
        assert_eq!(consumer.await.unwrap(), Some("client"));
    }

    #[tokio::test]
    async fn test_drains_then_closes_after_admitter_dropped() {
        let (admitter, queue) = AdmissionQueue::new(4);
        admitter.enqueue('a').await.unwrap();
        admitter.enqueue('b').await.unwrap();
        drop(admitter);

        assert_eq!(queue.dequeue().await, Some('a'));
        assert_eq!(queue.dequeue().await, Some('b'));
        assert_eq!(queue.dequeue().await, None);
    }

    #[tokio::test]
    async fn test_enqueue_fails_once_consumers_gone() {
        let (admitter, queue) = AdmissionQueue::new(4);
        drop(queue);
        let err = admitter.enqueue(7).await.unwrap_err();
        assert_eq!(err.0, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_item_dequeued_exactly_once() {
        let (admitter, queue) = AdmissionQueue::new(4);
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut got = Vec::new();
                    while let Some(item) = queue.dequeue().await {
                        got.push(item);
                    }
                    got
                })
            })
            .collect();
        drop(queue);

        for i in 0..200 {
            admitter.enqueue(i).await.unwrap();
        }
        drop(admitter);

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..200).collect::<Vec<_>>());
    }
}
