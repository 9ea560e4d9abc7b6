//! Bounded, closable FIFO queues connecting the pool stages.
//!
//! A queue is closed when every [`QueueSender`] handle has been dropped or
//! closed. Receivers keep draining buffered items after close and only then
//! observe the end of the stream, so nothing pushed before close is lost.

use std::sync::Arc;

use pool_core::{Job, JobResult};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Mutex, mpsc};

/// Sending half of the job queue.
pub type JobTx = QueueSender<Job>;
/// Receiving half of the job queue, shared by all workers.
pub type JobRx = QueueReceiver<Job>;
/// Sending half of the result queue.
pub type ResultTx = QueueSender<JobResult>;
/// Receiving half of the result queue, owned by the collector.
pub type ResultRx = QueueReceiver<JobResult>;

/// Every receiver is gone, so the item can never be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue has no receivers")]
pub struct QueueClosed;

/// Result of a non-suspending pop.
#[derive(Debug, PartialEq, Eq)]
pub enum TryPop<T> {
    Item(T),
    /// Nothing buffered right now, or another consumer is mid-pop.
    Empty,
    /// Closed and fully drained.
    Closed,
}

/// Create a bounded queue holding at most `capacity` items.
///
/// `capacity` must be non-zero; [`pool_core::RunConfig::validate`] enforces
/// this before any queue is built.
pub fn bounded<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle. Cloning adds another writer; the queue closes once
/// all writers are gone.
#[derive(Debug)]
pub struct QueueSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Push an item, suspending while the queue is full.
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed)
    }

    /// Give up this handle's right to write.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer handle. Clones share one underlying receiver, so each item is
/// handed to exactly one consumer.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Pop the next item, suspending while the queue is empty but open.
    ///
    /// Returns `None` once the queue is closed and drained. Cancel safe.
    pub async fn pop(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }

    /// Pop without suspending.
    pub fn try_pop(&self) -> TryPop<T> {
        let Ok(mut rx) = self.rx.try_lock() else {
            return TryPop::Empty;
        };
        match rx.try_recv() {
            Ok(item) => TryPop::Item(item),
            Err(TryRecvError::Empty) => TryPop::Empty,
            Err(TryRecvError::Disconnected) => TryPop::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn drains_buffered_items_after_close() {
        let (tx, rx) = bounded(5);
        tx.push(5).await.unwrap();
        tx.push(6).await.unwrap();
        tx.close();

        assert_eq!(rx.pop().await, Some(5));
        assert_eq!(rx.pop().await, Some(6));
        assert_eq!(rx.pop().await, None);
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn try_pop_reports_each_state() {
        let (tx, rx) = bounded(2);
        assert_eq!(rx.try_pop(), TryPop::Empty);
        tx.push(1).await.unwrap();
        assert_eq!(rx.try_pop(), TryPop::Item(1));
        drop(tx);
        assert_eq!(rx.try_pop(), TryPop::Closed);
    }

    #[tokio::test]
    async fn push_waits_for_space() {
        let (tx, rx) = bounded(1);
        tx.push(1).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.push(2)).await;
        assert!(blocked.is_err(), "push into a full queue should suspend");

        assert_eq!(rx.pop().await, Some(1));
        tx.push(2).await.unwrap();
        assert_eq!(rx.pop().await, Some(2));
    }

    #[tokio::test]
    async fn push_fails_without_receivers() {
        let (tx, rx) = bounded::<u32>(1);
        drop(rx);
        assert_eq!(tx.push(1).await, Err(QueueClosed));
    }

    #[tokio::test]
    async fn consumers_share_items_without_duplicates() {
        let (tx, rx) = bounded(4);
        let mut consumers = Vec::new();
        for _ in 0..3 {
            let rx = rx.clone();
            consumers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(item) = rx.pop().await {
                    seen.push(item);
                }
                seen
            }));
        }
        drop(rx);

        for i in 0..50u32 {
            tx.push(i).await.unwrap();
        }
        tx.close();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        assert_eq!(all.len(), 50);
        let unique: HashSet<u32> = all.into_iter().collect();
        assert_eq!(unique, (0..50).collect::<HashSet<u32>>());
    }
}
