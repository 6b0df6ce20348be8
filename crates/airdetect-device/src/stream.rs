use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::record::ReadingRecord;

/// Per-subscriber hand-off depth. Tokio channels cannot be zero-sized, so a
/// single slot is the closest to a rendezvous: a subscriber that stops
/// reading stalls publishers after at most one record.
const SUBSCRIPTION_CAPACITY: usize = 1;

/// Fan-in/fan-out queue for decoded readings.
///
/// Every connection publishes into the same stream; every subscriber sees
/// every record published after it subscribed, in per-connection order.
/// Cloning is cheap and all clones share the subscriber set.
#[derive(Clone, Default)]
pub struct ReadingStream {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<ReadingRecord>,
}

impl ReadingStream {
    /// Create a stream with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new consumer.
    pub fn subscribe(&self) -> ReadingSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Subscriber { id, tx });
        debug!(subscriber = id, "reading subscriber attached");
        ReadingSubscription { id, rx }
    }

    /// Hand `record` to every subscriber, waiting for each to have room.
    ///
    /// Returns how many subscribers received it. Subscribers that have gone
    /// away are dropped from the set.
    pub async fn publish(&self, record: ReadingRecord) -> usize {
        let targets: Vec<(u64, mpsc::Sender<ReadingRecord>)> = self
            .lock()
            .iter()
            .map(|sub| (sub.id, sub.tx.clone()))
            .collect();

        if targets.is_empty() {
            trace!(device = %record.device, "no subscribers; reading dropped");
            return 0;
        }

        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, tx) in targets {
            match tx.send(record.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => gone.push(id),
            }
        }

        if !gone.is_empty() {
            self.lock().retain(|sub| !gone.contains(&sub.id));
            debug!(count = gone.len(), "reading subscribers detached");
        }

        delivered
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ReadingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingStream")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// One consumer's view of a [`ReadingStream`].
///
/// Ends once every clone of the stream has been dropped.
#[derive(Debug)]
pub struct ReadingSubscription {
    id: u64,
    rx: mpsc::Receiver<ReadingRecord>,
}

impl ReadingSubscription {
    /// Receive the next record.
    pub async fn recv(&mut self) -> Option<ReadingRecord> {
        self.rx.recv().await
    }

    /// Subscriber id, for diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl futures_core::Stream for ReadingSubscription {
    type Item = ReadingRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
