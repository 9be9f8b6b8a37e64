//! Point write queue
//!
//! Turns one-shot outbound writes into retried-until-acknowledged
//! delivery over the half-duplex radio channel. The queue itself is a
//! plain state machine driven by [`poll`](PointWriteQueue::poll); the
//! worker thread in [`crate::worker`] supplies the clock, the key
//! resolution and the transport.
//!
//! Per-entry life cycle:
//!
//! ```text
//! Queued ──► InFlight ──► Acknowledged (removed)
//!               │  ▲
//!               ▼  │ timeout, attempts remaining
//!            Retrying
//!               │ attempts exhausted
//!               ▼
//!            Abandoned (removed, reported)
//! ```
//!
//! Invariant: no two entries share a message ID. The queue is bounded and
//! rejects new writes when full rather than growing without limit while a
//! device stays silent.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

/// Queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue is at capacity; the write is rejected, not coalesced
    #[error("write queue full ({0} entries)")]
    QueueFull(usize),

    /// Another write with this message ID is already in flight
    #[error("message id {0:#06x} already in flight")]
    DuplicateMessageId(u16),
}

/// Retry/timeout policy for the queue
#[derive(Debug, Clone)]
pub struct WriteQueueConfig {
    /// Total transmission attempts per write, first attempt inclusive
    pub max_retries: u32,
    /// Minimum spacing between attempts; also the ack wait window
    pub timeout: Duration,
    /// Maximum number of queued writes
    pub capacity: usize,
}

impl Default for WriteQueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(10),
            capacity: 64,
        }
    }
}

/// One outbound write tracked until acknowledged or abandoned
#[derive(Debug, Clone)]
pub struct PendingPointWrite {
    /// Correlates the write with a later uplink
    pub message_id: u16,
    /// Encoded frame, pre-encryption; the worker encrypts per attempt so
    /// retries stay byte-identical on the wire (counter-fixed cipher)
    pub frame: Vec<u8>,
    pub point_uuid: String,
    pub device_uuid: String,
    /// Device address, feeds nonce derivation
    pub address: String,
    pub enqueued_at: Instant,
    pub attempt_count: u32,
    pub last_attempt: Option<Instant>,
}

/// What the worker should do next
#[derive(Debug, Clone)]
pub enum QueueAction {
    /// Transmit this snapshot; the attempt is already recorded
    Transmit(PendingPointWrite),
    /// Entry exhausted its budget and was removed; report the failure
    Abandon(PendingPointWrite),
    /// Nothing due; next deadline if any entries remain
    Idle(Option<Duration>),
}

/// In-memory queue of pending outbound writes
#[derive(Debug)]
pub struct PointWriteQueue {
    entries: VecDeque<PendingPointWrite>,
    config: WriteQueueConfig,
}

impl PointWriteQueue {
    pub fn new(config: WriteQueueConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Message IDs currently in flight
    pub fn pending_ids(&self) -> Vec<u16> {
        self.entries.iter().map(|e| e.message_id).collect()
    }

    pub fn contains(&self, message_id: u16) -> bool {
        self.entries.iter().any(|e| e.message_id == message_id)
    }

    /// Append a write at the tail. Rejects duplicates and overflow.
    pub fn enqueue(&mut self, write: PendingPointWrite) -> Result<(), QueueError> {
        if self.contains(write.message_id) {
            return Err(QueueError::DuplicateMessageId(write.message_id));
        }
        if self.entries.len() >= self.config.capacity {
            return Err(QueueError::QueueFull(self.entries.len()));
        }
        self.entries.push_back(write);
        Ok(())
    }

    /// Rehydrate entries on startup for points the host reports as still
    /// write-pending, so a restart does not silently drop in-flight
    /// commands. Returns the number loaded; rejected entries are logged
    /// and skipped rather than failing the whole recovery.
    pub fn load_pending<I>(&mut self, writes: I) -> usize
    where
        I: IntoIterator<Item = PendingPointWrite>,
    {
        let mut loaded = 0;
        for write in writes {
            let point_uuid = write.point_uuid.clone();
            match self.enqueue(write) {
                Ok(()) => loaded += 1,
                Err(e) => warn!(point = %point_uuid, error = %e, "skipping pending write on recovery"),
            }
        }
        loaded
    }

    /// Remove the entry correlated with an uplink-observed message ID.
    /// Returns it so the caller can report completion to the host.
    pub fn acknowledge(&mut self, message_id: u16) -> Option<PendingPointWrite> {
        let idx = self.entries.iter().position(|e| e.message_id == message_id)?;
        self.entries.remove(idx)
    }

    /// Drive the retry state machine.
    ///
    /// Picks the first due entry: records the attempt and returns a
    /// snapshot to transmit, or removes it when its budget is spent.
    /// The caller transmits outside any lock.
    pub fn poll(&mut self, now: Instant) -> QueueAction {
        for idx in 0..self.entries.len() {
            let due = {
                let e = &self.entries[idx];
                e.last_attempt
                    .map_or(true, |t| now.duration_since(t) >= self.config.timeout)
            };
            if !due {
                continue;
            }
            if self.entries[idx].attempt_count >= self.config.max_retries {
                // remove() on a just-checked index cannot fail
                if let Some(e) = self.entries.remove(idx) {
                    return QueueAction::Abandon(e);
                }
            }
            let e = &mut self.entries[idx];
            e.attempt_count += 1;
            e.last_attempt = Some(now);
            return QueueAction::Transmit(e.clone());
        }

        QueueAction::Idle(self.next_deadline(now))
    }

    /// Time until the earliest entry becomes due again
    fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.entries
            .iter()
            .map(|e| match e.last_attempt {
                None => Duration::ZERO,
                Some(t) => self
                    .config
                    .timeout
                    .saturating_sub(now.duration_since(t)),
            })
            .min()
    }
}

/// Lock a mutex, recovering from poisoning: the queue holds plain data
/// and a panicked writer cannot leave it in a torn state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(id: u16) -> PendingPointWrite {
        PendingPointWrite {
            message_id: id,
            frame: vec![0u8; 11],
            point_uuid: format!("pnt-{id}"),
            device_uuid: "dev-1".to_string(),
            address: "aabbccdd".to_string(),
            enqueued_at: Instant::now(),
            attempt_count: 0,
            last_attempt: None,
        }
    }

    fn config(max_retries: u32, timeout_ms: u64, capacity: usize) -> WriteQueueConfig {
        WriteQueueConfig {
            max_retries,
            timeout: Duration::from_millis(timeout_ms),
            capacity,
        }
    }

    #[test]
    fn test_enqueue_rejects_duplicate_id() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        q.enqueue(write(1)).unwrap();
        assert_eq!(q.enqueue(write(1)), Err(QueueError::DuplicateMessageId(1)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_enqueue_rejects_overflow() {
        let mut q = PointWriteQueue::new(config(3, 100, 2));
        q.enqueue(write(1)).unwrap();
        q.enqueue(write(2)).unwrap();
        assert_eq!(q.enqueue(write(3)), Err(QueueError::QueueFull(2)));
    }

    #[test]
    fn test_fresh_entry_is_due_immediately() {
        let mut q = PointWriteQueue::new(config(3, 10_000, 8));
        q.enqueue(write(1)).unwrap();
        match q.poll(Instant::now()) {
            QueueAction::Transmit(w) => {
                assert_eq!(w.message_id, 1);
                assert_eq!(w.attempt_count, 1);
            }
            other => panic!("expected transmit, got {:?}", other),
        }
        // Not due again until the timeout elapses
        assert!(matches!(q.poll(Instant::now()), QueueAction::Idle(Some(_))));
    }

    #[test]
    fn test_retry_budget_and_spacing() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        q.enqueue(write(1)).unwrap();

        let t0 = Instant::now();
        let mut attempts = 0;
        let mut now = t0;
        loop {
            match q.poll(now) {
                QueueAction::Transmit(w) => {
                    attempts += 1;
                    assert_eq!(w.attempt_count, attempts);
                    now += Duration::from_millis(100);
                }
                QueueAction::Abandon(w) => {
                    assert_eq!(w.attempt_count, 3);
                    break;
                }
                QueueAction::Idle(_) => panic!("entry should be due"),
            }
        }
        assert_eq!(attempts, 3);
        assert!(q.is_empty());
    }

    #[test]
    fn test_ack_between_attempts_prevents_retry() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        q.enqueue(write(1)).unwrap();

        let now = Instant::now();
        assert!(matches!(q.poll(now), QueueAction::Transmit(_)));

        let acked = q.acknowledge(1).expect("entry in flight");
        assert_eq!(acked.attempt_count, 1);
        assert!(q.is_empty());

        // No further attempts after the ack
        assert!(matches!(
            q.poll(now + Duration::from_millis(200)),
            QueueAction::Idle(None)
        ));
    }

    #[test]
    fn test_ack_unknown_id_is_none() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        q.enqueue(write(1)).unwrap();
        assert!(q.acknowledge(2).is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_independent_entries_round_robin() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        q.enqueue(write(1)).unwrap();
        q.enqueue(write(2)).unwrap();

        let now = Instant::now();
        let first = match q.poll(now) {
            QueueAction::Transmit(w) => w.message_id,
            other => panic!("{:?}", other),
        };
        let second = match q.poll(now) {
            QueueAction::Transmit(w) => w.message_id,
            other => panic!("{:?}", other),
        };
        assert_eq!((first, second), (1, 2));
    }

    #[test]
    fn test_load_pending_skips_duplicates() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        let loaded = q.load_pending(vec![write(1), write(1), write(2)]);
        assert_eq!(loaded, 2);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_next_deadline_tracks_earliest_entry() {
        let mut q = PointWriteQueue::new(config(3, 100, 8));
        q.enqueue(write(1)).unwrap();
        let now = Instant::now();
        assert!(matches!(q.poll(now), QueueAction::Transmit(_)));

        match q.poll(now + Duration::from_millis(40)) {
            QueueAction::Idle(Some(d)) => {
                assert!(d <= Duration::from_millis(60));
                assert!(d > Duration::ZERO);
            }
            other => panic!("{:?}", other),
        }
    }
}
