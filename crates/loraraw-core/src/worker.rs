//! Write queue worker
//!
//! One long-lived thread drains the point write queue: it resolves the
//! device key, encrypts the frame and hands it to the transport, then
//! waits for the next deadline or the shutdown signal. The queue lock is
//! held only while picking work, never across encrypt/transmit or a wait.
//!
//! Shutdown is a one-shot channel message: the worker finishes the
//! attempt it is in the middle of, observes the signal within one wait
//! slice, and exits; [`WriteQueueWorker::shutdown`] joins it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::{self, CryptoError};
use crate::host::{HostError, HostStore};
use crate::queue::{lock, PendingPointWrite, PointWriteQueue, QueueAction};

/// Encryption counter for outbound writes. Fixed so that retries of the
/// same frame are byte-identical on the wire.
const WRITE_COUNTER: u32 = 0;

/// Transport carrying encrypted frames to the radio bridge.
///
/// Opaque to the core: the worker only requires that it be callable from
/// the worker thread and report success or failure.
pub trait Transport: Send + Sync {
    fn transmit(&self, frame: &[u8]) -> Result<(), TransportError>;
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single transmission attempt failed. Attempt failures are
/// transient: the entry stays queued and retries on its normal schedule.
#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Everything the worker thread needs
pub(crate) struct WorkerContext {
    pub queue: Arc<Mutex<PointWriteQueue>>,
    pub host: Arc<dyn HostStore>,
    pub transport: Arc<dyn Transport>,
    pub default_key: String,
    /// Upper bound on one wait slice; caps how long shutdown can take
    pub idle_tick: Duration,
}

/// Handle to the running worker thread
pub struct WriteQueueWorker {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: mpsc::Sender<()>,
}

impl WriteQueueWorker {
    /// Spawn the worker thread
    pub(crate) fn spawn(ctx: WorkerContext) -> std::io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("loraraw-write-queue".to_string())
            .spawn(move || run(ctx, shutdown_rx))?;
        Ok(Self {
            handle: Some(handle),
            shutdown_tx,
        })
    }

    /// Signal the worker once and wait for it to finish its current
    /// attempt and exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(ctx: WorkerContext, shutdown_rx: Receiver<()>) {
    debug!("write queue worker started");
    loop {
        let action = lock(&ctx.queue).poll(Instant::now());
        match action {
            QueueAction::Transmit(write) => {
                match transmit_attempt(&ctx, &write) {
                    Ok(()) => debug!(
                        message_id = write.message_id,
                        attempt = write.attempt_count,
                        point = %write.point_uuid,
                        "transmitted point write"
                    ),
                    Err(e) => warn!(
                        message_id = write.message_id,
                        attempt = write.attempt_count,
                        error = %e,
                        "point write attempt failed"
                    ),
                }
            }
            QueueAction::Abandon(write) => {
                warn!(
                    message_id = write.message_id,
                    attempts = write.attempt_count,
                    point = %write.point_uuid,
                    "write never acknowledged, dropping"
                );
                if let Err(e) = ctx.host.mark_write_failed(&write.point_uuid, "retries exhausted") {
                    warn!(point = %write.point_uuid, error = %e, "could not report abandoned write");
                }
            }
            QueueAction::Idle(next_deadline) => {
                let wait = next_deadline
                    .map(|d| d.min(ctx.idle_tick))
                    .unwrap_or(ctx.idle_tick);
                match shutdown_rx.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => continue,
                }
            }
        }

        // Check for shutdown between attempts, never mid-attempt
        match shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
    }
    debug!("write queue worker stopped");
}

/// One transmission attempt: resolve key, encrypt, hand to the transport.
/// Runs without the queue lock.
fn transmit_attempt(ctx: &WorkerContext, write: &PendingPointWrite) -> Result<(), AttemptError> {
    let device = ctx.host.device(&write.device_uuid)?;
    let key = crypto::resolve_key(device.key_hex.as_deref(), &ctx.default_key)?;
    let payload = crypto::encrypt(&write.address, &write.frame, &key, WRITE_COUNTER)?;
    ctx.transport.transmit(&payload)?;
    Ok(())
}
