//! Persistent hit queue and its driver task.

use crate::{DataEntity, DataQueue, HitDisposition, HitProcessing, QueueError, QueueResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pause after a storage error before the driver looks at the store again.
const STORAGE_RETRY_DELAY: Duration = Duration::from_secs(1);

struct Shared {
    store: Arc<dyn DataQueue>,
    processor: Arc<dyn HitProcessing>,
    notify: Notify,
    /// Set by `suspend`, cleared by `begin_processing`.
    paused: watch::Sender<bool>,
    closed: watch::Sender<bool>,
    /// External dispatch permission (privacy). `false` holds the head.
    gate: watch::Receiver<bool>,
}

/// Durable queue of hits with a single driver task.
///
/// Appends never wait on the network. The driver is spawned by
/// [`PersistentHitQueue::begin_processing`] and runs until
/// [`PersistentHitQueue::close`].
pub struct PersistentHitQueue {
    shared: Arc<Shared>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl PersistentHitQueue {
    /// Create a queue over `store`. `gate` must read `true` for the driver to
    /// dequeue; a gate whose sender is gone keeps its last value.
    pub fn new(
        store: Arc<dyn DataQueue>,
        processor: Arc<dyn HitProcessing>,
        gate: watch::Receiver<bool>,
    ) -> Self {
        let (paused, _) = watch::channel(true);
        let (closed, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                store,
                processor,
                notify: Notify::new(),
                paused,
                closed,
                gate,
            }),
            driver: Mutex::new(None),
        }
    }

    /// Persist `entity` at the tail and wake the driver.
    pub fn queue(&self, entity: &DataEntity) -> QueueResult<()> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        self.shared.store.add(entity)?;
        debug!(entity_id = %entity.unique_id, "Hit queued");
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Start (or un-suspend) dequeuing. Spawns the driver on first call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_processing(&self) {
        if self.is_closed() {
            return;
        }
        self.shared.paused.send_replace(false);

        let mut driver = self.driver.lock();
        if driver.is_none() {
            let shared = Arc::clone(&self.shared);
            *driver = Some(tokio::spawn(run_driver(shared)));
            info!("Hit queue processing started");
        }
    }

    /// Stop dequeuing. An in-flight hit finishes; nothing new is offered.
    pub fn suspend(&self) {
        self.shared.paused.send_replace(true);
        debug!("Hit queue suspended");
    }

    /// Re-check the head, e.g. after a shared-state change made it sendable.
    pub fn wake(&self) {
        self.shared.notify.notify_one();
    }

    /// Delete every stored hit.
    pub fn clear(&self) -> QueueResult<()> {
        self.shared.store.clear()
    }

    pub fn count(&self) -> QueueResult<usize> {
        self.shared.store.count()
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.closed.borrow()
    }

    /// Stop the driver and close the store.
    ///
    /// A hit being processed completes first; the store is closed when
    /// the driver exits. Without a driver the store is closed immediately.
    pub fn close(&self) {
        if self.shared.closed.send_replace(true) {
            return;
        }
        self.shared.notify.notify_one();
        if self.driver.lock().is_none() {
            self.shared.store.close();
        }
        info!("Hit queue closed");
    }

    /// [`close`](Self::close), then wait for the driver to exit.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Hit queue driver ended abnormally");
            }
        }
    }
}

impl Drop for PersistentHitQueue {
    fn drop(&mut self) {
        self.close();
    }
}

/// Driver-side view of the control channels.
struct Signals {
    paused: watch::Receiver<bool>,
    closed: watch::Receiver<bool>,
    gate: watch::Receiver<bool>,
    gate_live: bool,
}

impl Signals {
    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn may_dispatch(&mut self) -> bool {
        let paused = *self.paused.borrow_and_update();
        let open = *self.gate.borrow_and_update();
        !paused && open
    }

    /// Wait for an append/wake, a control change or close.
    async fn park(&mut self, notify: &Notify) {
        tokio::select! {
            _ = notify.notified() => {}
            changed = self.gate.changed(), if self.gate_live => {
                if changed.is_err() {
                    self.gate_live = false;
                }
            }
            _ = self.paused.changed() => {}
            _ = self.closed.changed() => {}
        }
    }

    /// Sleep for `delay`; only close cuts it short.
    async fn sleep(&mut self, delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.closed.changed() => {}
        }
    }
}

async fn run_driver(shared: Arc<Shared>) {
    let mut signals = Signals {
        paused: shared.paused.subscribe(),
        closed: shared.closed.subscribe(),
        gate: shared.gate.clone(),
        gate_live: true,
    };

    loop {
        if signals.is_closed() {
            break;
        }
        if !signals.may_dispatch() {
            signals.park(&shared.notify).await;
            continue;
        }

        let head = match shared.store.peek() {
            Ok(Some(head)) => head,
            Ok(None) => {
                signals.park(&shared.notify).await;
                continue;
            }
            Err(QueueError::Closed) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read queue head");
                signals.sleep(STORAGE_RETRY_DELAY).await;
                continue;
            }
        };

        let disposition = shared.processor.process_hit(&head).await;

        if disposition.removes_head() {
            match shared.store.remove(&head.unique_id) {
                Ok(_) => {
                    debug!(entity_id = %head.unique_id, disposition = ?disposition, "Hit removed");
                }
                Err(QueueError::Closed) => break,
                Err(e) => {
                    warn!(entity_id = %head.unique_id, error = %e, "Failed to remove processed hit");
                    signals.sleep(STORAGE_RETRY_DELAY).await;
                }
            }
            continue;
        }

        match disposition {
            HitDisposition::Retry(interval) => {
                let delay = if interval.is_zero() {
                    shared.processor.retry_interval(&head)
                } else {
                    interval
                };
                debug!(entity_id = %head.unique_id, retry_in_ms = delay.as_millis() as u64, "Hit kept for retry");
                signals.sleep(delay).await;
            }
            HitDisposition::NotReady => {
                debug!(entity_id = %head.unique_id, "Hit not ready, holding queue");
                signals.park(&shared.notify).await;
            }
            HitDisposition::Completed | HitDisposition::Dropped(_) => {}
        }
    }

    shared.store.close();
    info!("Hit queue driver stopped");
}
