//! Single-consumer FIFO of pending deep scans.
//!
//! At most one deep scan runs at any instant. The pending sequence and the
//! in-progress slot live behind one mutex that is only held for plain
//! bookkeeping and never across an await, so `enqueue`, `drain` and `remove`
//! are synchronous. Each completed scan is persisted, rendered, followed by a
//! mandatory cooldown, and then the queue drains again.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogStore;
use crate::config::ScanConfig;
use crate::deep_scan::DeepScanWorker;
use crate::models::Item;
use crate::render::{ElementHandle, Renderer};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Item>,
    in_progress: Option<String>,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.in_progress.is_none() && self.pending.is_empty()
    }
}

struct Shared {
    state: Mutex<QueueState>,
    idle: Notify,
    worker: DeepScanWorker,
    catalog: Arc<dyn CatalogStore>,
    renderer: Arc<dyn Renderer>,
    scan_delay: Duration,
}

#[derive(Clone)]
pub struct ScanQueue {
    shared: Arc<Shared>,
}

impl ScanQueue {
    pub fn new(
        worker: DeepScanWorker,
        catalog: Arc<dyn CatalogStore>,
        renderer: Arc<dyn Renderer>,
        config: &ScanConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                worker,
                catalog,
                renderer,
                scan_delay: config.scan_delay(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        // The guarded state is plain data, so a poisoned lock is still usable
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends to the tail and starts scanning if nothing is running.
    pub fn enqueue(&self, item: Item) {
        info!("Queued deep scan for {}", item.item_key);
        self.state().pending.push_back(item);
        self.drain();
    }

    /// No-op while a scan is running or when nothing is pending; otherwise
    /// claims the in-progress slot and scans the head of the queue. Outside a
    /// tokio runtime nothing is started and the queue is left untouched.
    pub fn drain(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, {} deep scans left pending", self.pending_len());
            return;
        };

        let next = {
            let mut state = self.state();
            if state.in_progress.is_some() {
                return;
            }
            let Some(item) = state.pending.pop_front() else {
                return;
            };
            state.in_progress = Some(item.item_key.clone());
            item
        };

        let queue = self.clone();
        runtime.spawn(async move {
            queue.run(next).await;
        });
    }

    /// Drops still-pending entries for `item_key`. A scan that is already
    /// running is not affected. Returns whether anything was removed.
    pub fn remove(&self, item_key: &str) -> bool {
        let mut state = self.state();
        let before = state.pending.len();
        state.pending.retain(|item| item.item_key != item_key);
        let removed = state.pending.len() != before;
        if removed {
            info!("Removed {} from the scan queue", item_key);
        }
        removed
    }

    /// Pending or currently being scanned.
    pub fn contains(&self, item_key: &str) -> bool {
        let state = self.state();
        state.in_progress.as_deref() == Some(item_key)
            || state.pending.iter().any(|item| item.item_key == item_key)
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_busy(&self) -> bool {
        self.state().in_progress.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.state().is_idle()
    }

    /// Resolves once nothing is running and nothing is pending.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    async fn run(self, queued: Item) {
        let item_key = queued.item_key.clone();
        let mut release = SlotRelease {
            queue: self.clone(),
            item_key: item_key.clone(),
            finished: false,
        };

        match self.latest_record(queued).await {
            Some(item) => {
                let outcome = self.shared.worker.scan(item).await;
                if outcome.scanned {
                    info!(
                        "Deep scan of {} finished: {} variants, {} detailed, {} remote failures",
                        item_key,
                        outcome.item.variants.len(),
                        outcome.variants_detailed,
                        outcome.remote_failures
                    );
                }
                let persisted = if outcome.scanned {
                    match self.shared.catalog.upsert(&outcome.item).await {
                        Ok(()) => true,
                        Err(e) => {
                            error!("Failed to store deep scan of {}: {}", item_key, e);
                            false
                        }
                    }
                } else {
                    true
                };

                if persisted {
                    let handle = ElementHandle::for_item(&outcome.item);
                    self.shared.renderer.render(&handle, &outcome.item);
                }
            }
            None => {
                debug!("Abandoned deep scan of {}", item_key);
            }
        }

        tokio::time::sleep(self.shared.scan_delay).await;
        release.finished = true;
    }

    /// The stored record wins over the queued snapshot so that feedback and
    /// the session id of a later page visit, both written while the item was
    /// pending, are honoured.
    async fn latest_record(&self, queued: Item) -> Option<Item> {
        match self.shared.catalog.get(&queued.item_key).await {
            Ok(Some(stored)) => Some(stored),
            Ok(None) => Some(queued),
            Err(e) => {
                error!("Failed to load {} before deep scan: {}", queued.item_key, e);
                None
            }
        }
    }
}

/// Frees the in-progress slot when a run ends, including a run cut short by
/// a panicking scan or renderer, and hands over to the next pending item.
struct SlotRelease {
    queue: ScanQueue,
    item_key: String,
    finished: bool,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if !self.finished {
            error!("Deep scan of {} ended early, releasing the scan slot", self.item_key);
        }

        self.queue.state().in_progress = None;
        self.queue.drain();

        if self.queue.is_idle() {
            info!("Scan queue drained");
            self.queue.shared.idle.notify_waiters();
        }
    }
}
