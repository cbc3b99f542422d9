//! Fixed-size decode worker pool.
//!
//! Bundle parsing is CPU-bound, so it runs on a bounded set of dedicated
//! OS threads rather than on the async runtime. The pool routes each task
//! to an idle worker and queues the overflow; a worker that finishes a
//! task picks up the next pending one directly instead of going back
//! through the queue. The pending queue is unbounded; callers self-limit.
//!
//! Completion carries no ordering guarantee: tasks finish whenever their
//! decode does, not in submission order. Every submitted task completes
//! exactly once, including when the decoder fails or panics; a failing
//! decode never costs the pool a worker.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::config::PoolSize;
use crate::decode::{BundleDecoder, DecodeError, RawBitmap};

/// A single decode request, owned by the pool until its result is sent.
pub struct WorkerTask {
    /// Raw bundle payload.
    pub payload: Bytes,
    /// Atlas asset name, when extracting a named sprite.
    pub asset_name: Option<String>,
    /// Sprite to extract from the atlas.
    pub sprite_name: Option<String>,
    /// Completion channel; fired exactly once.
    pub done: oneshot::Sender<Result<RawBitmap, DecodeError>>,
}

struct PoolState {
    /// Indices of workers with no current task.
    idle: Vec<usize>,
    /// Tasks waiting for a worker, oldest first.
    pending: VecDeque<WorkerTask>,
}

struct PoolInner {
    senders: Vec<mpsc::UnboundedSender<WorkerTask>>,
    state: Mutex<PoolState>,
}

impl PoolInner {
    /// Hands the next pending task to the finishing worker, or parks the
    /// worker in the idle set.
    fn next_or_idle(&self, worker: usize) -> Option<WorkerTask> {
        let mut state = self.state.lock();
        match state.pending.pop_front() {
            Some(task) => Some(task),
            None => {
                state.idle.push(worker);
                None
            }
        }
    }
}

/// Fixed-size pool of bundle-decode workers.
///
/// The worker count is set at construction and stays constant for the
/// pool's lifetime; workers are recycled between tasks, never destroyed.
/// Dropping the pool shuts the workers down once their current task (and
/// anything already delivered to their channels) is finished; tasks still
/// in the pending queue resolve as [`DecodeError::WorkerGone`].
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    size: usize,
}

impl WorkerPool {
    /// Starts a pool with `size` decode workers (clamped to at least one).
    pub fn new(size: usize, decoder: Arc<dyn BundleDecoder>) -> Self {
        let size = size.max(1);
        let mut senders = Vec::with_capacity(size);
        let mut receivers = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push(rx);
        }

        let inner = Arc::new(PoolInner {
            senders,
            state: Mutex::new(PoolState {
                idle: (0..size).collect(),
                pending: VecDeque::new(),
            }),
        });

        for (index, receiver) in receivers.into_iter().enumerate() {
            let pool = Arc::downgrade(&inner);
            let decoder = Arc::clone(&decoder);
            std::thread::Builder::new()
                .name(format!("bundle-decode-{}", index))
                .spawn(move || run_worker(pool, index, receiver, decoder))
                .expect("failed to spawn decode worker");
        }

        Self { inner, size }
    }

    /// Starts a pool sized per [`PoolSize`].
    pub fn with_size(size: PoolSize, decoder: Arc<dyn BundleDecoder>) -> Self {
        Self::new(size.worker_count(), decoder)
    }

    /// Worker count; constant for the pool's lifetime.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks currently waiting for a worker.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Number of workers with no current task.
    pub fn idle(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    /// Submits a task: an idle worker picks it up immediately, otherwise
    /// it joins the pending queue.
    pub fn submit(&self, task: WorkerTask) {
        let mut state = self.inner.state.lock();
        match state.idle.pop() {
            Some(worker) => {
                // An idle worker is parked on its channel; delivery only
                // fails during teardown, in which case the task waits in
                // the pending queue and resolves as WorkerGone.
                if let Err(undelivered) = self.inner.senders[worker].send(task) {
                    state.pending.push_back(undelivered.0);
                }
            }
            None => state.pending.push_back(task),
        }
    }

    /// Submits a decode and awaits its result.
    pub async fn decode(
        &self,
        payload: Bytes,
        asset_name: Option<String>,
        sprite_name: Option<String>,
    ) -> Result<RawBitmap, DecodeError> {
        let (done, result) = oneshot::channel();
        self.submit(WorkerTask {
            payload,
            asset_name,
            sprite_name,
            done,
        });
        result.await.unwrap_or_else(|_| Err(DecodeError::WorkerGone))
    }
}

fn run_worker(
    pool: Weak<PoolInner>,
    index: usize,
    mut tasks: mpsc::UnboundedReceiver<WorkerTask>,
    decoder: Arc<dyn BundleDecoder>,
) {
    while let Some(mut task) = tasks.blocking_recv() {
        loop {
            let result = decode_task(&*decoder, &task);
            if let Err(error) = &result {
                warn!(worker = index, %error, "bundle decode failed");
            }
            // The caller may have gone away; the worker is recycled
            // either way.
            let _ = task.done.send(result);

            let Some(inner) = pool.upgrade() else {
                return;
            };
            match inner.next_or_idle(index) {
                Some(next) => task = next,
                None => break,
            }
        }
    }
    debug!(worker = index, "decode worker shut down");
}

fn decode_task(decoder: &dyn BundleDecoder, task: &WorkerTask) -> Result<RawBitmap, DecodeError> {
    // Sprite extraction only applies when an atlas asset is named.
    let sprite = match task.asset_name.as_deref() {
        Some(asset) if !asset.is_empty() => task.sprite_name.as_deref(),
        _ => None,
    };
    catch_unwind(AssertUnwindSafe(|| decoder.parse(&task.payload, sprite)))
        .unwrap_or_else(|_| Err(DecodeError::Parse("decoder panicked".to_string())))
}
