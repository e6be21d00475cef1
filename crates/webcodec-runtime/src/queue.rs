// crates/webcodec-runtime/src/queue.rs
//
// The per-instance control message queue and the two shared,
// outlive-the-instance cells that ride alongside it: the pending-results
// counter and the flush completion token.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use webcodec_types::CodecError;

/// Hard ceiling on queue depth — a circuit breaker against unbounded growth
/// when the host ignores backpressure.
pub const HARD_QUEUE_LIMIT: u64 = 64;

/// `codec_saturated` becomes true at this depth.
pub const SATURATION_THRESHOLD: u64 = 16;

struct State<M> {
    /// Each entry's `bool` is whether it counts toward the observable
    /// `queue_size` a host can poll — internal control messages (reset,
    /// close) ride the same FIFO but are invisible to that counter.
    queue: VecDeque<(M, bool)>,
    processing: u64,
    running: bool,
}

/// Thread-safe FIFO of control messages with condvar-based blocking pop,
/// a lock-free size counter, and a hard submission ceiling.
pub struct ControlQueue<M> {
    state: Mutex<State<M>>,
    not_empty: Condvar,
    drained: Condvar,
    queue_size: AtomicU64,
    /// Set whenever a counted pop decrements `queue_size`, cleared by
    /// `take_dequeue_notification`. A flag rather than a counter: any
    /// number of decrements between checks coalesce into one notification.
    dequeue_pending: AtomicBool,
}

impl<M> ControlQueue<M> {
    pub fn new() -> Self {
        ControlQueue {
            state: Mutex::new(State { queue: VecDeque::new(), processing: 0, running: true }),
            not_empty: Condvar::new(),
            drained: Condvar::new(),
            queue_size: AtomicU64::new(0),
            dequeue_pending: AtomicBool::new(false),
        }
    }

    /// Push a message. Fails with `QuotaExceeded` once `size() >= HARD_QUEUE_LIMIT`.
    pub fn push(self: &Arc<Self>, msg: M) -> Result<(), CodecError> {
        self.push_internal(msg, true)
    }

    /// Push an internal control message (reset/close) that the worker must
    /// still process in FIFO order, but that a host never observes through
    /// `size()`/`is_saturated()` — it isn't work the host queued.
    pub fn push_uncounted(self: &Arc<Self>, msg: M) -> Result<(), CodecError> {
        self.push_internal(msg, false)
    }

    fn push_internal(self: &Arc<Self>, msg: M, counted: bool) -> Result<(), CodecError> {
        let mut state = self.state.lock().unwrap();
        if counted && self.queue_size.load(Ordering::Relaxed) >= HARD_QUEUE_LIMIT {
            return Err(CodecError::QuotaExceeded(format!(
                "control queue at hard limit ({HARD_QUEUE_LIMIT})"
            )));
        }
        state.queue.push_back((msg, counted));
        if counted {
            self.queue_size.fetch_add(1, Ordering::Relaxed);
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Block until a message is available or shutdown is requested.
    /// Returns `None` once `running` is cleared and the queue is drained.
    pub fn pop_blocking(self: &Arc<Self>) -> Option<(M, PopGuard<M>)> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some((msg, counted)) = state.queue.pop_front() {
                if counted {
                    self.queue_size.fetch_sub(1, Ordering::Relaxed);
                    self.dequeue_pending.store(true, Ordering::Relaxed);
                }
                state.processing += 1;
                let guard = PopGuard { queue: Arc::clone(self) };
                return Some((msg, guard));
            }
            if !state.running {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Take the pending dequeue notification, if any, along with the
    /// current observable size. Returns `None` if nothing decremented the
    /// counter since the last call.
    pub fn take_dequeue_notification(&self) -> Option<u64> {
        if self.dequeue_pending.swap(false, Ordering::Relaxed) {
            Some(self.size())
        } else {
            None
        }
    }

    /// Drop every queued message without processing it (reset's cancellation).
    pub fn clear_and_drop(&self) {
        let mut state = self.state.lock().unwrap();
        state.queue.clear();
        self.queue_size.store(0, Ordering::Relaxed);
        self.dequeue_pending.store(false, Ordering::Relaxed);
    }

    pub fn size(&self) -> u64 {
        self.queue_size.load(Ordering::Relaxed)
    }

    pub fn is_saturated(&self) -> bool {
        self.size() >= SATURATION_THRESHOLD
    }

    /// Signal shutdown: wake the worker so it observes `running == false`
    /// and exits `pop_blocking` with `None` once the queue is empty.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        self.not_empty.notify_all();
    }

    /// Block until the queue is empty and nothing is being processed.
    pub fn wait_drained(&self) {
        let mut state = self.state.lock().unwrap();
        while !state.queue.is_empty() || state.processing > 0 {
            state = self.drained.wait(state).unwrap();
        }
    }
}

/// RAII "processing" marker returned by `pop_blocking`. Decrements the
/// processing counter and notifies `wait_drained` waiters on drop.
pub struct PopGuard<M> {
    queue: Arc<ControlQueue<M>>,
}

impl<M> Drop for PopGuard<M> {
    fn drop(&mut self) {
        let mut state = self.queue.state.lock().unwrap();
        state.processing -= 1;
        if state.queue.is_empty() && state.processing == 0 {
            self.queue.drained.notify_all();
        }
    }
}

/// A shared, atomically-counted cell tracking in-flight deliveries.
/// Lives in an `Arc` so late deliveries can decrement it after the
/// instance and worker that created it are gone.
pub struct PendingResults {
    count: Mutex<u64>,
    zero: Condvar,
}

impl PendingResults {
    pub fn new() -> Arc<Self> {
        Arc::new(PendingResults { count: Mutex::new(0), zero: Condvar::new() })
    }

    pub(crate) fn inc(&self) {
        *self.count.lock().unwrap() += 1;
    }

    pub(crate) fn dec(&self) {
        let mut count = self.count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    pub fn get(&self) -> u64 {
        *self.count.lock().unwrap()
    }

    /// Block until the counter reaches zero — the second half of flush
    /// completion, alongside the codec drain itself.
    pub fn wait_until_zero(&self) {
        let mut count = self.count.lock().unwrap();
        while *count != 0 {
            count = self.zero.wait(count).unwrap();
        }
    }
}

/// Shared state behind a `flush()` completion token.
struct FlushShared {
    result: Mutex<Option<Result<(), CodecError>>>,
    done: Condvar,
}

/// A handle the facade hands back from `flush()`. The worker resolves it
/// once the codec has drained and the pending-results counter reaches zero.
#[derive(Clone)]
pub struct FlushHandle {
    shared: Arc<FlushShared>,
}

impl FlushHandle {
    pub fn new() -> Self {
        FlushHandle {
            shared: Arc::new(FlushShared { result: Mutex::new(None), done: Condvar::new() }),
        }
    }

    /// Resolve the token. Called exactly once, from the worker (success or
    /// codec-reinit failure) or from the facade (`reset()`'s abort path).
    pub fn resolve(&self, result: Result<(), CodecError>) {
        let mut guard = self.shared.result.lock().unwrap();
        if guard.is_none() {
            *guard = Some(result);
            self.shared.done.notify_all();
        }
    }

    /// Block the calling (host) thread until the flush resolves.
    pub fn wait(&self) -> Result<(), CodecError> {
        let mut guard = self.shared.result.lock().unwrap();
        while guard.is_none() {
            guard = self.shared.done.wait(guard).unwrap();
        }
        guard.clone().unwrap()
    }

    /// Non-blocking check.
    pub fn poll(&self) -> Option<Result<(), CodecError>> {
        self.shared.result.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_preserves_fifo_order() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();

        let (a, _g1) = queue.pop_blocking().unwrap();
        let (b, _g2) = queue.pop_blocking().unwrap();
        let (c, _g3) = queue.pop_blocking().unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn size_tracks_enqueued_minus_dequeued() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.size(), 2);
        let (_m, _guard) = queue.pop_blocking().unwrap();
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn saturation_flips_at_sixteen() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        for i in 0..15 {
            queue.push(i).unwrap();
        }
        assert!(!queue.is_saturated());
        queue.push(15).unwrap();
        assert!(queue.is_saturated());
    }

    #[test]
    fn hard_ceiling_rejects_past_sixty_four() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        for i in 0..64 {
            queue.push(i).unwrap();
        }
        assert!(queue.push(64).is_err());
    }

    #[test]
    fn clear_and_drop_empties_the_queue() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.clear_and_drop();
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn uncounted_push_does_not_move_size_but_still_pops_in_order() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        queue.push(1).unwrap();
        queue.push_uncounted(99).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.size(), 2);

        let (a, _g1) = queue.pop_blocking().unwrap();
        let (b, _g2) = queue.pop_blocking().unwrap();
        let (c, _g3) = queue.pop_blocking().unwrap();
        assert_eq!((a, b, c), (1, 99, 2));
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn dequeue_notification_fires_once_per_counted_pop_and_coalesces() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        assert_eq!(queue.take_dequeue_notification(), None);

        queue.push(1).unwrap();
        queue.push(2).unwrap();
        let (_m1, _g1) = queue.pop_blocking().unwrap();
        let (_m2, _g2) = queue.pop_blocking().unwrap();

        // Two decrements happened, but only one notification is pending.
        assert_eq!(queue.take_dequeue_notification(), Some(0));
        assert_eq!(queue.take_dequeue_notification(), None);
    }

    #[test]
    fn uncounted_pop_does_not_schedule_a_dequeue_notification() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        queue.push_uncounted(1).unwrap();
        let (_m, _guard) = queue.pop_blocking().unwrap();
        assert_eq!(queue.take_dequeue_notification(), None);
    }

    #[test]
    fn shutdown_unblocks_pop_with_none() {
        let queue: Arc<ControlQueue<u32>> = Arc::new(ControlQueue::new());
        queue.shutdown();
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn pending_results_wait_returns_once_all_guards_drop() {
        let pending = PendingResults::new();
        pending.inc();
        pending.inc();
        assert_eq!(pending.get(), 2);
        pending.dec();
        pending.dec();
        pending.wait_until_zero();
        assert_eq!(pending.get(), 0);
    }

    #[test]
    fn flush_handle_wait_observes_resolved_value() {
        let handle = FlushHandle::new();
        let h2 = handle.clone();
        std::thread::spawn(move || {
            h2.resolve(Ok(()));
        });
        assert!(handle.wait().is_ok());
    }

    #[test]
    fn flush_handle_poll_is_none_before_resolution() {
        let handle = FlushHandle::new();
        assert!(handle.poll().is_none());
        handle.resolve(Ok(()));
        assert!(handle.poll().is_some());
    }
}
