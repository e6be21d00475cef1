// crates/webcodec-runtime/src/bridge.rs
//
// HostBridge: the one seam host-side scripting/runtime glue plugs into.
// ChannelHostBridge is the reference transport, built on a bounded
// crossbeam_channel fan-in/fan-out, the same pattern used to move results
// from a background worker thread to a UI thread without ever blocking
// the worker on a slow or absent receiver.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::queue::PendingResults;

/// RAII pending-results accounting for a single in-flight delivery.
/// Incremented on construction, decremented on drop.
struct PendingGuard {
    pending: Arc<PendingResults>,
}

impl PendingGuard {
    fn new(pending: Arc<PendingResults>) -> Self {
        pending.inc();
        PendingGuard { pending }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.dec();
    }
}

/// A payload in flight to the host. The pending-results counter is
/// decremented the moment this is dropped — whether that's because the
/// host observed it via `try_recv`, or because delivery failed and it was
/// dropped immediately (the "orphan" path).
pub struct Delivery<T> {
    payload: T,
    _guard: PendingGuard,
}

/// The interface the worker depends on to post a result to the host,
/// without ever blocking on the host's cooperation.
pub trait HostBridge<T: Send + 'static>: Send + Sync {
    /// Attempt non-blocking delivery. Always resolves the pending-results
    /// accounting for this payload — either immediately (full channel, no
    /// receiver) or when the host later drops the delivered value.
    fn post(&self, payload: T, pending: &Arc<PendingResults>);
}

/// Reference `HostBridge` built on a bounded `crossbeam_channel`. A full
/// channel is treated the same as "no receiver": a host that can't keep up
/// with its own bounded channel is indistinguishable from one that's gone.
pub struct ChannelHostBridge<T> {
    tx: Sender<Delivery<T>>,
    rx: Receiver<Delivery<T>>,
}

impl<T: Send + 'static> ChannelHostBridge<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        ChannelHostBridge { tx, rx }
    }

    /// Drain one delivered result, if any. Mirrors
    /// `AppContext::ingest_media_results`'s `while let Ok(result) =
    /// rx.try_recv()` drain loop — call this from the host thread.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok().map(|delivery| delivery.payload)
    }
}

impl<T: Send + 'static> HostBridge<T> for ChannelHostBridge<T> {
    fn post(&self, payload: T, pending: &Arc<PendingResults>) {
        let guard = PendingGuard::new(Arc::clone(pending));
        // try_send drops the Delivery (and its guard) on failure, which
        // decrements `pending` immediately — the orphan path falls out of
        // ownership rather than needing a branch here.
        let _ = self.tx.try_send(Delivery { payload, _guard: guard });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_then_recv_round_trips_payload() {
        let bridge: ChannelHostBridge<u32> = ChannelHostBridge::new(4);
        let pending = PendingResults::new();
        bridge.post(7, &pending);
        assert_eq!(bridge.try_recv(), Some(7));
    }

    #[test]
    fn pending_counter_drops_to_zero_once_observed() {
        let bridge: ChannelHostBridge<u32> = ChannelHostBridge::new(4);
        let pending = PendingResults::new();
        bridge.post(1, &pending);
        assert_eq!(pending.get(), 1);
        bridge.try_recv();
        assert_eq!(pending.get(), 0);
    }

    #[test]
    fn full_channel_orphans_the_delivery_and_still_decrements() {
        let bridge: ChannelHostBridge<u32> = ChannelHostBridge::new(1);
        let pending = PendingResults::new();
        bridge.post(1, &pending); // fills the one slot
        bridge.post(2, &pending); // channel full -> dropped immediately
        assert_eq!(pending.get(), 1); // only the first delivery is still pending
        assert_eq!(bridge.try_recv(), Some(1));
        assert_eq!(pending.get(), 0);
    }

    #[test]
    fn try_recv_on_empty_channel_is_none() {
        let bridge: ChannelHostBridge<u32> = ChannelHostBridge::new(4);
        assert_eq!(bridge.try_recv(), None);
    }
}
