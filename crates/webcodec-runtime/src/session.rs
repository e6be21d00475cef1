// crates/webcodec-runtime/src/session.rs
//
// CodecSession: the trait both the encoder and decoder worker loops
// dispatch through. One generic worker-spawn function replaces a
// VideoEncoderWorker/VideoDecoderWorker virtual-dispatch split with a
// trait satisfied by two structs, not an inheritance hierarchy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use webcodec_types::CodecError;

use crate::bridge::HostBridge;
use crate::queue::{ControlQueue, FlushHandle, PendingResults};

/// A message on a codec instance's control queue.
pub enum ControlMessage<C, P> {
    Configure(C),
    Submit(P),
    Flush(FlushHandle),
    Reset,
    Close,
}

/// The operations a worker thread drives against an exclusively-owned
/// codec context. `Config` is the `configure()` argument; `Payload` is
/// whatever a single `Submit` carries (a frame+options for encode, a
/// chunk for decode); `Output` is the result type emitted to the bridge.
pub trait CodecSession: Send {
    type Config: Send;
    type Payload: Send;
    type Output: Send + 'static;

    fn configure(&mut self, config: Self::Config) -> Result<(), CodecError>;
    fn submit(&mut self, payload: Self::Payload, emit: &mut dyn FnMut(Self::Output)) -> Result<(), CodecError>;
    /// Drain the codec and reinitialize it so later submits still work.
    fn flush(&mut self, emit: &mut dyn FnMut(Self::Output)) -> Result<(), CodecError>;
    /// Drop in-flight output, return to the unconfigured-equivalent state.
    fn reset(&mut self);
    fn close(&mut self);

    /// Build the error variant of `Output` for a failure observed while
    /// dispatching a message — lets the generic worker report failures
    /// without knowing `Output`'s shape.
    fn error_output(kind: webcodec_types::ErrorKind, message: String) -> Self::Output;

    /// Build the dequeue-notification variant of `Output`, posted whenever
    /// the control queue's observable size decrements.
    fn dequeue_output(queue_size: u64) -> Self::Output;
}

/// Everything the generic worker loop needs alongside the session itself.
pub struct WorkerHandles<S: CodecSession> {
    pub queue: Arc<ControlQueue<ControlMessage<S::Config, S::Payload>>>,
    pub bridge: Arc<dyn HostBridge<S::Output>>,
    pub pending: Arc<PendingResults>,
    pub codec_valid: Arc<AtomicBool>,
}

/// Spawn the dedicated worker thread that exclusively owns `session` for
/// its entire lifetime. Returns once `Close` is processed or the queue is
/// shut down.
pub fn spawn_worker<S>(mut session: S, handles: WorkerHandles<S>) -> JoinHandle<()>
where
    S: CodecSession + 'static,
{
    thread::spawn(move || {
        let WorkerHandles { queue, bridge, pending, codec_valid } = handles;

        loop {
            let (msg, _guard) = match queue.pop_blocking() {
                Some(popped) => popped,
                None => break,
            };

            if let Some(queue_size) = queue.take_dequeue_notification() {
                bridge.post(S::dequeue_output(queue_size), &pending);
            }

            match msg {
                ControlMessage::Configure(config) => {
                    let mut emit = |out: S::Output| bridge.post(out, &pending);
                    match session.configure(config) {
                        Ok(()) => codec_valid.store(true, Ordering::SeqCst),
                        Err(e) => {
                            codec_valid.store(false, Ordering::SeqCst);
                            log::error!("configure failed: {e}");
                            emit(S::error_output(e.kind(), e.to_string()));
                        }
                    }
                }
                ControlMessage::Submit(payload) => {
                    if !codec_valid.load(Ordering::SeqCst) {
                        log::warn!("submit dropped: codec not configured");
                        bridge.post(
                            S::error_output(
                                webcodec_types::ErrorKind::InvalidState,
                                "submit before successful configure".to_string(),
                            ),
                            &pending,
                        );
                        continue;
                    }
                    let mut emit = |out: S::Output| bridge.post(out, &pending);
                    if let Err(e) = session.submit(payload, &mut emit) {
                        log::error!("submit failed: {e}");
                        emit(S::error_output(e.kind(), e.to_string()));
                    }
                }
                ControlMessage::Flush(token) => {
                    let mut emit = |out: S::Output| bridge.post(out, &pending);
                    let result = session.flush(&mut emit);
                    match &result {
                        Ok(()) => {
                            // Drain completed; wait for every delivery this
                            // flush (and anything before it) emitted to be
                            // observed before resolving the promise.
                            pending.wait_until_zero();
                        }
                        Err(e) => log::error!("flush failed: {e}"),
                    }
                    token.resolve(result);
                }
                ControlMessage::Reset => {
                    session.reset();
                    codec_valid.store(false, Ordering::SeqCst);
                }
                ControlMessage::Close => {
                    session.close();
                    codec_valid.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelHostBridge;
    use std::sync::atomic::AtomicU32;

    #[derive(Default)]
    struct CountingSession {
        configured: Arc<AtomicU32>,
        submitted: Arc<AtomicU32>,
    }

    impl CodecSession for CountingSession {
        type Config = ();
        type Payload = ();
        type Output = u32;

        fn configure(&mut self, _config: ()) -> Result<(), CodecError> {
            self.configured.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn submit(&mut self, _payload: (), emit: &mut dyn FnMut(u32)) -> Result<(), CodecError> {
            let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
            emit(n);
            Ok(())
        }

        fn flush(&mut self, _emit: &mut dyn FnMut(u32)) -> Result<(), CodecError> {
            Ok(())
        }

        fn reset(&mut self) {}
        fn close(&mut self) {}

        fn error_output(_kind: webcodec_types::ErrorKind, _message: String) -> u32 {
            u32::MAX
        }

        fn dequeue_output(queue_size: u64) -> u32 {
            // Distinguishable from both a submit count and the error sentinel.
            u32::MAX - 1 - queue_size as u32
        }
    }

    #[test]
    fn worker_dispatches_configure_then_submit_in_order() {
        let _ = env_logger::try_init();

        let queue: Arc<ControlQueue<ControlMessage<(), ()>>> = Arc::new(ControlQueue::new());
        let bridge: Arc<ChannelHostBridge<u32>> = Arc::new(ChannelHostBridge::new(8));
        let pending = PendingResults::new();
        let codec_valid = Arc::new(AtomicBool::new(false));

        let handles = WorkerHandles {
            queue: Arc::clone(&queue),
            bridge: bridge.clone() as Arc<dyn HostBridge<u32>>,
            pending,
            codec_valid: Arc::clone(&codec_valid),
        };
        let worker = spawn_worker(CountingSession::default(), handles);

        queue.push(ControlMessage::Configure(())).unwrap();
        queue.push(ControlMessage::Submit(())).unwrap();
        queue.push(ControlMessage::Submit(())).unwrap();
        queue.wait_drained();
        assert!(codec_valid.load(Ordering::SeqCst));

        queue.shutdown();
        worker.join().unwrap();

        // Each pop posts a coalesced dequeue notification ahead of whatever
        // output processing that message itself produces, in pop order.
        assert_eq!(bridge.try_recv(), Some(CountingSession::dequeue_output(2)));
        assert_eq!(bridge.try_recv(), Some(CountingSession::dequeue_output(1)));
        assert_eq!(bridge.try_recv(), Some(1));
        assert_eq!(bridge.try_recv(), Some(CountingSession::dequeue_output(0)));
        assert_eq!(bridge.try_recv(), Some(2));
    }

    #[test]
    fn submit_before_configure_reports_invalid_state_without_touching_session() {
        let queue: Arc<ControlQueue<ControlMessage<(), ()>>> = Arc::new(ControlQueue::new());
        let bridge: Arc<ChannelHostBridge<u32>> = Arc::new(ChannelHostBridge::new(8));
        let pending = PendingResults::new();
        let codec_valid = Arc::new(AtomicBool::new(false));

        let handles = WorkerHandles {
            queue: Arc::clone(&queue),
            bridge: bridge.clone() as Arc<dyn HostBridge<u32>>,
            pending,
            codec_valid: Arc::clone(&codec_valid),
        };
        let worker = spawn_worker(CountingSession::default(), handles);

        queue.push(ControlMessage::Submit(())).unwrap();
        queue.wait_drained();
        queue.shutdown();
        worker.join().unwrap();

        assert_eq!(bridge.try_recv(), Some(CountingSession::dequeue_output(0)));
        assert_eq!(bridge.try_recv(), Some(u32::MAX));
    }
}
