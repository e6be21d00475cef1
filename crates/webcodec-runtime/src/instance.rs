// crates/webcodec-runtime/src/instance.rs
//
// CodecInstance: the facade a host talks to. Never touches the codec
// session directly — every codec operation crosses the control queue to
// the dedicated worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use webcodec_types::{CodecError, ConfigSupport, DecoderConfig, EncoderConfig, VideoFrame};

use crate::bridge::HostBridge;
use crate::decoder::{DecodePayload, DecoderSession};
use crate::encoder::{EncodePayload, EncoderSession};
use crate::queue::{ControlQueue, FlushHandle, PendingResults};
use crate::session::{spawn_worker, CodecSession, ControlMessage, WorkerHandles};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecState {
    Unconfigured,
    Configured,
    Closed,
}

/// The facade wrapping one worker thread + its control queue. Generic over
/// `CodecSession` so encoder and decoder instances share every line of
/// lifecycle/state-machine logic.
pub struct CodecInstance<S: CodecSession> {
    queue: Arc<ControlQueue<ControlMessage<S::Config, S::Payload>>>,
    pending: Arc<PendingResults>,
    codec_valid: Arc<AtomicBool>,
    state: Mutex<CodecState>,
    outstanding_flush: Mutex<Option<FlushHandle>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S> CodecInstance<S>
where
    S: CodecSession + 'static,
{
    pub fn new(session: S, bridge: Arc<dyn HostBridge<S::Output>>) -> Self {
        let queue = Arc::new(ControlQueue::new());
        let pending = PendingResults::new();
        let codec_valid = Arc::new(AtomicBool::new(false));

        let handles = WorkerHandles {
            queue: Arc::clone(&queue),
            bridge,
            pending: Arc::clone(&pending),
            codec_valid: Arc::clone(&codec_valid),
        };
        let worker = spawn_worker(session, handles);

        CodecInstance {
            queue,
            pending,
            codec_valid,
            state: Mutex::new(CodecState::Unconfigured),
            outstanding_flush: Mutex::new(None),
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn state(&self) -> CodecState {
        *self.state.lock().unwrap()
    }

    pub fn queue_size(&self) -> u64 {
        self.queue.size()
    }

    pub fn codec_saturated(&self) -> bool {
        self.queue.is_saturated()
    }

    pub fn pending_results(&self) -> u64 {
        self.pending.get()
    }

    pub fn configure(&self, config: S::Config) -> Result<(), CodecError> {
        let mut state = self.state.lock().unwrap();
        if *state == CodecState::Closed {
            return Err(CodecError::invalid_state("configure() on a closed instance"));
        }
        self.queue.push(ControlMessage::Configure(config))?;
        *state = CodecState::Configured;
        Ok(())
    }

    pub fn submit(&self, payload: S::Payload) -> Result<(), CodecError> {
        let state = *self.state.lock().unwrap();
        match state {
            CodecState::Unconfigured => {
                return Err(CodecError::invalid_state("submit before configure()"))
            }
            CodecState::Closed => return Err(CodecError::invalid_state("submit on a closed instance")),
            CodecState::Configured => {}
        }
        self.queue.push(ControlMessage::Submit(payload))
    }

    pub fn flush(&self) -> Result<FlushHandle, CodecError> {
        let state = *self.state.lock().unwrap();
        if state != CodecState::Configured {
            return Err(CodecError::invalid_state("flush() before configure()"));
        }
        let handle = FlushHandle::new();
        *self.outstanding_flush.lock().unwrap() = Some(handle.clone());
        self.queue.push(ControlMessage::Flush(handle.clone()))?;
        Ok(handle)
    }

    /// Drop queued work and abort any outstanding flush with `aborted`.
    /// Returns the instance to `Unconfigured`.
    pub fn reset(&self) {
        self.queue.clear_and_drop();
        if let Some(handle) = self.outstanding_flush.lock().unwrap().take() {
            handle.resolve(Err(CodecError::aborted("reset() called before flush completed")));
        }
        let _ = self.queue.push_uncounted(ControlMessage::Reset);
        self.codec_valid.store(false, Ordering::SeqCst);
        *self.state.lock().unwrap() = CodecState::Unconfigured;
    }

    /// Idempotent. Silently drops (does not reject) any outstanding flush.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == CodecState::Closed {
            return;
        }
        *self.outstanding_flush.lock().unwrap() = None;
        let _ = self.queue.push_uncounted(ControlMessage::Close);
        *state = CodecState::Closed;
    }
}

impl<S: CodecSession> Drop for CodecInstance<S> {
    fn drop(&mut self) {
        self.queue.shutdown();
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }
    }
}

pub type EncoderInstance = CodecInstance<EncoderSession>;
pub type DecoderInstance = CodecInstance<DecoderSession>;

impl EncoderInstance {
    pub fn new_encoder(bridge: Arc<dyn HostBridge<webcodec_types::EncoderOutput>>) -> Self {
        CodecInstance::new(EncoderSession::new(), bridge)
    }

    pub fn encode(&self, frame: VideoFrame, key_frame: bool, quantizer: Option<u32>) -> Result<(), CodecError> {
        self.submit(EncodePayload { frame, key_frame, quantizer })
    }

    pub fn is_config_supported(config: &EncoderConfig) -> ConfigSupport<EncoderConfig> {
        ConfigSupport { supported: config.validate().is_ok(), config: config.clone() }
    }
}

impl DecoderInstance {
    pub fn new_decoder(bridge: Arc<dyn HostBridge<webcodec_types::DecoderOutput>>) -> Self {
        CodecInstance::new(DecoderSession::new(), bridge)
    }

    pub fn decode(&self, chunk: webcodec_types::EncodedVideoChunk) -> Result<(), CodecError> {
        self.submit(DecodePayload { chunk })
    }

    pub fn is_config_supported(config: &DecoderConfig) -> ConfigSupport<DecoderConfig> {
        ConfigSupport { supported: config.validate().is_ok(), config: config.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelHostBridge;
    use webcodec_types::{BitstreamFormat, HardwarePreference};

    fn base_encoder_config() -> EncoderConfig {
        EncoderConfig {
            codec: "avc1.42001f".to_string(),
            coded_width: 640,
            coded_height: 480,
            bitrate: 1_000_000,
            framerate: 30.0,
            display_width: None,
            display_height: None,
            bitstream_format: BitstreamFormat::Annexb,
            color_space: None,
            gop_size: 30,
            scalability_mode: None,
            hardware_acceleration: HardwarePreference::NoPreference,
            quantizer: None,
        }
    }

    #[test]
    fn encode_before_configure_is_rejected_synchronously() {
        let bridge = Arc::new(ChannelHostBridge::new(8));
        let instance = EncoderInstance::new_encoder(bridge);
        assert_eq!(instance.state(), CodecState::Unconfigured);

        let frame = VideoFrame::new(
            vec![0u8; 640 * 480 * 4],
            webcodec_types::VideoFrameInit {
                coded_width: 640,
                coded_height: 480,
                timestamp: 0,
                duration: None,
                display_width: None,
                display_height: None,
                format: webcodec_types::PixelFormat::Rgba,
                rotation: 0,
                flip: false,
                visible_rect: None,
                color_space: None,
            },
        )
        .unwrap();

        let err = instance.encode(frame, false, None).unwrap_err();
        assert_eq!(err.kind(), webcodec_types::ErrorKind::InvalidState);
        instance.close();
    }

    #[test]
    fn configure_transitions_state_and_close_is_idempotent() {
        let bridge = Arc::new(ChannelHostBridge::new(8));
        let instance = EncoderInstance::new_encoder(bridge);
        instance.configure(base_encoder_config()).unwrap();
        assert_eq!(instance.state(), CodecState::Configured);
        instance.close();
        assert_eq!(instance.state(), CodecState::Closed);
        instance.close(); // idempotent
    }

    #[test]
    fn configure_after_close_is_rejected() {
        let bridge = Arc::new(ChannelHostBridge::new(8));
        let instance = EncoderInstance::new_encoder(bridge);
        instance.close();
        let err = instance.configure(base_encoder_config()).unwrap_err();
        assert_eq!(err.kind(), webcodec_types::ErrorKind::InvalidState);
    }

    #[test]
    fn reset_aborts_an_outstanding_flush() {
        let bridge = Arc::new(ChannelHostBridge::new(8));
        let instance = EncoderInstance::new_encoder(bridge);
        instance.configure(base_encoder_config()).unwrap();
        let handle = instance.flush().unwrap();
        instance.reset();
        let result = handle.wait();
        assert_eq!(result.unwrap_err().kind(), webcodec_types::ErrorKind::Aborted);
    }

    #[test]
    fn queue_size_is_zero_immediately_after_reset() {
        let bridge = Arc::new(ChannelHostBridge::new(8));
        let instance = EncoderInstance::new_encoder(bridge);
        instance.configure(base_encoder_config()).unwrap();
        instance.reset();
        assert_eq!(instance.queue_size(), 0);
        assert!(!instance.codec_saturated());
    }
}
