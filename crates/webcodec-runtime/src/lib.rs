// crates/webcodec-runtime/src/lib.rs
//
// ffmpeg-backed worker threads behind webcodec-types' pure data model: one
// dedicated thread per configured codec instance, a bounded control queue
// in front of it, and a HostBridge carrying results back out.

pub mod bridge;
pub mod decoder;
pub mod encoder;
mod ffi;
pub mod instance;
pub mod queue;
pub mod session;

pub use bridge::{ChannelHostBridge, Delivery, HostBridge};
pub use decoder::{DecodePayload, DecoderSession};
pub use encoder::{EncodePayload, EncoderSession};
pub use instance::{CodecInstance, CodecState, DecoderInstance, EncoderInstance};
pub use queue::{ControlQueue, FlushHandle, PendingResults};
pub use session::{spawn_worker, CodecSession, ControlMessage, WorkerHandles};
