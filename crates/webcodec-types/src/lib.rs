// crates/webcodec-types/src/lib.rs
//
// Plain data shared across the worker-thread boundary: no ffmpeg, no
// threads. webcodec-runtime wraps these types around an actual codec.

pub mod codec_id;
pub mod config;
pub mod error;
pub mod frame;
pub mod output;
pub mod packet;
pub mod pixel_format;
pub mod svc;

pub use codec_id::CodecId;
pub use config::{BitstreamFormat, ConfigSupport, DecoderConfig, EncoderConfig, HardwarePreference, JsonConfig};
pub use error::{CodecError, ErrorKind};
pub use frame::{ColorSpace, CopyToOptions, PlaneLayout, VideoFrame, VideoFrameInit, VisibleRect};
pub use output::{DecoderConfigEcho, DecoderOutput, EncodedMetadata, EncoderOutput};
pub use packet::{ChunkType, EncodedVideoChunk};
pub use pixel_format::PixelFormat;
pub use svc::ScalabilityMode;
