// crates/webcodec-types/src/output.rs
//
// Results delivered from a codec worker thread to the host, across the
// HostBridge channel. No ffmpeg here — plain data.

use crate::error::ErrorKind;
use crate::frame::ColorSpace;
use crate::packet::ChunkType;

/// The decoder-config echo attached to keyframe packets, so a host can
/// reconstruct a decoder without having seen the original `configure()`.
#[derive(Debug, Clone)]
pub struct DecoderConfigEcho {
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// Extradata snapshot taken at emit time, not at configure time.
    pub description: Option<Vec<u8>>,
    pub color_space: Option<ColorSpace>,
}

/// Per-packet metadata an encoder attaches to every emitted chunk.
#[derive(Debug, Clone)]
pub struct EncodedMetadata {
    pub temporal_layer_id: u32,
    pub decoder_config: Option<DecoderConfigEcho>,
}

/// A result delivered from an encoder session's worker thread.
#[derive(Debug)]
pub enum EncoderOutput {
    Chunk {
        payload: Vec<u8>,
        timestamp: i64,
        duration: Option<i64>,
        chunk_type: ChunkType,
        frame_index: u64,
        metadata: EncodedMetadata,
    },
    Error {
        kind: ErrorKind,
        message: String,
        codec_error_code: Option<i32>,
    },
    /// Scheduled whenever the worker decrements `queue_size`; coalesced so
    /// at most one is pending at a time.
    Dequeue { queue_size: u64 },
}

/// A result delivered from a decoder session's worker thread.
#[derive(Debug)]
pub enum DecoderOutput {
    Frame {
        payload: Vec<u8>, // RGBA
        coded_width: u32,
        coded_height: u32,
        display_width: u32,
        display_height: u32,
        timestamp: i64,
        duration: Option<i64>,
        rotation: i32,
        flip: bool,
        color_space: Option<ColorSpace>,
    },
    Error {
        kind: ErrorKind,
        message: String,
        codec_error_code: Option<i32>,
    },
    Dequeue { queue_size: u64 },
}
