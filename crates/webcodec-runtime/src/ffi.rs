// crates/webcodec-runtime/src/ffi.rs
//
// Small translations between webcodec-types' pure data and ffmpeg-the-third's
// types. Nothing here owns a codec context.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::Pixel;

use webcodec_types::{CodecId, PixelFormat};

/// This runtime only ever hands ffmpeg I420 frames (encode side) and only
/// ever produces RGBA frames (decode side) — see `pixel_format.rs`'s
/// `PixelFormatInfo` registry for the full set `webcodec-types` understands.
pub fn to_av_pixel(format: PixelFormat) -> Option<Pixel> {
    match format {
        PixelFormat::I420 => Some(Pixel::YUV420P),
        PixelFormat::Rgba => Some(Pixel::RGBA),
        PixelFormat::Nv12 => Some(Pixel::NV12),
        _ => None,
    }
}

pub fn av_codec_id(id: CodecId) -> ffmpeg::codec::Id {
    match id {
        CodecId::H264 => ffmpeg::codec::Id::H264,
        CodecId::Vp8 => ffmpeg::codec::Id::VP8,
        CodecId::Vp9 => ffmpeg::codec::Id::VP9,
        CodecId::Av1 => ffmpeg::codec::Id::AV1,
        CodecId::Hevc => ffmpeg::codec::Id::HEVC,
    }
}

/// Names of software encoders to try, in order, once the hardware cascade
/// is exhausted or skipped — mirrors `video_encoder_worker.cc`'s
/// `InitializeCodec`.
pub fn software_encoder_names(id: CodecId) -> &'static [&'static str] {
    match id {
        CodecId::H264 => &["libx264"],
        CodecId::Hevc => &["libx265"],
        CodecId::Vp8 => &["libvpx"],
        CodecId::Vp9 => &["libvpx-vp9"],
        CodecId::Av1 => &["libsvtav1", "libaom-av1"],
    }
}

/// Platform-appropriate hardware encoder names to try first, in order.
/// Empty on platforms/codecs with no hardware path in this registry.
pub fn hardware_encoder_names(id: CodecId) -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        return match id {
            CodecId::H264 => &["h264_videotoolbox"],
            CodecId::Hevc => &["hevc_videotoolbox"],
            _ => &[],
        };
    }
    #[cfg(target_os = "windows")]
    {
        return match id {
            CodecId::H264 => &["h264_nvenc", "h264_qsv", "h264_amf"],
            CodecId::Hevc => &["hevc_nvenc", "hevc_qsv"],
            _ => &[],
        };
    }
    #[cfg(target_os = "linux")]
    {
        return match id {
            CodecId::H264 => &["h264_vaapi", "h264_nvenc"],
            CodecId::Hevc => &["hevc_vaapi", "hevc_nvenc"],
            _ => &[],
        };
    }
    #[allow(unreachable_code)]
    &[]
}

pub fn is_hardware_encoder_name(name: &str) -> bool {
    ["videotoolbox", "nvenc", "qsv", "vaapi", "amf"]
        .iter()
        .any(|needle| name.contains(needle))
}
