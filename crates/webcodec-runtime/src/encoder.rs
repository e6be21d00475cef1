// crates/webcodec-runtime/src/encoder.rs
//
// EncoderSession: owns the ffmpeg encoder context exclusively for a single
// worker thread's lifetime. Grounded on video_encoder_worker.cc's
// InitializeCodec/ReinitializeCodec/OnEncode/OnFlush/OnReset/EmitPacket.

use std::collections::HashMap;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, encoder};
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags as ScaleFlags};
use ffmpeg::util::frame::video::Video as AvFrame;

use webcodec_types::{
    ChunkType, CodecError, DecoderConfigEcho, EncodedMetadata, EncoderConfig, EncoderOutput,
    ErrorKind, VideoFrame,
};

use crate::ffi;
use crate::session::CodecSession;

const QSCALE_LAMBDA_BASE: i32 = 118; // FF_QP2LAMBDA
const DEFAULT_QP: u32 = 23;

pub struct EncodePayload {
    pub frame: VideoFrame,
    pub key_frame: bool,
    pub quantizer: Option<u32>,
}

struct Opened {
    encoder: encoder::video::Video,
    codec_name: &'static str,
    is_hardware: bool,
}

pub struct EncoderSession {
    config: Option<EncoderConfig>,
    opened: Option<Opened>,
    scaler: Option<SwsContext>,
    frame_count: u64,
    /// frame_index -> (original timestamp, duration), erased once emitted.
    frame_info: HashMap<u64, (i64, Option<i64>)>,
}

impl EncoderSession {
    pub fn new() -> Self {
        EncoderSession {
            config: None,
            opened: None,
            scaler: None,
            frame_count: 0,
            frame_info: HashMap::new(),
        }
    }

    fn open(config: &EncoderConfig) -> Result<Opened, CodecError> {
        let codec_id = config
            .codec_id()
            .ok_or_else(|| CodecError::validation(format!("unrecognized codec: {}", config.codec)))?;
        let av_id = ffi::av_codec_id(codec_id);

        let prefer_software = matches!(
            config.hardware_acceleration,
            webcodec_types::HardwarePreference::PreferSoftware
        );

        let mut candidate: Option<(&'static str, codec::Codec)> = None;
        if !prefer_software {
            for name in ffi::hardware_encoder_names(codec_id) {
                if let Some(c) = encoder::find_by_name(name) {
                    candidate = Some((name, c));
                    break;
                }
            }
        }
        if candidate.is_none() {
            for name in ffi::software_encoder_names(codec_id) {
                if let Some(c) = encoder::find_by_name(name) {
                    candidate = Some((name, c));
                    break;
                }
            }
        }
        let (codec_name, codec) = candidate
            .or_else(|| encoder::find(av_id).map(|c| ("generic", c)))
            .ok_or_else(|| CodecError::CodecOpen(format!("encoder not found for {:?}", codec_id)))?;

        let is_hardware = ffi::is_hardware_encoder_name(codec_name);

        let try_open = |codec: codec::Codec, codec_name: &'static str, is_hardware: bool| -> Result<Opened, CodecError> {
            let ctx = codec::context::Context::new_with_codec(codec);
            let mut video = ctx
                .encoder()
                .video()
                .map_err(|e| CodecError::CodecOpen(e.to_string()))?;

            video.set_width(config.coded_width);
            video.set_height(config.coded_height);
            video.set_format(Pixel::YUV420P);
            video.set_time_base(ffmpeg::Rational::new(1, config.framerate.round().max(1.0) as i32));
            video.set_frame_rate(Some(ffmpeg::Rational::new(config.framerate.round().max(1.0) as i32, 1)));
            video.set_gop(config.gop_size);
            video.set_max_b_frames(0);

            if let Some(qp) = config.quantizer {
                video.set_flags(ffmpeg::codec::Flags::QSCALE);
                unsafe {
                    (*video.as_mut_ptr()).global_quality = QSCALE_LAMBDA_BASE * qp as i32;
                }
            } else {
                video.set_bit_rate(config.bitrate as usize);
            }

            if config.bitstream_format != webcodec_types::BitstreamFormat::Annexb {
                video.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
            }

            if !is_hardware {
                apply_software_opts(&mut video, codec_name, codec_id, config.quantizer.is_some());
            } else if codec_name.contains("videotoolbox") {
                unsafe {
                    ffmpeg::ffi::av_opt_set(
                        (*video.as_mut_ptr()).priv_data,
                        c"allow_sw".as_ptr(),
                        c"1".as_ptr(),
                        0,
                    );
                }
            }

            let encoder = video
                .open_as_with(codec, ffmpeg::Dictionary::new())
                .map_err(|e| CodecError::CodecOpen(e.to_string()))?;
            Ok(Opened { encoder, codec_name, is_hardware })
        };

        match try_open(codec, codec_name, is_hardware) {
            Ok(opened) => Ok(opened),
            Err(_) if is_hardware => {
                // Hardware open failed; fall back to the generic software lookup.
                let codec = encoder::find(av_id)
                    .ok_or_else(|| CodecError::CodecOpen(format!("no software fallback for {:?}", codec_id)))?;
                try_open(codec, "generic", false)
            }
            Err(e) => Err(e),
        }
    }

    fn ensure_scaler(&mut self, width: u32, height: u32, src_format: Pixel) -> Result<(), CodecError> {
        if self.scaler.is_some() {
            return Ok(());
        }
        let scaler = SwsContext::get(
            src_format,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ScaleFlags::BILINEAR,
        )
        .map_err(|e| CodecError::CodecRun(e.to_string()))?;
        self.scaler = Some(scaler);
        Ok(())
    }

    fn emit_pending_packets(&mut self, emit: &mut dyn FnMut(EncoderOutput)) -> Result<(), CodecError> {
        let opened = self.opened.as_mut().expect("encoder opened");
        let mut packet = ffmpeg::Packet::empty();
        while opened.encoder.receive_packet(&mut packet).is_ok() {
            self.emit_packet(&packet, emit);
            packet = ffmpeg::Packet::empty();
        }
        Ok(())
    }

    fn emit_packet(&mut self, packet: &ffmpeg::Packet, emit: &mut dyn FnMut(EncoderOutput)) {
        let frame_index = packet.pts().unwrap_or(0) as u64;
        let (timestamp, duration) = self.frame_info.remove(&frame_index).unwrap_or((0, None));

        let config = self.config.as_ref().expect("configured");
        let chunk_type = if packet.is_key() { ChunkType::Key } else { ChunkType::Delta };
        let temporal_layer_id = webcodec_types::svc::temporal_layer_id(config.scalability(), frame_index);

        let decoder_config = if chunk_type.is_key() {
            let opened = self.opened.as_ref().expect("encoder opened");
            let description = extradata_snapshot(&opened.encoder);
            let (display_width, display_height) = config.effective_display_dims();
            Some(DecoderConfigEcho {
                codec: config.codec.clone(),
                coded_width: config.coded_width,
                coded_height: config.coded_height,
                display_width,
                display_height,
                description,
                color_space: config.color_space.clone(),
            })
        } else {
            None
        };

        emit(EncoderOutput::Chunk {
            payload: packet.data().unwrap_or(&[]).to_vec(),
            timestamp,
            duration,
            chunk_type,
            frame_index,
            metadata: EncodedMetadata { temporal_layer_id, decoder_config },
        });
    }
}

fn extradata_snapshot(encoder: &encoder::video::Video) -> Option<Vec<u8>> {
    unsafe {
        let ctx = encoder.as_ptr();
        let size = (*ctx).extradata_size;
        if size > 0 && !(*ctx).extradata.is_null() {
            let slice = std::slice::from_raw_parts((*ctx).extradata, size as usize);
            Some(slice.to_vec())
        } else {
            None
        }
    }
}

fn apply_software_opts(
    video: &mut encoder::video::Video,
    codec_name: &str,
    codec_id: webcodec_types::CodecId,
    use_qscale: bool,
) {
    use webcodec_types::CodecId as C;
    unsafe {
        let priv_data = (*video.as_mut_ptr()).priv_data;
        match (codec_id, codec_name) {
            (C::H264, "libx264") => {
                ffmpeg::ffi::av_opt_set(priv_data, c"preset".as_ptr(), c"fast".as_ptr(), 0);
                ffmpeg::ffi::av_opt_set(priv_data, c"tune".as_ptr(), c"zerolatency".as_ptr(), 0);
                ffmpeg::ffi::av_opt_set(priv_data, c"forced-idr".as_ptr(), c"1".as_ptr(), 0);
                if use_qscale {
                    ffmpeg::ffi::av_opt_set_int(priv_data, c"qp".as_ptr(), DEFAULT_QP as i64, 0);
                }
            }
            (C::Vp8, "libvpx") | (C::Vp9, "libvpx-vp9") => {
                ffmpeg::ffi::av_opt_set(priv_data, c"quality".as_ptr(), c"realtime".as_ptr(), 0);
                ffmpeg::ffi::av_opt_set(priv_data, c"speed".as_ptr(), c"6".as_ptr(), 0);
            }
            (C::Av1, "libaom-av1") => {
                ffmpeg::ffi::av_opt_set(priv_data, c"cpu-used".as_ptr(), c"8".as_ptr(), 0);
            }
            (C::Av1, "libsvtav1") => {
                ffmpeg::ffi::av_opt_set(priv_data, c"preset".as_ptr(), c"8".as_ptr(), 0);
            }
            (C::Hevc, "libx265") => {
                ffmpeg::ffi::av_opt_set(priv_data, c"preset".as_ptr(), c"fast".as_ptr(), 0);
                ffmpeg::ffi::av_opt_set(
                    priv_data,
                    c"x265-params".as_ptr(),
                    c"bframes=0:forced-idr=1".as_ptr(),
                    0,
                );
            }
            _ => {}
        }
    }
}

impl CodecSession for EncoderSession {
    type Config = EncoderConfig;
    type Payload = EncodePayload;
    type Output = EncoderOutput;

    fn configure(&mut self, config: Self::Config) -> Result<(), CodecError> {
        config.validate()?;
        let opened = Self::open(&config)?;
        self.opened = Some(opened);
        self.scaler = None;
        self.frame_count = 0;
        self.frame_info.clear();
        self.config = Some(config);
        Ok(())
    }

    fn submit(&mut self, payload: Self::Payload, emit: &mut dyn FnMut(Self::Output)) -> Result<(), CodecError> {
        let config = self.config.as_ref().ok_or_else(|| CodecError::invalid_state("encoder not configured"))?;
        let src_format = ffi::to_av_pixel(payload.frame.format())
            .ok_or_else(|| CodecError::validation("frame format not supported by encoder"))?;
        self.ensure_scaler(config.coded_width, config.coded_height, src_format)?;

        let mut src = AvFrame::new(src_format, config.coded_width, config.coded_height);
        let data = payload.frame.data()?;
        src.data_mut(0)[..data.len().min(src.data(0).len())]
            .copy_from_slice(&data[..data.len().min(src.data(0).len())]);

        let mut av_frame = AvFrame::empty();
        self.scaler
            .as_mut()
            .expect("scaler ensured")
            .run(&src, &mut av_frame)
            .map_err(|e| CodecError::CodecRun(e.to_string()))?;

        let frame_index = self.frame_count;
        av_frame.set_pts(Some(frame_index as i64));
        self.frame_info
            .insert(frame_index, (payload.frame.timestamp(), payload.frame.duration()));

        unsafe {
            let ptr = av_frame.as_mut_ptr();
            if payload.key_frame {
                (*ptr).pict_type = ffmpeg::ffi::AVPictureType::AV_PICTURE_TYPE_I;
            } else {
                (*ptr).pict_type = ffmpeg::ffi::AVPictureType::AV_PICTURE_TYPE_NONE;
            }
        }
        self.frame_count += 1;

        let opened = self.opened.as_mut().expect("opened");
        opened
            .encoder
            .send_frame(&av_frame)
            .map_err(|e| CodecError::CodecRun(e.to_string()))?;
        self.emit_pending_packets(emit)?;
        Ok(())
    }

    fn flush(&mut self, emit: &mut dyn FnMut(Self::Output)) -> Result<(), CodecError> {
        if self.opened.is_none() {
            return Ok(());
        }
        {
            let opened = self.opened.as_mut().expect("opened");
            opened.encoder.send_eof().map_err(|e| CodecError::CodecRun(e.to_string()))?;
        }
        self.emit_pending_packets(emit)?;
        self.frame_info.clear();

        let config = self.config.clone().expect("configured");
        let reopened = Self::open(&config)?;
        self.opened = Some(reopened);
        self.scaler = None;
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(opened) = self.opened.as_mut() {
            let _ = opened.encoder.send_eof();
            let mut packet = ffmpeg::Packet::empty();
            while opened.encoder.receive_packet(&mut packet).is_ok() {
                packet = ffmpeg::Packet::empty();
            }
        }
        self.opened = None;
        self.scaler = None;
        self.frame_count = 0;
        self.frame_info.clear();
    }

    fn close(&mut self) {
        self.reset();
        self.config = None;
    }

    fn error_output(kind: ErrorKind, message: String) -> Self::Output {
        EncoderOutput::Error { kind, message, codec_error_code: None }
    }

    fn dequeue_output(queue_size: u64) -> Self::Output {
        EncoderOutput::Dequeue { queue_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcodec_types::ScalabilityMode;

    #[test]
    fn configure_rejects_unrecognized_codec_before_touching_ffmpeg() {
        let mut session = EncoderSession::new();
        let config = EncoderConfig {
            codec: "theora".to_string(),
            coded_width: 640,
            coded_height: 480,
            bitrate: 1_000_000,
            framerate: 30.0,
            display_width: None,
            display_height: None,
            bitstream_format: webcodec_types::BitstreamFormat::Annexb,
            color_space: None,
            gop_size: 30,
            scalability_mode: None,
            hardware_acceleration: webcodec_types::HardwarePreference::NoPreference,
            quantizer: None,
        };
        assert!(session.configure(config).is_err());
    }

    #[test]
    fn submit_before_configure_is_invalid_state() {
        let mut session = EncoderSession::new();
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
        let mut sink = Vec::new();
        let mut emit = |o: EncoderOutput| sink.push(o);
        let err = session
            .submit(EncodePayload { frame, key_frame: false, quantizer: None }, &mut emit)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn default_scalability_is_single_layer() {
        assert_eq!(ScalabilityMode::L1T1.num_temporal_layers(), 1);
    }
}
