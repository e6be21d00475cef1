// crates/webcodec-runtime/src/decoder.rs
//
// DecoderSession: owns the ffmpeg decoder context exclusively for a single
// worker thread's lifetime. Grounded on video_decoder_worker.cc's
// OnConfigure/OnDecode/OnFlush/OnReset/OnClose/EnsureSwsContext/EmitFrame.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec;
use ffmpeg::decoder;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags as ScaleFlags};
use ffmpeg::util::frame::video::Video as AvFrame;

use webcodec_types::{CodecError, DecoderConfig, DecoderOutput, EncodedVideoChunk, ErrorKind};

use crate::ffi;
use crate::session::CodecSession;

pub struct DecodePayload {
    pub chunk: EncodedVideoChunk,
}

struct Opened {
    decoder: decoder::video::Video,
}

pub struct DecoderSession {
    config: Option<DecoderConfig>,
    opened: Option<Opened>,
    scaler: Option<SwsContext>,
    last_format: Option<(Pixel, u32, u32)>,
}

impl DecoderSession {
    pub fn new() -> Self {
        DecoderSession { config: None, opened: None, scaler: None, last_format: None }
    }

    fn ensure_sws(&mut self, format: Pixel, width: u32, height: u32) -> Result<(), CodecError> {
        if self.last_format == Some((format, width, height)) && self.scaler.is_some() {
            return Ok(());
        }
        let scaler = SwsContext::get(format, width, height, Pixel::RGBA, width, height, ScaleFlags::BILINEAR)
            .map_err(|e| CodecError::CodecRun(e.to_string()))?;
        self.scaler = Some(scaler);
        self.last_format = Some((format, width, height));
        Ok(())
    }

    fn drain_frames(&mut self, emit: &mut dyn FnMut(DecoderOutput)) -> Result<(), CodecError> {
        loop {
            let mut frame = AvFrame::empty();
            let opened = self.opened.as_mut().expect("opened");
            match opened.decoder.receive_frame(&mut frame) {
                Ok(()) => self.emit_frame(&frame, emit)?,
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => return Err(CodecError::CodecRun(e.to_string())),
            }
        }
        Ok(())
    }

    fn emit_frame(&mut self, frame: &AvFrame, emit: &mut dyn FnMut(DecoderOutput)) -> Result<(), CodecError> {
        let width = frame.width();
        let height = frame.height();
        self.ensure_sws(frame.format(), width, height)?;

        let mut rgba = AvFrame::empty();
        self.scaler
            .as_mut()
            .expect("sws ensured")
            .run(frame, &mut rgba)
            .map_err(|e| CodecError::CodecRun(e.to_string()))?;

        let stride = rgba.stride(0);
        let row_bytes = width as usize * 4;
        let src = rgba.data(0);
        let mut payload = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            payload.extend_from_slice(&src[start..start + row_bytes]);
        }

        let config = self.config.as_ref().expect("configured");
        let (display_width, display_height) = config.display_dims(width, height);
        let timestamp = frame.timestamp().unwrap_or(0);

        emit(DecoderOutput::Frame {
            payload,
            coded_width: width,
            coded_height: height,
            display_width,
            display_height,
            timestamp,
            duration: None,
            rotation: config.rotation.unwrap_or(0),
            flip: config.flip.unwrap_or(false),
            color_space: config.color_space.clone(),
        });
        Ok(())
    }
}

impl CodecSession for DecoderSession {
    type Config = DecoderConfig;
    type Payload = DecodePayload;
    type Output = DecoderOutput;

    fn configure(&mut self, config: Self::Config) -> Result<(), CodecError> {
        config.validate()?;
        let codec_id = config.codec_id().expect("validated above");
        let av_id = ffi::av_codec_id(codec_id);
        let codec = ffmpeg::decoder::find(av_id)
            .ok_or_else(|| CodecError::CodecOpen(format!("decoder not found for {:?}", codec_id)))?;

        let mut ctx = codec::context::Context::new_with_codec(codec);
        unsafe {
            let ptr = ctx.as_mut_ptr();
            if config.coded_width > 0 {
                (*ptr).width = config.coded_width as i32;
            }
            if config.coded_height > 0 {
                (*ptr).height = config.coded_height as i32;
            }
            if let Some(description) = &config.description {
                let padded_len = description.len() + ffi_padding();
                let buf = ffmpeg::ffi::av_malloc(padded_len) as *mut u8;
                if !buf.is_null() {
                    std::ptr::copy_nonoverlapping(description.as_ptr(), buf, description.len());
                    std::ptr::write_bytes(buf.add(description.len()), 0, ffi_padding());
                    (*ptr).extradata = buf;
                    (*ptr).extradata_size = description.len() as i32;
                }
            }
            if config.low_latency {
                (*ptr).flags |= ffmpeg::ffi::AV_CODEC_FLAG_LOW_DELAY as i32;
                (*ptr).flags2 |= ffmpeg::ffi::AV_CODEC_FLAG2_FAST as i32;
            }
        }

        let decoder = ctx
            .decoder()
            .video()
            .map_err(|e| CodecError::CodecOpen(e.to_string()))?;

        self.opened = Some(Opened { decoder });
        self.scaler = None;
        self.last_format = None;
        self.config = Some(config);
        Ok(())
    }

    fn submit(&mut self, payload: Self::Payload, emit: &mut dyn FnMut(Self::Output)) -> Result<(), CodecError> {
        let data = payload.chunk.data()?;
        let mut packet = ffmpeg::Packet::copy(data);
        packet.set_pts(Some(payload.chunk.timestamp()));

        let opened = self.opened.as_mut().ok_or_else(|| CodecError::invalid_state("decoder not configured"))?;
        match opened.decoder.send_packet(&packet) {
            Ok(()) => {}
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {}
            Err(ffmpeg::Error::Eof) => {}
            Err(e) => return Err(CodecError::CodecRun(e.to_string())),
        }
        self.drain_frames(emit)
    }

    fn flush(&mut self, emit: &mut dyn FnMut(Self::Output)) -> Result<(), CodecError> {
        let opened = match self.opened.as_mut() {
            Some(o) => o,
            None => return Ok(()),
        };
        match opened.decoder.send_eof() {
            Ok(()) | Err(ffmpeg::Error::Eof) => {}
            Err(e) => return Err(CodecError::CodecRun(e.to_string())),
        }
        self.drain_frames(emit)?;
        self.opened.as_mut().expect("opened").decoder.flush();
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(opened) = self.opened.as_mut() {
            opened.decoder.flush();
        }
        self.scaler = None;
        self.last_format = None;
    }

    fn close(&mut self) {
        if let Some(opened) = self.opened.as_mut() {
            opened.decoder.flush();
        }
        self.opened = None;
        self.scaler = None;
        self.last_format = None;
        self.config = None;
    }

    fn error_output(kind: ErrorKind, message: String) -> Self::Output {
        DecoderOutput::Error { kind, message, codec_error_code: None }
    }

    fn dequeue_output(queue_size: u64) -> Self::Output {
        DecoderOutput::Dequeue { queue_size }
    }
}

fn ffi_padding() -> usize {
    unsafe { ffmpeg::ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> DecoderConfig {
        DecoderConfig {
            codec: "avc1.42001f".to_string(),
            coded_width: 640,
            coded_height: 480,
            description: None,
            display_aspect_width: None,
            display_aspect_height: None,
            rotation: None,
            flip: None,
            color_space: None,
            low_latency: false,
        }
    }

    #[test]
    fn submit_before_configure_is_invalid_state() {
        let mut session = DecoderSession::new();
        let chunk = EncodedVideoChunk::new(webcodec_types::ChunkType::Key, 0, None, vec![0, 1, 2]);
        let mut sink = Vec::new();
        let mut emit = |o: DecoderOutput| sink.push(o);
        let err = session.submit(DecodePayload { chunk }, &mut emit).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn flush_on_unconfigured_session_is_a_no_op() {
        let mut session = DecoderSession::new();
        let mut sink = Vec::new();
        let mut emit = |o: DecoderOutput| sink.push(o);
        assert!(session.flush(&mut emit).is_ok());
        assert!(sink.is_empty());
    }

    #[test]
    fn unrecognized_codec_string_fails_validation_before_ffmpeg() {
        let mut session = DecoderSession::new();
        let mut cfg = base_config();
        cfg.codec = "theora".to_string();
        assert!(session.configure(cfg).is_err());
    }
}
