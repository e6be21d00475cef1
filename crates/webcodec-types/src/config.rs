// crates/webcodec-types/src/config.rs
//
// configure() parameters for encoder and decoder sessions, plus the
// normalized echo is_config_supported() returns.

use serde::{Deserialize, Serialize};

use crate::codec_id::CodecId;
use crate::frame::ColorSpace;
use crate::svc::ScalabilityMode;

/// Hardware-acceleration lookup preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwarePreference {
    NoPreference,
    PreferHardware,
    PreferSoftware,
}

impl Default for HardwarePreference {
    fn default() -> Self {
        HardwarePreference::NoPreference
    }
}

/// Encoded bitstream framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitstreamFormat {
    Annexb,
    Avc,
}

impl Default for BitstreamFormat {
    fn default() -> Self {
        BitstreamFormat::Annexb
    }
}

/// `EncoderConfig`, the argument to a video encoder's `configure()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    #[serde(default = "default_bitrate")]
    pub bitrate: u64,
    #[serde(default = "default_framerate")]
    pub framerate: f64,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    #[serde(default)]
    pub bitstream_format: BitstreamFormat,
    pub color_space: Option<ColorSpace>,
    #[serde(default = "default_gop_size")]
    pub gop_size: u32,
    /// `None` means a single temporal layer (L1T1).
    pub scalability_mode: Option<String>,
    #[serde(default)]
    pub hardware_acceleration: HardwarePreference,
    /// When set, encode with a fixed quantizer instead of target bitrate.
    pub quantizer: Option<u32>,
}

fn default_bitrate() -> u64 {
    1_000_000
}

fn default_framerate() -> f64 {
    30.0
}

fn default_gop_size() -> u32 {
    30
}

impl EncoderConfig {
    pub fn codec_id(&self) -> Option<CodecId> {
        crate::codec_id::parse_codec_string(&self.codec, true)
    }

    pub fn scalability(&self) -> ScalabilityMode {
        self.scalability_mode
            .as_deref()
            .and_then(ScalabilityMode::parse)
            .unwrap_or(ScalabilityMode::L1T1)
    }

    pub fn effective_display_dims(&self) -> (u32, u32) {
        (
            self.display_width.unwrap_or(self.coded_width),
            self.display_height.unwrap_or(self.coded_height),
        )
    }

    /// Validate dims and required fields without touching a codec library.
    pub fn validate(&self) -> Result<(), crate::error::CodecError> {
        validate_dims(self.coded_width, self.coded_height)?;
        if self.codec_id().is_none() {
            return Err(crate::error::CodecError::validation(format!(
                "unrecognized encoder codec string: {}",
                self.codec
            )));
        }
        Ok(())
    }
}

/// `DecoderConfig`, the argument to a video decoder's `configure()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    /// SPS/PPS or codec-specific extradata, base64-free raw bytes.
    #[serde(default)]
    pub description: Option<Vec<u8>>,
    pub display_aspect_width: Option<u32>,
    pub display_aspect_height: Option<u32>,
    pub rotation: Option<i32>,
    pub flip: Option<bool>,
    pub color_space: Option<ColorSpace>,
    #[serde(default)]
    pub low_latency: bool,
}

impl DecoderConfig {
    pub fn codec_id(&self) -> Option<CodecId> {
        crate::codec_id::parse_codec_string(&self.codec, false)
    }

    pub fn validate(&self) -> Result<(), crate::error::CodecError> {
        validate_dims(self.coded_width, self.coded_height)?;
        if self.codec_id().is_none() {
            return Err(crate::error::CodecError::validation(format!(
                "unrecognized decoder codec string: {}",
                self.codec
            )));
        }
        Ok(())
    }

    /// Display dims per the W3C formula: when an aspect ratio was
    /// provided, `display_width = round(coded_height * aspect_w / aspect_h)`
    /// and `display_height = coded_height`; otherwise display == coded.
    pub fn display_dims(&self, coded_width: u32, coded_height: u32) -> (u32, u32) {
        match (self.display_aspect_width, self.display_aspect_height) {
            (Some(aw), Some(ah)) if ah > 0 => {
                let dw = (coded_height as f64 * aw as f64 / ah as f64).round() as u32;
                (dw, coded_height)
            }
            _ => (coded_width, coded_height),
        }
    }
}

/// Encode/decode helpers for configs that cross a host process boundary as
/// JSON rather than as native Rust values.
pub trait JsonConfig: Sized {
    fn to_json(&self) -> Result<String, crate::error::CodecError>;
    fn from_json(text: &str) -> Result<Self, crate::error::CodecError>;
}

impl<C> JsonConfig for C
where
    C: Serialize + for<'de> Deserialize<'de>,
{
    fn to_json(&self) -> Result<String, crate::error::CodecError> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::CodecError::validation(format!("config serialization failed: {e}")))
    }

    fn from_json(text: &str) -> Result<Self, crate::error::CodecError> {
        serde_json::from_str(text)
            .map_err(|e| crate::error::CodecError::validation(format!("config parse failed: {e}")))
    }
}

fn validate_dims(width: u32, height: u32) -> Result<(), crate::error::CodecError> {
    const MIN: u32 = 1;
    const MAX: u32 = 16384;
    if !(MIN..=MAX).contains(&width) || !(MIN..=MAX).contains(&height) {
        return Err(crate::error::CodecError::validation(format!(
            "dimensions out of range [1, 16384]: {width}x{height}"
        )));
    }
    Ok(())
}

/// Result of `is_config_supported()`: whether the library can honour the
/// config, plus a normalized echo of it (defaults filled in).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSupport<C> {
    pub supported: bool,
    pub config: C,
}
