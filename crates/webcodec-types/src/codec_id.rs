// crates/webcodec-types/src/codec_id.rs
//
// Codec-string parsing, shared by encoder and decoder configure paths.
// Decoders accept a narrower set than encoders (no HEVC).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    H264,
    Vp8,
    Vp9,
    Av1,
    Hevc,
}

/// Parse a WebCodecs codec string (e.g. `"avc1.42001f"`, `"vp09.00.10.08"`)
/// into a [`CodecId`]. `for_encoder` widens acceptance to HEVC, which
/// decoders in this runtime do not accept.
pub fn parse_codec_string(codec: &str, for_encoder: bool) -> Option<CodecId> {
    if codec.starts_with("avc1") || codec == "h264" {
        return Some(CodecId::H264);
    }
    if codec == "vp8" {
        return Some(CodecId::Vp8);
    }
    if codec.starts_with("vp09") || codec == "vp9" {
        return Some(CodecId::Vp9);
    }
    if codec.starts_with("av01") || codec == "av1" {
        return Some(CodecId::Av1);
    }
    if for_encoder && (codec.starts_with("hev1") || codec.starts_with("hvc1") || codec == "hevc") {
        return Some(CodecId::Hevc);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_prefixed_and_bare_codec_strings() {
        assert_eq!(parse_codec_string("avc1.42001f", false), Some(CodecId::H264));
        assert_eq!(parse_codec_string("h264", false), Some(CodecId::H264));
        assert_eq!(parse_codec_string("vp09.00.10.08", false), Some(CodecId::Vp9));
        assert_eq!(parse_codec_string("av01.0.04M.08", true), Some(CodecId::Av1));
    }

    #[test]
    fn decoder_rejects_hevc_but_encoder_accepts_it() {
        assert_eq!(parse_codec_string("hev1.1.6.L93.B0", false), None);
        assert_eq!(parse_codec_string("hev1.1.6.L93.B0", true), Some(CodecId::Hevc));
    }

    #[test]
    fn unknown_string_is_none() {
        assert_eq!(parse_codec_string("theora", true), None);
    }
}
