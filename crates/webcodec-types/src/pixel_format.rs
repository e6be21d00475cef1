// crates/webcodec-types/src/pixel_format.rs
//
// The pixel format registry: byte layout math for every VideoFrame format
// the runtime accepts. Mirrors the W3C WebCodecs VideoPixelFormat list.

/// A VideoFrame pixel format, per the W3C WebCodecs `VideoPixelFormat` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba,
    Rgbx,
    Bgra,
    Bgrx,
    I420,
    I420A,
    I422,
    I422A,
    I444,
    I444A,
    Nv12,
    Nv21,
    Nv12A,
    I420P10,
    I422P10,
    I444P10,
    Nv12P10,
    I420AP10,
    I422AP10,
    I444AP10,
    I420P12,
    I422P12,
    I444P12,
    Unknown,
}

/// Byte-layout facts about a [`PixelFormat`], sufficient to compute
/// allocation sizes and per-plane strides without touching a decoder.
#[derive(Debug, Clone, Copy)]
pub struct PixelFormatInfo {
    pub name: &'static str,
    pub bit_depth: u32,
    pub num_planes: u32,
    pub chroma_h_shift: u32,
    pub chroma_v_shift: u32,
    pub has_alpha: bool,
    pub is_semi_planar: bool,
}

const UNKNOWN_INFO: PixelFormatInfo = PixelFormatInfo {
    name: "UNKNOWN",
    bit_depth: 0,
    num_planes: 0,
    chroma_h_shift: 0,
    chroma_v_shift: 0,
    has_alpha: false,
    is_semi_planar: false,
};

/// Look up the byte-layout facts for `format`. Returns a zeroed
/// [`PixelFormatInfo`] for [`PixelFormat::Unknown`].
pub fn format_info(format: PixelFormat) -> PixelFormatInfo {
    match format {
        PixelFormat::Rgba => PixelFormatInfo { name: "RGBA", bit_depth: 8, num_planes: 1, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: true, is_semi_planar: false },
        PixelFormat::Rgbx => PixelFormatInfo { name: "RGBX", bit_depth: 8, num_planes: 1, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::Bgra => PixelFormatInfo { name: "BGRA", bit_depth: 8, num_planes: 1, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: true, is_semi_planar: false },
        PixelFormat::Bgrx => PixelFormatInfo { name: "BGRX", bit_depth: 8, num_planes: 1, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::I420 => PixelFormatInfo { name: "I420", bit_depth: 8, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: false, is_semi_planar: false },
        PixelFormat::I420A => PixelFormatInfo { name: "I420A", bit_depth: 8, num_planes: 4, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: true, is_semi_planar: false },
        PixelFormat::I422 => PixelFormatInfo { name: "I422", bit_depth: 8, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::I422A => PixelFormatInfo { name: "I422A", bit_depth: 8, num_planes: 4, chroma_h_shift: 1, chroma_v_shift: 0, has_alpha: true, is_semi_planar: false },
        PixelFormat::I444 => PixelFormatInfo { name: "I444", bit_depth: 8, num_planes: 3, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::I444A => PixelFormatInfo { name: "I444A", bit_depth: 8, num_planes: 4, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: true, is_semi_planar: false },
        PixelFormat::Nv12 => PixelFormatInfo { name: "NV12", bit_depth: 8, num_planes: 2, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: false, is_semi_planar: true },
        PixelFormat::Nv21 => PixelFormatInfo { name: "NV21", bit_depth: 8, num_planes: 2, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: false, is_semi_planar: true },
        // NV12A: no native ffmpeg format, modeled as a 3-plane semi-planar + alpha.
        PixelFormat::Nv12A => PixelFormatInfo { name: "NV12A", bit_depth: 8, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: true, is_semi_planar: true },
        PixelFormat::I420P10 => PixelFormatInfo { name: "I420P10", bit_depth: 10, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: false, is_semi_planar: false },
        PixelFormat::I422P10 => PixelFormatInfo { name: "I422P10", bit_depth: 10, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::I444P10 => PixelFormatInfo { name: "I444P10", bit_depth: 10, num_planes: 3, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::Nv12P10 => PixelFormatInfo { name: "NV12P10", bit_depth: 10, num_planes: 2, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: false, is_semi_planar: true },
        PixelFormat::I420AP10 => PixelFormatInfo { name: "I420AP10", bit_depth: 10, num_planes: 4, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: true, is_semi_planar: false },
        PixelFormat::I422AP10 => PixelFormatInfo { name: "I422AP10", bit_depth: 10, num_planes: 4, chroma_h_shift: 1, chroma_v_shift: 0, has_alpha: true, is_semi_planar: false },
        PixelFormat::I444AP10 => PixelFormatInfo { name: "I444AP10", bit_depth: 10, num_planes: 4, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: true, is_semi_planar: false },
        PixelFormat::I420P12 => PixelFormatInfo { name: "I420P12", bit_depth: 12, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 1, has_alpha: false, is_semi_planar: false },
        PixelFormat::I422P12 => PixelFormatInfo { name: "I422P12", bit_depth: 12, num_planes: 3, chroma_h_shift: 1, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::I444P12 => PixelFormatInfo { name: "I444P12", bit_depth: 12, num_planes: 3, chroma_h_shift: 0, chroma_v_shift: 0, has_alpha: false, is_semi_planar: false },
        PixelFormat::Unknown => UNKNOWN_INFO,
    }
}

/// Parse a format name as it would appear in a JS `VideoPixelFormat` string.
pub fn parse_pixel_format(name: &str) -> PixelFormat {
    match name {
        "RGBA" => PixelFormat::Rgba,
        "RGBX" => PixelFormat::Rgbx,
        "BGRA" => PixelFormat::Bgra,
        "BGRX" => PixelFormat::Bgrx,
        "I420" => PixelFormat::I420,
        "I420A" => PixelFormat::I420A,
        "I422" => PixelFormat::I422,
        "I422A" => PixelFormat::I422A,
        "I444" => PixelFormat::I444,
        "I444A" => PixelFormat::I444A,
        "NV12" => PixelFormat::Nv12,
        "NV21" => PixelFormat::Nv21,
        "NV12A" => PixelFormat::Nv12A,
        "I420P10" => PixelFormat::I420P10,
        "I422P10" => PixelFormat::I422P10,
        "I444P10" => PixelFormat::I444P10,
        "NV12P10" => PixelFormat::Nv12P10,
        "I420AP10" => PixelFormat::I420AP10,
        "I422AP10" => PixelFormat::I422AP10,
        "I444AP10" => PixelFormat::I444AP10,
        "I420P12" => PixelFormat::I420P12,
        "I422P12" => PixelFormat::I422P12,
        "I444P12" => PixelFormat::I444P12,
        _ => PixelFormat::Unknown,
    }
}

pub fn pixel_format_name(format: PixelFormat) -> &'static str {
    format_info(format).name
}

/// Bytes per sample: 1 for 8-bit, 2 for 10- and 12-bit.
fn bytes_per_sample(info: &PixelFormatInfo) -> usize {
    ((info.bit_depth + 7) / 8) as usize
}

/// Total byte count a buffer needs to hold one frame of `format` at
/// `width`x`height`. Mirrors the packed/semi-planar/planar/alpha cases a
/// software codec actually lays frames out in.
///
/// Returns 0 for [`PixelFormat::Unknown`].
pub fn allocation_size(format: PixelFormat, width: u32, height: u32) -> usize {
    let info = format_info(format);
    if info.bit_depth == 0 {
        return 0;
    }

    let (width, height) = (width as usize, height as usize);
    let sample = bytes_per_sample(&info);

    if info.num_planes == 1 {
        return width * height * 4;
    }

    let y_size = width * height * sample;
    let chroma_width = width >> info.chroma_h_shift;
    let chroma_height = height >> info.chroma_v_shift;

    if info.is_semi_planar {
        let uv_size = chroma_width * 2 * chroma_height * sample;
        let mut total = y_size + uv_size;
        if info.has_alpha {
            total += y_size;
        }
        return total;
    }

    let uv_size = chroma_width * chroma_height * sample;
    let mut total = y_size + uv_size * 2;
    if info.has_alpha && info.num_planes > 3 {
        total += y_size;
    }
    total
}

/// Per-plane `(offset, stride)` pairs for a buffer laid out by
/// [`allocation_size`] — up to 4 planes, unused entries are `(0, 0)`.
pub fn plane_layout(format: PixelFormat, width: u32, height: u32) -> [(usize, usize); 4] {
    let info = format_info(format);
    let sample = bytes_per_sample(&info);
    let (width, height) = (width as usize, height as usize);

    let mut layout = [(0usize, 0usize); 4];

    if info.num_planes == 1 {
        layout[0] = (0, width * 4);
        return layout;
    }

    let y_stride = width * sample;
    let y_size = y_stride * height;
    layout[0] = (0, y_stride);

    let chroma_width = width >> info.chroma_h_shift;
    let chroma_height = height >> info.chroma_v_shift;
    let chroma_stride = chroma_width * sample;

    if info.is_semi_planar {
        let uv_size = chroma_width * 2 * chroma_height * sample;
        layout[1] = (y_size, chroma_width * 2 * sample);
        if info.has_alpha {
            layout[2] = (y_size + uv_size, y_stride);
        }
        return layout;
    }

    let uv_size = chroma_stride * chroma_height;
    layout[1] = (y_size, chroma_stride);
    layout[2] = (y_size + uv_size, chroma_stride);

    if info.has_alpha && info.num_planes > 3 {
        layout[3] = (y_size + uv_size * 2, y_stride);
    }

    layout
}
