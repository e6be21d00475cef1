// crates/webcodec-types/src/frame.rs
//
// VideoFrame: an owned, sized buffer plus the metadata the W3C VideoFrame
// interface carries. No ffmpeg here — format-converting copies that need a
// scaler live in webcodec-runtime, which wraps this type.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::pixel_format::{self, PixelFormat};

/// The region of the coded frame that should actually be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibleRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Color space metadata, per W3C `VideoColorSpaceInit`. Every field is
/// optional except `full_range`, which defaults to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSpace {
    pub primaries: Option<String>,
    pub transfer: Option<String>,
    pub matrix: Option<String>,
    pub full_range: bool,
}

/// Construction parameters for [`VideoFrame::new`].
#[derive(Debug, Clone)]
pub struct VideoFrameInit {
    pub coded_width: u32,
    pub coded_height: u32,
    pub timestamp: i64,
    pub duration: Option<i64>,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub format: PixelFormat,
    pub rotation: i32,
    pub flip: bool,
    pub visible_rect: Option<VisibleRect>,
    pub color_space: Option<ColorSpace>,
}

/// Destination-plane layout entry for [`VideoFrame::copy_to`], per W3C
/// `PlaneLayout`.
#[derive(Debug, Clone, Copy)]
pub struct PlaneLayout {
    pub offset: usize,
    pub stride: usize,
}

/// Options accepted by [`VideoFrame::copy_to`].
#[derive(Debug, Clone, Default)]
pub struct CopyToOptions {
    pub rect: Option<VisibleRect>,
    pub layout: Option<Vec<PlaneLayout>>,
}

/// An owned, closable video frame buffer.
#[derive(Debug)]
pub struct VideoFrame {
    data: Vec<u8>,
    coded_width: u32,
    coded_height: u32,
    display_width: u32,
    display_height: u32,
    timestamp: i64,
    duration: Option<i64>,
    format: PixelFormat,
    rotation: i32,
    flip: bool,
    visible_rect: VisibleRect,
    color_space: Option<ColorSpace>,
    closed: bool,
}

impl VideoFrame {
    pub fn new(data: Vec<u8>, init: VideoFrameInit) -> Result<Self, CodecError> {
        let visible_rect = init.visible_rect.unwrap_or(VisibleRect {
            x: 0,
            y: 0,
            width: init.coded_width,
            height: init.coded_height,
        });
        let visible_rect = if visible_rect.width == 0 || visible_rect.height == 0 {
            VisibleRect { width: init.coded_width, height: init.coded_height, ..visible_rect }
        } else {
            visible_rect
        };

        if visible_rect.x.saturating_add(visible_rect.width) > init.coded_width
            || visible_rect.y.saturating_add(visible_rect.height) > init.coded_height
        {
            return Err(CodecError::validation("visibleRect exceeds coded dimensions"));
        }

        let color_space = init.color_space.or_else(|| {
            matches!(
                init.format,
                PixelFormat::Rgba | PixelFormat::Rgbx | PixelFormat::Bgra | PixelFormat::Bgrx
            )
            .then(|| ColorSpace {
                primaries: Some("bt709".to_string()),
                transfer: Some("iec61966-2-1".to_string()),
                matrix: Some("rgb".to_string()),
                full_range: true,
            })
        });

        Ok(VideoFrame {
            data,
            coded_width: init.coded_width,
            coded_height: init.coded_height,
            display_width: init.display_width.unwrap_or(init.coded_width),
            display_height: init.display_height.unwrap_or(init.coded_height),
            timestamp: init.timestamp,
            duration: init.duration,
            format: init.format,
            rotation: init.rotation,
            flip: init.flip,
            visible_rect,
            color_space,
            closed: false,
        })
    }

    pub fn coded_width(&self) -> u32 {
        self.coded_width
    }

    pub fn coded_height(&self) -> u32 {
        self.coded_height
    }

    pub fn display_width(&self) -> u32 {
        self.display_width
    }

    pub fn display_height(&self) -> u32 {
        self.display_height
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn duration(&self) -> Option<i64> {
        self.duration
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn flip(&self) -> bool {
        self.flip
    }

    pub fn visible_rect(&self) -> VisibleRect {
        self.visible_rect
    }

    pub fn color_space(&self) -> Option<&ColorSpace> {
        self.color_space.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Raw backing buffer. Errors if the frame is closed.
    pub fn data(&self) -> Result<&[u8], CodecError> {
        if self.closed {
            return Err(CodecError::invalid_state("VideoFrame is closed"));
        }
        Ok(&self.data)
    }

    /// Required buffer size for `copy_to(target_format, width, height)`.
    pub fn allocation_size(&self, target_format: Option<PixelFormat>) -> Result<usize, CodecError> {
        if self.closed {
            return Err(CodecError::invalid_state("VideoFrame is closed"));
        }
        let format = target_format.unwrap_or(self.format);
        let (w, h) = (self.visible_rect.width, self.visible_rect.height);
        Ok(pixel_format::allocation_size(format, w, h))
    }

    /// Copy this frame's pixel data into `dest`, optionally cropped to
    /// `options.rect` and laid out per `options.layout`.
    ///
    /// Format conversion (a `target_format` that differs from this frame's
    /// own format) requires a scaler and is not available here — see
    /// `webcodec-runtime`'s frame conversion helper for that case.
    pub fn copy_to(
        &self,
        dest: &mut [u8],
        target_format: Option<PixelFormat>,
        options: &CopyToOptions,
    ) -> Result<Vec<PlaneLayout>, CodecError> {
        if self.closed {
            return Err(CodecError::invalid_state("VideoFrame is closed"));
        }

        let target_format = target_format.unwrap_or(self.format);
        if target_format != self.format {
            return Err(CodecError::validation(
                "copy_to format conversion requires webcodec-runtime's scaler",
            ));
        }

        let rect = options.rect.unwrap_or(self.visible_rect);
        if rect.x.saturating_add(rect.width) > self.coded_width
            || rect.y.saturating_add(rect.height) > self.coded_height
        {
            return Err(CodecError::validation("rect exceeds coded frame dimensions"));
        }

        let required = pixel_format::allocation_size(target_format, rect.width, rect.height);
        if dest.len() < required {
            return Err(CodecError::validation("destination buffer too small"));
        }

        let full_copy = rect.x == 0
            && rect.y == 0
            && rect.width == self.coded_width
            && rect.height == self.coded_height;

        if full_copy && options.layout.is_none() {
            dest[..self.data.len()].copy_from_slice(&self.data);
            let layout = pixel_format::plane_layout(target_format, rect.width, rect.height)
                .into_iter()
                .filter(|(_, stride)| *stride != 0)
                .map(|(offset, stride)| PlaneLayout { offset, stride })
                .collect();
            return Ok(layout);
        }

        self.copy_cropped(dest, target_format, rect, options.layout.as_deref())
    }

    fn copy_cropped(
        &self,
        dest: &mut [u8],
        format: PixelFormat,
        rect: VisibleRect,
        custom_layout: Option<&[PlaneLayout]>,
    ) -> Result<Vec<PlaneLayout>, CodecError> {
        let info = pixel_format::format_info(format);
        let src_layout = pixel_format::plane_layout(format, self.coded_width, self.coded_height);
        let default_dst_layout = pixel_format::plane_layout(format, rect.width, rect.height);

        let sample = ((info.bit_depth + 7) / 8) as usize;
        let num_planes = info.num_planes.max(1) as usize;

        let mut out_layout = Vec::with_capacity(num_planes);

        for plane in 0..num_planes {
            let (src_offset, src_stride) = src_layout[plane];
            if src_stride == 0 && plane != 0 {
                continue;
            }

            let (dst_offset, dst_stride) = custom_layout
                .and_then(|l| l.get(plane))
                .map(|p| (p.offset, p.stride))
                .unwrap_or(default_dst_layout[plane]);

            let (plane_x, plane_y, plane_height) = if info.num_planes == 1 {
                (rect.x as usize * 4, rect.y as usize, rect.height as usize)
            } else if plane == 0 || (info.has_alpha && plane == num_planes - 1) {
                (rect.x as usize * sample, rect.y as usize, rect.height as usize)
            } else {
                let cx = (rect.x >> info.chroma_h_shift) as usize;
                let cy = (rect.y >> info.chroma_v_shift) as usize;
                let ch = (rect.height >> info.chroma_v_shift) as usize;
                let cx = if info.is_semi_planar { cx * 2 } else { cx };
                (cx * sample, cy, ch)
            };

            for row in 0..plane_height {
                let src_start = src_offset + (plane_y + row) * src_stride + plane_x;
                let dst_start = dst_offset + row * dst_stride;
                let row_bytes = dst_stride.min(src_stride.saturating_sub(plane_x));
                if src_start + row_bytes > self.data.len() || dst_start + row_bytes > dest.len() {
                    return Err(CodecError::validation("copy_to layout out of bounds"));
                }
                dest[dst_start..dst_start + row_bytes]
                    .copy_from_slice(&self.data[src_start..src_start + row_bytes]);
            }

            out_layout.push(PlaneLayout { offset: dst_offset, stride: dst_stride });
        }

        Ok(out_layout)
    }

    /// An independent copy of this frame's data and metadata.
    pub fn try_clone(&self) -> Result<VideoFrame, CodecError> {
        if self.closed {
            return Err(CodecError::invalid_state("VideoFrame is closed"));
        }
        Ok(VideoFrame {
            data: self.data.clone(),
            closed: false,
            ..self.clone_metadata()
        })
    }

    fn clone_metadata(&self) -> VideoFrame {
        VideoFrame {
            data: Vec::new(),
            coded_width: self.coded_width,
            coded_height: self.coded_height,
            display_width: self.display_width,
            display_height: self.display_height,
            timestamp: self.timestamp,
            duration: self.duration,
            format: self.format,
            rotation: self.rotation,
            flip: self.flip,
            visible_rect: self.visible_rect,
            color_space: self.color_space.clone(),
            closed: self.closed,
        }
    }

    /// Release the backing buffer. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.data = Vec::new();
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rgba(w: u32, h: u32) -> VideoFrame {
        let data = vec![0xABu8; pixel_format::allocation_size(PixelFormat::Rgba, w, h)];
        VideoFrame::new(
            data,
            VideoFrameInit {
                coded_width: w,
                coded_height: h,
                timestamp: 1_000,
                duration: Some(33_333),
                display_width: None,
                display_height: None,
                format: PixelFormat::Rgba,
                rotation: 0,
                flip: false,
                visible_rect: None,
                color_space: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn rgb_formats_default_to_srgb_color_space() {
        let frame = make_rgba(4, 4);
        let cs = frame.color_space().unwrap();
        assert_eq!(cs.matrix.as_deref(), Some("rgb"));
        assert!(cs.full_range);
    }

    #[test]
    fn visible_rect_defaults_to_full_coded_area() {
        let frame = make_rgba(16, 8);
        assert_eq!(frame.visible_rect(), VisibleRect { x: 0, y: 0, width: 16, height: 8 });
    }

    #[test]
    fn out_of_bounds_visible_rect_is_rejected() {
        let data = vec![0u8; pixel_format::allocation_size(PixelFormat::Rgba, 4, 4)];
        let err = VideoFrame::new(
            data,
            VideoFrameInit {
                coded_width: 4,
                coded_height: 4,
                timestamp: 0,
                duration: None,
                display_width: None,
                display_height: None,
                format: PixelFormat::Rgba,
                rotation: 0,
                flip: false,
                visible_rect: Some(VisibleRect { x: 2, y: 2, width: 4, height: 4 }),
                color_space: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn full_frame_copy_matches_allocation_size() {
        let frame = make_rgba(4, 4);
        let size = frame.allocation_size(None).unwrap();
        let mut dest = vec![0u8; size];
        let layout = frame.copy_to(&mut dest, None, &CopyToOptions::default()).unwrap();
        assert_eq!(dest, vec![0xABu8; size]);
        assert_eq!(layout[0].stride, 16);
    }

    #[test]
    fn cropped_copy_writes_exactly_rect_sized_buffer() {
        let data = vec![0u8; pixel_format::allocation_size(PixelFormat::I420, 8, 8)];
        let frame = VideoFrame::new(
            data,
            VideoFrameInit {
                coded_width: 8,
                coded_height: 8,
                timestamp: 0,
                duration: None,
                display_width: None,
                display_height: None,
                format: PixelFormat::I420,
                rotation: 0,
                flip: false,
                visible_rect: None,
                color_space: None,
            },
        )
        .unwrap();

        let rect = VisibleRect { x: 0, y: 0, width: 4, height: 4 };
        let required = pixel_format::allocation_size(PixelFormat::I420, 4, 4);
        let mut dest = vec![0xFFu8; required];
        let opts = CopyToOptions { rect: Some(rect), layout: None };
        frame.copy_to(&mut dest, None, &opts).unwrap();
        assert_eq!(dest.len(), required);
    }

    #[test]
    fn closed_frame_rejects_further_access() {
        let mut frame = make_rgba(2, 2);
        frame.close();
        assert!(frame.data().is_err());
        assert!(frame.allocation_size(None).is_err());
        frame.close(); // idempotent
    }

    #[test]
    fn differing_target_format_is_rejected_without_a_scaler() {
        let frame = make_rgba(2, 2);
        let mut dest = vec![0u8; 64];
        let err = frame
            .copy_to(&mut dest, Some(PixelFormat::I420), &CopyToOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }
}
