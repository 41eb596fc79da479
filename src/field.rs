//! Video-driven luminance field.
//!
//! A [`VideoFrame`] is an immutable RGBA8 image. Producers hand frames to a
//! [`FieldSlot`] from any thread at their own cadence; the frame driver reads
//! whatever frame is newest when a step starts. There is no queue: frames may
//! be skipped or sampled twice.
//!
//! [`FieldSampler`] maps world-space `(x, y)` into the frame:
//!
//! ```text
//! u = 1 - (x / Wx + 0.5)     // mirrored, so the field behaves like a mirror
//! v = y / Wy + 0.5           // v = 0 is the bottom row of the frame
//! ```
//!
//! Samples outside `[0, 1]²` are zero rather than clamped, so particles that
//! drift off the mapped area feel no force. No frame means zero everywhere.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use glam::Vec2;

use crate::error::FrameError;

/// Rec. 601 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Perceptual luminance of a linear RGB triple in `[0, 1]`.
#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA_WEIGHTS[0] + rgb[1] * LUMA_WEIGHTS[1] + rgb[2] * LUMA_WEIGHTS[2]
}

/// One frame of video, stored top row first as RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    sequence: u64,
}

impl VideoFrame {
    /// Wrap raw RGBA pixel data (4 bytes per pixel).
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            sequence: 0,
        })
    }

    /// Convert packed RGB pixel data (3 bytes per pixel), as most capture
    /// devices deliver it.
    pub fn from_rgb(width: u32, height: u32, rgb: &[u8]) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: rgb.len(),
            });
        }
        let pixels = rgb
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect();
        Self::from_rgba(width, height, pixels)
    }

    /// Convert any decoded image.
    pub fn from_image(image: &image::DynamicImage) -> Result<Self, FrameError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Load a still image from disk as a frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameError> {
        let bytes = std::fs::read(path.as_ref())?;
        let image = image::load_from_memory(&bytes)?;
        Self::from_image(&image)
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width.max(1) as usize * height.max(1) as usize;
        let pixels = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(count)
            .flatten()
            .collect();
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels,
            sequence: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, top row first.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Publication number assigned by [`FieldSlot::publish`]; 0 if never published.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// A copy shrunk to fit within `max`×`max`, keeping aspect ratio and
    /// sequence number. `None` when the frame already fits.
    pub fn fit_within(&self, max: u32) -> Option<VideoFrame> {
        let max = max.max(1);
        if self.width <= max && self.height <= max {
            return None;
        }
        let scale = max as f64 / self.width.max(self.height) as f64;
        let width = ((self.width as f64 * scale).round() as u32).clamp(1, max);
        let height = ((self.height as f64 * scale).round() as u32).clamp(1, max);

        let source = image::ImageBuffer::<image::Rgba<u8>, &[u8]>::from_raw(
            self.width,
            self.height,
            self.pixels.as_slice(),
        )?;
        let resized =
            image::imageops::resize(&source, width, height, image::imageops::FilterType::Triangle);
        Some(Self {
            width,
            height,
            pixels: resized.into_raw(),
            sequence: self.sequence,
        })
    }

    #[inline]
    fn texel(&self, x: i64, y: i64) -> [f32; 3] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let offset = (y * self.width as usize + x) * 4;
        let px = &self.pixels[offset..offset + 3];
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ]
    }

    /// Bilinearly filtered colour at texture coordinate `uv`, clamped to edge.
    ///
    /// `uv.y = 0` addresses the bottom row.
    pub fn sample_rgb(&self, uv: Vec2) -> [f32; 3] {
        let px = uv.x * self.width as f32 - 0.5;
        let py = (1.0 - uv.y) * self.height as f32 - 0.5;
        let fx = px.floor();
        let fy = py.floor();
        let tx = px - fx;
        let ty = py - fy;
        let (x0, y0) = (fx as i64, fy as i64);

        let c00 = self.texel(x0, y0);
        let c10 = self.texel(x0 + 1, y0);
        let c01 = self.texel(x0, y0 + 1);
        let c11 = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 3];
        for (k, value) in out.iter_mut().enumerate() {
            let top = c00[k] + (c10[k] - c00[k]) * tx;
            let bottom = c01[k] + (c11[k] - c01[k]) * tx;
            *value = top + (bottom - top) * ty;
        }
        out
    }
}

/// World-to-frame coordinate mapping and luminance lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSampler {
    extent: Vec2,
}

impl FieldSampler {
    pub fn new(extent: Vec2) -> Self {
        Self { extent }
    }

    pub fn extent(&self) -> Vec2 {
        self.extent
    }

    /// Mirrored frame coordinate for world `(x, y)`, or `None` outside the frame.
    ///
    /// Both edges are inclusive: `u = 0` and `u = 1` are inside.
    pub fn frame_uv(&self, world: Vec2) -> Option<Vec2> {
        let mapped = world / self.extent + 0.5;
        let inside = (0.0..=1.0).contains(&mapped.x) && (0.0..=1.0).contains(&mapped.y);
        inside.then(|| Vec2::new(1.0 - mapped.x, mapped.y))
    }

    /// Luminance at world `(x, y)`; zero without a frame or outside its bounds.
    pub fn luminance(&self, frame: Option<&VideoFrame>, world: Vec2) -> f32 {
        match (frame, self.frame_uv(world)) {
            (Some(frame), Some(uv)) => luminance(frame.sample_rgb(uv)),
            _ => 0.0,
        }
    }
}

/// Shared holder for the newest video frame.
///
/// Clone it freely: all clones see the same frame. Writers and the reader never
/// block each other for longer than an `Arc` swap.
#[derive(Debug, Clone, Default)]
pub struct FieldSlot {
    inner: Arc<SlotInner>,
}

#[derive(Debug, Default)]
struct SlotInner {
    frame: RwLock<Option<Arc<VideoFrame>>>,
    published: AtomicU64,
}

impl FieldSlot {
    /// An empty slot (no source attached).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame. Returns the sequence number it was given.
    pub fn publish(&self, mut frame: VideoFrame) -> u64 {
        let sequence = self.inner.published.fetch_add(1, Ordering::Relaxed) + 1;
        frame.sequence = sequence;
        let mut guard = self
            .inner
            .frame
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Arc::new(frame));
        sequence
    }

    /// Drop the current frame; the field reads as zero until the next publish.
    pub fn detach(&self) {
        let mut guard = self
            .inner
            .frame
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            log::debug!("field source detached");
        }
    }

    /// The newest frame, if a source is attached.
    pub fn latest(&self) -> Option<Arc<VideoFrame>> {
        self.inner
            .frame
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_attached(&self) -> bool {
        self.latest().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> FieldSampler {
        FieldSampler::new(Vec2::new(10.0, 8.0))
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(luminance([0.0, 0.0, 0.0]), 0.0);
        assert!((luminance([1.0, 0.0, 0.0]) - 0.299).abs() < 1e-6);
        assert!((luminance([0.0, 1.0, 0.0]) - 0.587).abs() < 1e-6);
        assert!((luminance([0.0, 0.0, 1.0]) - 0.114).abs() < 1e-6);
    }

    #[test]
    fn test_frame_uv_mirrors_and_centers() {
        let s = sampler();
        assert_eq!(s.frame_uv(Vec2::ZERO), Some(Vec2::new(0.5, 0.5)));
        // Left edge of the world maps to the right edge of the frame.
        assert_eq!(s.frame_uv(Vec2::new(-5.0, 0.0)), Some(Vec2::new(1.0, 0.5)));
        assert_eq!(s.frame_uv(Vec2::new(5.0, 4.0)), Some(Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn test_frame_uv_outside_is_none() {
        let s = sampler();
        assert_eq!(s.frame_uv(Vec2::new(5.01, 0.0)), None);
        assert_eq!(s.frame_uv(Vec2::new(0.0, -4.01)), None);
        assert_eq!(s.frame_uv(Vec2::new(-100.0, 100.0)), None);
    }

    #[test]
    fn test_no_frame_is_zero() {
        let s = sampler();
        assert_eq!(s.luminance(None, Vec2::ZERO), 0.0);
    }

    #[test]
    fn test_out_of_bounds_is_zero_not_edge() {
        let s = sampler();
        let white = VideoFrame::solid(16, 9, [255, 255, 255]);
        assert!(s.luminance(Some(&white), Vec2::new(4.99, 0.0)) > 0.99);
        assert!(s.luminance(Some(&white), Vec2::new(5.0, 0.0)) > 0.99);
        assert_eq!(s.luminance(Some(&white), Vec2::new(5.001, 0.0)), 0.0);
        assert_eq!(s.luminance(Some(&white), Vec2::new(-5.001, 0.0)), 0.0);
    }

    #[test]
    fn test_mirroring_picks_opposite_side() {
        // Left half of the image bright, right half dark.
        let (w, h) = (8u32, 2u32);
        let mut pixels = Vec::new();
        for _ in 0..h {
            for x in 0..w {
                let v = if x < w / 2 { 255 } else { 0 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let frame = VideoFrame::from_rgba(w, h, pixels).unwrap();
        let s = sampler();
        // World right side samples the image's left half.
        assert!(s.luminance(Some(&frame), Vec2::new(4.0, 0.0)) > 0.99);
        assert!(s.luminance(Some(&frame), Vec2::new(-4.0, 0.0)) < 0.01);
    }

    #[test]
    fn test_bottom_row_is_v_zero() {
        // Top row white, bottom row black.
        let mut pixels = vec![255u8; 4 * 4];
        pixels.extend_from_slice(&[0, 0, 0, 255].repeat(4));
        let frame = VideoFrame::from_rgba(4, 2, pixels).unwrap();
        assert!(luminance(frame.sample_rgb(Vec2::new(0.5, 0.0))) < 0.01);
        assert!(luminance(frame.sample_rgb(Vec2::new(0.5, 1.0))) > 0.99);
    }

    #[test]
    fn test_from_rgb_expands_alpha() {
        let frame = VideoFrame::from_rgb(2, 1, &[10, 20, 30, 40, 50, 60]).unwrap();
        assert_eq!(frame.pixels(), &[10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let err = VideoFrame::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                expected: 16,
                actual: 15
            }
        ));
        assert!(matches!(
            VideoFrame::from_rgba(0, 2, Vec::new()),
            Err(FrameError::Empty)
        ));
    }

    #[test]
    fn test_slot_publish_and_detach() {
        let slot = FieldSlot::new();
        assert!(slot.latest().is_none());

        let first = slot.publish(VideoFrame::solid(2, 2, [1, 2, 3]));
        let second = slot.publish(VideoFrame::solid(2, 2, [4, 5, 6]));
        assert!(second > first);
        assert_eq!(slot.latest().map(|f| f.sequence()), Some(second));

        let reader = slot.clone();
        slot.detach();
        assert!(!reader.is_attached());
    }

    #[test]
    fn test_frame_held_by_reader_survives_detach() {
        let slot = FieldSlot::new();
        slot.publish(VideoFrame::solid(1, 1, [255, 255, 255]));
        let held = slot.latest().unwrap();
        slot.detach();
        assert_eq!(held.width(), 1);
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_oversized_frame_fits_texture_limit() {
        let slot = FieldSlot::new();
        let sequence = slot.publish(VideoFrame::solid(20_000, 100, [200, 200, 200]));
        let wide = slot.latest().unwrap();

        let fitted = wide.fit_within(8192).unwrap();
        assert_eq!((fitted.width(), fitted.height()), (8192, 41));
        assert_eq!(fitted.sequence(), sequence);
        for px in fitted.pixels().chunks_exact(4) {
            assert!((px[0] as i32 - 200).abs() <= 1);
            assert_eq!(px[3], 255);
        }

        let uv = Vec2::new(0.3, 0.6);
        let before = luminance(wide.sample_rgb(uv));
        let after = luminance(fitted.sample_rgb(uv));
        assert!((before - after).abs() < 0.01);
    }

    #[test]
    fn test_frame_within_limit_is_left_alone() {
        let frame = VideoFrame::solid(640, 480, [10, 20, 30]);
        assert!(frame.fit_within(640).is_none());
        assert!(frame.fit_within(8192).is_none());

        let tall = VideoFrame::solid(3, 900, [0, 0, 0]);
        let fitted = tall.fit_within(300).unwrap();
        assert_eq!((fitted.width(), fitted.height()), (1, 300));
    }
}
