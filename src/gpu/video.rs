//! Video frame upload.

use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::field::VideoFrame;

use super::VIDEO_FORMAT;

/// GPU copy of the newest video frame plus its sampler.
///
/// Starts as a 1×1 black placeholder so the field bind group is always valid.
/// A frame is uploaded only when its sequence number differs from the last
/// upload; a size change reallocates the texture. Frames larger than the
/// device's 2D texture limit are downscaled first.
pub struct VideoTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
    sequence: Option<u64>,
}

impl VideoTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = create_texture(device, queue, 1, 1, &[0, 0, 0, 255]);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Video Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width: 1,
            height: 1,
            sequence: None,
        }
    }

    /// Upload `frame` if it is new. Returns `true` when the texture was
    /// reallocated and any bind group referencing it must be rebuilt.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &VideoFrame,
    ) -> bool {
        if self.sequence == Some(frame.sequence()) {
            return false;
        }
        self.sequence = Some(frame.sequence());

        let max = device.limits().max_texture_dimension_2d;
        let original = (frame.width(), frame.height());
        let frame = match frame.fit_within(max) {
            Some(fitted) => Cow::Owned(fitted),
            None => Cow::Borrowed(frame),
        };

        if frame.width() != self.width || frame.height() != self.height {
            if (frame.width(), frame.height()) != original {
                log::warn!(
                    "Video frame {}x{} exceeds the {} texture limit; downscaling to {}x{}",
                    original.0,
                    original.1,
                    max,
                    frame.width(),
                    frame.height()
                );
            }
            log::info!(
                "Video texture resized {}x{} -> {}x{}",
                self.width,
                self.height,
                frame.width(),
                frame.height()
            );
            self.texture =
                create_texture(device, queue, frame.width(), frame.height(), frame.pixels());
            self.view = self.texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.width = frame.width();
            self.height = frame.height();
            return true;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width()),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
        );
        false
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Sequence number of the uploaded frame, `None` for the placeholder.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("Video Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: VIDEO_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        pixels,
    )
}
