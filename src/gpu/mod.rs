//! wgpu execution of the particle field.
//!
//! [`GpuContext`] owns the device and window surface. [`GpuBackend`] holds the
//! two pipelines and implements [`FrameBackend`](crate::driver::FrameBackend)
//! over a pair of [`GpuStateSlot`]s.

mod backend;
mod camera;
mod state;
mod video;

use std::sync::Arc;

use winit::window::Window;

pub use backend::GpuBackend;
pub use camera::Camera;
pub use state::GpuStateSlot;
pub use video::VideoTexture;

use crate::error::GpuError;

/// Format of both state textures. Never downgraded: positions span roughly
/// `[-5, 5]` and must not be clipped or quantized.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Format of the uploaded video frame.
pub const VIDEO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Device, queue and configured window surface.
pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Create a device able to hold an `resolution`×`resolution` state texture.
    ///
    /// Fails if the adapter cannot sample and storage-write [`STATE_FORMAT`] or
    /// if the grid exceeds the device's 2D texture limit.
    pub async fn new(window: Arc<Window>, resolution: u32) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", adapter_info.name, adapter_info.backend);

        check_state_format(&adapter)?;

        let adapter_limits = adapter.limits();
        if resolution > adapter_limits.max_texture_dimension_2d {
            return Err(GpuError::ResolutionTooLarge {
                resolution,
                max: adapter_limits.max_texture_dimension_2d,
            });
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: required_limits(&adapter_limits),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("GPU uncaptured error: {}", error);
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_info,
        })
    }

    /// Reconfigure the surface. Zero-sized (minimized) windows are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Surface size in pixels.
    pub fn viewport(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

/// Downlevel limits raised to the adapter's texture dimensions, so the state
/// texture and large video frames fit wherever the adapter allows.
fn required_limits(adapter: &wgpu::Limits) -> wgpu::Limits {
    wgpu::Limits::downlevel_defaults().using_resolution(adapter.clone())
}

fn check_state_format(adapter: &wgpu::Adapter) -> Result<(), GpuError> {
    let required = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING;
    let features = adapter.get_texture_format_features(STATE_FORMAT);
    if !features.allowed_usages.contains(required) {
        log::error!(
            "{:?} lacks {:?} on this adapter (has {:?})",
            STATE_FORMAT,
            required,
            features.allowed_usages
        );
        return Err(GpuError::UnsupportedStateFormat(STATE_FORMAT));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_limits_follow_adapter_resolution() {
        let adapter = wgpu::Limits {
            max_texture_dimension_2d: 32_768,
            ..wgpu::Limits::default()
        };
        let required = required_limits(&adapter);
        assert_eq!(required.max_texture_dimension_2d, 32_768);

        let floor = wgpu::Limits::downlevel_defaults();
        assert_eq!(
            required.max_storage_buffer_binding_size,
            floor.max_storage_buffer_binding_size
        );
        assert_eq!(
            required.max_compute_workgroups_per_dimension,
            floor.max_compute_workgroups_per_dimension
        );
    }

    #[test]
    fn test_required_limits_do_not_exceed_small_adapter() {
        let adapter = wgpu::Limits {
            max_texture_dimension_2d: 2048,
            ..wgpu::Limits::downlevel_defaults()
        };
        let required = required_limits(&adapter);
        assert!(required.check_limits(&adapter));
    }
}
