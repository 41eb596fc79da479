//! State texture pair on the GPU.
//!
//! Each slot carries a prebuilt step bind group that samples this slot and
//! storage-writes its partner, so the compute pass for either direction is a
//! single `set_bind_group` call and can never alias its read and write targets.

use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::state::{PingPong, Slot, StateTexture};

use super::STATE_FORMAT;

/// One physical state texture with its bind groups.
pub struct GpuStateSlot {
    slot: Slot,
    texture: wgpu::Texture,
    /// Simulation group 0: this texture sampled, the partner storage-written.
    pub(crate) step_bind_group: wgpu::BindGroup,
    /// Render group 0: render uniforms plus this texture.
    pub(crate) render_bind_group: wgpu::BindGroup,
}

impl GpuStateSlot {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

/// Bind group layout for simulation group 0.
pub(crate) fn step_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("State Step Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: STATE_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
        ],
    })
}

/// Bind group layout for render group 0.
pub(crate) fn render_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("State Render Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    })
}

/// [`create_state_pair`] inside error scopes, so an out-of-memory or
/// validation failure comes back as [`GpuError::StateAllocation`].
pub(crate) fn try_create_state_pair(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    initial: &StateTexture,
    step_layout: &wgpu::BindGroupLayout,
    render_layout: &wgpu::BindGroupLayout,
    render_uniforms: &wgpu::Buffer,
) -> Result<PingPong<GpuStateSlot>, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let slots = create_state_pair(
        device,
        queue,
        initial,
        step_layout,
        render_layout,
        render_uniforms,
    );
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    allocation_result(out_of_memory, validation)?;
    Ok(slots)
}

/// Out-of-memory wins over validation when both scopes caught something.
fn allocation_result(
    out_of_memory: Option<wgpu::Error>,
    validation: Option<wgpu::Error>,
) -> Result<(), GpuError> {
    match out_of_memory.or(validation) {
        Some(error) => {
            log::error!("State texture allocation failed: {}", error);
            Err(GpuError::StateAllocation(error))
        }
        None => Ok(()),
    }
}

/// Upload `initial` into two textures and wire up both directions.
fn create_state_pair(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    initial: &StateTexture,
    step_layout: &wgpu::BindGroupLayout,
    render_layout: &wgpu::BindGroupLayout,
    render_uniforms: &wgpu::Buffer,
) -> PingPong<GpuStateSlot> {
    let n = initial.resolution();
    let desc = |label| wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: n,
            height: n,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: STATE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };

    let order = wgpu::util::TextureDataOrder::LayerMajor;
    let texture_a =
        device.create_texture_with_data(queue, &desc("State Texture A"), order, initial.as_bytes());
    let texture_b =
        device.create_texture_with_data(queue, &desc("State Texture B"), order, initial.as_bytes());
    let view_a = texture_a.create_view(&wgpu::TextureViewDescriptor::default());
    let view_b = texture_b.create_view(&wgpu::TextureViewDescriptor::default());

    log::info!(
        "Allocated state textures: {}x{} {:?} ({} KiB each)",
        n,
        n,
        STATE_FORMAT,
        initial.as_bytes().len() / 1024
    );

    let step = |label, read: &wgpu::TextureView, write: &wgpu::TextureView| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: step_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(read),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(write),
                },
            ],
        })
    };

    let render = |label, view: &wgpu::TextureView| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: render_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: render_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
            ],
        })
    };

    let a = GpuStateSlot {
        slot: Slot::A,
        step_bind_group: step("Step Bind Group A->B", &view_a, &view_b),
        render_bind_group: render("Render Bind Group A", &view_a),
        texture: texture_a,
    };
    let b = GpuStateSlot {
        slot: Slot::B,
        step_bind_group: step("Step Bind Group B->A", &view_b, &view_a),
        render_bind_group: render("Render Bind Group B", &view_b),
        texture: texture_b,
    };

    PingPong::new(a, b)
}
