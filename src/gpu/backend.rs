//! The two passes on wgpu.

use bytemuck::{bytes_of, cast_slice};
use wgpu::util::DeviceExt;

use crate::config::{AppearanceConfig, EchoConfig, MotionConfig};
use crate::driver::{FrameBackend, FrameInput};
use crate::error::GpuError;
use crate::grid::ParticleGrid;
use crate::render::{RenderUniforms, ViewProjection};
use crate::shader::{self, WORKGROUP_SIZE};
use crate::state::{PingPong, StateTexture};
use crate::step::SimUniforms;

use super::camera::Camera;
use super::state::{self, GpuStateSlot};
use super::video::VideoTexture;
use super::{GpuContext, VIDEO_FORMAT};

/// `#050505` in linear space.
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.0015,
    g: 0.0015,
    b: 0.0015,
    a: 1.0,
};

/// Compute-then-render execution on the GPU.
///
/// `simulate` records the compute pass into a pending encoder; `render`
/// appends the draw and submits both, so the step always completes before the
/// render pass reads its output.
pub struct GpuBackend {
    context: GpuContext,
    grid: ParticleGrid,
    motion: MotionConfig,
    appearance: AppearanceConfig,
    compute_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,
    field_layout: wgpu::BindGroupLayout,
    field_bind_group: wgpu::BindGroup,
    sim_uniforms: wgpu::Buffer,
    render_uniforms: wgpu::Buffer,
    references: wgpu::Buffer,
    video: VideoTexture,
    view: ViewProjection,
    pending: Option<wgpu::CommandEncoder>,
}

impl GpuBackend {
    /// Build pipelines and the initial state pair.
    pub fn new(
        context: GpuContext,
        config: &EchoConfig,
    ) -> Result<(Self, PingPong<GpuStateSlot>), GpuError> {
        let grid = ParticleGrid::from_config(&config.grid);
        let max = context.device.limits().max_texture_dimension_2d;
        if grid.resolution() > max {
            return Err(GpuError::ResolutionTooLarge {
                resolution: grid.resolution(),
                max,
            });
        }

        let device = &context.device;
        let queue = &context.queue;
        let (width, height) = context.viewport();
        let view = Camera::new().view_projection(width, height);

        let sim_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Simulation Uniform Buffer"),
            contents: bytes_of(&SimUniforms::new(&grid, &config.motion, 0.0, false)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Uniform Buffer"),
            contents: bytes_of(&RenderUniforms::new(&view, &config.appearance)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let references = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Reference Buffer"),
            contents: cast_slice(&grid.references()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let video = VideoTexture::new(device, queue);

        let step_layout = state::step_layout(device);
        let render_layout = state::render_layout(device);
        let field_layout = field_layout(device);
        let field_bind_group = field_bind_group(device, &field_layout, &sim_uniforms, &video);

        let slots = state::try_create_state_pair(
            device,
            queue,
            &StateTexture::from_grid(&grid),
            &step_layout,
            &render_layout,
            &render_uniforms,
        )?;

        // Simulation pipeline
        let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Simulation Shader"),
            source: wgpu::ShaderSource::Wgsl(shader::simulation_shader().into()),
        });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Simulation Pipeline Layout"),
                bind_group_layouts: &[&step_layout, &field_layout],
                push_constant_ranges: &[],
            });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Simulation Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &compute_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        // Render pipeline
        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Render Shader"),
            source: wgpu::ShaderSource::Wgsl(shader::render_shader().into()),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&render_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x2,
                    }],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.config.format,
                    blend: Some(additive_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // No depth attachment: overlapping particles accumulate.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!(
            "GPU backend ready: {} particles, video format {:?}",
            grid.len(),
            VIDEO_FORMAT
        );

        let backend = Self {
            context,
            grid,
            motion: config.motion.clone(),
            appearance: config.appearance.clone(),
            compute_pipeline,
            render_pipeline,
            field_layout,
            field_bind_group,
            sim_uniforms,
            render_uniforms,
            references,
            video,
            view,
            pending: None,
        };
        Ok((backend, slots))
    }

    /// Reconfigure the surface after a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    /// Set the camera used by the next render.
    pub fn set_view(&mut self, view: ViewProjection) {
        self.view = view;
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    fn encoder(&mut self) -> wgpu::CommandEncoder {
        self.pending.take().unwrap_or_else(|| {
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                })
        })
    }
}

impl FrameBackend for GpuBackend {
    type Buffer = GpuStateSlot;
    type Error = wgpu::SurfaceError;

    fn simulate(&mut self, read: &GpuStateSlot, write: &mut GpuStateSlot, input: &FrameInput<'_>) {
        debug_assert_eq!(read.slot().other(), write.slot());

        if let Some(frame) = input.field {
            if self.video.sync(&self.context.device, &self.context.queue, frame) {
                self.field_bind_group = field_bind_group(
                    &self.context.device,
                    &self.field_layout,
                    &self.sim_uniforms,
                    &self.video,
                );
            }
        }

        let uniforms =
            SimUniforms::new(&self.grid, &self.motion, input.time, input.field.is_some());
        self.context
            .queue
            .write_buffer(&self.sim_uniforms, 0, bytes_of(&uniforms));

        let mut encoder = self.encoder();
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Simulation Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.compute_pipeline);
            compute_pass.set_bind_group(0, &read.step_bind_group, &[]);
            compute_pass.set_bind_group(1, &self.field_bind_group, &[]);

            let groups = self.grid.resolution().div_ceil(WORKGROUP_SIZE);
            compute_pass.dispatch_workgroups(groups, groups, 1);
        }
        self.pending = Some(encoder);
    }

    fn render(
        &mut self,
        latest: &GpuStateSlot,
        _input: &FrameInput<'_>,
    ) -> Result<(), wgpu::SurfaceError> {
        let uniforms = RenderUniforms::new(&self.view, &self.appearance);
        self.context
            .queue
            .write_buffer(&self.render_uniforms, 0, bytes_of(&uniforms));

        let mut encoder = self.encoder();

        let output = match self.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                // The step still has to land so the swap stays consistent.
                self.context.queue.submit(std::iter::once(encoder.finish()));
                return Err(e);
            }
        };
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &latest.render_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.references.slice(..));
            render_pass.draw(0..6, 0..self.grid.len() as u32);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Source-alpha weighted additive blending.
fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn field_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Field Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn field_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    video: &VideoTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Field Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(video.view()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(video.sampler()),
            },
        ],
    })
}
