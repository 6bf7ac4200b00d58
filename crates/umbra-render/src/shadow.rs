//! Shadow mapping
//!
//! The scene's shadow casters are rendered from the directional light into
//! a square depth texture. The main pass samples it through a comparison
//! sampler with the same light-space matrix, so a world point and its
//! shadow-map texel are related by [`shadow_coord`]. The depth-only
//! pipeline here is shared with the camera depth prepass.

use crate::context::{create_shader, validated, RenderError};
use crate::draw::DepthDraws;
use crate::mesh::Vertex;
use crate::pipeline::{depth_write, triangles, BindLayouts};
use crate::shaders;
use crate::texture::create_depth_target;
use bytemuck::{Pod, Zeroable};
use umbra_core::matrix::{mat4_transform_vec4, Mat4};
use umbra_core::Vec3;
use wgpu::util::DeviceExt;

/// Default shadow map edge length in texels
pub const DEFAULT_SHADOW_RESOLUTION: u32 = 2048;

/// Uniforms of the depth-only programs
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DepthUniforms {
    pub view_proj: Mat4,
}

/// Shadow-map uv (origin top left) and depth of a world point, given a
/// light-space matrix already in wgpu clip space. Mirrors `shadow_coord`
/// in the lit shaders.
pub fn shadow_coord(light_space: &Mat4, world: Vec3) -> Option<(f32, f32, f32)> {
    let clip = mat4_transform_vec4(light_space, [world.x, world.y, world.z, 1.0]);
    if clip[3].abs() < f32::EPSILON {
        return None;
    }
    let ndc = [clip[0] / clip[3], clip[1] / clip[3], clip[2] / clip[3]];
    Some((ndc[0] * 0.5 + 0.5, ndc[1] * -0.5 + 0.5, ndc[2]))
}

/// Depth offset a receiver with `normal` subtracts before the shadow compare,
/// growing as the surface turns away from the light. Mirrors `shadow_factor`
/// in the lit shaders.
pub fn receiver_bias(normal: Vec3, light_dir: Vec3) -> f32 {
    let slope = 1.0 - normal.dot(&-light_dir).clamp(0.0, 1.0);
    (0.002 * slope).max(0.0005)
}

/// Which depth-only pipeline to record with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthKind {
    /// Light view, slope-scaled bias against acne
    Shadow,
    /// Camera view, no bias
    Camera,
}

/// Depth-only mesh pipelines for both depth passes
pub struct DepthPipeline {
    shadow: wgpu::RenderPipeline,
    camera: wgpu::RenderPipeline,
}

impl DepthPipeline {
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts) -> Result<Self, RenderError> {
        let shader = create_shader(device, "Depth Shader", shaders::DEPTH)?;
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Pipeline Layout"),
            bind_group_layouts: &[&layouts.depth, &layouts.object],
            push_constant_ranges: &[],
        });

        let build = |label: &str, bias: wgpu::DepthBiasState| {
            validated(device, label, || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::desc()],
                        compilation_options: Default::default(),
                    },
                    fragment: None, // Depth only
                    // Single-sided quads must still cast
                    primitive: triangles(None),
                    depth_stencil: Some(depth_write(wgpu::CompareFunction::Less, bias)),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
        };

        Ok(Self {
            shadow: build("Shadow Depth Pipeline", shadow_bias())?,
            camera: build("Camera Depth Pipeline", wgpu::DepthBiasState::default())?,
        })
    }

    pub fn pipeline(&self, kind: DepthKind) -> &wgpu::RenderPipeline {
        match kind {
            DepthKind::Shadow => &self.shadow,
            DepthKind::Camera => &self.camera,
        }
    }
}

pub(crate) fn shadow_bias() -> wgpu::DepthBiasState {
    wgpu::DepthBiasState {
        constant: 2,
        slope_scale: 2.0,
        clamp: 0.0,
    }
}

/// A sampleable depth texture plus the uniforms of the view rendering it
pub struct DepthTarget {
    label: String,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl DepthTarget {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let (texture, view) = create_depth_target(device, label, width, height)?;
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Uniforms", label)),
            contents: bytemuck::cast_slice(&[DepthUniforms {
                view_proj: umbra_core::matrix::IDENTITY,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.depth,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some(&format!("{} Bind Group", label)),
        });
        Ok(Self {
            label: label.to_string(),
            texture,
            view,
            uniform_buffer,
            bind_group,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Recreate the texture at a new size; the uniforms are kept
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), RenderError> {
        let (texture, view) = create_depth_target(device, &self.label, width, height)?;
        self.texture.destroy();
        self.texture = texture;
        self.view = view;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn write_view_proj(&self, queue: &wgpu::Queue, view_proj: &Mat4) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[DepthUniforms {
                view_proj: *view_proj,
            }]),
        );
    }

    /// Clear to the far plane and draw `draws` depth-only
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mesh_pipeline: &wgpu::RenderPipeline,
        field_pipeline: &wgpu::RenderPipeline,
        draws: &DepthDraws<'_>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&format!("{} Pass", self.label)),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !draws.meshes.is_empty() {
            pass.set_pipeline(mesh_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            for draw in &draws.meshes {
                pass.set_bind_group(1, draw.object, &[]);
                draw.mesh.draw(&mut pass, 0..1);
            }
        }

        if !draws.fields.is_empty() {
            pass.set_pipeline(field_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            for field in &draws.fields {
                pass.set_bind_group(1, field.bind_group, &[]);
                field.mesh.draw(&mut pass, 0..field.count);
            }
        }
    }
}

/// The light's depth texture and how the main pass samples it
pub struct ShadowPass {
    pub target: DepthTarget,
    /// Comparison sampler (LessEqual), clamped to the map edge
    pub sampler: wgpu::Sampler,
    pub resolution: u32,
}

impl ShadowPass {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        resolution: u32,
    ) -> Result<Self, RenderError> {
        let target = DepthTarget::new(device, layouts, "Shadow Map", resolution, resolution)?;
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        log::debug!("Shadow map {}x{}", resolution, resolution);
        Ok(Self {
            target,
            sampler,
            resolution,
        })
    }

    /// Change the map size; bind groups that reference the old view must be rebuilt
    pub fn set_resolution(&mut self, device: &wgpu::Device, resolution: u32) -> Result<(), RenderError> {
        self.target.resize(device, resolution, resolution)?;
        self.resolution = resolution;
        Ok(())
    }
}
