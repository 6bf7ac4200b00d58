//! Cube-map skybox
//!
//! Drawn after the main pass into the same color and depth targets. The
//! cube's corners come from `vertex_index` and are projected onto the far
//! plane, so with `LessEqual` and depth writes off the sky only fills
//! pixels no geometry covered. The view matrix has its translation removed
//! so the sky never moves with the camera.

use crate::camera::{to_wgpu, Camera};
use crate::context::{create_shader, validated, RenderError};
use crate::pipeline::{sampler_entry, texture_entry, triangles, uniform_entry, HDR_FORMAT};
use crate::shaders;
use crate::texture::{GpuTexture, DEPTH_FORMAT};
use bytemuck::{Pod, Zeroable};
use umbra_core::matrix::{mat4_mul, Mat4, IDENTITY};
use wgpu::util::DeviceExt;

/// Corners drawn per sky cube
pub const SKYBOX_VERTEX_COUNT: u32 = 36;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkyUniforms {
    pub view_proj: Mat4,
}

impl SkyUniforms {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: mat4_mul(&to_wgpu(&camera.projection_matrix()), &camera.skybox_view()),
        }
    }
}

pub struct SkyboxPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl SkyboxPipeline {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let shader = create_shader(device, "Skybox Shader", shaders::SKYBOX)?;

        // Uniforms, cube map, sampler
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                texture_entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::TextureViewDimension::Cube,
                ),
                sampler_entry(2, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
            ],
            label: Some("Skybox Bind Group Layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "Skybox Pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Skybox Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[], // Corners come from vertex_index
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                // Seen from inside
                primitive: triangles(None),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Uniforms"),
            contents: bytemuck::cast_slice(&[SkyUniforms { view_proj: IDENTITY }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
        })
    }

    /// Bind group for a cube map (the scene's or the solid fallback)
    pub fn bind(&self, device: &wgpu::Device, cube: &GpuTexture) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&cube.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&cube.sampler),
                },
            ],
            label: Some("Skybox Bind Group"),
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[SkyUniforms::from_camera(camera)]),
        );
    }

    /// Record the sky pass over the scene color and depth targets
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        bind_group: Option<&wgpu::BindGroup>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Skybox Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        // Disabled sky still runs the pass; the clear color shows through
        if let Some(bind_group) = bind_group {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..SKYBOX_VERTEX_COUNT, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::matrix::mat4_transform_vec4;
    use umbra_core::Vec3;

    #[test]
    fn test_sky_ignores_camera_translation() {
        let mut a = Camera::default();
        let mut b = Camera::default();
        a.position = Vec3::new(0.0, 0.0, 0.0);
        b.position = Vec3::new(100.0, -20.0, 5.0);
        a.rotate_local(10.0, 30.0);
        b.rotate_local(10.0, 30.0);
        assert_eq!(SkyUniforms::from_camera(&a).view_proj, SkyUniforms::from_camera(&b).view_proj);
    }

    #[test]
    fn test_forward_corner_lands_inside_clip_volume() {
        let camera = Camera::default();
        let sky = SkyUniforms::from_camera(&camera);
        // The cube face straight ahead (-Z) is visible
        let clip = mat4_transform_vec4(&sky.view_proj, [0.0, 0.0, -1.0, 1.0]);
        assert!(clip[3] > 0.0);
        assert!((clip[0] / clip[3]).abs() < 1.0);
        assert!((clip[1] / clip[3]).abs() < 1.0);
    }
}
