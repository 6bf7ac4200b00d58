//! Post-processing: HDR scene targets and the composite pass
//!
//! The main and skybox passes render into an Rgba16Float color target with
//! its own depth buffer. The composite pass draws one full-screen triangle
//! that maps it onto the output surface, applying exposure and distance
//! fog from the camera depth prepass, or shows one of the depth debug
//! views instead.

use crate::context::{create_shader, validated, RenderError};
use crate::debug::DebugView;
use crate::pipeline::{color_entry, depth_entry, sampler_entry, uniform_entry, HDR_FORMAT};
use crate::shaders;
use crate::texture::{create_depth_target, create_target};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Post-processing parameters, adjustable at runtime
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Off: the scene color is copied straight through
    pub enabled: bool,
    pub exposure: f32,
    /// Per world unit
    pub fog_density: f32,
    pub fog_color: [f32; 3],
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exposure: 1.0,
            fog_density: 0.015,
            fog_color: [0.6, 0.7, 0.8],
        }
    }
}

/// Mirrors `CompositeUniforms` in `composite.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub near: f32,
    pub far: f32,
    pub exposure: f32,
    pub debug_view: u32,
    pub post_enabled: u32,
    pub _pad: [u32; 3],
}

impl CompositeUniforms {
    pub fn new(config: &PostProcessConfig, near: f32, far: f32, debug_view: DebugView) -> Self {
        Self {
            fog_color: config.fog_color,
            fog_density: if config.enabled { config.fog_density } else { 0.0 },
            near,
            far,
            exposure: if config.enabled { config.exposure } else { 1.0 },
            debug_view: debug_view.as_u32(),
            post_enabled: config.enabled as u32,
            _pad: [0; 3],
        }
    }
}

/// Color and depth targets of the main and skybox passes, sized to the surface
pub struct SceneTargets {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl SceneTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, RenderError> {
        let (color_texture, color_view) =
            create_target(device, "Scene HDR Color", width, height, HDR_FORMAT)?;
        let (depth_texture, depth_view) = create_depth_target(device, "Scene Depth", width, height)?;
        Ok(Self {
            color_texture,
            color_view,
            depth_texture,
            depth_view,
            width,
            height,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<bool, RenderError> {
        if (self.width, self.height) == (width, height) {
            return Ok(false);
        }
        let fresh = Self::new(device, width, height)?;
        self.color_texture.destroy();
        self.depth_texture.destroy();
        *self = fresh;
        Ok(true)
    }
}

pub struct CompositePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

impl CompositePipeline {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let shader = create_shader(device, "Composite Shader", shaders::COMPOSITE)?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Composite Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let fragment = wgpu::ShaderStages::FRAGMENT;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, fragment),
                color_entry(1, fragment),
                sampler_entry(2, fragment, wgpu::SamplerBindingType::Filtering),
                depth_entry(3),
                depth_entry(4),
            ],
            label: Some("Composite Bind Group Layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "Composite Pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Composite Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Uniforms"),
            contents: bytemuck::cast_slice(&[CompositeUniforms::new(
                &PostProcessConfig::default(),
                0.1,
                100.0,
                DebugView::Lit,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            sampler,
        })
    }

    /// Bind the pass inputs; rebuild whenever one of the views is recreated
    pub fn bind(
        &self,
        device: &wgpu::Device,
        scene_color: &wgpu::TextureView,
        shadow_map: &wgpu::TextureView,
        camera_depth: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(scene_color),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(shadow_map),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(camera_depth),
                },
            ],
            label: Some("Composite Bind Group"),
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, uniforms: &CompositeUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    /// Draw the full-screen triangle into `output`
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Clip-space corners the composite vertex shader emits for vertices 0..3
pub fn fullscreen_triangle() -> [[f32; 2]; 3] {
    let mut corners = [[0.0; 2]; 3];
    for (index, corner) in corners.iter_mut().enumerate() {
        let index = index as u32;
        let x = ((index << 1) & 2) as f32;
        let y = (index & 2) as f32;
        *corner = [x * 2.0 - 1.0, 1.0 - y * 2.0];
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 48);
    }

    #[test]
    fn test_disabled_post_is_a_plain_copy() {
        let config = PostProcessConfig {
            enabled: false,
            exposure: 3.0,
            ..Default::default()
        };
        let u = CompositeUniforms::new(&config, 0.1, 100.0, DebugView::Lit);
        assert_eq!(u.post_enabled, 0);
        assert_eq!(u.exposure, 1.0);
        assert_eq!(u.fog_density, 0.0);
    }

    #[test]
    fn test_triangle_covers_the_screen() {
        let [a, b, c] = fullscreen_triangle();
        assert_eq!(a, [-1.0, 1.0]);
        assert_eq!(b, [3.0, 1.0]);
        assert_eq!(c, [-1.0, -3.0]);
        // Every NDC corner lies inside the triangle's bounding right angle
        for corner in [[-1.0f32, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(corner[0] - a[0] + (a[1] - corner[1]) <= 4.0 + 1e-6);
        }
    }

    #[test]
    fn test_debug_view_reaches_shader() {
        let u = CompositeUniforms::new(&PostProcessConfig::default(), 0.1, 50.0, DebugView::CameraDepth);
        assert_eq!(u.debug_view, 5);
        assert_eq!(u.far, 50.0);
    }
}
