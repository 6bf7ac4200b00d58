//! Alpha-blended water surface
//!
//! A subdivided quad displaced by a scrolling height map, reflecting the
//! sky and fading out where the camera depth prepass shows the bottom
//! close beneath it. Drawn last in the main pass, after opaque geometry
//! and instanced fields.

use crate::context::{create_shader, validated, RenderError};
use crate::mesh::Vertex;
use crate::pipeline::{
    color_entry, depth_write, height_entry, sampler_entry, triangles, uniform_entry, BindLayouts,
    HDR_FORMAT,
};
use crate::resources::{GpuResources, MeshHandle, TextureHandle};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use umbra_core::matrix::Mat4;
use umbra_core::{Transform, Vec3};
use umbra_scene::WaterDef;
use wgpu::util::DeviceExt;

/// Mirrors `WaterUniforms` in `water.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WaterUniforms {
    pub model: Mat4,
    pub alpha: f32,
    pub wave_height: f32,
    pub wave_speed: f32,
    pub _pad: f32,
}

/// A water surface as the scene owns it
#[derive(Debug, Clone)]
pub struct Water {
    pub transform: Transform,
    pub mesh: MeshHandle,
    pub albedo: TextureHandle,
    pub height_map: TextureHandle,
    pub alpha: f32,
    /// Local units the height map's 1.0 raises a vertex by
    pub wave_height: f32,
    /// UV units per second the height map scrolls
    pub wave_speed: f32,
}

impl Water {
    pub fn from_def(def: &WaterDef, mesh: MeshHandle, albedo: TextureHandle, height_map: TextureHandle) -> Self {
        Self {
            transform: Transform::from_euler(def.position, Vec3::ZERO, def.scale),
            mesh,
            albedo,
            height_map,
            alpha: def.alpha.clamp(0.0, 1.0),
            wave_height: 0.05,
            wave_speed: 0.02,
        }
    }

    pub fn uniforms(&self) -> WaterUniforms {
        WaterUniforms {
            model: self.transform.trs_matrix(),
            alpha: self.alpha,
            wave_height: self.wave_height,
            wave_speed: self.wave_speed,
            _pad: 0.0,
        }
    }
}

pub struct WaterPipeline {
    /// Group 1: uniforms, sampler, albedo, height map
    pub water_layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::RenderPipeline,
}

impl WaterPipeline {
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts) -> Result<Self, RenderError> {
        let shader = create_shader(device, "Water Shader", shaders::WATER)?;

        let water_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
                color_entry(2, wgpu::ShaderStages::FRAGMENT),
                height_entry(3, wgpu::ShaderStages::VERTEX),
            ],
            label: Some("Water Bind Group Layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Water Pipeline Layout"),
            bind_group_layouts: &[&layouts.frame, &water_layout],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "Water Pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Water Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: triangles(None),
                // Writes depth so the sky drawn afterwards stays behind the surface
                depth_stencil: Some(depth_write(
                    wgpu::CompareFunction::Less,
                    wgpu::DepthBiasState::default(),
                )),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(Self {
            water_layout,
            pipeline,
        })
    }
}

/// Uniform buffer and bind group of the scene's water
pub struct WaterBinding {
    uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl WaterBinding {
    pub fn new(
        device: &wgpu::Device,
        pipeline: &WaterPipeline,
        water: &Water,
        resources: &GpuResources,
    ) -> Result<Self, RenderError> {
        let albedo = resources
            .texture(water.albedo)
            .ok_or_else(|| RenderError::Resource(format!("water albedo {} is not live", water.albedo)))?;
        let heights = resources.texture(water.height_map).ok_or_else(|| {
            RenderError::Resource(format!("water height map {} is not live", water.height_map))
        })?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Water Uniforms"),
            contents: bytemuck::cast_slice(&[water.uniforms()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipeline.water_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&albedo.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&heights.view),
                },
            ],
            label: Some("Water Bind Group"),
        });

        Ok(Self {
            uniform_buffer,
            bind_group,
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, water: &Water) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[water.uniforms()]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{CountingAllocator, GpuAllocator};
    use crate::mesh::MeshData;
    use crate::texture::TextureUpload;
    use umbra_import::ImportedHeights;

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<WaterUniforms>(), 80);
    }

    #[test]
    fn test_from_def_places_surface_and_clamps_alpha() {
        let mut alloc = CountingAllocator::default();
        let mesh = alloc.create_mesh(&MeshData::subdivided_quad(4)).unwrap();
        let heights = ImportedHeights {
            name: "h".into(),
            width: 2,
            height: 2,
            values: vec![0.0; 4],
        };
        let height_map = alloc.create_texture("h", TextureUpload::Heights(&heights)).unwrap();
        let def = WaterDef {
            position: Vec3::new(0.0, -0.5, 0.0),
            scale: Vec3::new(30.0, 1.0, 30.0),
            albedo: "water.png".into(),
            height_map: "waves.png".into(),
            divisions: 4,
            alpha: 1.7,
        };
        let water = Water::from_def(&def, mesh, height_map, height_map);
        let u = water.uniforms();
        assert_eq!(u.alpha, 1.0);
        // Translation lives in the last column
        assert_eq!(u.model[3][1], -0.5);
        assert_eq!(u.model[0][0], 30.0);
    }
}
