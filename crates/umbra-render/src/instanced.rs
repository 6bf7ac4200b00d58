//! GPU-instanced fields of small meshes (grass, ferns, trees)
//!
//! A field is one base mesh drawn `count` times with a single instanced
//! draw. Nothing per instance is stored: the vertex shader derives each
//! instance's position, rotation and scale by hashing `instance_index`,
//! snaps it to the ground through the height map and adds wind sway. The
//! CPU supplies only the mesh, the maps, the count, the spawn radius and
//! the world height range the map's `[0, 1]` values stretch over.

use crate::context::{create_shader, validated, RenderError};
use crate::mesh::Vertex;
use crate::pipeline::{
    color_entry, depth_write, height_entry, sampler_entry, triangles, uniform_entry, BindLayouts,
    HDR_FORMAT,
};
use crate::resources::{GpuResources, MeshHandle, TextureHandle};
use crate::shaders;
use crate::shadow::{shadow_bias, DepthKind};
use crate::texture::{DefaultTextures, GpuTexture};
use bytemuck::{Pod, Zeroable};
use umbra_core::UmbraError;
use wgpu::util::DeviceExt;

/// Default horizontal sway at the top of a one-unit-tall mesh
pub const DEFAULT_WIND_STRENGTH: f32 = 0.08;

/// Mirrors `FieldUniforms` in `instanced_common.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FieldUniforms {
    pub spawn_radius: f32,
    pub world_y_min: f32,
    pub world_y_max: f32,
    pub time: f32,
    pub instance_count: u32,
    pub use_opacity_map: u32,
    pub wind_strength: f32,
    pub _pad: f32,
}

/// An instanced field as the scene owns it
#[derive(Debug, Clone)]
pub struct InstancedField {
    pub name: String,
    pub mesh: MeshHandle,
    pub albedo: TextureHandle,
    pub opacity: Option<TextureHandle>,
    pub normal: Option<TextureHandle>,
    pub height_map: TextureHandle,
    pub count: u32,
    pub spawn_radius: f32,
    /// World heights that map values 0 and 1 land on
    pub world_y_bounds: [f32; 2],
    pub cast_shadows: bool,
    pub wind_strength: f32,
}

/// Maps a field needs beyond its mesh
#[derive(Debug, Clone, Copy)]
pub struct FieldMaps {
    pub albedo: TextureHandle,
    pub opacity: Option<TextureHandle>,
    pub normal: Option<TextureHandle>,
    pub height_map: TextureHandle,
}

impl InstancedField {
    pub fn new(
        name: impl Into<String>,
        mesh: MeshHandle,
        maps: FieldMaps,
        count: u32,
        spawn_radius: f32,
        world_y_bounds: [f32; 2],
    ) -> umbra_core::Result<Self> {
        let name = name.into();
        if !(spawn_radius.is_finite() && spawn_radius > 0.0) {
            return Err(UmbraError::InvalidArgument(format!(
                "field '{}': spawn radius must be positive, got {}",
                name, spawn_radius
            )));
        }
        if world_y_bounds[0] > world_y_bounds[1] {
            return Err(UmbraError::InvalidArgument(format!(
                "field '{}': world y bounds {:?} are reversed",
                name, world_y_bounds
            )));
        }
        Ok(Self {
            name,
            mesh,
            albedo: maps.albedo,
            opacity: maps.opacity,
            normal: maps.normal,
            height_map: maps.height_map,
            count,
            spawn_radius,
            world_y_bounds,
            cast_shadows: true,
            wind_strength: DEFAULT_WIND_STRENGTH,
        })
    }

    pub fn uniforms(&self, time: f32) -> FieldUniforms {
        FieldUniforms {
            spawn_radius: self.spawn_radius,
            world_y_min: self.world_y_bounds[0],
            world_y_max: self.world_y_bounds[1],
            time,
            instance_count: self.count,
            use_opacity_map: self.opacity.is_some() as u32,
            wind_strength: self.wind_strength,
            _pad: 0.0,
        }
    }

    /// Every texture handle the field refers to
    pub fn textures(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        [Some(self.albedo), self.opacity, self.normal, Some(self.height_map)]
            .into_iter()
            .flatten()
    }
}

/// Integer hash used for instance placement; matches `hash_u32` in WGSL
pub fn hash_u32(x: u32) -> u32 {
    let mut h = x;
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

fn hash01(x: u32) -> f32 {
    (hash_u32(x) >> 8) as f32 / 16_777_215.0
}

/// Ground-plane position of instance `index`, as the vertex shader computes it
pub fn instance_xz(index: u32, spawn_radius: f32) -> [f32; 2] {
    let seed = index.wrapping_mul(4);
    let radius = hash01(seed).sqrt() * spawn_radius;
    let theta = hash01(seed.wrapping_add(1)) * std::f32::consts::TAU;
    [theta.cos() * radius, theta.sin() * radius]
}

/// Lit and depth pipelines for instanced fields, sharing one group-1 layout
pub struct InstancedPipeline {
    /// Group 1: uniforms, sampler, albedo, opacity, normal, height map
    pub field_layout: wgpu::BindGroupLayout,
    pub lit: wgpu::RenderPipeline,
    depth_shadow: wgpu::RenderPipeline,
    depth_camera: wgpu::RenderPipeline,
}

impl InstancedPipeline {
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts) -> Result<Self, RenderError> {
        let lit_shader = create_shader(device, "Instanced Shader", shaders::INSTANCED)?;
        let depth_shader = create_shader(device, "Instanced Depth Shader", shaders::INSTANCED_DEPTH)?;

        let both = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let field_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, both),
                sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
                color_entry(2, wgpu::ShaderStages::FRAGMENT),
                color_entry(3, wgpu::ShaderStages::FRAGMENT),
                color_entry(4, wgpu::ShaderStages::FRAGMENT),
                height_entry(5, wgpu::ShaderStages::VERTEX),
            ],
            label: Some("Instanced Field Bind Group Layout"),
        });

        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Instanced Pipeline Layout"),
            bind_group_layouts: &[&layouts.frame, &field_layout],
            push_constant_ranges: &[],
        });

        let lit = validated(device, "Instanced Pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Instanced Pipeline"),
                layout: Some(&lit_layout),
                vertex: wgpu::VertexState {
                    module: &lit_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &lit_shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                // Blades and leaves are seen from both sides
                primitive: triangles(None),
                depth_stencil: Some(depth_write(
                    wgpu::CompareFunction::Less,
                    wgpu::DepthBiasState::default(),
                )),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let depth_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Instanced Depth Pipeline Layout"),
            bind_group_layouts: &[&layouts.depth, &field_layout],
            push_constant_ranges: &[],
        });

        let build_depth = |label: &str, bias: wgpu::DepthBiasState| {
            validated(device, label, || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&depth_layout),
                    vertex: wgpu::VertexState {
                        module: &depth_shader,
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::desc()],
                        compilation_options: Default::default(),
                    },
                    // Alpha-tested cutouts, so a fragment stage without color targets
                    fragment: Some(wgpu::FragmentState {
                        module: &depth_shader,
                        entry_point: Some("fs_main"),
                        targets: &[],
                        compilation_options: Default::default(),
                    }),
                    primitive: triangles(None),
                    depth_stencil: Some(depth_write(wgpu::CompareFunction::Less, bias)),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
        };

        Ok(Self {
            depth_shadow: build_depth("Instanced Shadow Pipeline", shadow_bias())?,
            depth_camera: build_depth("Instanced Camera Depth Pipeline", wgpu::DepthBiasState::default())?,
            field_layout,
            lit,
        })
    }

    pub fn depth(&self, kind: DepthKind) -> &wgpu::RenderPipeline {
        match kind {
            DepthKind::Shadow => &self.depth_shadow,
            DepthKind::Camera => &self.depth_camera,
        }
    }
}

/// GPU state of one field: its uniform buffer and group-1 bind group
pub struct FieldBinding {
    uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl FieldBinding {
    pub fn new(
        device: &wgpu::Device,
        pipeline: &InstancedPipeline,
        field: &InstancedField,
        resources: &GpuResources,
        defaults: &DefaultTextures,
    ) -> Result<Self, RenderError> {
        let lookup = |handle: TextureHandle| -> Result<&GpuTexture, RenderError> {
            resources.texture(handle).ok_or_else(|| {
                RenderError::Resource(format!("field '{}': {} is not live", field.name, handle))
            })
        };
        let albedo = lookup(field.albedo)?;
        let opacity = match field.opacity {
            Some(handle) => lookup(handle)?,
            None => &defaults.white,
        };
        let normal = match field.normal {
            Some(handle) => lookup(handle)?,
            None => &defaults.flat_normal,
        };
        let heights = lookup(field.height_map)?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Field Uniforms", field.name)),
            contents: bytemuck::cast_slice(&[field.uniforms(0.0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipeline.field_layout,
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
                    resource: wgpu::BindingResource::TextureView(&opacity.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&heights.view),
                },
            ],
            label: Some(&format!("{} Field Bind Group", field.name)),
        });

        Ok(Self {
            uniform_buffer,
            bind_group,
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, field: &InstancedField, time: f32) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[field.uniforms(time)]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{CountingAllocator, GpuAllocator};
    use crate::texture::{ColorSpace, TextureUpload};
    use crate::mesh::MeshData;
    use umbra_import::{ImportedHeights, ImportedTexture};

    fn handles() -> (MeshHandle, FieldMaps) {
        let mut alloc = CountingAllocator::default();
        let mesh = alloc.create_mesh(&MeshData::unit_cube()).unwrap();
        let image = ImportedTexture::solid("grass", 1, 1, [0, 255, 0, 255]);
        let albedo = alloc
            .create_texture(
                "grass",
                TextureUpload::Rgba8 {
                    image: &image,
                    space: ColorSpace::Srgb,
                },
            )
            .unwrap();
        let heights = ImportedHeights {
            name: "h".into(),
            width: 1,
            height: 1,
            values: vec![0.5],
        };
        let height_map = alloc
            .create_texture("h", TextureUpload::Heights(&heights))
            .unwrap();
        (
            mesh,
            FieldMaps {
                albedo,
                opacity: None,
                normal: None,
                height_map,
            },
        )
    }

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<FieldUniforms>(), 32);
    }

    #[test]
    fn test_uniforms_carry_field_parameters() {
        let (mesh, maps) = handles();
        let field = InstancedField::new("grass", mesh, maps, 50_000, 12.0, [-1.0, 3.0]).unwrap();
        let u = field.uniforms(2.5);
        assert_eq!(u.instance_count, 50_000);
        assert_eq!((u.world_y_min, u.world_y_max), (-1.0, 3.0));
        assert_eq!(u.use_opacity_map, 0);
        assert_eq!(u.time, 2.5);
        assert_eq!(field.textures().count(), 2);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let (mesh, maps) = handles();
        assert!(InstancedField::new("a", mesh, maps, 10, 0.0, [0.0, 1.0]).is_err());
        assert!(InstancedField::new("b", mesh, maps, 10, f32::NAN, [0.0, 1.0]).is_err());
        assert!(InstancedField::new("c", mesh, maps, 10, 5.0, [2.0, 1.0]).is_err());
    }

    #[test]
    fn test_instances_stay_inside_the_spawn_disc() {
        let radius = 7.5;
        for index in 0..5_000 {
            let [x, z] = instance_xz(index, radius);
            assert!((x * x + z * z).sqrt() <= radius + 1e-4, "instance {}", index);
        }
    }

    #[test]
    fn test_placement_is_deterministic_and_spread() {
        assert_eq!(instance_xz(42, 10.0), instance_xz(42, 10.0));
        // Every quadrant of the disc gets instances
        let mut quadrants = [0usize; 4];
        for index in 0..1_000 {
            let [x, z] = instance_xz(index, 10.0);
            quadrants[(x >= 0.0) as usize * 2 + (z >= 0.0) as usize] += 1;
        }
        assert!(quadrants.iter().all(|&n| n > 150), "{:?}", quadrants);
    }

    #[test]
    fn test_hash_matches_reference_values() {
        assert_eq!(hash_u32(0), 0);
        assert_ne!(hash_u32(1), hash_u32(2));
    }
}
