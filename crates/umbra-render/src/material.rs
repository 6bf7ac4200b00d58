//! Materials and the per-object uniform block

use crate::resources::TextureHandle;
use bytemuck::{Pod, Zeroable};
use std::collections::BTreeMap;
use umbra_core::matrix::{mat4_inverse, mat4_transpose, Mat4, IDENTITY};
use umbra_scene::{FaceCulling, MaterialDef};

/// Surface parameters plus named texture slots
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Slot name (as the shader declares it) to texture
    pub textures: BTreeMap<String, TextureHandle>,
    pub tiling: [f32; 2],
    /// UV scroll per second
    pub tiling_speed: [f32; 2],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    /// Specular exponent
    pub shininess: f32,
    pub metallic: f32,
    pub cull: FaceCulling,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            textures: BTreeMap::new(),
            tiling: [1.0, 1.0],
            tiling_speed: [0.0, 0.0],
            ambient: 0.2,
            diffuse: 0.8,
            specular: 1.0,
            shininess: 32.0,
            metallic: 0.0,
            cull: FaceCulling::CullBack,
        }
    }
}

impl Material {
    /// Scalar parameters from a document; textures are attached by the loader
    pub fn from_def(name: &str, def: &MaterialDef) -> Self {
        Self {
            name: name.to_string(),
            textures: BTreeMap::new(),
            tiling: def.tiling,
            tiling_speed: def.tiling_speed,
            ambient: def.ambient,
            diffuse: def.diffuse,
            specular: def.specular,
            shininess: def.shininess,
            metallic: def.metallic,
            cull: def.cull,
        }
    }

    pub fn texture_slot_count(&self) -> usize {
        self.textures.len()
    }

    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        cull_mode(self.cull)
    }
}

pub fn cull_mode(cull: FaceCulling) -> Option<wgpu::Face> {
    match cull {
        FaceCulling::CullBack => Some(wgpu::Face::Back),
        FaceCulling::CullFront => Some(wgpu::Face::Front),
        FaceCulling::DoubleSided => None,
    }
}

/// Per-draw uniforms: `model`, its normal matrix and the material scalars.
/// Mirrors `ObjectUniforms` in the mesh shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    /// Inverse-transpose of `model`
    pub normal_matrix: Mat4,
    pub tiling: [f32; 2],
    pub tiling_speed: [f32; 2],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
    pub metallic: f32,
    pub _padding: [f32; 3],
}

impl ObjectUniforms {
    pub fn new(model: Mat4, material: &Material) -> Self {
        let normal_matrix = mat4_inverse(&model)
            .map(|inv| mat4_transpose(&inv))
            .unwrap_or(IDENTITY);
        Self {
            model,
            normal_matrix,
            tiling: material.tiling,
            tiling_speed: material.tiling_speed,
            ambient: material.ambient,
            diffuse: material.diffuse,
            specular: material.specular,
            shininess: material.shininess,
            metallic: material.metallic,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::{matrix::mat4_transform_direction, Transform, Vec3};

    #[test]
    fn test_defaults() {
        let m = Material::default();
        assert_eq!((m.ambient, m.diffuse, m.specular, m.shininess), (0.2, 0.8, 1.0, 32.0));
        assert_eq!(m.cull_mode(), Some(wgpu::Face::Back));
    }

    #[test]
    fn test_from_def_copies_scalars() {
        let def = MaterialDef {
            tiling: [4.0, 2.0],
            cull: FaceCulling::DoubleSided,
            ..Default::default()
        };
        let m = Material::from_def("ground", &def);
        assert_eq!(m.name, "ground");
        assert_eq!(m.tiling, [4.0, 2.0]);
        assert_eq!(m.cull_mode(), None);
    }

    #[test]
    fn test_uniform_block_matches_wgsl_size() {
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 176);
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let t = Transform::from_euler(Vec3::ZERO, Vec3::new(0.0, 30.0, 0.0), Vec3::new(4.0, 1.0, 1.0));
        let u = ObjectUniforms::new(t.trs_matrix(), &Material::default());
        // Surface of a slanted plane: tangent (1, 1, 0), normal (1, -1, 0)
        let tangent = mat4_transform_direction(&u.model, Vec3::new(1.0, 1.0, 0.0));
        let normal = mat4_transform_direction(&u.normal_matrix, Vec3::new(1.0, -1.0, 0.0));
        assert!(tangent.dot(&normal).abs() < 1e-4);
    }
}
