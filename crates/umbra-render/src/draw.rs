//! Per-frame draw lists handed to the passes

use crate::resources::GpuMesh;
use umbra_scene::FaceCulling;

/// One mesh entity, with its bind groups already built
pub struct MeshDraw<'a> {
    pub mesh: &'a GpuMesh,
    pub object: &'a wgpu::BindGroup,
    pub material: &'a wgpu::BindGroup,
    pub cull: FaceCulling,
    pub cast_shadows: bool,
}

/// One instanced field: a single mesh drawn `count` times
pub struct FieldDraw<'a> {
    pub mesh: &'a GpuMesh,
    pub bind_group: &'a wgpu::BindGroup,
    pub count: u32,
    pub cast_shadows: bool,
}

/// What a depth pass draws
#[derive(Default)]
pub struct DepthDraws<'a> {
    pub meshes: Vec<&'a MeshDraw<'a>>,
    pub fields: Vec<&'a FieldDraw<'a>>,
}

impl<'a> DepthDraws<'a> {
    /// Casters only, or nothing when shadows are off
    pub fn casters(meshes: &'a [MeshDraw<'a>], fields: &'a [FieldDraw<'a>], enabled: bool) -> Self {
        if !enabled {
            return Self::default();
        }
        Self {
            meshes: meshes.iter().filter(|m| m.cast_shadows).collect(),
            fields: fields.iter().filter(|f| f.cast_shadows).collect(),
        }
    }

    /// Every opaque draw
    pub fn all(meshes: &'a [MeshDraw<'a>], fields: &'a [FieldDraw<'a>]) -> Self {
        Self {
            meshes: meshes.iter().collect(),
            fields: fields.iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.fields.is_empty()
    }
}
