//! CPU-side mesh data, procedural primitives and the GPU vertex layout

use bytemuck::{Pod, Zeroable};
use umbra_core::{Result, UmbraError, Vec3};
use umbra_import::{ImportedMesh, MeshBounds};

/// Interleaved vertex consumed by every mesh pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Indexed triangle geometry with per-vertex attributes.
///
/// Attribute arrays always have one entry per position and `bounds` always
/// reflects the current positions; every mutator keeps both in step.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<[f32; 2]>,
    tangents: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Option<MeshBounds>,
}

impl MeshData {
    /// Build a mesh. Empty `normals` are computed from faces and empty
    /// `uvs` default to zero.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<u32>,
    ) -> Result<Self> {
        let name = name.into();
        let count = positions.len();

        if indices.len() % 3 != 0 {
            return Err(UmbraError::InvalidArgument(format!(
                "mesh '{}': index count {} is not a multiple of 3",
                name,
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= count) {
            return Err(UmbraError::InvalidArgument(format!(
                "mesh '{}': index {} out of range (have {} vertices)",
                name, bad, count
            )));
        }
        if !normals.is_empty() && normals.len() != count {
            return Err(UmbraError::InvalidArgument(format!(
                "mesh '{}': {} normals for {} vertices",
                name,
                normals.len(),
                count
            )));
        }
        if !uvs.is_empty() && uvs.len() != count {
            return Err(UmbraError::InvalidArgument(format!(
                "mesh '{}': {} texcoords for {} vertices",
                name,
                uvs.len(),
                count
            )));
        }

        let compute_normals = normals.is_empty();
        let mut mesh = Self {
            name,
            bounds: MeshBounds::from_positions(&positions),
            normals: if compute_normals { vec![Vec3::Y; count] } else { normals },
            uvs: if uvs.is_empty() { vec![[0.0, 0.0]; count] } else { uvs },
            tangents: vec![Vec3::X; count],
            positions,
            indices,
        };

        if compute_normals {
            mesh.recalculate_normals();
        } else {
            mesh.sanitize_normals();
        }
        mesh.recalculate_tangents();
        Ok(mesh)
    }

    pub fn from_imported(imported: ImportedMesh) -> Result<Self> {
        Self::new(
            imported.name,
            imported.positions,
            imported.normals,
            imported.uvs,
            imported.indices,
        )
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    pub fn tangents(&self) -> &[Vec3] {
        &self.tangents
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// `None` for a mesh without vertices
    pub fn bounds(&self) -> Option<MeshBounds> {
        self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Replace vertex positions (e.g. after displacing by a height field).
    /// The vertex count must not change.
    pub fn set_positions(&mut self, positions: Vec<Vec3>) -> Result<()> {
        if positions.len() != self.positions.len() {
            return Err(UmbraError::InvalidArgument(format!(
                "mesh '{}': set_positions expects {} positions, got {}",
                self.name,
                self.positions.len(),
                positions.len()
            )));
        }
        self.positions = positions;
        self.bounds = MeshBounds::from_positions(&self.positions);
        Ok(())
    }

    /// Translate all vertices so the bounds are centered on the origin
    pub fn center_pivot(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let offset = bounds.center();
        for p in &mut self.positions {
            *p -= offset;
        }
        self.bounds = MeshBounds::from_positions(&self.positions);
    }

    /// Recompute smooth, area-weighted vertex normals from the faces.
    ///
    /// Vertices whose accumulated normal has zero length (degenerate or
    /// unreferenced) get +Y. Returns how many vertices needed the fallback.
    pub fn recalculate_normals(&mut self) -> usize {
        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let face = (self.positions[b] - self.positions[a])
                .cross(&(self.positions[c] - self.positions[a]));
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }

        let mut degenerate = 0;
        self.normals = accumulated
            .into_iter()
            .map(|n| match n.try_normalized() {
                Some(n) if n.is_finite() => n,
                _ => {
                    degenerate += 1;
                    Vec3::Y
                }
            })
            .collect();

        if degenerate > 0 {
            log::debug!(
                "mesh '{}': {} vertices had no usable face normal, using +Y",
                self.name,
                degenerate
            );
        }
        self.recalculate_tangents();
        degenerate
    }

    /// Normalize supplied normals, replacing zero-length ones with +Y
    fn sanitize_normals(&mut self) {
        for n in &mut self.normals {
            *n = n.try_normalized().filter(Vec3::is_finite).unwrap_or(Vec3::Y);
        }
    }

    /// Per-vertex tangents from UV gradients, orthogonalized against the normal
    pub fn recalculate_tangents(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let e1 = self.positions[b] - self.positions[a];
            let e2 = self.positions[c] - self.positions[a];
            let du1 = self.uvs[b][0] - self.uvs[a][0];
            let dv1 = self.uvs[b][1] - self.uvs[a][1];
            let du2 = self.uvs[c][0] - self.uvs[a][0];
            let dv2 = self.uvs[c][1] - self.uvs[a][1];

            let det = du1 * dv2 - du2 * dv1;
            if det.abs() < 1e-12 {
                continue;
            }
            let tangent = (e1 * dv2 - e2 * dv1) / det;
            accumulated[a] += tangent;
            accumulated[b] += tangent;
            accumulated[c] += tangent;
        }

        self.tangents = accumulated
            .into_iter()
            .zip(&self.normals)
            .map(|(t, n)| {
                (t - *n * n.dot(&t))
                    .try_normalized()
                    .unwrap_or_else(|| any_perpendicular(*n))
            })
            .collect();
    }

    /// Interleave attributes for upload
    pub fn to_vertices(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex {
                position: self.positions[i].to_array(),
                normal: self.normals[i].to_array(),
                uv: self.uvs[i],
                tangent: self.tangents[i].to_array(),
            })
            .collect()
    }

    /// Unit cube centered on the origin with one flat-shaded quad per face,
    /// faces ordered +X, -X, +Y, -Y, +Z, -Z
    pub fn unit_cube() -> Self {
        // (normal, u axis, v axis) with u x v = normal so corners wind CCW
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut tangents = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (n, u, v)) in FACES.iter().enumerate() {
            let (n, u, v) = (Vec3::from(*n), Vec3::from(*u), Vec3::from(*v));
            for (s, t) in CORNERS {
                positions.push((n + u * s + v * t) * 0.5);
                normals.push(n);
                uvs.push([(s + 1.0) * 0.5, 1.0 - (t + 1.0) * 0.5]);
                tangents.push(u);
            }
            let base = face as u32 * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            name: "cube".into(),
            bounds: MeshBounds::from_positions(&positions),
            positions,
            normals,
            uvs,
            tangents,
            indices,
        }
    }

    /// Unit square in the XZ plane facing +Y, split into `divisions²` cells.
    /// Texture coordinates span `[0, 1]` across the square.
    pub fn subdivided_quad(divisions: u32) -> Self {
        let n = divisions.max(1);
        let row = n + 1;
        let step = 1.0 / n as f32;

        let mut positions = Vec::with_capacity((row * row) as usize);
        let mut uvs = Vec::with_capacity((row * row) as usize);
        for j in 0..row {
            for i in 0..row {
                let (u, v) = (i as f32 * step, j as f32 * step);
                positions.push(Vec3::new(u - 0.5, 0.0, v - 0.5));
                uvs.push([u, v]);
            }
        }

        let mut indices = Vec::with_capacity((n * n * 6) as usize);
        for j in 0..n {
            for i in 0..n {
                let i00 = j * row + i;
                let i10 = i00 + 1;
                let i01 = i00 + row;
                let i11 = i01 + 1;
                indices.extend_from_slice(&[i00, i01, i11, i00, i11, i10]);
            }
        }

        let count = positions.len();
        Self {
            name: format!("quad_{}", n),
            bounds: MeshBounds::from_positions(&positions),
            normals: vec![Vec3::Y; count],
            tangents: vec![Vec3::X; count],
            positions,
            uvs,
            indices,
        }
    }
}

fn any_perpendicular(n: Vec3) -> Vec3 {
    let axis = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    (axis - n * n.dot(&axis)).try_normalized().unwrap_or(Vec3::X)
}
