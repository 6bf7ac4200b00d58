//! GPU resource ownership
//!
//! Meshes and textures are referred to by typed handles. Whoever creates a
//! handle through a [`GpuAllocator`] owns it and must release it exactly
//! once; releasing an unknown or already released handle is an error rather
//! than a silent no-op, so leaks and double frees show up in tests.

use crate::context::RenderError;
use crate::mesh::MeshData;
use crate::texture::{create_texture, GpuTexture, TextureUpload};
use std::collections::HashMap;
use std::fmt;
use umbra_import::MeshBounds;
use wgpu::util::DeviceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl fmt::Display for MeshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// Creates and releases GPU objects on behalf of an owner
pub trait GpuAllocator {
    fn create_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError>;

    fn create_texture(
        &mut self,
        label: &str,
        upload: TextureUpload<'_>,
    ) -> Result<TextureHandle, RenderError>;

    fn release_mesh(&mut self, handle: MeshHandle) -> Result<(), RenderError>;

    fn release_texture(&mut self, handle: TextureHandle) -> Result<(), RenderError>;
}

/// Vertex and index buffers of an uploaded mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub bounds: Option<MeshBounds>,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertices = mesh.to_vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices().len() as u32,
            bounds: mesh.bounds(),
        }
    }

    /// Bind the buffers and draw `instances` copies
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

/// Every live mesh and texture, keyed by handle
#[derive(Default)]
pub struct GpuResources {
    meshes: HashMap<MeshHandle, GpuMesh>,
    textures: HashMap<TextureHandle, GpuTexture>,
    next_id: u32,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the store together with a device and queue for uploads
    pub fn uploader<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
    ) -> GpuUploader<'a> {
        GpuUploader {
            device,
            queue,
            resources: self,
        }
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(&handle)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> Result<(), RenderError> {
        let mesh = self
            .meshes
            .remove(&handle)
            .ok_or_else(|| RenderError::Resource(format!("{} is not live", handle)))?;
        mesh.vertex_buffer.destroy();
        mesh.index_buffer.destroy();
        Ok(())
    }

    fn release_texture(&mut self, handle: TextureHandle) -> Result<(), RenderError> {
        let texture = self
            .textures
            .remove(&handle)
            .ok_or_else(|| RenderError::Resource(format!("{} is not live", handle)))?;
        texture.texture.destroy();
        Ok(())
    }
}

/// [`GpuAllocator`] backed by a wgpu device
pub struct GpuUploader<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    resources: &'a mut GpuResources,
}

impl GpuAllocator for GpuUploader<'_> {
    fn create_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        if mesh.indices().is_empty() {
            return Err(RenderError::Resource(format!(
                "mesh '{}' has no triangles",
                mesh.name
            )));
        }
        let gpu = GpuMesh::upload(self.device, mesh);
        let handle = MeshHandle(self.resources.next_id());
        self.resources.meshes.insert(handle, gpu);
        log::debug!(
            "Uploaded mesh '{}' as {} ({} triangles)",
            mesh.name,
            handle,
            mesh.triangle_count()
        );
        Ok(handle)
    }

    fn create_texture(
        &mut self,
        label: &str,
        upload: TextureUpload<'_>,
    ) -> Result<TextureHandle, RenderError> {
        let gpu = create_texture(self.device, self.queue, label, upload)?;
        let handle = TextureHandle(self.resources.next_id());
        self.resources.textures.insert(handle, gpu);
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> Result<(), RenderError> {
        self.resources.release_mesh(handle)
    }

    fn release_texture(&mut self, handle: TextureHandle) -> Result<(), RenderError> {
        self.resources.release_texture(handle)
    }
}

/// In-memory allocator that tracks handles without a GPU
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingAllocator {
    next_id: u32,
    pub live_meshes: std::collections::HashSet<MeshHandle>,
    pub live_textures: std::collections::HashSet<TextureHandle>,
    pub created: usize,
    pub released: usize,
}

#[cfg(test)]
impl GpuAllocator for CountingAllocator {
    fn create_mesh(&mut self, _mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        self.next_id += 1;
        self.created += 1;
        let handle = MeshHandle(self.next_id);
        self.live_meshes.insert(handle);
        Ok(handle)
    }

    fn create_texture(
        &mut self,
        label: &str,
        upload: TextureUpload<'_>,
    ) -> Result<TextureHandle, RenderError> {
        upload.validate(label)?;
        self.next_id += 1;
        self.created += 1;
        let handle = TextureHandle(self.next_id);
        self.live_textures.insert(handle);
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> Result<(), RenderError> {
        if !self.live_meshes.remove(&handle) {
            return Err(RenderError::Resource(format!("{} is not live", handle)));
        }
        self.released += 1;
        Ok(())
    }

    fn release_texture(&mut self, handle: TextureHandle) -> Result<(), RenderError> {
        if !self.live_textures.remove(&handle) {
            return Err(RenderError::Resource(format!("{} is not live", handle)));
        }
        self.released += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::ColorSpace;
    use umbra_import::ImportedTexture;

    #[test]
    fn test_double_release_is_an_error() {
        let mut alloc = CountingAllocator::default();
        let mesh = alloc.create_mesh(&MeshData::unit_cube()).unwrap();
        alloc.release_mesh(mesh).unwrap();
        let err = alloc.release_mesh(mesh).unwrap_err();
        assert!(matches!(err, RenderError::Resource(_)));
        assert_eq!(alloc.released, 1);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut alloc = CountingAllocator::default();
        let image = ImportedTexture::solid("t", 1, 1, [0, 0, 0, 255]);
        let a = alloc
            .create_texture(
                "a",
                TextureUpload::Rgba8 {
                    image: &image,
                    space: ColorSpace::Srgb,
                },
            )
            .unwrap();
        let b = alloc
            .create_texture(
                "b",
                TextureUpload::Rgba8 {
                    image: &image,
                    space: ColorSpace::Srgb,
                },
            )
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(alloc.live_textures.len(), 2);
        assert_eq!(a.to_string(), "texture#1");
    }

    #[test]
    fn test_empty_store_has_nothing_live() {
        let mut store = GpuResources::new();
        assert_eq!(store.live_meshes(), 0);
        assert!(store.mesh(MeshHandle(1)).is_none());
        assert!(store.release_texture(TextureHandle(3)).is_err());
    }
}
