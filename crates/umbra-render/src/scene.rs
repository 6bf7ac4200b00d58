//! Renderable scene built from a scene document
//!
//! A [`Scene`] owns every mesh and texture handle it allocated while
//! loading. Nothing else releases them: [`Scene::destroy`] hands each one
//! back to the allocator exactly once. A load that fails part way releases
//! what it already created before returning the error.

use crate::context::RenderError;
use crate::instanced::{FieldMaps, InstancedField};
use crate::material::Material;
use crate::mesh::MeshData;
use crate::resources::{GpuAllocator, MeshHandle, TextureHandle};
use crate::texture::{ColorSpace, TextureUpload};
use crate::water::Water;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use umbra_core::{Transform, Vec3};
use umbra_import::{ImportedCubeMap, ImportedHeights, ImportedMesh, ImportedTexture};
use umbra_scene::{
    Behavior, BehaviorContext, InstancedFieldDef, MeshDef, Primitive, SceneFile, SetupStep,
};

/// Where a scene's geometry and images come from
pub trait AssetSource {
    fn mesh(&mut self, path: &str) -> umbra_core::Result<ImportedMesh>;
    fn texture(&mut self, path: &str) -> umbra_core::Result<ImportedTexture>;
    fn heights(&mut self, path: &str) -> umbra_core::Result<ImportedHeights>;
    fn cube_map(&mut self, faces: &[String]) -> umbra_core::Result<ImportedCubeMap>;
}

/// Reads assets from disk, relative to the scene file's directory
#[derive(Debug, Clone)]
pub struct FileAssets {
    base_dir: PathBuf,
}

impl FileAssets {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Assets next to `scene_path`
    pub fn for_scene(scene_path: &Path) -> Self {
        Self::new(scene_path.parent().unwrap_or_else(|| Path::new(".")))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl AssetSource for FileAssets {
    fn mesh(&mut self, path: &str) -> umbra_core::Result<ImportedMesh> {
        umbra_import::import_obj(self.resolve(path))
    }

    fn texture(&mut self, path: &str) -> umbra_core::Result<ImportedTexture> {
        umbra_import::import_texture(self.resolve(path))
    }

    fn heights(&mut self, path: &str) -> umbra_core::Result<ImportedHeights> {
        umbra_import::import_heights(self.resolve(path))
    }

    fn cube_map(&mut self, faces: &[String]) -> umbra_core::Result<ImportedCubeMap> {
        let paths: Vec<PathBuf> = faces.iter().map(|f| self.resolve(f)).collect();
        umbra_import::import_cube_map(&paths)
    }
}

/// A placed mesh with its material and per-frame behaviors
#[derive(Debug, Clone)]
pub struct Renderable {
    pub name: String,
    pub transform: Transform,
    /// Transform as loaded; behaviors that oscillate work relative to it
    pub rest: Transform,
    pub mesh: MeshHandle,
    /// Index into [`Scene::materials`]
    pub material: usize,
    pub behaviors: Vec<Behavior>,
    pub cast_shadows: bool,
}

/// Color and height textures are cached separately; one image path may be both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextureRole {
    Color(ColorSpace),
    Heights,
}

pub struct Scene {
    pub name: String,
    pub renderables: Vec<Renderable>,
    pub materials: Vec<Material>,
    pub fields: Vec<InstancedField>,
    pub water: Option<Water>,
    pub skybox: Option<TextureHandle>,
    /// CPU copies of every height map, by path, for snapshots
    pub height_fields: BTreeMap<String, ImportedHeights>,
    meshes: Vec<MeshHandle>,
    textures: Vec<TextureHandle>,
    texture_cache: HashMap<(String, TextureRole), TextureHandle>,
}

impl Scene {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            renderables: Vec::new(),
            materials: Vec::new(),
            fields: Vec::new(),
            water: None,
            skybox: None,
            height_fields: BTreeMap::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            texture_cache: HashMap::new(),
        }
    }

    /// Build every renderable of `file`, allocating through `alloc`
    pub fn load(
        file: &SceneFile,
        assets: &mut dyn AssetSource,
        alloc: &mut dyn GpuAllocator,
    ) -> Result<Self, RenderError> {
        let mut scene = Self::empty(&file.scene.name);
        match scene.populate(file, assets, alloc) {
            Ok(()) => {
                log::info!(
                    "Scene '{}': {} entities, {} materials, {} fields, {} GPU handles",
                    scene.name,
                    scene.renderables.len(),
                    scene.materials.len(),
                    scene.fields.len(),
                    scene.handle_count()
                );
                Ok(scene)
            }
            Err(e) => {
                if let Err(release) = scene.destroy(alloc) {
                    log::warn!("Cleanup after failed scene load: {}", release);
                }
                Err(e)
            }
        }
    }

    fn populate(
        &mut self,
        file: &SceneFile,
        assets: &mut dyn AssetSource,
        alloc: &mut dyn GpuAllocator,
    ) -> Result<(), RenderError> {
        let mut material_index = HashMap::new();
        for (name, def) in &file.materials {
            let mut material = Material::from_def(name, def);
            for (slot, path) in &def.textures {
                let handle = self.color_texture(path, ColorSpace::for_slot(slot), assets, alloc)?;
                material.textures.insert(slot.clone(), handle);
            }
            material_index.insert(name.as_str(), self.materials.len());
            self.materials.push(material);
        }

        for (name, def) in &file.meshes {
            let material = *material_index.get(def.material.as_str()).ok_or_else(|| {
                umbra_core::UmbraError::SceneError(format!(
                    "mesh '{}' references unknown material '{}'",
                    name, def.material
                ))
            })?;
            let data = build_mesh(name, def, assets)?;
            let mesh = self.own_mesh(&data, alloc)?;
            self.renderables.push(renderable(name, def, mesh, material));
        }

        for def in &file.fields {
            let field = self.load_field(def, assets, alloc)?;
            self.fields.push(field);
        }

        if let Some(def) = &file.water {
            let mesh = self.own_mesh(&MeshData::subdivided_quad(def.divisions), alloc)?;
            let albedo = self.color_texture(&def.albedo, ColorSpace::Srgb, assets, alloc)?;
            let height_map = self.height_texture(&def.height_map, assets, alloc)?;
            self.water = Some(Water::from_def(def, mesh, albedo, height_map));
        }

        if let Some(def) = &file.skybox {
            let cube = assets.cube_map(&def.faces)?;
            let handle = alloc.create_texture("Skybox", TextureUpload::CubeMap(&cube))?;
            self.textures.push(handle);
            self.skybox = Some(handle);
        }

        Ok(())
    }

    fn load_field(
        &mut self,
        def: &InstancedFieldDef,
        assets: &mut dyn AssetSource,
        alloc: &mut dyn GpuAllocator,
    ) -> Result<InstancedField, RenderError> {
        let data = MeshData::from_imported(assets.mesh(&def.mesh)?)?;
        let mesh = self.own_mesh(&data, alloc)?;
        let maps = FieldMaps {
            albedo: self.color_texture(&def.albedo, ColorSpace::Srgb, assets, alloc)?,
            opacity: def
                .opacity
                .as_deref()
                .map(|path| self.color_texture(path, ColorSpace::Linear, assets, alloc))
                .transpose()?,
            normal: def
                .normal
                .as_deref()
                .map(|path| self.color_texture(path, ColorSpace::Linear, assets, alloc))
                .transpose()?,
            height_map: self.height_texture(&def.height_map, assets, alloc)?,
        };
        let mut field = InstancedField::new(
            &def.name,
            mesh,
            maps,
            def.count,
            def.spawn_radius,
            def.world_y_bounds,
        )?;
        field.cast_shadows = def.cast_shadows;
        Ok(field)
    }

    fn own_mesh(&mut self, data: &MeshData, alloc: &mut dyn GpuAllocator) -> Result<MeshHandle, RenderError> {
        let handle = alloc.create_mesh(data)?;
        self.meshes.push(handle);
        Ok(handle)
    }

    fn color_texture(
        &mut self,
        path: &str,
        space: ColorSpace,
        assets: &mut dyn AssetSource,
        alloc: &mut dyn GpuAllocator,
    ) -> Result<TextureHandle, RenderError> {
        let key = (path.to_string(), TextureRole::Color(space));
        if let Some(handle) = self.texture_cache.get(&key) {
            return Ok(*handle);
        }
        let image = assets.texture(path)?;
        let handle = alloc.create_texture(path, TextureUpload::Rgba8 { image: &image, space })?;
        self.textures.push(handle);
        self.texture_cache.insert(key, handle);
        Ok(handle)
    }

    fn height_texture(
        &mut self,
        path: &str,
        assets: &mut dyn AssetSource,
        alloc: &mut dyn GpuAllocator,
    ) -> Result<TextureHandle, RenderError> {
        let key = (path.to_string(), TextureRole::Heights);
        if let Some(handle) = self.texture_cache.get(&key) {
            return Ok(*handle);
        }
        let heights = assets.heights(path)?;
        let handle = alloc.create_texture(path, TextureUpload::Heights(&heights))?;
        self.textures.push(handle);
        self.texture_cache.insert(key, handle);
        self.height_fields.insert(path.to_string(), heights);
        Ok(handle)
    }

    /// Mesh and texture handles this scene owns
    pub fn handle_count(&self) -> usize {
        self.meshes.len() + self.textures.len()
    }

    pub fn material(&self, renderable: &Renderable) -> &Material {
        &self.materials[renderable.material]
    }

    /// Run every entity's behaviors for one frame
    pub fn update(&mut self, dt: f32, time: f32, camera_position: Vec3) {
        for entity in &mut self.renderables {
            let ctx = BehaviorContext {
                dt,
                time,
                camera_position,
                rest: entity.rest,
            };
            for behavior in &entity.behaviors {
                behavior.apply(&mut entity.transform, &ctx);
            }
        }
    }

    /// Release every handle this scene allocated. Returns how many were
    /// released; the first failure is reported after all were attempted.
    pub fn destroy(self, alloc: &mut dyn GpuAllocator) -> Result<usize, RenderError> {
        let mut released = 0;
        let mut first_error = None;
        for handle in &self.meshes {
            match alloc.release_mesh(*handle) {
                Ok(()) => released += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        for handle in &self.textures {
            match alloc.release_texture(*handle) {
                Ok(()) => released += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        log::debug!("Scene '{}' released {} GPU handles", self.name, released);
        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }
}

fn build_mesh(name: &str, def: &MeshDef, assets: &mut dyn AssetSource) -> Result<MeshData, RenderError> {
    let mut data = match (&def.path, def.primitive) {
        (Some(path), _) => MeshData::from_imported(assets.mesh(path)?)?,
        (None, Some(Primitive::Cube)) => MeshData::unit_cube(),
        (None, Some(Primitive::Quad)) => MeshData::subdivided_quad(def.divisions),
        (None, None) => {
            return Err(umbra_core::UmbraError::SceneError(format!(
                "mesh '{}' needs a 'path' or a 'primitive'",
                name
            ))
            .into())
        }
    };

    let mut steps = def.setup.clone();
    if def.recalculate_normals && !steps.contains(&SetupStep::RecalculateNormals) {
        steps.insert(0, SetupStep::RecalculateNormals);
    }
    for step in steps {
        match step {
            SetupStep::RecalculateNormals => {
                let degenerate = data.recalculate_normals();
                if degenerate > 0 {
                    log::warn!(
                        "mesh '{}': {} vertices had no usable face normal, using +Y",
                        name,
                        degenerate
                    );
                }
                data.recalculate_tangents();
            }
            SetupStep::CenterPivot => data.center_pivot(),
        }
    }
    Ok(data)
}

fn renderable(name: &str, def: &MeshDef, mesh: MeshHandle, material: usize) -> Renderable {
    let transform = Transform::from_euler(def.position, def.rotation, def.scale);
    let mut behaviors = def.behaviors.clone();
    if def.icon && !behaviors.contains(&Behavior::FaceCamera) {
        behaviors.push(Behavior::FaceCamera);
    }
    Renderable {
        name: name.to_string(),
        transform,
        rest: transform,
        mesh,
        material,
        behaviors,
        cast_shadows: def.cast_shadows,
    }
}
