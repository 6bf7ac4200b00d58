//! Umbra Scene - TOML scene documents
//!
//! This crate defines the scene description format (materials, meshes,
//! instanced fields, water, skybox, light, camera and render overrides),
//! loads and validates it, and provides the typed per-frame behaviors that
//! replace name-keyed update scripts.

mod behavior;
mod format;
mod loader;

pub use behavior::{Behavior, BehaviorContext, SetupStep};
pub use format::{
    CameraDef, FaceCulling, InstancedFieldDef, LightDef, MaterialDef, MeshDef, Primitive,
    RenderSettings, SceneFile, SceneMetadata, SkyboxDef, WaterDef,
};
pub use loader::{load_scene, load_scene_string};
