//! Scene file format definitions

use crate::behavior::{Behavior, SetupStep};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use umbra_core::Vec3;

/// Root structure of a scene TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFile {
    pub scene: SceneMetadata,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub camera: CameraDef,
    #[serde(default)]
    pub light: LightDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skybox: Option<SkyboxDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<WaterDef>,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDef>,
    #[serde(default)]
    pub meshes: BTreeMap<String, MeshDef>,
    #[serde(default)]
    pub fields: Vec<InstancedFieldDef>,
}

/// Scene metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Optional overrides for renderer settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderSettings {
    pub shadow_resolution: Option<u32>,
    pub clear_color: Option<[f32; 3]>,
    pub shadows: Option<bool>,
    pub camera_depth: Option<bool>,
    pub instanced_fields: Option<bool>,
    pub water: Option<bool>,
    pub skybox: Option<bool>,
    pub post_process: Option<bool>,
}

fn default_fov() -> f32 {
    80.0
}
fn default_near() -> f32 {
    0.1
}
fn default_camera_far() -> f32 {
    100.0
}
fn default_camera_position() -> Vec3 {
    Vec3::new(0.0, 2.0, 2.0)
}
fn default_move_speed() -> f32 {
    1.0
}
fn default_look_sensitivity() -> f32 {
    50.0
}

/// Free-look camera start state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDef {
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_camera_far")]
    pub far: f32,
    #[serde(default = "default_camera_position")]
    pub position: Vec3,
    /// Degrees
    #[serde(default)]
    pub pitch: f32,
    /// Degrees
    #[serde(default)]
    pub yaw: f32,
    /// World units per second
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Degrees per pixel-second of mouse motion
    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f32,
}

impl Default for CameraDef {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_camera_far(),
            position: default_camera_position(),
            pitch: 0.0,
            yaw: 0.0,
            move_speed: default_move_speed(),
            look_sensitivity: default_look_sensitivity(),
        }
    }
}

fn default_light_position() -> Vec3 {
    Vec3::new(5.0, 10.0, 0.0)
}
fn default_light_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
fn default_one() -> f32 {
    1.0
}
fn default_light_size() -> f32 {
    15.0
}
fn default_light_far() -> f32 {
    30.0
}

/// The single directional light
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightDef {
    #[serde(default = "default_light_position")]
    pub position: Vec3,
    #[serde(default = "default_light_color")]
    pub color: [f32; 3],
    #[serde(default = "default_one")]
    pub intensity: f32,
    /// Half-extent of the orthographic shadow frustum
    #[serde(default = "default_light_size")]
    pub size: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_light_far")]
    pub far: f32,
    /// Day/night orbit radius in the XZ plane; defaults to the distance of
    /// `position` from the Y axis
    #[serde(default)]
    pub orbit_radius: Option<f32>,
    /// Radians per second the day/night cycle advances on its own
    #[serde(default)]
    pub cycle_speed: f32,
}

impl Default for LightDef {
    fn default() -> Self {
        Self {
            position: default_light_position(),
            color: default_light_color(),
            intensity: 1.0,
            size: default_light_size(),
            near: default_near(),
            far: default_light_far(),
            orbit_radius: None,
            cycle_speed: 0.0,
        }
    }
}

/// Six cube-map faces ordered +X, -X, +Y, -Y, +Z, -Z
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyboxDef {
    pub faces: Vec<String>,
}

fn default_water_divisions() -> u32 {
    64
}

/// An alpha-blended water surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterDef {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_unit_scale")]
    pub scale: Vec3,
    pub albedo: String,
    pub height_map: String,
    #[serde(default = "default_water_divisions")]
    pub divisions: u32,
    #[serde(default = "default_water_alpha")]
    pub alpha: f32,
}

fn default_water_alpha() -> f32 {
    0.6
}

/// Which faces the lit pass discards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceCulling {
    #[default]
    CullBack,
    CullFront,
    DoubleSided,
}

fn default_tiling() -> [f32; 2] {
    [1.0, 1.0]
}
fn default_ambient() -> f32 {
    0.2
}
fn default_diffuse() -> f32 {
    0.8
}
fn default_shininess() -> f32 {
    32.0
}

/// A named material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Shader sampler name -> image path
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
    #[serde(default = "default_tiling")]
    pub tiling: [f32; 2],
    /// UV units per second, for scrolling materials
    #[serde(default)]
    pub tiling_speed: [f32; 2],
    #[serde(default = "default_ambient")]
    pub ambient: f32,
    #[serde(default = "default_diffuse")]
    pub diffuse: f32,
    #[serde(default = "default_one")]
    pub specular: f32,
    #[serde(default = "default_shininess")]
    pub shininess: f32,
    #[serde(default)]
    pub metallic: f32,
    #[serde(default)]
    pub cull: FaceCulling,
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            textures: BTreeMap::new(),
            tiling: default_tiling(),
            tiling_speed: [0.0, 0.0],
            ambient: default_ambient(),
            diffuse: default_diffuse(),
            specular: 1.0,
            shininess: default_shininess(),
            metallic: 0.0,
            cull: FaceCulling::CullBack,
        }
    }
}

/// Built-in geometry usable instead of a file path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    /// Unit cube centered on the origin
    Cube,
    /// 1x1 quad in the XZ plane, subdivided `divisions` times per side
    Quad,
}

fn default_unit_scale() -> Vec3 {
    Vec3::ONE
}
fn default_true() -> bool {
    true
}
fn default_divisions() -> u32 {
    1
}

/// A named mesh placed in the scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshDef {
    /// Path to an OBJ file, relative to the scene file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<Primitive>,
    #[serde(default = "default_divisions")]
    pub divisions: u32,
    pub material: String,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_unit_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub recalculate_normals: bool,
    /// Billboard toward the camera every frame
    #[serde(default)]
    pub icon: bool,
    #[serde(default = "default_true")]
    pub cast_shadows: bool,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
    #[serde(default)]
    pub setup: Vec<SetupStep>,
}

impl MeshDef {
    pub fn primitive(material: impl Into<String>, primitive: Primitive) -> Self {
        Self {
            path: None,
            primitive: Some(primitive),
            divisions: 1,
            material: material.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            recalculate_normals: false,
            icon: false,
            cast_shadows: true,
            behaviors: Vec::new(),
            setup: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

fn default_spawn_radius() -> f32 {
    20.0
}
fn default_world_y_bounds() -> [f32; 2] {
    [0.0, 1.0]
}

/// A GPU-instanced field of small meshes (grass, ferns, trees)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstancedFieldDef {
    pub name: String,
    /// Path to the blade/plant OBJ
    pub mesh: String,
    pub albedo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<String>,
    pub height_map: String,
    pub count: u32,
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
    /// World height that heightmap values 0 and 1 map to
    #[serde(default = "default_world_y_bounds")]
    pub world_y_bounds: [f32; 2],
    #[serde(default = "default_true")]
    pub cast_shadows: bool,
}

impl SceneFile {
    /// Create an empty scene file
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scene: SceneMetadata {
                name: name.into(),
                description: None,
            },
            render: RenderSettings::default(),
            camera: CameraDef::default(),
            light: LightDef::default(),
            skybox: None,
            water: None,
            materials: BTreeMap::new(),
            meshes: BTreeMap::new(),
            fields: Vec::new(),
        }
    }

    pub fn add_material(&mut self, name: impl Into<String>, material: MaterialDef) {
        self.materials.insert(name.into(), material);
    }

    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: MeshDef) {
        self.meshes.insert(name.into(), mesh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_tables() {
        let scene: SceneFile = toml::from_str("[scene]\nname = \"Empty\"\n").unwrap();
        assert_eq!(scene.camera.fov, 80.0);
        assert_eq!(scene.light.position, Vec3::new(5.0, 10.0, 0.0));
        assert_eq!(scene.light.size, 15.0);
        assert_eq!(scene.light.far, 30.0);
        assert!(scene.meshes.is_empty());
        assert!(scene.skybox.is_none());
    }

    #[test]
    fn test_material_and_mesh_deserialization() {
        let toml_str = r#"
[scene]
name = "Jungle"

[materials.ground]
textures = { albedo = "textures/ground/color.png", normalMap = "textures/ground/normal.png" }
tiling = [8.0, 8.0]
cull = "double_sided"

[meshes.floor]
primitive = "quad"
divisions = 4
material = "ground"
rotation = [0.0, 45.0, 0.0]
scale = [10.0, 1.0, 10.0]
recalculate_normals = true

[[meshes.floor.behaviors]]
kind = "rotate_over_time"
"#;
        let scene: SceneFile = toml::from_str(toml_str).unwrap();
        let ground = &scene.materials["ground"];
        assert_eq!(ground.textures.len(), 2);
        assert_eq!(ground.tiling, [8.0, 8.0]);
        assert_eq!(ground.cull, FaceCulling::DoubleSided);
        assert_eq!(ground.ambient, 0.2);

        let floor = &scene.meshes["floor"];
        assert_eq!(floor.primitive, Some(Primitive::Quad));
        assert_eq!(floor.divisions, 4);
        assert!(floor.cast_shadows);
        assert_eq!(floor.behaviors.len(), 1);
    }

    #[test]
    fn test_scene_file_serialization() {
        let mut scene = SceneFile::new("Test Scene");
        scene.add_material("plain", MaterialDef::default());
        scene.add_mesh("box", MeshDef::primitive("plain", Primitive::Cube));

        let toml_str = toml::to_string_pretty(&scene).unwrap();
        assert!(toml_str.contains("Test Scene"));
        assert!(toml_str.contains("[meshes.box]"));
        assert!(toml_str.contains("primitive = \"cube\""));
    }
}
