//! Scene loading and validation

use crate::format::SceneFile;
use std::fs;
use std::path::Path;
use umbra_core::{Result, UmbraError};

/// Load a scene from a TOML file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneFile> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        UmbraError::SceneError(format!("Failed to read scene '{}': {}", path.display(), e))
    })?;
    let scene = load_scene_string(&content)?;
    log::info!(
        "Loaded scene '{}': {} materials, {} meshes, {} instanced fields",
        scene.scene.name,
        scene.materials.len(),
        scene.meshes.len(),
        scene.fields.len()
    );
    Ok(scene)
}

/// Load a scene from a TOML string and validate cross references
pub fn load_scene_string(content: &str) -> Result<SceneFile> {
    let scene: SceneFile = toml::from_str(content)?;
    validate(&scene)?;
    Ok(scene)
}

fn validate(scene: &SceneFile) -> Result<()> {
    for (name, mesh) in &scene.meshes {
        if !scene.materials.contains_key(&mesh.material) {
            return Err(UmbraError::SceneError(format!(
                "mesh '{}' references unknown material '{}'",
                name, mesh.material
            )));
        }
        match (&mesh.path, &mesh.primitive) {
            (Some(_), Some(_)) => {
                return Err(UmbraError::SceneError(format!(
                    "mesh '{}' sets both 'path' and 'primitive'",
                    name
                )))
            }
            (None, None) => {
                return Err(UmbraError::SceneError(format!(
                    "mesh '{}' needs a 'path' or a 'primitive'",
                    name
                )))
            }
            _ => {}
        }
        if mesh.divisions == 0 {
            return Err(UmbraError::SceneError(format!(
                "mesh '{}' needs at least one division",
                name
            )));
        }
    }

    for field in &scene.fields {
        if field.count == 0 {
            return Err(UmbraError::SceneError(format!(
                "instanced field '{}' has a zero instance count",
                field.name
            )));
        }
        if field.spawn_radius <= 0.0 {
            return Err(UmbraError::SceneError(format!(
                "instanced field '{}' needs a positive spawn radius",
                field.name
            )));
        }
        let [low, high] = field.world_y_bounds;
        if low >= high {
            return Err(UmbraError::SceneError(format!(
                "instanced field '{}' world_y_bounds must be [min, max] with min < max",
                field.name
            )));
        }
    }

    if let Some(skybox) = &scene.skybox {
        if skybox.faces.len() != 6 {
            return Err(UmbraError::SceneError(format!(
                "skybox needs 6 faces (+X, -X, +Y, -Y, +Z, -Z), got {}",
                skybox.faces.len()
            )));
        }
    }

    let light = &scene.light;
    if light.size <= 0.0 || light.near >= light.far {
        return Err(UmbraError::SceneError(
            "light needs a positive size and near < far".into(),
        ));
    }

    let camera = &scene.camera;
    if camera.near <= 0.0 || camera.near >= camera.far || camera.fov <= 0.0 || camera.fov >= 180.0 {
        return Err(UmbraError::SceneError(
            "camera needs 0 < near < far and 0 < fov < 180".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MESHES: &str = r#"
[scene]
name = "Two Meshes"

[materials.stone]
textures = { albedo = "stone.png", normalMap = "stone_n.png", specularMap = "stone_s.png" }

[materials.grass]
textures = { albedo = "grass.png" }
tiling = [4.0, 4.0]

[meshes.rock]
primitive = "cube"
material = "stone"
position = [0.0, 0.5, 0.0]

[meshes.ground]
primitive = "quad"
material = "grass"
scale = [20.0, 1.0, 20.0]
"#;

    #[test]
    fn test_load_scene_string() {
        let scene = load_scene_string(TWO_MESHES).unwrap();
        assert_eq!(scene.scene.name, "Two Meshes");
        assert_eq!(scene.materials.len(), 2);
        assert_eq!(scene.meshes.len(), 2);
        assert_eq!(scene.materials["stone"].textures.len(), 3);
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let src = r#"
[scene]
name = "Broken"

[meshes.rock]
primitive = "cube"
material = "missing"
"#;
        let err = load_scene_string(src).unwrap_err();
        assert!(matches!(err, UmbraError::SceneError(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_mesh_source_must_be_exactly_one() {
        let src = r#"
[scene]
name = "Broken"

[materials.m]

[meshes.rock]
material = "m"
"#;
        assert!(load_scene_string(src).is_err());
    }

    #[test]
    fn test_field_bounds_are_checked() {
        let src = r#"
[scene]
name = "Field"

[[fields]]
name = "grass"
mesh = "blade.obj"
albedo = "blade.png"
height_map = "heights.png"
count = 1000
world_y_bounds = [5.0, 1.0]
"#;
        assert!(load_scene_string(src).is_err());
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let err = load_scene_string("[scene\nname = 1").unwrap_err();
        assert!(matches!(err, UmbraError::TomlParseError(_)));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_scene("no/such/scene.toml").is_err());
    }

    #[test]
    fn test_bundled_demo_scene() {
        let scene = load_scene_string(include_str!("../../../scenes/demo.toml")).unwrap();
        assert_eq!(scene.scene.name, "Demo");
        assert!(scene.meshes.values().all(|m| m.primitive.is_some()));
        assert!(scene.meshes["marker"].icon);
        assert_eq!(scene.meshes["spinner"].behaviors.len(), 2);
        assert_eq!(scene.render.shadow_resolution, Some(2048));
    }
}
