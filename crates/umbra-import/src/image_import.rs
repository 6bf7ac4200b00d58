//! Image import: color textures, height fields and cube maps

use crate::types::{ImportedCubeMap, ImportedHeights, ImportedTexture};
use std::path::Path;
use umbra_core::{Result, UmbraError};

/// File stems expected for cube-map faces, in GPU layer order
pub const CUBE_FACE_ORDER: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

fn texture_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

fn open_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).map_err(|e| {
        UmbraError::ImportError(format!("Failed to open image '{}': {}", path.display(), e))
    })
}

/// Load an image from disk as RGBA8
pub fn import_texture<P: AsRef<Path>>(path: P) -> Result<ImportedTexture> {
    let path = path.as_ref();
    let rgba = open_image(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImportedTexture {
        name: texture_name(path),
        width,
        height,
        data: rgba.into_raw(),
    })
}

/// Load a grayscale height field; values are normalized to `[0, 1]`
pub fn import_heights<P: AsRef<Path>>(path: P) -> Result<ImportedHeights> {
    let path = path.as_ref();
    let luma = open_image(path)?.to_luma16();
    let (width, height) = luma.dimensions();
    let values = luma
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / u16::MAX as f32)
        .collect();
    Ok(ImportedHeights {
        name: texture_name(path),
        width,
        height,
        values,
    })
}

/// Load six cube-map faces. `faces` must be ordered +X, -X, +Y, -Y, +Z, -Z
/// and every face must be square and the same size.
pub fn import_cube_map<P: AsRef<Path>>(faces: &[P]) -> Result<ImportedCubeMap> {
    if faces.len() != 6 {
        return Err(UmbraError::ImportError(format!(
            "cube map needs 6 faces, got {}",
            faces.len()
        )));
    }

    let faces = faces
        .iter()
        .map(import_texture)
        .collect::<Result<Vec<_>>>()?;

    let size = faces[0].width;
    for face in &faces {
        if face.width != size || face.height != size {
            return Err(UmbraError::ImportError(format!(
                "cube face '{}' is {}x{}, expected {}x{}",
                face.name, face.width, face.height, size, size
            )));
        }
    }

    Ok(ImportedCubeMap { size, faces })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_face_count_is_rejected() {
        let err = import_cube_map(&["a.png", "b.png"]).unwrap_err();
        assert!(err.to_string().contains("6 faces"));
    }

    #[test]
    fn test_missing_file_is_an_import_error() {
        let err = import_texture("does/not/exist.png").unwrap_err();
        assert!(matches!(err, UmbraError::ImportError(_)));
    }

    #[test]
    fn test_heights_round_trip_through_png() {
        let dir = std::env::temp_dir().join("umbra-import-heights-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ramp.png");
        let img = image::GrayImage::from_fn(4, 1, |x, _| image::Luma([(x * 85) as u8]));
        img.save(&path).unwrap();

        let heights = import_heights(&path).unwrap();
        assert_eq!((heights.width, heights.height), (4, 1));
        assert!(heights.values[0].abs() < 1e-6);
        assert!((heights.values[3] - 1.0).abs() < 1e-3);
        assert!((heights.sample(0.5, 0.0) - 0.5).abs() < 1e-2);
    }
}
