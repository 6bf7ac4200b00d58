//! Umbra Import - Asset importers
//!
//! Turns on-disk assets into plain CPU-side data: Wavefront-style OBJ
//! geometry into [`ImportedMesh`], and images into RGBA8 textures, height
//! fields and six-face cube maps.

mod image_import;
mod obj_import;
mod types;

pub use image_import::{import_cube_map, import_heights, import_texture, CUBE_FACE_ORDER};
pub use obj_import::{import_obj, parse_obj};
pub use types::{ImportedCubeMap, ImportedHeights, ImportedMesh, ImportedTexture, MeshBounds};
