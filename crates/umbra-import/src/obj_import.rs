//! Wavefront-style OBJ geometry import
//!
//! Supports `v`, `vt`, `vn` and `f` records. Faces may reference
//! `v`, `v/vt`, `v//vn` or `v/vt/vn`, with 1-based or negative (relative)
//! indices, and polygons are fan-triangulated. Other record types
//! (`o`, `g`, `s`, `usemtl`, `mtllib`) are ignored.

use crate::types::ImportedMesh;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use umbra_core::{Result, UmbraError, Vec3};

/// Load and parse an OBJ file from disk
pub fn import_obj<P: AsRef<Path>>(path: P) -> Result<ImportedMesh> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| {
        UmbraError::ImportError(format!("Failed to read '{}': {}", path.display(), e))
    })?;

    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let mesh = parse_obj(&name, &source)?;
    log::debug!(
        "Imported '{}': {} vertices, {} triangles",
        path.display(),
        mesh.positions.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// A face corner as written in the file, resolved to 0-based indices
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Parse OBJ text into a de-indexed triangle mesh.
///
/// Texture coordinates are flipped vertically (`v' = 1 - v`) because OBJ puts
/// the origin at the bottom-left while wgpu samples from the top-left.
pub fn parse_obj(name: &str, source: &str) -> Result<ImportedMesh> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[Corner; 3]> = Vec::new();

    for (line_index, raw) in source.lines().enumerate() {
        let line_no = line_index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&args, line_no, "v")?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                // A missing v component defaults to zero
                let u = parse_float(args.first().copied(), line_no, "vt")?;
                let v = match args.get(1).copied() {
                    Some(token) => parse_float(Some(token), line_no, "vt")?,
                    None => 0.0,
                };
                uvs.push([u, 1.0 - v]);
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&args, line_no, "vn")?;
                normals.push(Vec3::new(x, y, z));
            }
            "f" => {
                if args.len() < 3 {
                    return Err(parse_error(
                        line_no,
                        format!("face needs at least 3 vertices, got {}", args.len()),
                    ));
                }
                let corners = args
                    .iter()
                    .map(|token| {
                        parse_corner(token, positions.len(), uvs.len(), normals.len(), line_no)
                    })
                    .collect::<Result<Vec<_>>>()?;
                for i in 1..corners.len() - 1 {
                    triangles.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    let all_have_normals = triangles
        .iter()
        .flatten()
        .all(|corner| corner.normal.is_some());

    let mut mesh = ImportedMesh {
        name: name.to_string(),
        ..Default::default()
    };
    let mut lookup: HashMap<Corner, u32> = HashMap::new();

    for corner in triangles.iter().flatten() {
        let index = match lookup.get(corner) {
            Some(index) => *index,
            None => {
                let index = mesh.positions.len() as u32;
                mesh.positions.push(positions[corner.position]);
                mesh.uvs.push(corner.uv.map(|i| uvs[i]).unwrap_or([0.0, 0.0]));
                if all_have_normals {
                    if let Some(n) = corner.normal {
                        mesh.normals.push(normals[n]);
                    }
                }
                lookup.insert(*corner, index);
                index
            }
        };
        mesh.indices.push(index);
    }

    if mesh.indices.is_empty() {
        log::warn!("OBJ '{}' contains no faces", name);
    }

    Ok(mesh)
}

fn parse_error(line: usize, message: String) -> UmbraError {
    UmbraError::ParseError(format!("OBJ line {}: {}", line, message))
}

fn parse_float(token: Option<&str>, line: usize, record: &str) -> Result<f32> {
    let token = token.ok_or_else(|| parse_error(line, format!("'{}' record is missing a value", record)))?;
    token
        .parse::<f32>()
        .map_err(|_| parse_error(line, format!("invalid number '{}' in '{}' record", token, record)))
}

fn parse_floats<const N: usize>(args: &[&str], line: usize, record: &str) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    for (i, value) in out.iter_mut().enumerate() {
        *value = parse_float(args.get(i).copied(), line, record)?;
    }
    Ok(out)
}

/// Resolve a 1-based or negative OBJ index against `count` existing elements
fn resolve_index(token: &str, count: usize, line: usize, what: &str) -> Result<usize> {
    let raw: i64 = token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {} index '{}'", what, token)))?;
    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        count as i64 + raw
    } else {
        return Err(parse_error(line, format!("{} index 0 is not valid", what)));
    };
    if resolved < 0 || resolved >= count as i64 {
        return Err(parse_error(
            line,
            format!("{} index {} out of range (have {})", what, raw, count),
        ));
    }
    Ok(resolved as usize)
}

fn parse_corner(
    token: &str,
    position_count: usize,
    uv_count: usize,
    normal_count: usize,
    line: usize,
) -> Result<Corner> {
    let mut parts = token.split('/');
    let position = resolve_index(parts.next().unwrap_or(""), position_count, line, "position")?;
    let uv = match parts.next() {
        Some("") | None => None,
        Some(t) => Some(resolve_index(t, uv_count, line, "texcoord")?),
    };
    let normal = match parts.next() {
        Some("") | None => None,
        Some(t) => Some(resolve_index(t, normal_count, line, "normal")?),
    };
    Ok(Corner {
        position,
        uv,
        normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = r#"
# unit quad in the XZ plane
o Quad
v -1.0 0.0 -1.0
v  1.0 0.0 -1.0
v  1.0 0.0  1.0
v -1.0 0.0  1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 1.0 0.0
s off
f 1/1/1 4/4/1 3/3/1 2/2/1
"#;

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = parse_obj("quad", QUAD).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(mesh.has_normals());
        assert_eq!(mesh.normals[0], Vec3::Y);
        // vt flipped to top-left origin
        assert_eq!(mesh.uvs[0], [0.0, 1.0]);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_missing_texcoords_default_to_zero() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_obj("tri", src).unwrap();
        assert_eq!(mesh.uvs, vec![[0.0, 0.0]; 3]);
        assert!(!mesh.has_normals());
    }

    #[test]
    fn test_shared_corners_are_deduplicated() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        let mesh = parse_obj("quad", src).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_same_position_with_different_uv_splits_vertex() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 1\nf 1/1 2/1 3/1\nf 1/2 3/2 2/2\n";
        let mesh = parse_obj("split", src).unwrap();
        assert_eq!(mesh.positions.len(), 6);
    }

    #[test]
    fn test_negative_indices() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = parse_obj("rel", src).unwrap();
        assert_eq!(mesh.positions[2], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_errors_report_line_numbers() {
        let err = parse_obj("bad", "v 0 0 0\nv 1 0 0\nf 1 2 7\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);

        let err = parse_obj("bad", "v 0 zero 0\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));

        assert!(parse_obj("bad", "v 0 0 0\nf 1 1\n").is_err());
        assert!(parse_obj("bad", "v 0 0 0\nf 0 1 1\n").is_err());
    }
}
