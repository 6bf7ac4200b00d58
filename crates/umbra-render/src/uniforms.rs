//! Name-keyed sampler tables and warn-once soft failures
//!
//! Frame-wide inputs occupy fixed texture units; material textures are
//! looked up by name against a program's sampler table and get units
//! assigned after the reserved ones. A name the program does not declare
//! resolves to [`UniformLocation::NotFound`]; binding it is a logged no-op,
//! never an error.

use std::collections::{BTreeMap, HashSet};

/// Unit of the shadow map in every lit program
pub const SHADOW_MAP_UNIT: u32 = 0;
/// Unit of the skybox cube map (reflections)
pub const SKYBOX_UNIT: u32 = 10;
/// Unit of the camera depth prepass texture
pub const CAMERA_DEPTH_UNIT: u32 = 11;
/// Units `0..MAX_TEXTURE_UNITS` exist
pub const MAX_TEXTURE_UNITS: u32 = 12;

/// Uniform names fed from the per-frame block
pub const FRAME_UNIFORMS: [&str; 11] = [
    "view",
    "projection",
    "lightSpaceMatrix",
    "camPos",
    "time",
    "camFwd",
    "debugView",
    "lightPos",
    "lightDir",
    "sunColor",
    "shadowTexel",
];

/// Sampler names on reserved units
pub const RESERVED_SAMPLERS: [(&str, u32); 3] = [
    ("shadowMap", SHADOW_MAP_UNIT),
    ("_Skybox", SKYBOX_UNIT),
    ("cameraDepthMap", CAMERA_DEPTH_UNIT),
];

pub fn is_reserved_unit(unit: u32) -> bool {
    RESERVED_SAMPLERS.iter().any(|(_, u)| *u == unit)
}

/// Logs each distinct warning key once
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<String>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message()` unless `key` was already reported. Returns whether it logged.
    pub fn warn(&mut self, key: impl Into<String>, message: impl FnOnce() -> String) -> bool {
        if self.seen.insert(key.into()) {
            log::warn!("{}", message());
            true
        } else {
            false
        }
    }

    /// Number of distinct warnings emitted so far
    pub fn count(&self) -> usize {
        self.seen.len()
    }
}

/// Result of looking a name up in a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLocation {
    /// Bound at this texture unit
    Unit(u32),
    /// The program does not declare the name
    NotFound,
}

impl UniformLocation {
    pub fn unit(self) -> Option<u32> {
        match self {
            Self::Unit(unit) => Some(unit),
            Self::NotFound => None,
        }
    }

    pub fn is_found(self) -> bool {
        matches!(self, Self::Unit(_))
    }
}

/// Hands out texture units in order, skipping the reserved ones
#[derive(Debug, Clone, Default)]
pub struct TextureUnits {
    next: u32,
}

impl TextureUnits {
    /// Next free unit, or `None` once the supported range is exhausted
    pub fn assign(&mut self) -> Option<u32> {
        while self.next < MAX_TEXTURE_UNITS && is_reserved_unit(self.next) {
            self.next += 1;
        }
        if self.next >= MAX_TEXTURE_UNITS {
            return None;
        }
        let unit = self.next;
        self.next += 1;
        Some(unit)
    }
}

/// The uniform and sampler names one shader program declares
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    name: &'static str,
    uniforms: Vec<&'static str>,
    samplers: Vec<(String, u32)>,
}

impl ProgramLayout {
    /// Declare a program. Material samplers get units after the reserved
    /// ones; any that do not fit are reported and left out.
    pub fn new(
        name: &'static str,
        uniforms: &[&'static str],
        material_samplers: &[&str],
        warnings: &mut WarnOnce,
    ) -> Self {
        let mut units = TextureUnits::default();
        let mut samplers = Vec::with_capacity(material_samplers.len());
        for sampler in material_samplers {
            match units.assign() {
                Some(unit) => samplers.push((sampler.to_string(), unit)),
                None => {
                    warnings.warn(format!("{}:unit:{}", name, sampler), || {
                        format!(
                            "program '{}': no texture unit left for '{}' (max {})",
                            name, sampler, MAX_TEXTURE_UNITS
                        )
                    });
                }
            }
        }
        Self {
            name,
            uniforms: uniforms.to_vec(),
            samplers,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Material samplers in unit order
    pub fn samplers(&self) -> &[(String, u32)] {
        &self.samplers
    }

    pub fn declares_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|u| *u == name)
    }

    /// Unit of a sampler, reserved or material
    pub fn sampler_location(&self, name: &str) -> UniformLocation {
        RESERVED_SAMPLERS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, unit)| *unit)
            .or_else(|| {
                self.samplers
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, unit)| *unit)
            })
            .map_or(UniformLocation::NotFound, UniformLocation::Unit)
    }

    /// Pair every material sampler with the texture a material supplies for
    /// it (if any). Texture names the program does not declare are reported
    /// once and ignored.
    pub fn resolve_textures<T: Copy>(
        &self,
        material: &str,
        textures: &BTreeMap<String, T>,
        warnings: &mut WarnOnce,
    ) -> Vec<(u32, Option<T>)> {
        for name in textures.keys() {
            if let UniformLocation::NotFound = self.sampler_location(name) {
                warnings.warn(format!("{}:{}", self.name, name), || {
                    format!(
                        "program '{}' has no sampler '{}' (material '{}'); binding skipped",
                        self.name, name, material
                    )
                });
            }
        }
        self.samplers
            .iter()
            .map(|(name, unit)| (*unit, textures.get(name).copied()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_skip_reserved_slots() {
        let mut units = TextureUnits::default();
        let assigned: Vec<u32> = std::iter::from_fn(|| units.assign()).collect();
        assert_eq!(assigned, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_lookup_returns_sentinel_for_unknown_names() {
        let mut warnings = WarnOnce::new();
        let lit = ProgramLayout::new(
            "lit",
            &FRAME_UNIFORMS,
            &["albedo", "normalMap", "specularMap"],
            &mut warnings,
        );
        assert_eq!(lit.sampler_location("shadowMap"), UniformLocation::Unit(0));
        assert_eq!(lit.sampler_location("_Skybox"), UniformLocation::Unit(10));
        assert_eq!(lit.sampler_location("albedo"), UniformLocation::Unit(1));
        assert_eq!(lit.sampler_location("specularMap"), UniformLocation::Unit(3));
        assert_eq!(lit.sampler_location("roughness"), UniformLocation::NotFound);
        assert!(lit.declares_uniform("lightSpaceMatrix"));
        assert!(!lit.declares_uniform("viewPos"));
        assert_eq!(warnings.count(), 0);
    }

    #[test]
    fn test_samplers_past_the_last_unit_are_dropped() {
        let mut warnings = WarnOnce::new();
        let names: Vec<String> = (0..11).map(|i| format!("map{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let program = ProgramLayout::new("big", &[], &refs, &mut warnings);
        assert_eq!(program.samplers().len(), 9);
        assert_eq!(program.sampler_location("map10"), UniformLocation::NotFound);
        assert_eq!(warnings.count(), 2);
    }

    #[test]
    fn test_unknown_material_texture_warns_once() {
        let mut warnings = WarnOnce::new();
        let lit = ProgramLayout::new("lit", &[], &["albedo", "normalMap"], &mut warnings);
        let mut textures = BTreeMap::new();
        textures.insert("albedo".to_string(), 7u32);
        textures.insert("glow".to_string(), 8u32);

        let resolved = lit.resolve_textures("stone", &textures, &mut warnings);
        assert_eq!(resolved, vec![(1, Some(7)), (2, None)]);
        assert_eq!(warnings.count(), 1);

        // A second frame does not log again
        lit.resolve_textures("stone", &textures, &mut warnings);
        assert_eq!(warnings.count(), 1);
    }

    #[test]
    fn test_warn_once_reports_first_occurrence_only() {
        let mut warnings = WarnOnce::new();
        assert!(warnings.warn("a", || "first".into()));
        assert!(!warnings.warn("a", || "again".into()));
        assert!(warnings.warn("b", || "other".into()));
    }
}
