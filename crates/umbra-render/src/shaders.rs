//! WGSL sources. Programs sharing a bind group layout are assembled from
//! common pieces so the struct declarations exist once.

pub const DEPTH: &str = include_str!("depth.wgsl");

pub const LIT: &str = concat!(include_str!("frame_common.wgsl"), include_str!("lit.wgsl"));

pub const INSTANCED: &str = concat!(
    include_str!("frame_common.wgsl"),
    include_str!("instanced_common.wgsl"),
    include_str!("instanced.wgsl")
);

pub const INSTANCED_DEPTH: &str = concat!(
    include_str!("instanced_common.wgsl"),
    include_str!("instanced_depth.wgsl")
);

pub const WATER: &str = concat!(include_str!("frame_common.wgsl"), include_str!("water.wgsl"));

pub const SKYBOX: &str = include_str!("skybox.wgsl");

pub const COMPOSITE: &str = include_str!("composite.wgsl");

/// Every program with its label, for compilation checks
pub const ALL: [(&str, &str); 7] = [
    ("depth", DEPTH),
    ("lit", LIT),
    ("instanced", INSTANCED),
    ("instanced depth", INSTANCED_DEPTH),
    ("water", WATER),
    ("skybox", SKYBOX),
    ("composite", COMPOSITE),
];
