//! Umbra Render - wgpu multi-pass renderer for Umbra scenes
//!
//! A frame is a fixed sequence of passes: a shadow map from the single
//! directional light, a camera depth prepass, the main lit pass into an
//! HDR target (meshes, instanced fields, blended water), the skybox and a
//! composite onto the surface. [`Renderer`] records them; [`Scene`] turns a
//! parsed scene document into GPU handles and releases them again.

mod camera;
mod context;
pub mod debug;
mod depth_prepass;
mod draw;
mod frame;
pub mod instanced;
pub mod light;
pub mod material;
pub mod mesh;
mod pipeline;
pub mod postprocess;
mod renderer;
mod resources;
mod scene;
mod schedule;
mod shaders;
pub mod shadow;
mod skybox;
pub mod snapshot;
pub mod texture;
mod uniforms;
pub mod water;

pub use camera::{orthographic, perspective, to_wgpu, Camera};
pub use context::{RenderContext, RenderError};
pub use debug::DebugView;
pub use frame::{FrameContext, FrameUniforms};
pub use instanced::{FieldMaps, InstancedField};
pub use light::{DayNightCycle, DirectionalLight};
pub use material::Material;
pub use mesh::{MeshData, Vertex};
pub use pipeline::HDR_FORMAT;
pub use postprocess::PostProcessConfig;
pub use renderer::{Renderer, RendererConfig};
pub use resources::{GpuAllocator, GpuResources, MeshHandle, TextureHandle};
pub use scene::{AssetSource, FileAssets, Renderable, Scene};
pub use schedule::{FrameSchedule, PassKind};
pub use shadow::DEFAULT_SHADOW_RESOLUTION;
pub use texture::{ColorSpace, TextureUpload};
pub use uniforms::WarnOnce;
pub use water::Water;

#[cfg(test)]
mod tests {
    use crate::camera::to_wgpu;
    use crate::light::DirectionalLight;
    use crate::mesh::MeshData;
    use crate::shadow::{receiver_bias, shadow_coord};
    use umbra_core::matrix::{mat4_transform_point, Mat4};
    use umbra_core::{Transform, Vec3};

    #[test]
    fn shaders_wgsl_parse() {
        for (label, source) in crate::shaders::ALL {
            if let Err(e) = naga::front::wgsl::parse_str(source) {
                panic!("{} shader failed to parse: {}", label, e.emit_to_string(source));
            }
        }
    }

    /// Rasterize the triangles of `mesh` placed by `model` into a depth map
    /// the way the shadow pass does (nearest depth wins)
    fn rasterize_depth(map: &mut [f32], mesh: &MeshData, model: &Mat4, light_space: &Mat4, size: usize) {
        let scale = size as f32;
        let projected: Vec<(f32, f32, f32)> = mesh
            .positions()
            .iter()
            .map(|p| {
                let (u, v, d) = shadow_coord(light_space, mat4_transform_point(model, *p)).unwrap();
                (u * scale, v * scale, d)
            })
            .collect();

        for tri in mesh.indices().chunks(3) {
            let [a, b, c] = [projected[tri[0] as usize], projected[tri[1] as usize], projected[tri[2] as usize]];
            let area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
            if area.abs() < 1e-9 {
                continue;
            }
            let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as usize;
            let max_x = (a.0.max(b.0).max(c.0).ceil() as usize).min(size - 1);
            let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as usize;
            let max_y = (a.1.max(b.1).max(c.1).ceil() as usize).min(size - 1);
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                    let w0 = ((b.0 - px) * (c.1 - py) - (b.1 - py) * (c.0 - px)) / area;
                    let w1 = ((c.0 - px) * (a.1 - py) - (c.1 - py) * (a.0 - px)) / area;
                    let w2 = 1.0 - w0 - w1;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }
                    let depth = w0 * a.2 + w1 * b.2 + w2 * c.2;
                    let texel = &mut map[y * size + x];
                    *texel = texel.min(depth);
                }
            }
        }
    }

    /// Whether the ray from `origin` along `dir` meets the box
    fn ray_hits_box(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> bool {
        let mut t_near = 0.0f32;
        let mut t_far = f32::INFINITY;
        for (o, d, lo, hi) in [
            (origin.x, dir.x, min.x, max.x),
            (origin.y, dir.y, min.y, max.y),
            (origin.z, dir.z, min.z, max.z),
        ] {
            if d.abs() < 1e-9 {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }
            let (t0, t1) = ((lo - o) / d, (hi - o) / d);
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
        }
        t_near <= t_far
    }

    #[test]
    fn cube_shadow_falls_where_the_light_says() {
        const SIZE: usize = 1024;

        let light = DirectionalLight::default();
        let light_space = to_wgpu(&light.light_space_matrix());

        // Both the cube and the ground it stands on cast into the map
        let cube = MeshData::unit_cube();
        let cube_model = Transform::from_position(Vec3::new(0.0, 1.0, 0.0)).trs_matrix();
        let ground = MeshData::subdivided_quad(8);
        let ground_model = Transform {
            scale: Vec3::new(10.0, 1.0, 10.0),
            ..Default::default()
        }
        .trs_matrix();

        let mut ground_only = vec![1.0f32; SIZE * SIZE];
        rasterize_depth(&mut ground_only, &ground, &ground_model, &light_space, SIZE);
        let mut map = ground_only.clone();
        rasterize_depth(&mut map, &cube, &cube_model, &light_space, SIZE);

        let bias = receiver_bias(Vec3::Y, light.direction());
        let shadowed_in = |map: &[f32], p: Vec3| {
            let (u, v, depth) = shadow_coord(&light_space, p).unwrap();
            let x = ((u * SIZE as f32) as usize).min(SIZE - 1);
            let y = ((v * SIZE as f32) as usize).min(SIZE - 1);
            depth - bias > map[y * SIZE + x]
        };
        let shadowed = |p: Vec3| shadowed_in(&map, p);

        // Directional light: every ground point sees the sun along the same ray
        let to_light = light.position.normalized();
        let inner = (Vec3::new(-0.3, 0.7, -0.3), Vec3::new(0.3, 1.3, 0.3));
        let outer = (Vec3::new(-0.7, 0.3, -0.7), Vec3::new(0.7, 1.7, 0.7));

        let mut checked_shadow = 0;
        let mut checked_lit = 0;
        for i in 0..=32 {
            for j in 0..=32 {
                let p = Vec3::new(-4.0 + i as f32 * 0.25, 0.0, -4.0 + j as f32 * 0.25);
                // The ground never shadows itself
                assert!(!shadowed_in(&ground_only, p), "{:?} self-shadowed", p);

                let surely_shadowed = ray_hits_box(p, to_light, inner.0, inner.1);
                let surely_lit = !ray_hits_box(p, to_light, outer.0, outer.1);
                if surely_shadowed {
                    assert!(shadowed(p), "{:?} should be in shadow", p);
                    checked_shadow += 1;
                } else if surely_lit {
                    assert!(!shadowed(p), "{:?} should be lit", p);
                    checked_lit += 1;
                }
            }
        }
        assert!(checked_shadow >= 4, "only {} shadowed samples", checked_shadow);
        assert!(checked_lit > 900);

        // The shadow falls away from the light, on the -X side
        assert!(shadowed(Vec3::new(-0.5, 0.0, 0.0)));
        assert!(!shadowed(Vec3::new(1.5, 0.0, 0.0)));
        assert!(!shadowed(Vec3::new(-0.5, 0.0, 2.0)));
    }

    #[test]
    fn shadows_off_leaves_the_map_clear() {
        use crate::draw::DepthDraws;
        let draws = DepthDraws::casters(&[], &[], false);
        assert!(draws.is_empty());
    }
}
