//! Per-frame state handed to every pass

use crate::camera::{to_wgpu, Camera};
use crate::debug::DebugView;
use crate::light::DirectionalLight;
use bytemuck::{Pod, Zeroable};
use umbra_core::matrix::Mat4;

/// Frame-wide uniform block, bound at group 0 of the lit, instanced and
/// water programs. Field order and padding mirror `FrameUniforms` in WGSL,
/// where the fields are named `view`, `projection`, `lightSpaceMatrix`,
/// `camPos`, `time`, `camFwd`, `debugView`, `lightPos`, `lightIntensity`,
/// `lightDir`, `shadowsEnabled`, `sunColor` and `shadowTexel`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: Mat4,
    /// Perspective with depth already remapped to `[0, 1]`
    pub projection: Mat4,
    /// Light projection · view, depth remapped to `[0, 1]`
    pub light_space_matrix: Mat4,
    pub cam_pos: [f32; 3],
    pub time: f32,
    pub cam_fwd: [f32; 3],
    pub debug_view: u32,
    pub light_pos: [f32; 3],
    pub light_intensity: f32,
    pub light_dir: [f32; 3],
    pub shadows_enabled: u32,
    pub sun_color: [f32; 3],
    /// `1 / shadow map resolution`, for PCF offsets
    pub shadow_texel: f32,
}

/// Everything a pass needs to know about the current frame.
///
/// Built once per frame; the shadow pass and the main pass read the same
/// `light_space` value from here.
pub struct FrameContext<'a> {
    pub camera: &'a Camera,
    pub light: &'a DirectionalLight,
    /// Seconds since start
    pub time: f32,
    pub debug_view: DebugView,
    pub shadows_enabled: bool,
    /// Light-space matrix in wgpu clip space
    pub light_space: Mat4,
    /// Camera projection · view in wgpu clip space
    pub camera_view_proj: Mat4,
    pub uniforms: FrameUniforms,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        camera: &'a Camera,
        light: &'a DirectionalLight,
        time: f32,
        debug_view: DebugView,
        shadows_enabled: bool,
        shadow_resolution: u32,
    ) -> Self {
        let light_space = to_wgpu(&light.light_space_matrix());
        let projection = to_wgpu(&camera.projection_matrix());
        let camera_view_proj = to_wgpu(&camera.view_projection_matrix());
        let color = light.color.to_rgb();

        let uniforms = FrameUniforms {
            view: camera.view_matrix(),
            projection,
            light_space_matrix: light_space,
            cam_pos: camera.position.to_array(),
            time,
            cam_fwd: camera.forward().to_array(),
            debug_view: debug_view.as_u32(),
            light_pos: light.position.to_array(),
            light_intensity: light.intensity,
            light_dir: light.direction().to_array(),
            shadows_enabled: shadows_enabled as u32,
            sun_color: color,
            shadow_texel: 1.0 / shadow_resolution.max(1) as f32,
        };

        Self {
            camera,
            light,
            time,
            debug_view,
            shadows_enabled,
            light_space,
            camera_view_proj,
            uniforms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::matrix::mat4_mul;
    use umbra_core::Vec3;

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 272);
    }

    #[test]
    fn test_light_space_is_shared() {
        let camera = Camera::default();
        let light = DirectionalLight::default();
        let frame = FrameContext::new(&camera, &light, 1.5, DebugView::Lit, true, 2048);
        assert_eq!(frame.light_space, frame.uniforms.light_space_matrix);
        assert_eq!(frame.light_space, to_wgpu(&light.light_space_matrix()));
        assert_eq!(frame.uniforms.shadow_texel, 1.0 / 2048.0);
    }

    #[test]
    fn test_view_projection_matches_uniform_parts() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(1.0, 2.0, 3.0);
        camera.rotate_local(-20.0, 45.0);
        let light = DirectionalLight::default();
        let frame = FrameContext::new(&camera, &light, 0.0, DebugView::Normals, false, 1024);
        let combined = mat4_mul(&frame.uniforms.projection, &frame.uniforms.view);
        for c in 0..4 {
            for r in 0..4 {
                assert!((combined[c][r] - frame.camera_view_proj[c][r]).abs() < 1e-5);
            }
        }
        assert_eq!(frame.uniforms.debug_view, 2);
        assert_eq!(frame.uniforms.shadows_enabled, 0);
    }
}
