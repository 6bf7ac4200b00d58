//! Camera depth prepass
//!
//! Renders opaque geometry from the camera into a sampleable depth texture
//! at surface resolution. Water reads it for the shoreline fade and the
//! composite pass for fog and the depth debug view.

use crate::context::RenderError;
use crate::pipeline::BindLayouts;
use crate::shadow::DepthTarget;

pub struct CameraDepthPass {
    pub target: DepthTarget,
}

impl CameraDepthPass {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            target: DepthTarget::new(device, layouts, "Camera Depth", width, height)?,
        })
    }

    /// Follow the surface size. Returns whether the texture was recreated.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<bool, RenderError> {
        if self.target.size() == (width, height) {
            return Ok(false);
        }
        self.target.resize(device, width, height)?;
        Ok(true)
    }
}
