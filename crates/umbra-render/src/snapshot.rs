//! Depth and height raster snapshots
//!
//! Debugging aid: the shadow map, the camera depth prepass and height
//! fields can be written out as 8-bit grayscale PNGs. Near is black.

use crate::context::RenderError;
use image::GrayImage;
use std::path::{Path, PathBuf};
use umbra_core::UmbraError;
use umbra_import::ImportedHeights;

/// How stored depth values relate to distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthRange {
    /// Orthographic projection: depth is already linear in distance
    Linear,
    /// Perspective projection with `[0, 1]` depth between these planes
    Perspective { near: f32, far: f32 },
}

impl DepthRange {
    /// Map a stored depth to `[0, 1]`, linear in view distance
    pub fn linearize(self, depth: f32) -> f32 {
        match self {
            Self::Linear => depth.clamp(0.0, 1.0),
            Self::Perspective { near, far } => {
                let d = depth.clamp(0.0, 1.0);
                let distance = near * far / (far - d * (far - near));
                ((distance - near) / (far - near)).clamp(0.0, 1.0)
            }
        }
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn gray_image(width: u32, height: u32, values: impl Iterator<Item = f32>) -> Result<GrayImage, RenderError> {
    let pixels: Vec<u8> = values.map(to_byte).collect();
    GrayImage::from_raw(width, height, pixels).ok_or_else(|| {
        RenderError::Resource(format!("snapshot data does not fill {}x{}", width, height))
    })
}

/// Depth buffer to grayscale, row-major from the top
pub fn depth_to_gray(depth: &[f32], width: u32, height: u32, range: DepthRange) -> Result<GrayImage, RenderError> {
    gray_image(width, height, depth.iter().map(|d| range.linearize(*d)))
}

/// Height field to grayscale
pub fn heights_to_gray(heights: &ImportedHeights) -> Result<GrayImage, RenderError> {
    gray_image(heights.width, heights.height, heights.values.iter().copied())
}

/// Write `image` as `<dir>/<name>.png`, creating `dir` if needed
pub fn save_gray(image: &GrayImage, dir: &Path, name: &str) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(dir).map_err(UmbraError::from)?;
    let path = dir.join(format!("{}.png", name));
    image.save(&path).map_err(|e| {
        RenderError::Asset(UmbraError::ResourceError(format!(
            "Failed to write snapshot '{}': {}",
            path.display(),
            e
        )))
    })?;
    log::info!("Wrote snapshot {}", path.display());
    Ok(path)
}

/// Copy a Depth32Float texture back to the CPU
pub fn read_depth(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<f32>, RenderError> {
    let width = texture.width();
    let height = texture.height();
    let unpadded_bytes_per_row = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Depth Readback Buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Depth Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::DepthOnly,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?
        .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?;

    let data = buffer_slice.get_mapped_range();
    let mut values = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        let start = (row * padded_bytes_per_row) as usize;
        let end = start + unpadded_bytes_per_row as usize;
        values.extend_from_slice(bytemuck::cast_slice::<u8, f32>(&data[start..end]));
    }
    drop(data);
    staging_buffer.unmap();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_depth_is_linearized() {
        let range = DepthRange::Perspective {
            near: 0.1,
            far: 100.0,
        };
        assert_eq!(range.linearize(0.0), 0.0);
        assert!((range.linearize(1.0) - 1.0).abs() < 1e-5);
        // Perspective depth crowds near the far plane; halfway in depth is
        // still close to the camera
        assert!(range.linearize(0.5) < 0.01);
    }

    #[test]
    fn test_depth_to_gray_maps_near_to_black() {
        let depth = [0.0, 0.25, 0.5, 1.0];
        let image = depth_to_gray(&depth, 2, 2, DepthRange::Linear).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [64]);
        assert_eq!(image.get_pixel(1, 1).0, [255]);
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        assert!(depth_to_gray(&[0.5; 3], 2, 2, DepthRange::Linear).is_err());
    }

    #[test]
    fn test_heights_to_gray() {
        let heights = ImportedHeights {
            name: "h".into(),
            width: 2,
            height: 1,
            values: vec![0.0, 1.0],
        };
        let image = heights_to_gray(&heights).unwrap();
        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(1, 0).0, [255]);
    }
}
