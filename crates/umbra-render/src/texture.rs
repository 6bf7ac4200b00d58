//! Texture creation: color and normal maps, height fields, cube maps and
//! render targets

use crate::context::RenderError;
use umbra_import::{ImportedCubeMap, ImportedHeights, ImportedTexture};
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const HEIGHT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Color space of an RGBA8 upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Albedo and other color maps
    Srgb,
    /// Normal and specular maps
    Linear,
}

impl ColorSpace {
    /// Texture names containing "normal" or "specular" hold data, not color
    pub fn for_slot(slot: &str) -> Self {
        let lower = slot.to_ascii_lowercase();
        if lower.contains("normal") || lower.contains("specular") || lower.contains("opacity") {
            Self::Linear
        } else {
            Self::Srgb
        }
    }

    fn format(self) -> wgpu::TextureFormat {
        match self {
            Self::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// CPU data ready to become a GPU texture
#[derive(Debug, Clone, Copy)]
pub enum TextureUpload<'a> {
    Rgba8 {
        image: &'a ImportedTexture,
        space: ColorSpace,
    },
    /// Single-channel float heights, read in shaders with `textureLoad`
    Heights(&'a ImportedHeights),
    CubeMap(&'a ImportedCubeMap),
}

/// What a texture holds, which decides how it can be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Rgba,
    Heights,
    Cube,
}

impl TextureUpload<'_> {
    pub fn kind(&self) -> TextureKind {
        match self {
            Self::Rgba8 { .. } => TextureKind::Rgba,
            Self::Heights(_) => TextureKind::Heights,
            Self::CubeMap(_) => TextureKind::Cube,
        }
    }

    /// `(width, height, layers)`
    pub fn extent(&self) -> (u32, u32, u32) {
        match self {
            Self::Rgba8 { image, .. } => (image.width, image.height, 1),
            Self::Heights(h) => (h.width, h.height, 1),
            Self::CubeMap(c) => (c.size, c.size, 6),
        }
    }

    /// Check that dimensions are non-zero and the pixel data matches them
    pub fn validate(&self, label: &str) -> Result<(), RenderError> {
        let (width, height, _) = self.extent();
        if width == 0 || height == 0 {
            return Err(RenderError::Resource(format!(
                "texture '{}' has zero size {}x{}",
                label, width, height
            )));
        }
        let texels = (width * height) as usize;
        let ok = match self {
            Self::Rgba8 { image, .. } => image.data.len() == texels * 4,
            Self::Heights(h) => h.values.len() == texels,
            Self::CubeMap(c) => {
                c.faces.len() == 6
                    && c.faces.iter().all(|f| {
                        f.width == c.size && f.height == c.size && f.data.len() == texels * 4
                    })
            }
        };
        if ok {
            Ok(())
        } else {
            Err(RenderError::Resource(format!(
                "texture '{}': pixel data does not match {}x{}",
                label, width, height
            )))
        }
    }
}

/// A GPU-resident texture with its view and sampler
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub kind: TextureKind,
}

fn repeat_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{} Sampler", label)),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn clamp_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{} Sampler", label)),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Upload `upload` as a new texture
pub fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    upload: TextureUpload<'_>,
) -> Result<GpuTexture, RenderError> {
    upload.validate(label)?;
    let (width, height, layers) = upload.extent();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: layers,
    };

    let (format, bytes): (wgpu::TextureFormat, Vec<u8>) = match upload {
        TextureUpload::Rgba8 { image, space } => (space.format(), image.data.clone()),
        TextureUpload::Heights(heights) => {
            (HEIGHT_FORMAT, bytemuck::cast_slice(&heights.values).to_vec())
        }
        TextureUpload::CubeMap(cube) => (
            wgpu::TextureFormat::Rgba8UnormSrgb,
            cube.faces.iter().flat_map(|f| f.data.iter().copied()).collect(),
        ),
    };

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &bytes,
    );

    let kind = upload.kind();
    let (view, sampler) = match kind {
        TextureKind::Rgba => (
            texture.create_view(&wgpu::TextureViewDescriptor::default()),
            repeat_sampler(device, label, wgpu::FilterMode::Linear),
        ),
        TextureKind::Heights => (
            texture.create_view(&wgpu::TextureViewDescriptor::default()),
            repeat_sampler(device, label, wgpu::FilterMode::Nearest),
        ),
        TextureKind::Cube => (
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("{} Cube View", label)),
                dimension: Some(wgpu::TextureViewDimension::Cube),
                ..Default::default()
            }),
            clamp_sampler(device, label),
        ),
    };

    log::debug!("Created {:?} texture '{}' ({}x{})", kind, label, width, height);

    Ok(GpuTexture {
        texture,
        view,
        sampler,
        kind,
    })
}

/// 1x1 fallbacks bound where a material or scene supplies nothing
pub struct DefaultTextures {
    /// White albedo and specular
    pub white: GpuTexture,
    /// Flat tangent-space normal (0.5, 0.5, 1.0)
    pub flat_normal: GpuTexture,
    /// Zero height
    pub flat_height: GpuTexture,
    /// Solid clear-color sky
    pub sky: GpuTexture,
}

impl DefaultTextures {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        sky_color: [f32; 3],
    ) -> Result<Self, RenderError> {
        let white = ImportedTexture::solid("Default White", 1, 1, [255, 255, 255, 255]);
        let normal = ImportedTexture::solid("Default Normal", 1, 1, [128, 128, 255, 255]);
        let height = ImportedHeights {
            name: "Default Height".into(),
            width: 1,
            height: 1,
            values: vec![0.0],
        };
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let sky_rgba = [to_byte(sky_color[0]), to_byte(sky_color[1]), to_byte(sky_color[2]), 255];
        let sky = ImportedCubeMap {
            size: 1,
            faces: (0..6)
                .map(|_| ImportedTexture::solid("Default Sky", 1, 1, sky_rgba))
                .collect(),
        };

        Ok(Self {
            white: create_texture(
                device,
                queue,
                "Default White",
                TextureUpload::Rgba8 {
                    image: &white,
                    space: ColorSpace::Srgb,
                },
            )?,
            flat_normal: create_texture(
                device,
                queue,
                "Default Normal",
                TextureUpload::Rgba8 {
                    image: &normal,
                    space: ColorSpace::Linear,
                },
            )?,
            flat_height: create_texture(
                device,
                queue,
                "Default Height",
                TextureUpload::Heights(&height),
            )?,
            sky: create_texture(device, queue, "Default Sky", TextureUpload::CubeMap(&sky))?,
        })
    }

    /// Fallback for a material sampler slot
    pub fn for_slot(&self, slot: &str) -> &GpuTexture {
        if slot.to_ascii_lowercase().contains("normal") {
            &self.flat_normal
        } else {
            &self.white
        }
    }
}

/// Check an attachment size against the device before creating it
pub fn validate_attachment(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let max = device.limits().max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(RenderError::InvalidAttachment {
            label: label.to_string(),
            message: format!("{}x{} is outside 1..={}", width, height, max),
        });
    }
    Ok(())
}

/// A depth attachment that later passes can sample
pub fn create_depth_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> Result<(wgpu::Texture, wgpu::TextureView), RenderError> {
    create_target(device, label, width, height, DEPTH_FORMAT)
}

/// A color or depth attachment that later passes can sample and copy from
pub fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> Result<(wgpu::Texture, wgpu::TextureView), RenderError> {
    validate_attachment(device, label, width, height)?;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_color_space() {
        assert_eq!(ColorSpace::for_slot("albedo"), ColorSpace::Srgb);
        assert_eq!(ColorSpace::for_slot("normalMap"), ColorSpace::Linear);
        assert_eq!(ColorSpace::for_slot("specularMap"), ColorSpace::Linear);
    }

    #[test]
    fn test_upload_validation() {
        let good = ImportedTexture::solid("ok", 2, 2, [1, 2, 3, 4]);
        let upload = TextureUpload::Rgba8 {
            image: &good,
            space: ColorSpace::Srgb,
        };
        assert!(upload.validate("ok").is_ok());
        assert_eq!(upload.extent(), (2, 2, 1));

        let mut short = good.clone();
        short.data.truncate(4);
        let upload = TextureUpload::Rgba8 {
            image: &short,
            space: ColorSpace::Srgb,
        };
        assert!(upload.validate("short").is_err());

        let heights = ImportedHeights {
            name: "empty".into(),
            width: 0,
            height: 4,
            values: vec![],
        };
        assert!(TextureUpload::Heights(&heights).validate("empty").is_err());
    }

    #[test]
    fn test_cube_map_needs_six_matching_faces() {
        let face = ImportedTexture::solid("face", 2, 2, [0, 0, 0, 255]);
        let mut cube = ImportedCubeMap {
            size: 2,
            faces: vec![face.clone(); 6],
        };
        let upload = TextureUpload::CubeMap(&cube);
        assert!(upload.validate("sky").is_ok());
        assert_eq!(upload.extent(), (2, 2, 6));

        cube.faces.pop();
        assert!(TextureUpload::CubeMap(&cube).validate("sky").is_err());
    }
}
