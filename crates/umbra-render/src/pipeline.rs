//! Bind group layouts shared across programs, and the lit mesh pipeline

use crate::context::{create_shader, validated, RenderError};
use crate::mesh::Vertex;
use crate::shaders;
use crate::texture::DEPTH_FORMAT;
use crate::uniforms::{ProgramLayout, WarnOnce, FRAME_UNIFORMS};
use umbra_scene::FaceCulling;

/// Format of the intermediate scene color target
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Samplers the lit program declares, in unit order
pub const LIT_SAMPLERS: [&str; 3] = ["albedo", "normalMap", "specularMap"];

pub(crate) fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn color_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        visibility,
        wgpu::TextureSampleType::Float { filterable: true },
        wgpu::TextureViewDimension::D2,
    )
}

/// R32Float heights, read with `textureLoad`
pub(crate) fn height_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        visibility,
        wgpu::TextureSampleType::Float { filterable: false },
        wgpu::TextureViewDimension::D2,
    )
}

pub(crate) fn depth_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::ShaderStages::FRAGMENT,
        wgpu::TextureSampleType::Depth,
        wgpu::TextureViewDimension::D2,
    )
}

pub(crate) fn sampler_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

/// Depth state of passes that write the scene depth buffer
pub(crate) fn depth_write(compare: wgpu::CompareFunction, bias: wgpu::DepthBiasState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias,
    }
}

pub(crate) fn triangles(cull_mode: Option<wgpu::Face>) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Layouts every mesh program agrees on
pub struct BindLayouts {
    /// Group 0: frame uniforms, shadow map, sky, camera depth
    pub frame: wgpu::BindGroupLayout,
    /// Group 1 of mesh programs: `ObjectUniforms`
    pub object: wgpu::BindGroupLayout,
    /// Group 0 of depth-only programs: one view-projection matrix
    pub depth: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let both = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let fragment = wgpu::ShaderStages::FRAGMENT;

        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, both),
                depth_entry(1),
                sampler_entry(2, fragment, wgpu::SamplerBindingType::Comparison),
                texture_entry(
                    3,
                    fragment,
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::TextureViewDimension::Cube,
                ),
                sampler_entry(4, fragment, wgpu::SamplerBindingType::Filtering),
                depth_entry(5),
            ],
            label: Some("Frame Bind Group Layout"),
        });

        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, both)],
            label: Some("Object Bind Group Layout"),
        });

        let depth = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            label: Some("Depth Bind Group Layout"),
        });

        Self {
            frame,
            object,
            depth,
        }
    }
}

/// Lit mesh program: one pipeline per face-culling mode
pub struct LitPipeline {
    pub program: ProgramLayout,
    /// Group 2: shared sampler at binding 0, each material sampler at its unit
    pub material_layout: wgpu::BindGroupLayout,
    back: wgpu::RenderPipeline,
    front: wgpu::RenderPipeline,
    double_sided: wgpu::RenderPipeline,
}

impl LitPipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        warnings: &mut WarnOnce,
    ) -> Result<Self, RenderError> {
        let program = ProgramLayout::new("lit", &FRAME_UNIFORMS, &LIT_SAMPLERS, warnings);
        let shader = create_shader(device, "Lit Shader", shaders::LIT)?;

        let mut entries = vec![sampler_entry(
            0,
            wgpu::ShaderStages::FRAGMENT,
            wgpu::SamplerBindingType::Filtering,
        )];
        entries.extend(
            program
                .samplers()
                .iter()
                .map(|(_, unit)| color_entry(*unit, wgpu::ShaderStages::FRAGMENT)),
        );
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &entries,
            label: Some("Material Bind Group Layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Pipeline Layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.object, &material_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str, cull: Option<wgpu::Face>| {
            validated(device, label, || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[Vertex::desc()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: HDR_FORMAT,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: triangles(cull),
                    depth_stencil: Some(depth_write(
                        wgpu::CompareFunction::Less,
                        wgpu::DepthBiasState::default(),
                    )),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
        };

        Ok(Self {
            back: build("Lit Pipeline (cull back)", Some(wgpu::Face::Back))?,
            front: build("Lit Pipeline (cull front)", Some(wgpu::Face::Front))?,
            double_sided: build("Lit Pipeline (double sided)", None)?,
            program,
            material_layout,
        })
    }

    pub fn pipeline(&self, cull: FaceCulling) -> &wgpu::RenderPipeline {
        match cull {
            FaceCulling::CullBack => &self.back,
            FaceCulling::CullFront => &self.front,
            FaceCulling::DoubleSided => &self.double_sided,
        }
    }
}
