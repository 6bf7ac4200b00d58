//! Frame orchestration
//!
//! [`Renderer`] owns every pipeline, the intermediate targets and the GPU
//! resource store, and records one frame as five passes in fixed order:
//!
//! 1. shadow map from the light (casters only)
//! 2. camera depth prepass
//! 3. main lit pass into the HDR target: meshes, instanced fields, water
//! 4. skybox behind everything drawn so far
//! 5. composite onto the output view
//!
//! Feature toggles empty a pass's draw list but never skip the pass, so
//! each pass always finds its inputs. The light-space matrix is taken once
//! from the [`FrameContext`] and fed to both the shadow pass and the frame
//! uniforms the main pass samples with.

use crate::camera::Camera;
use crate::context::RenderError;
use crate::debug::DebugView;
use crate::depth_prepass::CameraDepthPass;
use crate::draw::{DepthDraws, FieldDraw, MeshDraw};
use crate::frame::FrameContext;
use crate::instanced::{FieldBinding, InstancedPipeline};
use crate::light::DirectionalLight;
use crate::material::{Material, ObjectUniforms};
use crate::pipeline::{BindLayouts, LitPipeline};
use crate::postprocess::{CompositePipeline, CompositeUniforms, PostProcessConfig, SceneTargets};
use crate::resources::{GpuMesh, GpuResources, GpuUploader, TextureHandle};
use crate::scene::Scene;
use crate::schedule::{FrameSchedule, PassKind};
use crate::shadow::{DepthKind, DepthPipeline, ShadowPass, DEFAULT_SHADOW_RESOLUTION};
use crate::skybox::SkyboxPipeline;
use crate::snapshot::{self, DepthRange};
use crate::texture::{DefaultTextures, GpuTexture};
use crate::uniforms::WarnOnce;
use crate::water::{WaterBinding, WaterPipeline};
use std::path::{Path, PathBuf};
use umbra_scene::{LightDef, SceneFile};
use wgpu::util::DeviceExt;

/// Renderer settings. A scene's `[render]` table and the command line
/// override the defaults, in that order.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Shadow map edge length in texels
    pub shadow_resolution: u32,
    pub clear_color: [f32; 3],
    pub shadows: bool,
    pub camera_depth: bool,
    pub instanced_fields: bool,
    pub water: bool,
    pub skybox: bool,
    pub post: PostProcessConfig,
    /// Half-extent of the light's orthographic shadow box
    pub light_size: f32,
    pub light_near: f32,
    pub light_far: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadow_resolution: DEFAULT_SHADOW_RESOLUTION,
            clear_color: [0.1, 0.2, 0.3],
            shadows: true,
            camera_depth: true,
            instanced_fields: true,
            water: true,
            skybox: true,
            post: PostProcessConfig::default(),
            light_size: 15.0,
            light_near: 0.1,
            light_far: 30.0,
        }
    }
}

impl RendererConfig {
    /// Take the light frustum and any `[render]` overrides from a document
    pub fn apply_scene(&mut self, file: &SceneFile) {
        self.light_size = file.light.size;
        self.light_near = file.light.near;
        self.light_far = file.light.far;

        let render = &file.render;
        if let Some(resolution) = render.shadow_resolution {
            self.shadow_resolution = resolution;
        }
        if let Some(color) = render.clear_color {
            self.clear_color = color;
        }
        let toggles = [
            (render.shadows, &mut self.shadows),
            (render.camera_depth, &mut self.camera_depth),
            (render.instanced_fields, &mut self.instanced_fields),
            (render.water, &mut self.water),
            (render.skybox, &mut self.skybox),
            (render.post_process, &mut self.post.enabled),
        ];
        for (value, flag) in toggles {
            if let Some(value) = value {
                *flag = value;
            }
        }
    }

    /// The scene's light with this configuration's shadow frustum
    pub fn light(&self, def: &LightDef) -> DirectionalLight {
        DirectionalLight {
            size: self.light_size,
            near: self.light_near,
            far: self.light_far,
            ..DirectionalLight::from_def(def)
        }
    }
}

/// The scene's cube map while it is live, else the clear-color cube
fn sky_texture<'a>(
    defaults: &'a DefaultTextures,
    handle: Option<TextureHandle>,
    resources: &'a GpuResources,
) -> &'a GpuTexture {
    handle
        .and_then(|handle| resources.texture(handle))
        .unwrap_or(&defaults.sky)
}

/// Object uniforms and bind group of one renderable
struct EntityBinding {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// GPU state built for the scene currently attached
struct AttachedScene {
    entities: Vec<EntityBinding>,
    materials: Vec<wgpu::BindGroup>,
    fields: Vec<FieldBinding>,
    water: Option<WaterBinding>,
}

/// Bind groups that reference views which change on resize or attach
struct Bindings {
    frame: wgpu::BindGroup,
    sky: wgpu::BindGroup,
    composite: wgpu::BindGroup,
}

pub struct Renderer {
    config: RendererConfig,
    layouts: BindLayouts,
    warnings: WarnOnce,
    lit: LitPipeline,
    depth: DepthPipeline,
    instanced: InstancedPipeline,
    water: WaterPipeline,
    skybox: SkyboxPipeline,
    composite: CompositePipeline,
    shadow: ShadowPass,
    camera_depth: CameraDepthPass,
    targets: SceneTargets,
    defaults: DefaultTextures,
    resources: GpuResources,
    frame_buffer: wgpu::Buffer,
    bindings: Bindings,
    sky_texture: Option<TextureHandle>,
    attached: Option<AttachedScene>,
    schedule: FrameSchedule,
}

impl Renderer {
    /// Compile every program and create the intermediate targets. Any shader
    /// or attachment problem is reported here, never per frame.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let layouts = BindLayouts::new(device);
        let mut warnings = WarnOnce::new();

        let lit = LitPipeline::new(device, &layouts, &mut warnings)?;
        let depth = DepthPipeline::new(device, &layouts)?;
        let instanced = InstancedPipeline::new(device, &layouts)?;
        let water = WaterPipeline::new(device, &layouts)?;
        let skybox = SkyboxPipeline::new(device)?;
        let composite = CompositePipeline::new(device, output_format)?;

        let shadow = ShadowPass::new(device, &layouts, config.shadow_resolution)?;
        let camera_depth = CameraDepthPass::new(device, &layouts, width, height)?;
        let targets = SceneTargets::new(device, width, height)?;
        let defaults = DefaultTextures::new(device, queue, config.clear_color)?;

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<crate::frame::FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let resources = GpuResources::new();
        let bindings = Self::create_bindings(
            device,
            &layouts,
            &frame_buffer,
            &shadow,
            &camera_depth,
            &targets,
            &skybox,
            &composite,
            sky_texture(&defaults, None, &resources),
        );

        log::info!(
            "Renderer ready: {}x{}, shadow map {}, output {:?}",
            width,
            height,
            config.shadow_resolution,
            output_format
        );

        Ok(Self {
            config,
            layouts,
            warnings,
            lit,
            depth,
            instanced,
            water,
            skybox,
            composite,
            shadow,
            camera_depth,
            targets,
            defaults,
            resources,
            frame_buffer,
            bindings,
            sky_texture: None,
            attached: None,
            schedule: FrameSchedule::new(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create_bindings(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        frame_buffer: &wgpu::Buffer,
        shadow: &ShadowPass,
        camera_depth: &CameraDepthPass,
        targets: &SceneTargets,
        skybox: &SkyboxPipeline,
        composite: &CompositePipeline,
        sky: &GpuTexture,
    ) -> Bindings {
        let frame = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow.target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&sky.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&sky.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&camera_depth.target.view),
                },
            ],
            label: Some("Frame Bind Group"),
        });

        Bindings {
            frame,
            sky: skybox.bind(device, sky),
            composite: composite.bind(
                device,
                &targets.color_view,
                &shadow.target.view,
                &camera_depth.target.view,
            ),
        }
    }

    fn rebuild_bindings(&mut self, device: &wgpu::Device) {
        let sky = sky_texture(&self.defaults, self.sky_texture, &self.resources);
        self.bindings = Self::create_bindings(
            device,
            &self.layouts,
            &self.frame_buffer,
            &self.shadow,
            &self.camera_depth,
            &self.targets,
            &self.skybox,
            &self.composite,
            sky,
        );
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn set_shadows(&mut self, enabled: bool) {
        self.config.shadows = enabled;
        log::info!("Shadows {}", if enabled { "on" } else { "off" });
    }

    /// Flip shadows on or off; returns the new state
    pub fn toggle_shadows(&mut self) -> bool {
        self.set_shadows(!self.config.shadows);
        self.config.shadows
    }

    pub fn set_post_process(&mut self, config: PostProcessConfig) {
        self.config.post = config;
    }

    pub fn set_shadow_resolution(&mut self, device: &wgpu::Device, resolution: u32) -> Result<(), RenderError> {
        if resolution == self.shadow.resolution {
            return Ok(());
        }
        self.shadow.set_resolution(device, resolution)?;
        self.config.shadow_resolution = resolution;
        self.rebuild_bindings(device);
        Ok(())
    }

    /// Follow the output size. Zero-sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let depth_changed = self.camera_depth.resize(device, width, height)?;
        let color_changed = self.targets.resize(device, width, height)?;
        if depth_changed || color_changed {
            self.rebuild_bindings(device);
            log::debug!("Render targets resized to {}x{}", width, height);
        }
        Ok(())
    }

    /// Allocator for loading a scene into this renderer's resource store
    pub fn uploader<'a>(&'a mut self, device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> GpuUploader<'a> {
        self.resources.uploader(device, queue)
    }

    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }

    /// The per-frame context, with this renderer's shadow settings
    pub fn frame_context<'a>(
        &self,
        camera: &'a Camera,
        light: &'a DirectionalLight,
        time: f32,
        debug_view: DebugView,
    ) -> FrameContext<'a> {
        FrameContext::new(
            camera,
            light,
            time,
            debug_view,
            self.config.shadows,
            self.shadow.resolution,
        )
    }

    /// Build the bind groups for `scene`. Must be called again whenever the
    /// scene gains or loses renderables.
    pub fn attach_scene(&mut self, device: &wgpu::Device, scene: &Scene) -> Result<(), RenderError> {
        let entities = scene
            .renderables
            .iter()
            .map(|entity| {
                let uniforms = ObjectUniforms::new(entity.transform.trs_matrix(), scene.material(entity));
                let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Object Uniforms", entity.name)),
                    contents: bytemuck::cast_slice(&[uniforms]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &self.layouts.object,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    }],
                    label: Some(&format!("{} Object Bind Group", entity.name)),
                });
                EntityBinding {
                    uniform_buffer,
                    bind_group,
                }
            })
            .collect();

        let materials = scene
            .materials
            .iter()
            .map(|material| self.material_bind_group(device, material))
            .collect();

        let fields = scene
            .fields
            .iter()
            .map(|field| FieldBinding::new(device, &self.instanced, field, &self.resources, &self.defaults))
            .collect::<Result<Vec<_>, _>>()?;

        let water = scene
            .water
            .as_ref()
            .map(|water| WaterBinding::new(device, &self.water, water, &self.resources))
            .transpose()?;

        self.attached = Some(AttachedScene {
            entities,
            materials,
            fields,
            water,
        });
        self.sky_texture = scene.skybox;
        self.rebuild_bindings(device);
        log::info!(
            "Attached scene '{}' ({} entities, {} fields)",
            scene.name,
            scene.renderables.len(),
            scene.fields.len()
        );
        Ok(())
    }

    /// Drop every bind group referring to the attached scene's resources.
    /// Call before destroying the scene.
    pub fn detach_scene(&mut self, device: &wgpu::Device) {
        self.attached = None;
        self.sky_texture = None;
        self.rebuild_bindings(device);
    }

    /// Group 2 of the lit program: sampler, then each declared material
    /// sampler at its unit. Slots the material leaves empty get a default.
    fn material_bind_group(&mut self, device: &wgpu::Device, material: &Material) -> wgpu::BindGroup {
        let resolved = self
            .lit
            .program
            .resolve_textures(&material.name, &material.textures, &mut self.warnings);

        let mut views = Vec::with_capacity(resolved.len());
        for ((slot, _), (unit, handle)) in self.lit.program.samplers().iter().zip(&resolved) {
            let texture = match handle {
                Some(handle) => match self.resources.texture(*handle) {
                    Some(texture) => texture,
                    None => {
                        self.warnings.warn(format!("{}:{}", material.name, handle), || {
                            format!(
                                "material '{}': {} for '{}' is not live, using default",
                                material.name, handle, slot
                            )
                        });
                        self.defaults.for_slot(slot)
                    }
                },
                None => self.defaults.for_slot(slot),
            };
            views.push((*unit, &texture.view));
        }

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.defaults.white.sampler),
        }];
        entries.extend(views.into_iter().map(|(unit, view)| wgpu::BindGroupEntry {
            binding: unit,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.lit.material_layout,
            entries: &entries,
            label: Some(&format!("{} Material Bind Group", material.name)),
        })
    }

    /// Record and submit one frame into `output`
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: Option<&Scene>,
        frame: &FrameContext<'_>,
        output: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        self.schedule.begin_frame()?;
        match self.record_frame(device, queue, scene, frame, output) {
            Ok(()) => self.schedule.end_frame(),
            Err(e) => {
                self.schedule.abort_frame();
                Err(e)
            }
        }
    }

    fn upload_frame(&self, queue: &wgpu::Queue, scene: Option<&Scene>, frame: &FrameContext<'_>) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame.uniforms]));
        self.shadow.target.write_view_proj(queue, &frame.light_space);
        self.camera_depth.target.write_view_proj(queue, &frame.camera_view_proj);
        self.skybox.update(queue, frame.camera);
        self.composite.update(
            queue,
            &CompositeUniforms::new(&self.config.post, frame.camera.near, frame.camera.far, frame.debug_view),
        );

        let (Some(scene), Some(attached)) = (scene, &self.attached) else {
            return;
        };
        for (entity, binding) in scene.renderables.iter().zip(&attached.entities) {
            let uniforms = ObjectUniforms::new(entity.transform.trs_matrix(), scene.material(entity));
            queue.write_buffer(&binding.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }
        for (field, binding) in scene.fields.iter().zip(&attached.fields) {
            binding.update(queue, field, frame.time);
        }
        if let (Some(water), Some(binding)) = (&scene.water, &attached.water) {
            binding.update(queue, water);
        }
    }

    fn record_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: Option<&Scene>,
        frame: &FrameContext<'_>,
        output: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        if let (Some(scene), Some(attached)) = (scene, &self.attached) {
            if scene.renderables.len() != attached.entities.len() || scene.fields.len() != attached.fields.len() {
                return Err(RenderError::Resource(format!(
                    "scene '{}' changed since it was attached",
                    scene.name
                )));
            }
        } else if scene.is_some() {
            return Err(RenderError::Resource("scene was not attached".into()));
        }

        self.upload_frame(queue, scene, frame);

        let mut meshes: Vec<MeshDraw<'_>> = Vec::new();
        let mut fields: Vec<FieldDraw<'_>> = Vec::new();
        let mut water: Option<(&GpuMesh, &wgpu::BindGroup)> = None;
        if let (Some(scene), Some(attached)) = (scene, self.attached.as_ref()) {
            for (entity, binding) in scene.renderables.iter().zip(&attached.entities) {
                let Some(mesh) = self.resources.mesh(entity.mesh) else {
                    self.warnings.warn(format!("draw:{}", entity.mesh), || {
                        format!("entity '{}': {} is not live, not drawn", entity.name, entity.mesh)
                    });
                    continue;
                };
                meshes.push(MeshDraw {
                    mesh,
                    object: &binding.bind_group,
                    material: &attached.materials[entity.material],
                    cull: scene.material(entity).cull,
                    cast_shadows: entity.cast_shadows,
                });
            }
            if self.config.instanced_fields {
                for (field, binding) in scene.fields.iter().zip(&attached.fields) {
                    if let Some(mesh) = self.resources.mesh(field.mesh) {
                        fields.push(FieldDraw {
                            mesh,
                            bind_group: &binding.bind_group,
                            count: field.count,
                            cast_shadows: field.cast_shadows,
                        });
                    }
                }
            }
            if self.config.water {
                if let (Some(surface), Some(binding)) = (&scene.water, &attached.water) {
                    water = self
                        .resources
                        .mesh(surface.mesh)
                        .map(|mesh| (mesh, &binding.bind_group));
                }
            }
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        self.schedule.begin(PassKind::Shadow)?;
        self.shadow.target.record(
            &mut encoder,
            self.depth.pipeline(DepthKind::Shadow),
            self.instanced.depth(DepthKind::Shadow),
            &DepthDraws::casters(&meshes, &fields, frame.shadows_enabled),
        );
        self.schedule.finish(PassKind::Shadow);

        self.schedule.begin(PassKind::CameraDepth)?;
        let depth_draws = if self.config.camera_depth {
            DepthDraws::all(&meshes, &fields)
        } else {
            DepthDraws::default()
        };
        self.camera_depth.target.record(
            &mut encoder,
            self.depth.pipeline(DepthKind::Camera),
            self.instanced.depth(DepthKind::Camera),
            &depth_draws,
        );
        self.schedule.finish(PassKind::CameraDepth);

        self.schedule.begin(PassKind::Main)?;
        {
            let [r, g, b] = self.config.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &meshes {
                pass.set_pipeline(self.lit.pipeline(draw.cull));
                pass.set_bind_group(0, &self.bindings.frame, &[]);
                pass.set_bind_group(1, draw.object, &[]);
                pass.set_bind_group(2, draw.material, &[]);
                draw.mesh.draw(&mut pass, 0..1);
            }

            if !fields.is_empty() {
                pass.set_pipeline(&self.instanced.lit);
                pass.set_bind_group(0, &self.bindings.frame, &[]);
                for field in &fields {
                    pass.set_bind_group(1, field.bind_group, &[]);
                    field.mesh.draw(&mut pass, 0..field.count);
                }
            }

            // Blended, so after everything opaque
            if let Some((mesh, bind_group)) = water {
                pass.set_pipeline(&self.water.pipeline);
                pass.set_bind_group(0, &self.bindings.frame, &[]);
                pass.set_bind_group(1, bind_group, &[]);
                mesh.draw(&mut pass, 0..1);
            }
        }
        self.schedule.finish(PassKind::Main);

        self.schedule.begin(PassKind::Skybox)?;
        self.skybox.record(
            &mut encoder,
            &self.targets.color_view,
            &self.targets.depth_view,
            self.config.skybox.then_some(&self.bindings.sky),
        );
        self.schedule.finish(PassKind::Skybox);

        self.schedule.begin(PassKind::Composite)?;
        self.composite.record(&mut encoder, output, &self.bindings.composite);
        self.schedule.finish(PassKind::Composite);

        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Write the shadow map, the camera depth prepass and every height map
    /// of `scene` to `dir` as grayscale PNGs
    pub fn write_snapshots(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: &Path,
        camera: &Camera,
        scene: Option<&Scene>,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let mut written = Vec::new();

        let (width, height) = self.shadow.target.size();
        let depth = snapshot::read_depth(device, queue, &self.shadow.target.texture)?;
        let image = snapshot::depth_to_gray(&depth, width, height, DepthRange::Linear)?;
        written.push(snapshot::save_gray(&image, dir, "shadow_map")?);

        let (width, height) = self.camera_depth.target.size();
        let depth = snapshot::read_depth(device, queue, &self.camera_depth.target.texture)?;
        let range = DepthRange::Perspective {
            near: camera.near,
            far: camera.far,
        };
        let image = snapshot::depth_to_gray(&depth, width, height, range)?;
        written.push(snapshot::save_gray(&image, dir, "camera_depth")?);

        if let Some(scene) = scene {
            for (path, heights) in &scene.height_fields {
                let image = snapshot::heights_to_gray(heights)?;
                let stem = Path::new(path)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("heights");
                written.push(snapshot::save_gray(&image, dir, &format!("heights_{}", stem))?);
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::Vec3;
    use umbra_scene::load_scene_string;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.shadow_resolution, 2048);
        assert_eq!(config.clear_color, [0.1, 0.2, 0.3]);
        assert!(config.shadows && config.camera_depth && config.post.enabled);
        assert_eq!((config.light_size, config.light_near, config.light_far), (15.0, 0.1, 30.0));
    }

    #[test]
    fn test_render_table_overrides_defaults() {
        let file = load_scene_string(
            r#"
[scene]
name = "Overrides"

[render]
shadow_resolution = 4096
shadows = false
post_process = false
clear_color = [0.0, 0.0, 0.0]

[light]
size = 25.0
"#,
        )
        .unwrap();
        let mut config = RendererConfig::default();
        config.apply_scene(&file);
        assert_eq!(config.shadow_resolution, 4096);
        assert!(!config.shadows);
        assert!(!config.post.enabled);
        assert!(config.water, "unset toggles keep their defaults");
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0]);
        assert_eq!(config.light_size, 25.0);
    }

    #[test]
    fn test_light_takes_configured_frustum() {
        let def = LightDef {
            position: Vec3::new(1.0, 8.0, 1.0),
            ..Default::default()
        };
        let config = RendererConfig {
            light_size: 40.0,
            ..Default::default()
        };
        let light = config.light(&def);
        assert_eq!(light.position, def.position);
        assert_eq!(light.size, 40.0);
        assert_eq!(light.far, 30.0);
    }
}
