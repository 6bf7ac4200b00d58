//! Viewer application implementing winit's ApplicationHandler
//!
//! Owns the window, the render context and the loaded scene, and runs the
//! per-frame loop: input, camera, day/night cycle, behaviors, render.

use crate::clock::FrameClock;
use crate::controller::FreeLookController;
use crate::input::InputState;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use umbra_render::{
    Camera, DayNightCycle, DebugView, DirectionalLight, FileAssets, RenderContext, Renderer,
    RendererConfig, Scene,
};
use umbra_scene::SceneFile;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

/// Radians per second the keypad keys turn the day/night cycle
const CYCLE_KEY_RATE: f32 = 1.0;

/// Startup options gathered from the command line
pub struct ViewerOptions {
    pub scene_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub config: RendererConfig,
    pub snapshot_dir: Option<PathBuf>,
}

/// GPU state, created once the event loop hands us a window
struct Gpu {
    window: Arc<Window>,
    context: RenderContext,
    renderer: Renderer,
    scene: Option<Scene>,
}

pub struct ViewerApp {
    options: ViewerOptions,
    scene_file: SceneFile,
    gpu: Option<Gpu>,

    camera: Camera,
    controller: FreeLookController,
    light: DirectionalLight,
    cycle: DayNightCycle,
    debug_view: DebugView,

    clock: FrameClock,
    input: InputState,
    snapshot_requested: bool,
    /// First fatal error; reported by `main` after the loop exits
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(options: ViewerOptions, scene_file: SceneFile) -> Self {
        let aspect = options.width.max(1) as f32 / options.height.max(1) as f32;
        let camera = Camera::from_def(&scene_file.camera, aspect);
        let controller = FreeLookController::from_def(&scene_file.camera);
        let light = options.config.light(&scene_file.light);
        let cycle = DayNightCycle::from_def(&scene_file.light);

        Self {
            options,
            scene_file,
            gpu: None,
            camera,
            controller,
            light,
            cycle,
            debug_view: DebugView::default(),
            clock: FrameClock::new(),
            input: InputState::new(),
            snapshot_requested: false,
            failure: None,
        }
    }

    /// The error that stopped the viewer, if any
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        event_loop.exit();
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(format!("Umbra - {}", self.scene_file.scene.name))
            .with_inner_size(PhysicalSize::new(self.options.width, self.options.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );

        let context = pollster::block_on(RenderContext::new(window.clone()))
            .context("Failed to initialize the GPU")?;
        let (width, height) = (context.config.width, context.config.height);
        self.camera.set_aspect(width, height);

        let mut renderer = Renderer::new(
            &context.device,
            &context.queue,
            context.config.format,
            width,
            height,
            self.options.config.clone(),
        )
        .context("Failed to create renderer")?;

        let mut assets = FileAssets::for_scene(&self.options.scene_path);
        let scene = Scene::load(
            &self.scene_file,
            &mut assets,
            &mut renderer.uploader(&context.device, &context.queue),
        )
        .with_context(|| format!("Failed to load scene '{}'", self.options.scene_path.display()))?;
        renderer
            .attach_scene(&context.device, &scene)
            .context("Failed to prepare scene for rendering")?;

        window.request_redraw();
        self.gpu = Some(Gpu {
            window,
            context,
            renderer,
            scene: Some(scene),
        });
        Ok(())
    }

    /// Detach and release every GPU handle the scene holds
    fn shutdown(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let Some(scene) = gpu.scene.take() else {
            return;
        };
        let device = &gpu.context.device;
        gpu.renderer.detach_scene(device);
        match scene.destroy(&mut gpu.renderer.uploader(device, &gpu.context.queue)) {
            Ok(released) => log::info!("Released {} GPU handles", released),
            Err(e) => log::warn!("Scene teardown incomplete: {}", e),
        }
    }

    fn handle_actions(&mut self, event_loop: &ActiveEventLoop) {
        if self.input.is_action_just_pressed("quit") {
            event_loop.exit();
            return;
        }
        if let Some(view) = self.input.digit_just_pressed().and_then(DebugView::from_digit) {
            if view != self.debug_view {
                log::info!("Debug view: {}", view.label());
                self.debug_view = view;
            }
        }
        if self.input.is_action_just_pressed("toggle_shadows") {
            if let Some(gpu) = &mut self.gpu {
                gpu.renderer.toggle_shadows();
            }
        }
        if self.input.is_action_just_pressed("snapshot") {
            if self.options.snapshot_dir.is_some() {
                self.snapshot_requested = true;
            } else {
                log::warn!("Snapshots are disabled; start with --snapshot-dir <dir>");
            }
        }
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        self.clock.tick();
        let dt = self.clock.delta_time;

        self.handle_actions(event_loop);
        self.controller.update(&mut self.camera, &self.input, dt);

        let cycle = self.input.is_action_pressed("cycle_forward") as i32
            - self.input.is_action_pressed("cycle_backward") as i32;
        if cycle != 0 {
            self.cycle.step(cycle as f32 * CYCLE_KEY_RATE * dt);
        }
        self.cycle.update(dt, &mut self.light);

        if let Some(scene) = self.gpu.as_mut().and_then(|gpu| gpu.scene.as_mut()) {
            scene.update(dt, self.clock.total_time, self.camera.position);
        }

        self.input.end_frame();
    }

    fn render(&mut self) -> Result<()> {
        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };

        let output = match gpu.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.context.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(anyhow::anyhow!("Surface error: {}", e)),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let frame = gpu.renderer.frame_context(
            &self.camera,
            &self.light,
            self.clock.total_time,
            self.debug_view,
        );
        gpu.renderer
            .render(
                &gpu.context.device,
                &gpu.context.queue,
                gpu.scene.as_ref(),
                &frame,
                &view,
            )
            .context("Frame failed")?;
        output.present();

        if std::mem::take(&mut self.snapshot_requested) {
            if let Some(dir) = &self.options.snapshot_dir {
                match gpu.renderer.write_snapshots(
                    &gpu.context.device,
                    &gpu.context.queue,
                    dir,
                    &self.camera,
                    gpu.scene.as_ref(),
                ) {
                    Ok(written) => log::info!("Wrote {} snapshots to {}", written.len(), dir.display()),
                    Err(e) => log::warn!("Snapshot failed: {}", e),
                }
            }
        }

        if self.clock.frames() % 120 == 0 {
            gpu.window.set_title(&format!(
                "Umbra - {} ({:.0} fps, {})",
                self.scene_file.scene.name,
                self.clock.fps(),
                self.debug_view.label()
            ));
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        if gpu.context.resize(size) {
            gpu.renderer
                .resize(&gpu.context.device, size.width, size.height)
                .context("Failed to resize render targets")?;
            self.camera.set_aspect(size.width, size.height);
        }
        Ok(())
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_none() {
            if let Err(e) = self.initialize(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Err(e) = self.resize(size) {
                    self.fail(event_loop, e);
                }
            }

            WindowEvent::Focused(false) => self.input.release_all(),

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.input.process_key_down(key),
                        ElementState::Released => self.input.process_key_up(key),
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.input
                    .process_mouse_button(button, state == ElementState::Pressed);
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input.process_cursor_moved(position.x, position.y);
            }

            WindowEvent::RedrawRequested => {
                self.tick(event_loop);
                if let Err(e) = self.render() {
                    self.fail(event_loop, e);
                    return;
                }
                if let Some(gpu) = &self.gpu {
                    gpu.window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
