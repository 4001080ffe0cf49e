use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::Window,
};

// Import from the library crate
use character_viewer::{
    config::{self, AssetManifest, ControllerConfig},
    controller::{input::native, AssetLoader, CharacterController, FrameInput, FrameLoopContext, FsSource, InputEvent},
    logging,
    model::{CpuScene, FollowCamera},
    ui,
    view::{render, GpuContext, RenderState},
};

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,
    frame_ctx: FrameLoopContext,
    controller: Rc<RefCell<CharacterController<CpuScene>>>,
    egui_state: egui_winit::State,
    clock: Instant,
}

impl App {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gpu = GpuContext::new_native(window.clone()).await?;
        let (width, height) = (gpu.config.width, gpu.config.height);

        let scene = CpuScene::new(&FollowCamera::new(width, height));
        let controller = Rc::new(RefCell::new(CharacterController::new(
            scene,
            ControllerConfig::default(),
            width,
            height,
        )));

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        // Camera, lighting buffers & bind groups
        let resources = render::create_camera_resources(&gpu.device);
        let frame_ctx = FrameLoopContext::new(controller.clone(), &resources, egui_ctx, 0.0);
        let render_state = {
            let controller = controller.borrow();
            RenderState::new(
                &gpu.device,
                &gpu.config,
                &resources.bind_group_layout,
                resources.camera_bind_group,
                controller.engine().frame(),
            )
        };

        Ok(Self {
            window,
            gpu,
            render_state,
            frame_ctx,
            controller,
            egui_state,
            clock: Instant::now(),
        })
    }

    fn now_ms(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    /// Load every asset from disk before the first frame
    fn load_character(&mut self) {
        let root = config::native_asset_root();
        tracing::info!(root = %root.display(), "loading assets");
        let source = FsSource::new(root);
        let manifest = AssetManifest::default();
        let result = pollster::block_on(AssetLoader::new(&source, &manifest).load::<CpuScene>());
        let mut controller = self.controller.borrow_mut();
        match result {
            Ok(assets) => controller.initialize(assets),
            Err(err) => controller.fail(&err),
        }
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        if self.egui_state.on_window_event(self.window.as_ref(), event).consumed {
            return true;
        }

        let now = self.now_ms();
        let event = match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, physical_key: PhysicalKey::Code(code), .. }, .. } => {
                native::keyboard_input(*code, *state == ElementState::Pressed)
            }
            WindowEvent::Focused(false) => Some(InputEvent::FocusLost),
            WindowEvent::Occluded(occluded) => Some(InputEvent::VisibilityChanged { visible: !occluded }),
            _ => return false,
        };
        if let Some(event) = event {
            self.controller.borrow_mut().handle_event(&event, now);
        }
        true
    }

    fn redraw(&mut self) {
        let size = self.window.inner_size();
        let frame = FrameInput {
            now_ms: self.now_ms(),
            width: size.width,
            height: size.height,
            pixels_per_point: self.window.scale_factor() as f32,
            raw_input: self.egui_state.take_egui_input(&self.window),
        };
        let platform_output = self.frame_ctx.update(
            &self.gpu.device,
            &self.gpu.queue,
            &self.gpu.surface,
            &mut self.render_state,
            frame,
        );
        self.egui_state.handle_platform_output(&self.window, platform_output);
        self.render_state.draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface);
    }
}

#[allow(deprecated)]
fn main() -> anyhow::Result<()> {
    logging::init();

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title(ui::TITLE)
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window))?;
    app.load_character();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
            if !app.input(event) {
                match event {
                    WindowEvent::CloseRequested => {
                        app.controller.borrow_mut().teardown();
                        elwt.exit();
                    }
                    WindowEvent::RedrawRequested => app.redraw(),
                    _ => {}
                }
            }
        }
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}
