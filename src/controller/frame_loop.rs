use std::cell::RefCell;
use std::rc::Rc;
use wgpu::{Device, Queue, Surface};

use crate::controller::{CharacterController, InputEvent};
use crate::model::CpuScene;
use crate::ui::{self, OverlayStats};
use crate::view::render::{CameraResources, CameraUniform, LightingUniform, RenderState};

/// Longest simulated step; long stalls (tab switches) are not replayed
const MAX_FRAME_SECS: f64 = 0.1;

/// Averages frame rate over one-second windows
#[derive(Debug, Default)]
pub struct FpsCounter {
    pub fps: f32,
    frame_count: u32,
    timer: f32,
}

impl FpsCounter {
    pub fn tick(&mut self, dt: f32) {
        self.frame_count += 1;
        self.timer += dt;
        if self.timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.timer;
            self.frame_count = 0;
            self.timer = 0.0;
        }
    }
}

/// What the platform layer measured for this frame
pub struct FrameInput {
    /// Monotonic clock in milliseconds
    pub now_ms: f64,
    /// Drawable size in physical pixels
    pub width: u32,
    pub height: u32,
    pub pixels_per_point: f32,
    pub raw_input: egui::RawInput,
}

/// Per-frame glue between the controller, the scene and the renderer.
/// Shared by the browser and desktop entry points.
pub struct FrameLoopContext {
    pub controller: Rc<RefCell<CharacterController<CpuScene>>>,
    pub cam_buf: wgpu::Buffer,
    pub lighting_buf: wgpu::Buffer,
    pub egui_ctx: egui::Context,
    pub fps: FpsCounter,
    pub last_time: f64,
}

impl FrameLoopContext {
    pub fn new(
        controller: Rc<RefCell<CharacterController<CpuScene>>>,
        resources: &CameraResources,
        egui_ctx: egui::Context,
        now_ms: f64,
    ) -> Self {
        Self {
            controller,
            cam_buf: resources.camera_buffer.clone(),
            lighting_buf: resources.lighting_buffer.clone(),
            egui_ctx,
            fps: FpsCounter::default(),
            last_time: now_ms,
        }
    }

    /// Advance the controller one frame and stage geometry, uniforms and UI
    /// for `RenderState::draw_frame`. Returns egui's platform output for the
    /// caller to apply (cursor, clipboard).
    pub fn update(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
        render_state: &mut RenderState,
        input: FrameInput,
    ) -> egui::PlatformOutput {
        // Time step
        let dt = ((input.now_ms - self.last_time) / 1000.0).clamp(0.0, MAX_FRAME_SECS) as f32;
        self.last_time = input.now_ms;
        self.fps.tick(dt);

        self.handle_resize(device, surface, render_state, input.width, input.height);

        let stats = {
            let mut controller = self.controller.borrow_mut();
            controller.update(input.now_ms, dt);
            if !controller.is_ready() {
                let camera = controller.camera().clone();
                controller.engine_mut().set_camera(&camera);
            }

            let scene = controller.engine();
            let cam_data = CameraUniform { view_proj: scene.view_proj().to_cols_array_2d() };
            queue.write_buffer(&self.cam_buf, 0, bytemuck::bytes_of(&cam_data));
            let lighting = LightingUniform::from_scene(&scene.lighting);
            queue.write_buffer(&self.lighting_buf, 0, bytemuck::bytes_of(&lighting));
            render_state.frame_buffer.write(device, queue, scene.frame());

            OverlayStats::from_controller(&controller, self.fps.fps)
        };

        // Set DPI scale for egui
        self.egui_ctx.set_pixels_per_point(input.pixels_per_point);

        let mut full_output = ui::build_ui(&self.egui_ctx, input.raw_input, &stats);
        let platform_output = std::mem::take(&mut full_output.platform_output);

        // Tessellate and store for rendering in next step
        let primitives = self
            .egui_ctx
            .tessellate(std::mem::take(&mut full_output.shapes), input.pixels_per_point);
        render_state.egui_primitives = Some(primitives);
        render_state.egui_full_output = Some(full_output);
        render_state.egui_dpr = input.pixels_per_point;

        platform_output
    }

    fn handle_resize(
        &self,
        device: &Device,
        surface: &Surface,
        render_state: &mut RenderState,
        width: u32,
        height: u32,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        if width != render_state.width || height != render_state.height {
            render_state.resize(device, surface, width, height);
            self.controller
                .borrow_mut()
                .handle_event(&InputEvent::Resized { width, height }, self.last_time);
        }
    }
}
