// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::cell::{Cell, RefCell};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use config::{AssetManifest, ControllerConfig};
#[cfg(target_arch = "wasm32")]
use controller::{input, ArrowKey, AssetLoader, CharacterController, FetchSource, FrameInput, FrameLoopContext, InputEvent};
#[cfg(target_arch = "wasm32")]
use model::{CpuScene, FollowCamera};
#[cfg(target_arch = "wasm32")]
use view::{render, GpuContext, RenderState};

#[cfg(target_arch = "wasm32")]
type SharedController = Rc<RefCell<CharacterController<CpuScene>>>;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let (width, height) = viewport_size(window);
    canvas.set_width(width);
    canvas.set_height(height);

    // Initialize GPU
    let gpu = GpuContext::new(canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
    let width = gpu.config.width;
    let height = gpu.config.height;

    let scene = CpuScene::new(&FollowCamera::new(width, height));
    let controller: SharedController = Rc::new(RefCell::new(CharacterController::new(
        scene,
        ControllerConfig::default(),
        width,
        height,
    )));
    let running = Rc::new(Cell::new(true));
    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));

    load_character(controller.clone());
    setup_input_listeners(document, window, controller.clone(), running.clone(), egui_events.clone())?;

    // Camera, lighting buffers & bind groups
    let resources = render::create_camera_resources(gpu.device.as_ref());
    let mut frame_ctx = FrameLoopContext::new(controller.clone(), &resources, egui::Context::default(), performance_now(window));
    let mut render_state = {
        let controller = controller.borrow();
        RenderState::new(
            gpu.device.as_ref(),
            &gpu.config,
            &resources.bind_group_layout,
            resources.camera_bind_group,
            controller.engine().frame(),
        )
    };

    // Continuous redraw using requestAnimationFrame
    let f = RcCellCallback::new(window.clone(), {
        let window = window.clone();
        let canvas = canvas.clone();

        move || {
            let now_ms = performance_now(&window);
            let (w, h) = viewport_size(&window);
            if w != canvas.width() || h != canvas.height() {
                canvas.set_width(w);
                canvas.set_height(h);
            }
            let dpr = window.device_pixel_ratio() as f32;
            let mut raw_input = ui::raw_input_for(w, h, dpr, now_ms);
            raw_input.events.extend(egui_events.borrow_mut().drain(..));

            frame_ctx.update(
                gpu.device.as_ref(),
                gpu.queue.as_ref(),
                &gpu.surface,
                &mut render_state,
                FrameInput { now_ms, width: w, height: h, pixels_per_point: dpr, raw_input },
            );
            render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface);
        }
    });
    f.start(running);

    Ok(())
}

/// Fetch every clip and the mesh in the background; the frame loop keeps
/// drawing the ground meanwhile.
#[cfg(target_arch = "wasm32")]
fn load_character(controller: SharedController) {
    wasm_bindgen_futures::spawn_local(async move {
        let manifest = AssetManifest::default();
        let source = FetchSource::new("");
        let result = AssetLoader::new(&source, &manifest).load::<CpuScene>().await;
        let mut controller = controller.borrow_mut();
        match result {
            Ok(assets) => controller.initialize(assets),
            Err(err) => controller.fail(&err),
        }
    });
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    controller: SharedController,
    running: Rc<Cell<bool>>,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let controller = controller.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            // Keep arrow keys from scrolling the page
            if ArrowKey::from_key_name(&e.key()).is_some() {
                e.prevent_default();
            }
            let event = input::wasm::keyboard_event_to_input(&e, true);
            controller.borrow_mut().handle_event(&event, e.time_stamp());
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let controller = controller.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let event = input::wasm::keyboard_event_to_input(&e, false);
            controller.borrow_mut().handle_event(&event, e.time_stamp());
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - held keys never see their keyup
    {
        let controller = controller.clone();
        let blur = Closure::wrap(Box::new(move |e: Event| {
            controller.borrow_mut().handle_event(&InputEvent::FocusLost, e.time_stamp());
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change
    {
        let controller = controller.clone();
        let doc = document.clone();
        let visibility = Closure::wrap(Box::new(move |e: Event| {
            let event = InputEvent::VisibilityChanged { visible: !doc.hidden() };
            controller.borrow_mut().handle_event(&event, e.time_stamp());
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Page teardown - stop the frame loop and release the character
    {
        let controller = controller.clone();
        let pagehide = Closure::wrap(Box::new(move |_e: Event| {
            running.set(false);
            controller.borrow_mut().teardown();
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("pagehide", pagehide.as_ref().unchecked_ref())?;
        pagehide.forget();
    }

    // Pointer events for the debug window
    {
        let egui_events = egui_events.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let pos = egui::pos2(e.client_x() as f32, e.client_y() as f32);
            egui_events.borrow_mut().push(egui::Event::PointerMoved(pos));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }
    for (event_name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let egui_events = egui_events.clone();
        let button = Closure::wrap(Box::new(move |e: MouseEvent| {
            if e.button() != 0 {
                return;
            }
            egui_events.borrow_mut().push(egui::Event::PointerButton {
                pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::default(),
            });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback(event_name, button.as_ref().unchecked_ref())?;
        button.forget();
    }

    Ok(())
}

/// Full-viewport canvas, sized in physical pixels
#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;

    body.style().set_property("margin", "0")?;
    body.style().set_property("overflow", "hidden")?;
    let style = canvas_el.style();
    style.set_property("display", "block")?;
    style.set_property("width", "100vw")?;
    style.set_property("height", "100vh")?;

    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

/// Window inner size in physical pixels
#[cfg(target_arch = "wasm32")]
fn viewport_size(window: &Window) -> (u32, u32) {
    let dpr = window.device_pixel_ratio();
    let css = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
    let w = css(window.inner_width(), 800.0) * dpr;
    let h = css(window.inner_height(), 600.0) * dpr;
    ((w as u32).max(1), (h as u32).max(1))
}

#[cfg(target_arch = "wasm32")]
fn performance_now(window: &Window) -> f64 {
    window.performance().map(|p| p.now()).unwrap_or(0.0)
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    /// Run every animation frame until `running` is cleared
    fn start(self, running: Rc<Cell<bool>>) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !running.get() {
                tracing::info!("frame loop stopped");
                return;
            }
            inner.borrow_mut().as_mut()();

            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!("requestAnimationFrame failed: {e:?}");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            if let Err(e) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                tracing::error!("requestAnimationFrame start failed: {e:?}");
            }
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}
