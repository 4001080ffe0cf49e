use egui::Context;
use glam::Vec3;

use crate::controller::{CharacterController, LoadStatus, SceneEngine};
use crate::model::{AnimationName, Facing};

pub const TITLE: &str = "Welcome to Our Landing Page";

/// Snapshot of controller state shown by the overlay
#[derive(Debug, Clone)]
pub struct OverlayStats {
    pub fps: f32,
    pub status: LoadStatus,
    pub animation: Option<AnimationName>,
    pub position: Vec3,
    pub facing: Facing,
}

impl OverlayStats {
    pub fn from_controller<E: SceneEngine>(controller: &CharacterController<E>, fps: f32) -> Self {
        let transform = controller.transform();
        Self {
            fps,
            status: controller.status().clone(),
            animation: controller.current_animation(),
            position: transform.position,
            facing: transform.facing,
        }
    }
}

/// Line shown under the title while the character is not on screen
pub fn status_line(status: &LoadStatus) -> Option<String> {
    match status {
        LoadStatus::Loading => Some("Loading character...".to_string()),
        LoadStatus::Unavailable { reason } => Some(format!("Character unavailable: {reason}")),
        LoadStatus::Ready | LoadStatus::TornDown => None,
    }
}

/// Build the complete UI and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, stats: &OverlayStats) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_title(ctx, stats);
        draw_debug_window(ctx, stats);
    })
}

fn draw_title(ctx: &Context, stats: &OverlayStats) {
    egui::Area::new(egui::Id::new("title"))
        .anchor(egui::Align2::CENTER_TOP, [0.0, 20.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new(TITLE)
                        .size(32.0)
                        .strong()
                        .color(egui::Color32::from_rgb(0x33, 0x33, 0x33)),
                );
                if let Some(line) = status_line(&stats.status) {
                    ui.label(egui::RichText::new(line).color(egui::Color32::from_rgb(0x80, 0x80, 0x80)));
                }
            });
        });
}

fn draw_debug_window(ctx: &Context, stats: &OverlayStats) {
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .default_open(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", stats.fps)).small());
            let animation = stats.animation.map(|a| a.as_str()).unwrap_or("-");
            ui.label(egui::RichText::new(format!("Animation: {animation}")).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.2}", stats.position.x)).small());
            ui.label(egui::RichText::new(format!("Facing: {}", stats.facing.label())).small());
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("Left/Right - Walk, hold to run").small());
            ui.label(egui::RichText::new("Up/Down - Jump").small());
        });
}

/// egui input for a canvas of `width` x `height` physical pixels
pub fn raw_input_for(width: u32, height: u32, pixels_per_point: f32, now_ms: f64) -> egui::RawInput {
    egui::RawInput {
        time: Some(now_ms / 1000.0),
        screen_rect: Some(egui::Rect::from_min_size(
            egui::Pos2::new(0.0, 0.0),
            egui::vec2(width as f32 / pixels_per_point, height as f32 / pixels_per_point),
        )),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_per_state() {
        assert!(status_line(&LoadStatus::Loading).is_some());
        assert_eq!(status_line(&LoadStatus::Ready), None);
        let line = status_line(&LoadStatus::Unavailable { reason: "HTTP 404".into() }).unwrap();
        assert!(line.contains("HTTP 404"));
    }

    #[test]
    fn test_raw_input_uses_logical_points() {
        let input = raw_input_for(1600, 1200, 2.0, 1500.0);
        let rect = input.screen_rect.unwrap();
        assert_eq!(rect.width(), 800.0);
        assert_eq!(rect.height(), 600.0);
        assert_eq!(input.time, Some(1.5));
    }

    #[test]
    fn test_overlay_builds_without_panicking() {
        let ctx = Context::default();
        let stats = OverlayStats {
            fps: 60.0,
            status: LoadStatus::Loading,
            animation: None,
            position: Vec3::ZERO,
            facing: Facing::Back,
        };
        // New areas are measured invisibly on their first frame
        build_ui(&ctx, raw_input_for(800, 600, 1.0, 0.0), &stats);
        let output = build_ui(&ctx, raw_input_for(800, 600, 1.0, 16.0), &stats);
        assert!(!output.shapes.is_empty());
    }
}
