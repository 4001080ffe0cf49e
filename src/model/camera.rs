use glam::{Mat4, Vec3};
use crate::config::ControllerConfig;

/// Perspective camera that trails the character along the x axis.
#[derive(Debug, Clone)]
pub struct FollowCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl FollowCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::new(0.0, 1.0, 0.0),
            up: Vec3::Y,
            fov_y: 100f32.to_radians(),
            aspect: aspect_ratio(width, height),
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    /// Recompute eye and target from the character's feet position
    pub fn follow(&mut self, feet: Vec3, config: &ControllerConfig) {
        self.eye = Vec3::new(feet.x, config.camera_height, config.camera_distance);
        self.target = feet + Vec3::new(0.0, config.look_at_height, 0.0);
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = aspect_ratio(width, height); }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }
}

// Zero-sized surfaces show up while a window is minimized.
fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_pose_matches_idle_framing() {
        let cam = FollowCamera::new(800, 600);
        assert_eq!(cam.eye, Vec3::new(0.0, 2.0, 5.0));
        assert_eq!(cam.target, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(cam.aspect, 800.0 / 600.0);
    }

    #[test]
    fn test_follow_tracks_x_only() {
        let mut cam = FollowCamera::new(800, 600);
        let cfg = ControllerConfig::default();
        cam.follow(Vec3::new(-4.5, 0.0, 0.0), &cfg);
        assert_eq!(cam.eye, Vec3::new(-4.5, 2.0, 5.0));
        assert_eq!(cam.target, Vec3::new(-4.5, 1.0, 0.0));
    }

    #[test]
    fn test_set_aspect_handles_zero_height() {
        let mut cam = FollowCamera::new(800, 600);
        cam.set_aspect(1920, 1080);
        assert_relative_eq!(cam.aspect, 1920.0 / 1080.0);
        cam.set_aspect(100, 0);
        assert!(cam.aspect.is_finite());
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let cam = FollowCamera::new(800, 600);
        let clip = cam.view_proj() * cam.target.extend(1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }
}
