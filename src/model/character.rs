use glam::{Mat4, Quat, Vec3};
use std::f32::consts::PI;

/// Discrete rotations of the character about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Facing {
    /// Default orientation, back to the camera.
    Back,
    Left,
    Right,
    /// Set when a jump key is released. Distinct from `Back` on purpose.
    FullTurn,
}

impl Facing {
    pub fn yaw(&self) -> f32 {
        match self {
            Facing::Back => PI,
            Facing::Left => 1.5 * PI,
            Facing::Right => 0.5 * PI,
            Facing::FullTurn => 2.0 * PI,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Facing::Back => "back",
            Facing::Left => "left",
            Facing::Right => "right",
            Facing::FullTurn => "full turn",
        }
    }
}

/// Character placement in the world. Only `position.x` ever changes.
#[derive(Debug, Clone)]
pub struct CharacterTransform {
    pub position: Vec3,
    pub facing: Facing,
    pub scale: f32,
}

impl CharacterTransform {
    pub fn new(scale: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            facing: Facing::Back,
            scale,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.facing.yaw()),
            self.position,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_facing_values() {
        assert_relative_eq!(Facing::Back.yaw(), PI);
        assert_relative_eq!(Facing::Left.yaw(), 3.0 * PI / 2.0);
        assert_relative_eq!(Facing::Right.yaw(), PI / 2.0);
        assert_relative_eq!(Facing::FullTurn.yaw(), 2.0 * PI);
        assert_ne!(Facing::FullTurn, Facing::Back);
    }

    #[test]
    fn test_model_matrix_scales_and_translates() {
        let mut t = CharacterTransform::new(0.01);
        t.position.x = 3.0;
        let p = t.model_matrix().transform_point3(Vec3::ZERO);
        assert_relative_eq!(p.x, 3.0);
        let up = t.model_matrix().transform_point3(Vec3::new(0.0, 100.0, 0.0));
        assert_relative_eq!(up.y, 1.0, epsilon = 1e-5);
    }
}
