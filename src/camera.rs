//! Camera system: origin orbit for classic/bpm, travel-following for
//! journey mode.

use glam::{Mat4, Vec3};
use std::f32::consts::TAU;

use crate::params::{RenderConfig, Settings, VisualizerMode};

/// Orbit distance from the origin (world units)
const ORBIT_RADIUS: f32 = 50.0;

/// Per-frame orbit step per unit of camera speed (radians)
const ORBIT_STEP: f32 = TAU / 1800.0;

/// How far the eye trails the journey position (world units)
const FOLLOW_TRAIL: f32 = 30.0;

/// How far ahead of the journey position the camera looks (world units)
const FOLLOW_LEAD: f32 = 20.0;

/// Everything the renderer needs from the camera for one frame
pub struct CameraFrame {
    pub view_proj: Mat4,
    pub eye: Vec3,
    /// Billboard basis for camera-facing quads
    pub right: Vec3,
    pub up: Vec3,
}

/// Stateful camera: orbit angle persists across frames.
pub struct CameraSystem {
    orbit_angle: f32,
}

impl CameraSystem {
    pub fn new() -> Self {
        Self { orbit_angle: 0.0 }
    }

    /// Compute eye and look-at target for the current frame.
    ///
    /// Classic/bpm orbit the origin, advancing by `camera_speed` steps per
    /// frame. Journey trails the travel position and looks ahead of it.
    pub fn compute_position_and_target(
        &mut self,
        settings: &Settings,
        journey_position: f32,
    ) -> (Vec3, Vec3) {
        match settings.mode {
            VisualizerMode::Journey => {
                let eye = Vec3::new(0.0, 0.0, journey_position - FOLLOW_TRAIL);
                let target = Vec3::new(0.0, 0.0, journey_position + FOLLOW_LEAD);
                (eye, target)
            }
            _ => {
                self.orbit_angle += settings.camera_speed * 2.0 * ORBIT_STEP;
                let eye = Vec3::new(
                    self.orbit_angle.sin() * ORBIT_RADIUS,
                    0.0,
                    self.orbit_angle.cos() * ORBIT_RADIUS,
                );
                (eye, Vec3::ZERO)
            }
        }
    }

    /// Build the full camera frame (view-projection + billboard basis)
    pub fn frame(
        &mut self,
        settings: &Settings,
        journey_position: f32,
        render_config: &RenderConfig,
    ) -> CameraFrame {
        let (eye, target) = self.compute_position_and_target(settings, journey_position);

        // The camera never rolls
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane,
            render_config.far_plane,
        );

        let forward = (target - eye).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);

        CameraFrame {
            view_proj: proj * view,
            eye,
            right,
            up,
        }
    }

    /// Return the orbit to its starting angle
    pub fn reset(&mut self) {
        self.orbit_angle = 0.0;
    }
}

impl Default for CameraSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_keeps_radius() {
        let mut camera = CameraSystem::new();
        let mut settings = Settings::default();
        settings.camera_speed = 2.0;

        for _ in 0..100 {
            let (eye, target) = camera.compute_position_and_target(&settings, 0.0);
            assert!((eye.length() - ORBIT_RADIUS).abs() < 1e-3);
            assert_eq!(target, Vec3::ZERO);
        }
    }

    #[test]
    fn test_orbit_static_without_speed() {
        let mut camera = CameraSystem::new();
        let settings = Settings::default(); // camera_speed 0

        let (first, _) = camera.compute_position_and_target(&settings, 0.0);
        for _ in 0..10 {
            let (eye, _) = camera.compute_position_and_target(&settings, 0.0);
            assert_eq!(eye, first);
        }
    }

    #[test]
    fn test_journey_follow_brackets_position() {
        let mut camera = CameraSystem::new();
        let mut settings = Settings::default();
        settings.mode = VisualizerMode::Journey;

        let (eye, target) = camera.compute_position_and_target(&settings, 100.0);
        assert_eq!(eye.z, 70.0);
        assert_eq!(target.z, 120.0);
        assert!(target.z > eye.z);
    }

    #[test]
    fn test_frame_matrices_are_finite() {
        let mut camera = CameraSystem::new();
        let settings = Settings::default();
        let render_config = RenderConfig::default();

        let frame = camera.frame(&settings, 0.0, &render_config);

        assert_ne!(frame.view_proj, Mat4::IDENTITY);
        assert!(frame.eye.is_finite());
        assert!(frame.right.is_finite());
        assert!(frame.up.is_finite());
    }

    #[test]
    fn test_billboard_basis_is_orthonormal() {
        let mut camera = CameraSystem::new();
        let mut settings = Settings::default();
        settings.mode = VisualizerMode::Journey;

        let frame = camera.frame(&settings, 42.0, &RenderConfig::default());

        assert!((frame.right.length() - 1.0).abs() < 1e-5);
        assert!((frame.up.length() - 1.0).abs() < 1e-5);
        assert!(frame.right.dot(frame.up).abs() < 1e-5);
    }
}
