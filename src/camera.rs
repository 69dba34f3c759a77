//! Interactive orbit camera around the scene origin.

use glam::{Mat4, Vec3};

use crate::params::{OrbitConstraints, RenderConfig};

/// Orbit camera state in spherical coordinates.
///
/// Mouse drag rotates azimuth/polar, the wheel zooms. Distance and polar
/// angle are clamped so the view stays between 5 and 8 units out and never
/// dips below the horizontal plane.
pub struct OrbitCamera {
    /// Azimuth around +Y (radians)
    yaw: f32,

    /// Polar angle from +Y (radians)
    polar: f32,

    /// Distance from the origin (scene units)
    distance: f32,

    constraints: OrbitConstraints,
}

impl OrbitCamera {
    /// Create an orbit camera looking at the origin from `eye`.
    pub fn from_eye(eye: Vec3, constraints: OrbitConstraints) -> Self {
        let distance = eye
            .length()
            .clamp(constraints.min_distance, constraints.max_distance);
        let polar = (eye.y / eye.length().max(1e-6))
            .clamp(-1.0, 1.0)
            .acos()
            .clamp(constraints.min_polar, constraints.max_polar);
        let yaw = eye.z.atan2(eye.x);

        Self {
            yaw,
            polar,
            distance,
            constraints,
        }
    }

    /// Apply a mouse drag delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.constraints.rotate_speed;
        self.polar = (self.polar - dy * self.constraints.rotate_speed)
            .clamp(self.constraints.min_polar, self.constraints.max_polar);
    }

    /// Apply a scroll delta in lines (positive zooms in).
    pub fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance - lines * self.constraints.zoom_speed)
            .clamp(self.constraints.min_distance, self.constraints.max_distance);
    }

    /// Current camera position.
    pub fn eye(&self) -> Vec3 {
        self.distance
            * Vec3::new(
                self.polar.sin() * self.yaw.cos(),
                self.polar.cos(),
                self.polar.sin() * self.yaw.sin(),
            )
    }

    /// Create view-projection matrix for rendering.
    ///
    /// # Returns
    /// Tuple of (view_proj_matrix, camera_position)
    pub fn view_proj(&self, render_config: &RenderConfig) -> (Mat4, Vec3) {
        let eye = self.eye();

        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane,
            render_config.far_plane,
        );

        (proj * view, eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        let config = RenderConfig::default();
        OrbitCamera::from_eye(Vec3::from_array(config.initial_eye), OrbitConstraints::default())
    }

    #[test]
    fn test_from_eye_round_trip() {
        let cam = camera();
        let expected = Vec3::new(-5.0, 2.3, -5.5);

        // Initial position is within the distance constraints, so it is
        // reproduced exactly (up to float error)
        assert!((cam.eye() - expected).length() < 1e-4);
    }

    #[test]
    fn test_zoom_clamps_distance() {
        let mut cam = camera();

        for _ in 0..100 {
            cam.zoom(1.0);
        }
        assert!((cam.eye().length() - 5.0).abs() < 1e-4);

        for _ in 0..100 {
            cam.zoom(-1.0);
        }
        assert!((cam.eye().length() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotate_clamps_polar_above_horizon() {
        let mut cam = camera();

        // Drag hard downward: camera must never sink below the horizontal
        // plane through the origin
        for _ in 0..1000 {
            cam.rotate(0.0, -10.0);
            assert!(cam.eye().y >= -1e-4);
        }

        // And hard upward: never past the pole
        for _ in 0..1000 {
            cam.rotate(0.0, 10.0);
            assert!(cam.eye().y <= cam.eye().length());
        }
    }

    #[test]
    fn test_view_proj_matrix_generation() {
        let cam = camera();
        let render_config = RenderConfig::default();

        let (view_proj, eye) = cam.view_proj(&render_config);

        assert_ne!(view_proj, Mat4::IDENTITY);
        assert_ne!(view_proj, Mat4::ZERO);
        assert!(eye.x.is_finite());
        assert!(eye.y.is_finite());
        assert!(eye.z.is_finite());
    }
}
