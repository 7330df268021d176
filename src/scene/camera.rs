//! Camera value type.

use glam::{Mat3, Mat4, Vec3};

/// A perspective camera: position/target/up plus projection parameters,
/// with matrices and the ray-direction basis derived by [`Camera::update`].
///
/// Pure value type; cloning it is how manipulation state machines capture a
/// reference pose.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport size backing the aspect ratio.
    pub width: f32,
    pub height: f32,

    view: Mat4,
    proj: Mat4,
    view_proj: Mat4,
    inverse_view: Mat4,
    ray_derivatives: Mat3,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::splat(1.5),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_y: 60.0f32.to_radians(),
            near: 1e-2,
            far: 1e2,
            width: 1.0,
            height: 1.0,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            ray_derivatives: Mat3::IDENTITY,
        };
        camera.update();
        camera
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            position,
            target,
            ..Self::default()
        };
        camera.update();
        camera
    }

    /// Recompute every derived matrix from the current parameters.
    pub fn update(&mut self) {
        let aspect = self.width / self.height;
        self.proj = Mat4::perspective_rh_gl(self.fov_y, aspect, self.near, self.far);
        self.view = Mat4::look_at_rh(self.position, self.target, self.up);
        self.view_proj = self.proj * self.view;
        self.inverse_view = self.view.inverse();

        // Ray dir = x * rd0 + y * rd1 + rd2 for x, y in [0, 1].
        let h_world = 2.0 * (self.fov_y / 2.0).tan();
        let w_world = h_world * aspect;
        let rd0 = w_world * self.right();
        let rd1 = -h_world * self.up_direction();
        let rd2 = self.front() - (rd0 + rd1) / 2.0;
        self.ray_derivatives = Mat3::from_cols(rd0, rd1, rd2);
    }

    /// Set the viewport size backing the aspect ratio.
    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// Per-pixel ray direction basis (see [`Camera::update`]).
    pub fn ray_derivatives(&self) -> Mat3 {
        self.ray_derivatives
    }

    /// Viewing direction, from the view frame.
    pub fn front(&self) -> Vec3 {
        -self.inverse_view.z_axis.truncate()
    }

    pub fn right(&self) -> Vec3 {
        self.inverse_view.x_axis.truncate()
    }

    pub fn up_direction(&self) -> Vec3 {
        self.inverse_view.y_axis.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_points_at_target() {
        let mut camera = Camera::new(Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO);
        camera.update();
        let front = camera.front();
        assert!((front - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_view_proj_composition() {
        let camera = Camera::default();
        let vp = camera.view_proj();
        let expected = camera.proj() * camera.view();
        assert!((vp.to_cols_array()
            .iter()
            .zip(expected.to_cols_array().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max))
            < 1e-6);
    }

    #[test]
    fn test_ray_basis_center_matches_front() {
        let camera = Camera::default();
        let rd = camera.ray_derivatives();
        // x = y = 0.5 lands on the view axis.
        let center = 0.5 * rd.x_axis + 0.5 * rd.y_axis + rd.z_axis;
        let front = camera.front();
        assert!((center.normalize() - front).length() < 1e-5);
    }
}
