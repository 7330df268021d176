//! Camera manipulation state machine.
//!
//! Button-down captures the camera and cursor; while the button is held,
//! orbit/pan/roll poses are derived from that captured state and the
//! current cursor, so intermediate frames never accumulate error. Release
//! drops the capture. Wheel input zooms toward the target or, with a
//! modifier, adjusts the clip distances.
//!
//! Cursor positions are normalized viewport coordinates in `[0, 1]` with
//! the origin at the top-left; the event loop owns the conversion.

use glam::{Mat3, Vec2, Vec3};

use super::Camera;

const PI: f32 = std::f32::consts::PI;

/// What a held drag manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Rotate the eye around the target (primary button).
    Orbit,
    /// Translate eye and target in the view plane (secondary button).
    Pan,
    /// Rotate the up vector around the view axis (middle button).
    Roll,
}

/// What wheel input adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelAction {
    Zoom,
    AdjustNear,
    AdjustFar,
}

#[derive(Debug, Clone)]
struct Capture {
    camera: Camera,
    cursor: Vec2,
    mode: DragMode,
}

/// Orbit/pan/roll controller over a [`Camera`].
#[derive(Debug, Clone)]
pub struct OrbitController {
    /// Scene extent used to scale pan distances to world units.
    pub scene_diagonal: Vec3,
    /// Zoom ratio per wheel step.
    pub zoom_factor: f32,
    captured: Option<Capture>,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            scene_diagonal: Vec3::ONE,
            zoom_factor: 1.05,
            captured: None,
        }
    }
}

impl OrbitController {
    pub fn new(scene_diagonal: Vec3) -> Self {
        Self {
            scene_diagonal,
            ..Self::default()
        }
    }

    /// Capture camera and cursor at button-down.
    pub fn begin_drag(&mut self, camera: &Camera, cursor: Vec2, mode: DragMode) {
        self.captured = Some(Capture {
            camera: camera.clone(),
            cursor,
            mode,
        });
    }

    /// Drop the capture at button-up.
    pub fn end_drag(&mut self) {
        self.captured = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.captured.is_some()
    }

    /// Derive the camera pose for the current cursor from the captured
    /// state. No-op while no drag is active.
    pub fn update_drag(&mut self, camera: &mut Camera, cursor: Vec2) {
        let Some(capture) = &self.captured else {
            return;
        };
        let delta = cursor - capture.cursor;
        let reference = &capture.camera;
        let direction = reference.position - reference.target;

        match capture.mode {
            DragMode::Orbit => {
                let angles = delta * Vec2::new(-PI, PI / 2.0);
                let rot_x = Mat3::from_axis_angle(reference.up_direction(), angles.x);
                let rot_y = Mat3::from_axis_angle(reference.right(), angles.y);
                camera.position = reference.target + rot_y * (rot_x * direction);
                camera.up = rot_y * (rot_x * reference.up);
            }
            DragMode::Pan => {
                let scaling = self.scene_diagonal.length();
                let delta_world =
                    scaling * (Mat3::from_mat4(reference.inverse_view()) * delta.extend(0.0));
                camera.position = reference.position - delta_world;
                camera.target = reference.target - delta_world;
            }
            DragMode::Roll => {
                let src_dir = capture.cursor - Vec2::splat(0.5);
                let dst_dir = cursor - Vec2::splat(0.5);
                let angle = (src_dir.perp_dot(dst_dir)).atan2(src_dir.dot(dst_dir));
                let rot_z = Mat3::from_axis_angle(reference.front(), angle);
                camera.position = reference.target + rot_z * direction;
                camera.up = rot_z * reference.up;
            }
        }
        camera.update();
    }

    /// Apply one wheel step.
    pub fn apply_wheel(&self, camera: &mut Camera, delta: f32, action: WheelAction) {
        if delta == 0.0 {
            return;
        }
        let ratio = self.zoom_factor.powf(-delta);
        match action {
            WheelAction::Zoom => {
                camera.position = camera.target + ratio * (camera.position - camera.target);
            }
            WheelAction::AdjustNear => {
                camera.near = (camera.near / ratio).min(camera.far);
            }
            WheelAction::AdjustFar => {
                camera.far = (camera.far / ratio).max(camera.near);
            }
        }
        camera.update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_commits_until_drag_updates() {
        let mut camera = Camera::default();
        let before = camera.position;
        let mut controller = OrbitController::default();
        controller.begin_drag(&camera, Vec2::splat(0.5), DragMode::Orbit);
        assert!(controller.is_dragging());
        assert_eq!(camera.position, before);
    }

    #[test]
    fn test_orbit_preserves_distance() {
        let mut camera = Camera::default();
        let distance = (camera.position - camera.target).length();
        let mut controller = OrbitController::default();
        controller.begin_drag(&camera, Vec2::splat(0.5), DragMode::Orbit);
        controller.update_drag(&mut camera, Vec2::new(0.8, 0.6));
        let after = (camera.position - camera.target).length();
        assert!((after - distance).abs() < 1e-4);
        assert_ne!(camera.position, Camera::default().position);
    }

    #[test]
    fn test_drag_is_relative_to_capture_not_cumulative() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::default();
        controller.begin_drag(&camera, Vec2::splat(0.5), DragMode::Orbit);
        controller.update_drag(&mut camera, Vec2::new(0.7, 0.5));
        let once = camera.position;
        // Returning the cursor to the captured point restores the pose.
        controller.update_drag(&mut camera, Vec2::splat(0.5));
        let restored = camera.position;
        assert!((restored - Camera::default().position).length() < 1e-4);
        assert_ne!(once, restored);
    }

    #[test]
    fn test_pan_moves_position_and_target_together() {
        let mut camera = Camera::default();
        let offset = camera.position - camera.target;
        let mut controller = OrbitController::new(Vec3::splat(2.0));
        controller.begin_drag(&camera, Vec2::splat(0.5), DragMode::Pan);
        controller.update_drag(&mut camera, Vec2::new(0.6, 0.4));
        assert!(((camera.position - camera.target) - offset).length() < 1e-4);
        assert_ne!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn test_wheel_zoom_and_clip_adjust() {
        let mut camera = Camera::default();
        let controller = OrbitController::default();
        let distance = (camera.position - camera.target).length();
        controller.apply_wheel(&mut camera, 1.0, WheelAction::Zoom);
        assert!((camera.position - camera.target).length() < distance);

        let far = camera.far;
        controller.apply_wheel(&mut camera, 1.0, WheelAction::AdjustFar);
        assert!(camera.far < far);
        assert!(camera.far >= camera.near);
    }
}
