//! Orbit camera for the model viewers.
//!
//! Spherical-coordinate camera orbiting a target point, with velocity
//! damping on drag input and fixed-step zoom buttons.

use glam::{Mat4, Vec3};

/// Distance change per zoom button press.
pub const ZOOM_STEP: f32 = 0.5;

const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 50.0;
/// Pitch clamp short of the poles (~80 degrees).
const PITCH_LIMIT: f32 = 1.4;
/// Drag pixels to radians before the rotate speed is applied.
const DRAG_SCALE: f32 = 0.005;

pub struct OrbitCamera {
    /// Horizontal angle (yaw) in radians.
    yaw: f32,
    /// Vertical angle (pitch) in radians.
    pitch: f32,
    /// Distance from target point.
    distance: f32,
    /// Point the camera orbits around.
    target: Vec3,
    /// Aspect ratio (width/height) for projection.
    aspect: f32,
    /// Field of view in radians.
    fov: f32,
    near: f32,
    far: f32,
    /// Residual drag velocity, decayed each frame.
    yaw_velocity: f32,
    pitch_velocity: f32,
    /// Drag input multiplier.
    rotate_speed: f32,
    /// Fraction of velocity shed per frame.
    damping: f32,
}

impl OrbitCamera {
    /// Camera looking at the origin from roughly (0, 1, 3).
    pub fn new() -> Self {
        let start = Vec3::new(0.0, 1.0, 3.0);
        Self {
            yaw: 0.0,
            pitch: (start.y / start.length()).asin(),
            distance: start.length(),
            target: Vec3::ZERO,
            aspect: 16.0 / 9.0,
            fov: 75.0_f32.to_radians(),
            near: 0.1,
            far: 10000.0,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            rotate_speed: 0.5,
            damping: 0.25,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera position from spherical coordinates.
    pub fn eye_position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Feed a pointer drag into the orbit velocity.
    pub fn on_drag(&mut self, delta: (f32, f32)) {
        self.yaw_velocity += delta.0 * DRAG_SCALE * self.rotate_speed;
        self.pitch_velocity += delta.1 * DRAG_SCALE * self.rotate_speed;
    }

    /// Multiplicative wheel zoom.
    pub fn on_scroll(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * 0.1)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Apply residual velocity and shed it by the damping factor.
    pub fn update(&mut self) {
        self.yaw += self.yaw_velocity;
        self.pitch = (self.pitch - self.pitch_velocity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let keep = 1.0 - self.damping;
        self.yaw_velocity *= keep;
        self.pitch_velocity *= keep;
        if self.yaw_velocity.abs() < 1e-5 {
            self.yaw_velocity = 0.0;
        }
        if self.pitch_velocity.abs() < 1e-5 {
            self.pitch_velocity = 0.0;
        }
    }

    /// Step the camera closer by one zoom increment.
    pub fn zoom_in(&mut self) {
        self.distance = (self.distance - ZOOM_STEP).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Step the camera away by one zoom increment.
    pub fn zoom_out(&mut self) {
        self.distance = (self.distance + ZOOM_STEP).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn reset(&mut self) {
        *self = Self::new_with_aspect(self.aspect);
    }

    fn new_with_aspect(aspect: f32) -> Self {
        let mut camera = Self::new();
        camera.aspect = aspect;
        camera
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye_position() {
        let camera = OrbitCamera::new();
        let eye = camera.eye_position();
        assert!(eye.x.abs() < 1e-4);
        assert!((eye.y - 1.0).abs() < 1e-4, "eye y {} should be 1", eye.y);
        assert!((eye.z - 3.0).abs() < 1e-4, "eye z {} should be 3", eye.z);
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut camera = OrbitCamera::new();
        let start = camera.distance();
        camera.zoom_in();
        assert!((camera.distance() - (start - ZOOM_STEP)).abs() < 1e-6);
        camera.zoom_out();
        camera.zoom_out();
        assert!((camera.distance() - (start + ZOOM_STEP)).abs() < 1e-6);

        for _ in 0..200 {
            camera.zoom_in();
        }
        assert_eq!(camera.distance(), MIN_DISTANCE, "zoom-in clamps");
        for _ in 0..200 {
            camera.zoom_out();
        }
        assert_eq!(camera.distance(), MAX_DISTANCE, "zoom-out clamps");
    }

    #[test]
    fn test_drag_velocity_decays() {
        let mut camera = OrbitCamera::new();
        camera.on_drag((100.0, 0.0));
        let yaw_before = camera.yaw();
        camera.update();
        let first_turn = camera.yaw() - yaw_before;
        assert!(first_turn > 0.0, "drag must orbit the camera");

        camera.update();
        let second_turn = camera.yaw() - yaw_before - first_turn;
        assert!(
            second_turn < first_turn && second_turn > 0.0,
            "damping keeps a decaying residual turn"
        );
        for _ in 0..100 {
            camera.update();
        }
        let settled = camera.yaw();
        camera.update();
        assert_eq!(camera.yaw(), settled, "velocity eventually reaches zero");
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = OrbitCamera::new();
        camera.on_drag((0.0, -100000.0));
        for _ in 0..50 {
            camera.update();
        }
        assert!(camera.pitch() <= PITCH_LIMIT);
        assert!(camera.pitch() >= -PITCH_LIMIT);
    }

    #[test]
    fn test_set_aspect_rejects_degenerate() {
        let mut camera = OrbitCamera::new();
        camera.set_aspect(2.0);
        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        let proj = camera.projection_matrix();
        assert!(proj.is_finite(), "projection must stay finite");
    }
}
