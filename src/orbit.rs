//! Orbit camera controller: rotates, zooms and optionally pans a camera
//! around a fixed target.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::camera::PerspectiveCamera;

const PHI_EPS: f32 = 1.0e-6;
const MOVE_EPS: f32 = 1.0e-6;

/// A pointer gesture, already reduced to pixel deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitInput {
    Rotate { dx: f32, dy: f32, viewport_height: f32 },
    Pan { dx: f32, dy: f32, viewport_height: f32 },
    /// Positive steps move the camera towards the target.
    Zoom { steps: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pending {
    theta: f32,
    phi: f32,
    scale: f32,
    pan: Vec3,
}

impl Default for Pending {
    fn default() -> Self {
        Self {
            theta: 0.0,
            phi: 0.0,
            scale: 1.0,
            pan: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub auto_rotate: bool,
    /// 2.0 is one turn every 30 seconds at 60 ticks per second.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub(crate) pending: Pending,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            enable_rotate: true,
            enable_zoom: true,
            enable_pan: true,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pending: Pending::default(),
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Queues a gesture. Returns false when the gesture kind is disabled.
    pub fn handle(&mut self, input: OrbitInput, camera: &PerspectiveCamera) -> bool {
        match input {
            OrbitInput::Rotate {
                dx,
                dy,
                viewport_height,
            } => {
                if !self.enable_rotate || viewport_height <= 0.0 {
                    return false;
                }
                self.pending.theta -= TAU * dx / viewport_height * self.rotate_speed;
                self.pending.phi -= TAU * dy / viewport_height * self.rotate_speed;
                true
            }
            OrbitInput::Pan {
                dx,
                dy,
                viewport_height,
            } => {
                if !self.enable_pan || viewport_height <= 0.0 {
                    return false;
                }
                let distance = (camera.position - self.target).length();
                let span = 2.0 * distance * (0.5 * camera.fov.to_radians()).tan() / viewport_height;
                let forward = camera.forward();
                let right = forward.cross(camera.up).normalize_or_zero();
                let up = right.cross(forward);
                self.pending.pan += (-right * dx + up * dy) * span;
                true
            }
            OrbitInput::Zoom { steps } => {
                if !self.enable_zoom || steps == 0.0 {
                    return false;
                }
                self.pending.scale *= 0.95_f32.powf(self.zoom_speed * steps);
                true
            }
        }
    }

    pub fn auto_rotation_angle(&self) -> f32 {
        TAU / 60.0 / 60.0 * self.auto_rotate_speed
    }

    /// Queues one tick of auto-rotation. Does nothing while auto-rotate is off.
    pub fn step_auto_rotate(&mut self) -> bool {
        if !self.auto_rotate {
            return false;
        }
        self.pending.theta -= self.auto_rotation_angle();
        true
    }

    /// Applies queued motion to `camera`. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let pending = std::mem::take(&mut self.pending);

        let offset = camera.position - self.target;
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        theta += pending.theta;
        phi = (phi + pending.phi).clamp(PHI_EPS, PI - PHI_EPS);
        radius = (radius * pending.scale).clamp(self.min_distance, self.max_distance);
        self.target += pending.pan;

        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        let offset = Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * radius;

        let previous = camera.position;
        camera.position = self.target + offset;
        camera.look_at(self.target);

        previous.distance_squared(camera.position) > MOVE_EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(40.0, 1.0, 1.0, 200.0);
        camera.position = Vec3::new(-1.5, 2.5, 3.0);
        camera
    }

    fn controls() -> OrbitControls {
        OrbitControls {
            min_distance: 1.0,
            max_distance: 10.0,
            enable_pan: false,
            ..OrbitControls::default()
        }
    }

    #[test]
    fn update_without_input_keeps_the_camera() {
        let mut camera = camera();
        let mut controls = controls();
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::new(-1.5, 2.5, 3.0)).length() < 1.0e-4);
    }

    #[test]
    fn auto_rotate_orbits_at_constant_radius() {
        let mut camera = camera();
        let mut controls = controls();
        let radius = camera.position.length();

        assert!(!controls.step_auto_rotate());
        controls.auto_rotate = true;
        assert!(controls.step_auto_rotate());
        assert!(controls.update(&mut camera));
        assert!((camera.position.length() - radius).abs() < 1.0e-4);
        assert!((camera.position.y - 2.5).abs() < 1.0e-4);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = camera();
        let mut controls = controls();
        controls.handle(OrbitInput::Zoom { steps: 200.0 }, &camera);
        controls.update(&mut camera);
        assert!((camera.position.length() - 1.0).abs() < 1.0e-4);

        controls.handle(OrbitInput::Zoom { steps: -400.0 }, &camera);
        controls.update(&mut camera);
        assert!((camera.position.length() - 10.0).abs() < 1.0e-3);
    }

    #[test]
    fn pan_is_ignored_when_disabled() {
        let camera = camera();
        let mut controls = controls();
        let pan = OrbitInput::Pan {
            dx: 40.0,
            dy: 0.0,
            viewport_height: 600.0,
        };
        assert!(!controls.handle(pan, &camera));
        controls.enable_pan = true;
        assert!(controls.handle(pan, &camera));
    }

    #[test]
    fn rotation_never_flips_over_the_pole() {
        let mut camera = camera();
        let mut controls = controls();
        let drag = OrbitInput::Rotate {
            dx: 0.0,
            dy: 5000.0,
            viewport_height: 600.0,
        };
        controls.handle(drag, &camera);
        controls.update(&mut camera);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.x.hypot(camera.position.z) > 0.0);
    }
}
