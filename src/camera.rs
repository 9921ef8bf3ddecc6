use glam::{Mat4, Vec2, Vec3};

use crate::geometry::Ray;

/// Rectangle of the drawing surface in client (logical pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 1.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov,
            aspect,
            near,
            far,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a point given in normalized device coordinates.
    pub fn ray_through(&self, ndc: Vec2) -> Ray {
        let forward = self.forward();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);

        let half_h = (0.5 * self.fov.to_radians()).tan();
        let half_w = half_h * self.aspect;

        let dir = (forward + right * (ndc.x * half_w) + up * (ndc.y * half_h)).normalize_or_zero();
        Ray::new(self.position, dir)
    }
}

/// Maps a client-space pointer position onto NDC of `bounds`, Y pointing up.
pub fn client_to_ndc(x: f32, y: f32, bounds: SurfaceRect) -> Option<Vec2> {
    if bounds.width <= 1.0 || bounds.height <= 1.0 {
        return None;
    }

    let x_ndc = ((x - bounds.x) / bounds.width) * 2.0 - 1.0;
    let y_ndc = 1.0 - ((y - bounds.y) / bounds.height) * 2.0;
    Some(Vec2::new(x_ndc, y_ndc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at_z5() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.look_at(Vec3::ZERO);
        camera
    }

    #[test]
    fn ndc_spans_the_surface_with_inverted_y() {
        let bounds = SurfaceRect::sized(800.0, 600.0);
        assert_eq!(client_to_ndc(0.0, 0.0, bounds), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(client_to_ndc(800.0, 600.0, bounds), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(client_to_ndc(400.0, 300.0, bounds), Some(Vec2::ZERO));
    }

    #[test]
    fn ndc_accounts_for_surface_offset() {
        let bounds = SurfaceRect::new(100.0, 50.0, 200.0, 100.0);
        assert_eq!(client_to_ndc(200.0, 100.0, bounds), Some(Vec2::ZERO));
    }

    #[test]
    fn degenerate_surface_has_no_ndc() {
        assert!(client_to_ndc(1.0, 1.0, SurfaceRect::sized(0.0, 600.0)).is_none());
    }

    #[test]
    fn center_ray_points_at_target() {
        let camera = camera_at_z5();
        let ray = camera.ray_through(Vec2::ZERO);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1.0e-6);
    }

    #[test]
    fn edge_ray_matches_half_fov() {
        let camera = camera_at_z5();
        let ray = camera.ray_through(Vec2::new(0.0, 1.0));
        let angle = ray.direction.angle_between(Vec3::NEG_Z);
        assert!((angle - 37.5_f32.to_radians()).abs() < 1.0e-4);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn projected_target_lands_in_view_center() {
        let camera = camera_at_z5();
        let clip = camera.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1.0e-6 && ndc.y.abs() < 1.0e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
