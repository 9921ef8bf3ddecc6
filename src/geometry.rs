use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// The same ray expressed in the space that `world_to_local` maps into.
    /// The direction is not renormalized so distances stay comparable.
    pub fn transformed(&self, world_to_local: Mat4) -> Ray {
        Ray {
            origin: world_to_local.transform_point3(self.origin),
            direction: world_to_local.transform_vector3(self.direction),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        if points.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        Self { min, max }
    }

    /// Slab test. Returns the entry distance along the ray, or the exit distance
    /// when the origin is inside the box. Hits behind the origin are ignored.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let inv = ray.direction.recip();

        let t1 = (self.min - ray.origin) * inv;
        let t2 = (self.max - ray.origin) * inv;

        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();

        if tmax.is_nan() || tmin.is_nan() || tmax < tmin || tmax < 0.0 {
            return None;
        }

        Some(if tmin >= 0.0 { tmin } else { tmax })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Cuboid { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32, width_segments: u32, height_segments: u32 },
}

/// Immutable triangle geometry shared by reference between meshes and the renderer.
#[derive(Debug)]
pub struct Geometry {
    id: u64,
    shape: Shape,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Aabb,
}

impl Geometry {
    fn build(shape: Shape, positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            shape,
            positions,
            normals,
            indices,
            bounds,
        }
    }

    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = Vec3::new(width, height, depth) * 0.5;

        // (normal, u, v) with u x v == normal so every face winds counter-clockwise.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((normal + u * su + v * sv) * half);
                normals.push(normal);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::build(
            Shape::Cuboid {
                width,
                height,
                depth,
            },
            positions,
            normals,
            indices,
        )
    }

    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);

        let mut positions = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());

        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            let (sin_t, cos_t) = (v * std::f32::consts::PI).sin_cos();
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let (sin_p, cos_p) = (u * std::f32::consts::TAU).sin_cos();
                let normal = Vec3::new(-cos_p * sin_t, cos_t, sin_p * sin_t);
                positions.push(normal * radius);
                normals.push(normal.normalize_or_zero());
            }
        }

        let row = ws + 1;
        let mut indices = Vec::new();
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::build(
            Shape::Sphere {
                radius,
                width_segments: ws,
                height_segments: hs,
            },
            positions,
            normals,
            indices,
        )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_faces_point_outward() {
        let cube = Geometry::cuboid(1.0, 1.0, 1.0);
        assert_eq!(cube.positions().len(), 24);
        assert_eq!(cube.indices().len(), 36);

        for tri in cube.indices().chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| cube.positions()[i as usize]);
            let face_normal = (b - a).cross(c - a).normalize();
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0);
        }
        assert_eq!(cube.bounds().min, Vec3::splat(-0.5));
        assert_eq!(cube.bounds().max, Vec3::splat(0.5));
    }

    #[test]
    fn sphere_vertices_sit_on_radius() {
        let sphere = Geometry::uv_sphere(0.5, 48, 24);
        assert_eq!(sphere.positions().len(), 49 * 25);
        assert_eq!(sphere.indices().len(), (48 * 2 * 23 * 3) as usize);
        assert!(sphere.positions().iter().all(|p| (p.length() - 0.5).abs() < 1.0e-5));
    }

    #[test]
    fn geometry_ids_are_unique() {
        let a = Geometry::cuboid(1.0, 1.0, 1.0);
        let b = Geometry::cuboid(1.0, 1.0, 1.0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn slab_hit_and_miss() {
        let unit = Aabb {
            min: Vec3::splat(-0.5),
            max: Vec3::splat(0.5),
        };

        let through = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert_eq!(unit.intersect(&through), Some(4.5));

        let beside = Ray::new(Vec3::new(0.75, 0.0, 5.0), Vec3::NEG_Z);
        assert_eq!(unit.intersect(&beside), None);

        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert_eq!(unit.intersect(&away), None);

        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(unit.intersect(&inside), Some(0.5));
    }
}
