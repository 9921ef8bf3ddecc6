//! Clip planes and the rules that combine them.
//!
//! Planes live in a [`PlaneStore`] arena. Materials and plane helpers hold
//! [`PlaneId`]s into it, so writing a plane constant once is visible to every
//! consumer on the next render without any propagation step.

use glam::{Vec3, Vec4};

use crate::material::Color;

/// Upper bound on planes a single material can reference (GPU uniform slots).
pub const MAX_CLIP_PLANES: usize = 4;

/// Half-space boundary. A point is on the visible side when
/// `dot(normal, p) + constant >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    pub normal: Vec3,
    pub constant: f32,
}

impl ClipPlane {
    pub fn new(normal: Vec3, constant: f32) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            constant,
        }
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }

    pub fn is_visible(&self, point: Vec3) -> bool {
        self.distance_to(point) >= 0.0
    }

    /// The point on the plane closest to the origin.
    pub fn coplanar_point(&self) -> Vec3 {
        self.normal * -self.constant
    }

    pub fn to_vec4(self) -> Vec4 {
        self.normal.extend(self.constant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId(usize);

impl PlaneId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaneStore {
    planes: Vec<ClipPlane>,
}

impl PlaneStore {
    /// Returns `None` once the store holds [`MAX_CLIP_PLANES`] planes.
    pub fn insert(&mut self, plane: ClipPlane) -> Option<PlaneId> {
        if self.planes.len() >= MAX_CLIP_PLANES {
            return None;
        }
        self.planes.push(plane);
        Some(PlaneId(self.planes.len() - 1))
    }

    pub fn get(&self, id: PlaneId) -> Option<&ClipPlane> {
        self.planes.get(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = PlaneId> + '_ {
        (0..self.planes.len()).map(PlaneId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaneId, &ClipPlane)> {
        self.planes.iter().enumerate().map(|(i, p)| (PlaneId(i), p))
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Writes the same offset into every plane.
    pub fn set_constant_all(&mut self, constant: f32) {
        for plane in &mut self.planes {
            plane.constant = constant;
        }
    }

    /// Packed for the GPU; unused slots are zero.
    pub fn packed(&self) -> [[f32; 4]; MAX_CLIP_PLANES] {
        let mut out = [[0.0; 4]; MAX_CLIP_PLANES];
        for (slot, plane) in out.iter_mut().zip(&self.planes) {
            *slot = plane.to_vec4().to_array();
        }
        out
    }
}

/// Bit per referenced plane, matching the slot order of [`PlaneStore::packed`].
pub fn plane_mask(ids: &[PlaneId]) -> u32 {
    ids.iter()
        .filter(|id| id.0 < MAX_CLIP_PLANES)
        .fold(0, |mask, id| mask | (1 << id.0))
}

/// How several clip planes on one material combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipMode {
    /// Only the intersection of the clipped half-spaces is removed: a point is
    /// discarded when it is outside every plane's visible side.
    Intersection,
    /// The union of the clipped half-spaces is removed: a point is discarded
    /// when it is outside any plane's visible side.
    Union,
}

impl ClipMode {
    pub fn from_intersection_flag(intersection: bool) -> Self {
        if intersection {
            ClipMode::Intersection
        } else {
            ClipMode::Union
        }
    }

    pub fn is_intersection(self) -> bool {
        matches!(self, ClipMode::Intersection)
    }

    /// Whether `point` survives the planes. No planes keeps everything.
    pub fn keeps<'a>(self, planes: impl IntoIterator<Item = &'a ClipPlane>, point: Vec3) -> bool {
        let mut any_outside = false;
        let mut all_outside = true;
        let mut seen = false;

        for plane in planes {
            seen = true;
            if plane.is_visible(point) {
                all_outside = false;
            } else {
                any_outside = true;
            }
        }

        if !seen {
            return true;
        }

        match self {
            ClipMode::Intersection => !all_outside,
            ClipMode::Union => !any_outside,
        }
    }
}

/// Narrow capability set a clip-affected entity exposes to broadcasts.
pub trait ClipTarget {
    fn set_clip_mode(&mut self, mode: ClipMode);
    fn set_alpha_to_coverage(&mut self, enabled: bool);
    /// Tells the renderer its cached compiled state is stale.
    fn mark_dirty(&mut self);
}

/// Applies `mode` to every target and marks each one dirty. Returns how many
/// targets were touched.
pub fn broadcast_clip_mode<'a, T>(targets: impl IntoIterator<Item = &'a mut T>, mode: ClipMode) -> usize
where
    T: ClipTarget + 'a,
{
    let mut touched = 0;
    for target in targets {
        target.set_clip_mode(mode);
        target.mark_dirty();
        touched += 1;
    }
    touched
}

pub fn broadcast_alpha_to_coverage<'a, T>(
    targets: impl IntoIterator<Item = &'a mut T>,
    enabled: bool,
) -> usize
where
    T: ClipTarget + 'a,
{
    let mut touched = 0;
    for target in targets {
        target.set_alpha_to_coverage(enabled);
        target.mark_dirty();
        touched += 1;
    }
    touched
}

/// Debug wireframe drawn on a plane: a square outline plus both diagonals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHelper {
    pub plane: PlaneId,
    pub size: f32,
    pub color: Color,
}

impl PlaneHelper {
    pub fn new(plane: PlaneId, size: f32, color: Color) -> Self {
        Self { plane, size, color }
    }

    /// Line-list endpoints for the helper in world space, read from the
    /// current plane state.
    pub fn segments(&self, planes: &PlaneStore) -> Vec<(Vec3, Vec3)> {
        let Some(plane) = planes.get(self.plane) else {
            return Vec::new();
        };

        let normal = plane.normal;
        let helper_up = if normal.abs_diff_eq(Vec3::Y, 1.0e-4) || normal.abs_diff_eq(Vec3::NEG_Y, 1.0e-4) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let u = helper_up.cross(normal).normalize_or_zero();
        let v = normal.cross(u).normalize_or_zero();

        let half = self.size * 0.5;
        let center = plane.coplanar_point();
        let corners = [
            center + (-u - v) * half,
            center + (u - v) * half,
            center + (u + v) * half,
            center + (-u + v) * half,
        ];

        vec![
            (corners[0], corners[1]),
            (corners[1], corners[2]),
            (corners[2], corners[3]),
            (corners[3], corners[0]),
            (corners[0], corners[2]),
            (corners[1], corners[3]),
        ]
    }
}
