//! Scene ownership root: meshes, groups, lights, clip planes and plane helpers.
//!
//! Everything a view renders lives in one [`Scene`]. Entities are addressed by
//! typed indices and released together when the scene is cleared or dropped.

use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::clip::{ClipPlane, PlaneHelper, PlaneId, PlaneStore};
use crate::geometry::{Geometry, Ray, Shape};
use crate::material::{Color, Material};

pub mod frame;
pub mod lines;
pub mod render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    geometry: Arc<Geometry>,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
    group: Option<GroupId>,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry: Arc::new(geometry),
            material,
            transform: Transform::default(),
            visible: true,
            group: None,
        }
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Distance along `ray` to the nearest hit on this mesh's current
    /// transform, if any.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let model = self.transform.matrix();
        if model.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let local = ray.transformed(model.inverse());

        match self.geometry.shape() {
            Shape::Cuboid { .. } => self.geometry.bounds().intersect(&local),
            Shape::Sphere { radius, .. } => intersect_sphere(&local, radius),
        }
    }
}

fn intersect_sphere(ray: &Ray, radius: f32) -> Option<f32> {
    let a = ray.direction.length_squared();
    if a <= f32::EPSILON {
        return None;
    }
    let b = ray.origin.dot(ray.direction);
    let c = ray.origin.length_squared() - radius * radius;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let near = (-b - root) / a;
    let far = (-b + root) / a;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct Group {
    members: Vec<MeshId>,
    pub visible: bool,
}

impl Group {
    pub fn members(&self) -> &[MeshId] {
        &self.members
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Point {
        color: Color,
        intensity: f32,
        position: Vec3,
    },
    /// Sky/ground gradient lit from `position` towards the origin.
    Hemisphere {
        sky: Color,
        ground: Color,
        intensity: f32,
        position: Vec3,
    },
}

/// Plane helpers toggled as a unit.
#[derive(Debug, Clone, Default)]
pub struct HelperGroup {
    helpers: Vec<PlaneHelper>,
    pub visible: bool,
}

impl HelperGroup {
    pub fn helpers(&self) -> &[PlaneHelper] {
        &self.helpers
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Color,
    meshes: Vec<Mesh>,
    groups: Vec<Group>,
    lights: Vec<Light>,
    planes: PlaneStore,
    helpers: HelperGroup,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Color::BLACK)
    }
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            meshes: Vec::new(),
            groups: Vec::new(),
            lights: Vec::new(),
            planes: PlaneStore::default(),
            helpers: HelperGroup::default(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_group(&mut self) -> GroupId {
        self.groups.push(Group {
            members: Vec::new(),
            visible: true,
        });
        GroupId(self.groups.len() - 1)
    }

    /// Adds `mesh` as a member of `group`. Returns `None` for an unknown group.
    pub fn add_to_group(&mut self, group: GroupId, mut mesh: Mesh) -> Option<MeshId> {
        if group.0 >= self.groups.len() {
            return None;
        }
        mesh.group = Some(group);
        let id = self.add_mesh(mesh);
        self.groups[group.0].members.push(id);
        Some(id)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn add_plane(&mut self, plane: ClipPlane) -> Option<PlaneId> {
        self.planes.insert(plane)
    }

    pub fn add_helper(&mut self, plane: PlaneId, size: f32, color: Color) {
        self.helpers.helpers.push(PlaneHelper::new(plane, size, color));
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes.iter().enumerate().map(|(i, m)| (MeshId(i), m))
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(id.0)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn planes(&self) -> &PlaneStore {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut PlaneStore {
        &mut self.planes
    }

    pub fn helpers(&self) -> &HelperGroup {
        &self.helpers
    }

    pub fn set_helpers_visible(&mut self, visible: bool) {
        self.helpers.visible = visible;
    }

    /// A mesh renders when it and its group are visible.
    pub fn is_rendered(&self, id: MeshId) -> bool {
        let Some(mesh) = self.mesh(id) else {
            return false;
        };
        let group_visible = mesh
            .group
            .and_then(|g| self.group(g))
            .map(|g| g.visible)
            .unwrap_or(true);
        mesh.visible && group_visible
    }

    /// Materials of every member of `group`, for clip broadcasts.
    pub fn clip_targets(&mut self, group: GroupId) -> impl Iterator<Item = &mut Material> {
        self.meshes
            .iter_mut()
            .filter(move |mesh| mesh.group == Some(group))
            .map(|mesh| &mut mesh.material)
    }

    /// Releases every entity the scene owns.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.groups.clear();
        self.lights.clear();
        self.planes = PlaneStore::default();
        self.helpers = HelperGroup::default();
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.lights.is_empty() && self.planes.is_empty()
    }
}
