//! Concentric spheres cut by three axis-aligned clip planes, with an orbit
//! camera and a live parameter panel.
//!
//! Rendering is on demand: once after mount and once after every parameter,
//! orbit or resize change. Only auto-rotate runs a continuous loop, and only
//! while it is enabled.

use glam::Vec3;

use crate::camera::{PerspectiveCamera, SurfaceRect};
use crate::clip::{ClipMode, ClipPlane, PlaneId, PlaneStore, broadcast_alpha_to_coverage, broadcast_clip_mode};
use crate::frame_loop::{FrameLoop, LoopHandle};
use crate::geometry::Geometry;
use crate::host::{ListenerKind, Listeners, MountError, Renderer, Surface};
use crate::material::{Color, Material, Side};
use crate::orbit::{OrbitControls, OrbitInput};
use crate::panel::{ControlValue, Panel, PanelEvent, snap_to_step};
use crate::scene::{GroupId, Light, Mesh, MeshId, Scene};

pub const PLANE_CONSTANT_RANGE: (f32, f32) = (-1.0, 1.0);
pub const PLANE_CONSTANT_STEP: f32 = 0.01;
const HELPER_SIZE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub clip_intersection: bool,
    pub plane_constant: f32,
    pub show_helpers: bool,
    pub antialias_edges: bool,
    pub auto_rotate: bool,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            clip_intersection: true,
            plane_constant: 0.0,
            show_helpers: false,
            antialias_edges: true,
            auto_rotate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    ClipIntersection(bool),
    PlaneConstant(f32),
    ShowHelpers(bool),
    AntialiasEdges(bool),
    AutoRotate(bool),
}

impl ParamChange {
    fn control_name(self) -> &'static str {
        match self {
            ParamChange::ClipIntersection(_) => "clipIntersection",
            ParamChange::PlaneConstant(_) => "planeConstant",
            ParamChange::ShowHelpers(_) => "showHelpers",
            ParamChange::AntialiasEdges(_) => "antialiasEdges",
            ParamChange::AutoRotate(_) => "autoRotate",
        }
    }

    fn control_value(self) -> ControlValue {
        match self {
            ParamChange::PlaneConstant(v) => ControlValue::Number(v),
            ParamChange::ClipIntersection(v)
            | ParamChange::ShowHelpers(v)
            | ParamChange::AntialiasEdges(v)
            | ParamChange::AutoRotate(v) => ControlValue::Bool(v),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Seed for the sphere hues. `None` picks a fresh seed per mount.
    pub hue_seed: Option<u64>,
}

pub struct ClusterView<R> {
    surface: Surface,
    renderer: R,
    scene: Scene,
    camera: PerspectiveCamera,
    orbit: OrbitControls,
    spheres: GroupId,
    planes: Vec<PlaneId>,
    params: ClusterParams,
    panel: Panel<ParamChange>,
    rotate_loop: FrameLoop,
    listeners: Listeners,
    torn_down: bool,
}

impl<R: Renderer> ClusterView<R> {
    pub fn mount(surface: Option<Surface>, mut renderer: R, options: ClusterOptions) -> Result<Self, MountError> {
        let mut surface = surface.ok_or(MountError::SurfaceUnavailable)?;
        surface.attach();
        surface.clear_color = Color::BLACK;
        renderer.configure(&surface);

        let params = ClusterParams::default();

        let mut camera = PerspectiveCamera::new(40.0, surface.bounds.aspect(), 1.0, 200.0);
        camera.position = Vec3::new(-1.5, 2.5, 3.0);

        let mut orbit = OrbitControls {
            min_distance: 1.0,
            max_distance: 10.0,
            enable_pan: false,
            ..OrbitControls::new(Vec3::ZERO)
        };
        orbit.update(&mut camera);

        let mut scene = Scene::new(surface.clear_color);
        scene.add_light(Light::Hemisphere {
            sky: Color::WHITE,
            ground: Color::from_hex(0x080808),
            intensity: 4.5,
            position: Vec3::new(-1.25, 1.0, 1.25),
        });

        let planes: Vec<PlaneId> = [Vec3::X, Vec3::NEG_Y, Vec3::NEG_Z]
            .into_iter()
            .filter_map(|normal| scene.add_plane(ClipPlane::new(normal, params.plane_constant)))
            .collect();

        let mut rng = match options.hue_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let spheres = scene.add_group();
        let mode = ClipMode::from_intersection_flag(params.clip_intersection);
        for i in (1..=30).step_by(2) {
            let color = Color::from_hsl(rng.f32(), 0.5, 0.5);
            let material = Material::phong(color)
                .with_side(Side::Double)
                .with_clip_planes(&planes, mode)
                .with_alpha_to_coverage(params.antialias_edges);
            let geometry = Geometry::uv_sphere(i as f32 / 30.0, 48, 24);
            scene.add_to_group(spheres, Mesh::new(geometry, material));
        }

        let helper_colors = [0xff0000, 0x00ff00, 0x0000ff];
        for (plane, hex) in planes.iter().zip(helper_colors) {
            scene.add_helper(*plane, HELPER_SIZE, Color::from_hex(hex));
        }
        scene.set_helpers_visible(params.show_helpers);

        let mut panel = Panel::new("Clipping");
        panel.add_toggle("antialiasEdges", params.antialias_edges, ParamChange::AntialiasEdges);
        panel.add_toggle("clipIntersection", params.clip_intersection, ParamChange::ClipIntersection);
        panel.add_range(
            "planeConstant",
            params.plane_constant,
            PLANE_CONSTANT_RANGE,
            PLANE_CONSTANT_STEP,
            ParamChange::PlaneConstant,
        );
        panel.add_toggle("showHelpers", params.show_helpers, ParamChange::ShowHelpers);
        panel.add_toggle("autoRotate", params.auto_rotate, ParamChange::AutoRotate);

        let mut listeners = Listeners::default();
        listeners.register(ListenerKind::Resize);
        listeners.register(ListenerKind::OrbitChange);

        let mut view = Self {
            surface,
            renderer,
            scene,
            camera,
            orbit,
            spheres,
            planes,
            params,
            panel,
            rotate_loop: FrameLoop::default(),
            listeners,
            torn_down: false,
        };
        view.render();

        tracing::info!(
            spheres = view.sphere_ids().len(),
            seed = ?options.hue_seed,
            "sphere cluster mounted"
        );
        Ok(view)
    }

    /// Applies one parameter change to every entity it affects, then renders.
    /// Returns false once the view is torn down.
    pub fn apply(&mut self, change: ParamChange) -> bool {
        if self.torn_down {
            return false;
        }

        let change = match change {
            ParamChange::PlaneConstant(v) if !v.is_finite() => return false,
            ParamChange::PlaneConstant(v) => {
                let (min, max) = PLANE_CONSTANT_RANGE;
                ParamChange::PlaneConstant(snap_to_step(v, min, max, PLANE_CONSTANT_STEP))
            }
            other => other,
        };
        tracing::debug!(?change, "cluster parameter changed");

        match change {
            ParamChange::ClipIntersection(value) => {
                self.params.clip_intersection = value;
                let mode = ClipMode::from_intersection_flag(value);
                broadcast_clip_mode(self.scene.clip_targets(self.spheres), mode);
            }
            ParamChange::PlaneConstant(value) => {
                self.params.plane_constant = value;
                self.scene.planes_mut().set_constant_all(value);
            }
            ParamChange::ShowHelpers(value) => {
                self.params.show_helpers = value;
                self.scene.set_helpers_visible(value);
            }
            ParamChange::AntialiasEdges(value) => {
                self.params.antialias_edges = value;
                broadcast_alpha_to_coverage(self.scene.clip_targets(self.spheres), value);
            }
            ParamChange::AutoRotate(value) => {
                self.params.auto_rotate = value;
                self.orbit.auto_rotate = value;
                if value {
                    self.rotate_loop.start();
                } else {
                    self.rotate_loop.stop();
                }
            }
        }

        if let Some(id) = self.panel.find(change.control_name()) {
            self.panel.set_value(id, change.control_value());
        }

        // Auto-rotate draws from its own ticks.
        if !matches!(change, ParamChange::AutoRotate(_)) {
            self.render();
        }
        true
    }

    /// Routes a user edit through the panel's bound callback.
    pub fn panel_input(&mut self, event: PanelEvent) -> bool {
        match self.panel.dispatch(event) {
            Some(change) => self.apply(change),
            None => false,
        }
    }

    /// Feeds a drag or wheel gesture to the orbit controller and renders when
    /// the camera moved.
    pub fn orbit_input(&mut self, input: OrbitInput) -> bool {
        if !self.listeners.is_registered(ListenerKind::OrbitChange) {
            return false;
        }
        if !self.orbit.handle(input, &self.camera) {
            return false;
        }
        let changed = self.orbit.update(&mut self.camera);
        if changed {
            self.render();
        }
        changed
    }

    /// One auto-rotate step. Returns false for a handle that is not the
    /// running rotate loop.
    pub fn tick(&mut self, handle: LoopHandle) -> bool {
        if !self.rotate_loop.accept(handle) {
            return false;
        }
        self.orbit.step_auto_rotate();
        self.orbit.update(&mut self.camera);
        self.render();
        true
    }

    pub fn resize(&mut self, bounds: SurfaceRect) -> bool {
        if !self.listeners.is_registered(ListenerKind::Resize) {
            return false;
        }
        self.surface.bounds = bounds;
        self.camera.set_aspect(bounds.aspect());
        self.renderer.configure(&self.surface);
        self.render();
        true
    }

    /// Display scale changed; renders once at the new size.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) -> bool {
        if !self.listeners.is_registered(ListenerKind::Resize) {
            return false;
        }
        if !self.surface.set_pixel_ratio(pixel_ratio) {
            return false;
        }
        self.renderer.configure(&self.surface);
        self.render();
        true
    }

    /// Cancels auto-rotate, drops listeners, releases the renderer and the
    /// panel. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.rotate_loop.stop();
        self.orbit.auto_rotate = false;
        self.listeners.clear();
        self.renderer.dispose();
        self.panel.destroy();
        self.scene.clear();
        self.torn_down = true;
        tracing::info!(rotate_ticks = self.rotate_loop.ticks(), "sphere cluster torn down");
    }

    fn render(&mut self) {
        self.renderer.render(&self.scene, &self.camera);
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn planes(&self) -> &PlaneStore {
        self.scene.planes()
    }

    pub fn plane_ids(&self) -> &[PlaneId] {
        &self.planes
    }

    pub fn sphere_ids(&self) -> &[MeshId] {
        self.scene
            .group(self.spheres)
            .map(|g| g.members())
            .unwrap_or(&[])
    }

    pub fn panel(&self) -> &Panel<ParamChange> {
        &self.panel
    }

    pub fn orbit(&self) -> &OrbitControls {
        &self.orbit
    }

    pub fn rotate_handle(&self) -> Option<LoopHandle> {
        self.rotate_loop.active()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<R> std::fmt::Debug for ClusterView<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterView")
            .field("params", &self.params)
            .field("rotate_loop", &self.rotate_loop)
            .field("listeners", &self.listeners.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::frame::FrameSink;

    fn mounted() -> ClusterView<FrameSink> {
        let surface = Surface::new(SurfaceRect::sized(800.0, 600.0), 1.0);
        ClusterView::mount(
            Some(surface),
            FrameSink::default(),
            ClusterOptions { hue_seed: Some(7) },
        )
        .unwrap()
    }

    #[test]
    fn mount_builds_the_cluster() {
        let view = mounted();
        assert!(view.surface().is_attached());
        assert_eq!(view.sphere_ids().len(), 15);
        assert_eq!(view.planes().len(), 3);
        assert!(!view.scene().helpers().visible);
        assert_eq!(view.renderer().frames_rendered(), 1);
        assert_eq!(view.panel().controls().count(), 5);

        let radii: Vec<f32> = view
            .sphere_ids()
            .iter()
            .filter_map(|id| view.scene().mesh(*id))
            .filter_map(|m| match m.geometry().shape() {
                crate::geometry::Shape::Sphere { radius, .. } => Some(radius),
                _ => None,
            })
            .collect();
        assert_eq!(radii.first().copied(), Some(1.0 / 30.0));
        assert_eq!(radii.last().copied(), Some(29.0 / 30.0));
    }

    #[test]
    fn camera_starts_where_it_was_placed() {
        let view = mounted();
        assert!((view.camera().position - Vec3::new(-1.5, 2.5, 3.0)).length() < 1.0e-4);
        assert_eq!(view.camera().target, Vec3::ZERO);
    }

    #[test]
    fn same_seed_same_hues() {
        let a = mounted();
        let b = mounted();
        let hues = |v: &ClusterView<FrameSink>| -> Vec<Color> {
            v.sphere_ids()
                .iter()
                .filter_map(|id| v.scene().mesh(*id))
                .map(|m| m.material.color)
                .collect()
        };
        assert_eq!(hues(&a), hues(&b));
    }

    #[test]
    fn auto_rotate_toggle_does_not_render_by_itself() {
        let mut view = mounted();
        view.apply(ParamChange::AutoRotate(true));
        assert_eq!(view.renderer().frames_rendered(), 1);
        assert!(view.rotate_handle().is_some());
        assert!(view.orbit().auto_rotate);
    }

    #[test]
    fn direct_apply_keeps_the_panel_in_sync() {
        let mut view = mounted();
        view.apply(ParamChange::PlaneConstant(0.25));
        let id = view.panel().find("planeConstant").unwrap();
        assert_eq!(
            view.panel().control(id).map(|c| c.value()),
            Some(ControlValue::Number(0.25))
        );
    }
}
