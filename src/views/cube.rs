//! A cube that spins continuously and grows while the pointer is over it.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::camera::{PerspectiveCamera, SurfaceRect, client_to_ndc};
use crate::frame_loop::{FrameLoop, LoopHandle};
use crate::geometry::Geometry;
use crate::host::{ListenerKind, Listeners, MountError, Renderer, Surface};
use crate::material::{Color, Material};
use crate::scene::{Light, Mesh, MeshId, Scene};

pub const IDLE_COLOR: u32 = 0xffffff;
pub const HOVER_COLOR: u32 = 0xff0000;
pub const ROTATION_STEP: f32 = 0.01;
pub const SCALE_STEP: f32 = 0.01;
pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 2.0;

pub struct CubeView<R> {
    surface: Surface,
    renderer: R,
    scene: Scene,
    camera: PerspectiveCamera,
    cube: MeshId,
    /// Written by pointer moves, read by frame ticks. Only the latest write
    /// before a tick is observed.
    active: bool,
    frames: FrameLoop,
    listeners: Listeners,
    torn_down: bool,
}

impl<R: Renderer> CubeView<R> {
    /// Builds the scene and starts the frame loop. The surface is used as
    /// given; this view never attaches it.
    pub fn mount(surface: Option<Surface>, mut renderer: R) -> Result<Self, MountError> {
        let mut surface = surface.ok_or(MountError::SurfaceUnavailable)?;
        surface.clear_color = Color::from_hex(0xffffff);
        renderer.configure(&surface);

        let mut camera = PerspectiveCamera::new(75.0, surface.bounds.aspect(), 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.look_at(Vec3::ZERO);

        let mut scene = Scene::new(surface.clear_color);
        let cube = scene.add_mesh(Mesh::new(
            Geometry::cuboid(1.0, 1.0, 1.0),
            Material::standard(Color::from_hex(IDLE_COLOR), 0.7, 0.2),
        ));
        scene.add_light(Light::Ambient {
            color: Color::WHITE,
            intensity: 0.5,
        });
        scene.add_light(Light::Point {
            color: Color::WHITE,
            intensity: 30.0,
            position: Vec3::new(5.0, 5.0, 5.0),
        });

        let mut listeners = Listeners::default();
        listeners.register(ListenerKind::PointerMove);
        listeners.register(ListenerKind::Resize);

        let mut frames = FrameLoop::default();
        frames.start();

        let mut view = Self {
            surface,
            renderer,
            scene,
            camera,
            cube,
            active: false,
            frames,
            listeners,
            torn_down: false,
        };
        view.render();

        tracing::info!(
            width = view.surface.bounds.width,
            height = view.surface.bounds.height,
            "hover cube mounted"
        );
        Ok(view)
    }

    /// Hit-tests the pointer against the cube and sets the hover state and
    /// color from scratch. Coordinates are client pixels.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if !self.listeners.is_registered(ListenerKind::PointerMove) {
            return;
        }

        let hit = client_to_ndc(x, y, self.surface.bounds)
            .map(|ndc| self.camera.ray_through(ndc))
            .and_then(|ray| self.scene.mesh(self.cube)?.intersect(&ray))
            .is_some();

        if hit != self.active {
            tracing::trace!(hit, x, y, "cube hover changed");
        }
        self.active = hit;

        if let Some(cube) = self.scene.mesh_mut(self.cube) {
            cube.material.color = Color::from_hex(if hit { HOVER_COLOR } else { IDLE_COLOR });
        }
    }

    /// Advances one frame. Returns false, without touching anything, for a
    /// handle that is not the running loop.
    pub fn tick(&mut self, handle: LoopHandle) -> bool {
        if !self.frames.accept(handle) {
            return false;
        }

        let active = self.active;
        if let Some(cube) = self.scene.mesh_mut(self.cube) {
            let t = &mut cube.transform;
            t.rotation.x = (t.rotation.x + ROTATION_STEP).rem_euclid(TAU);
            t.rotation.y = (t.rotation.y + ROTATION_STEP).rem_euclid(TAU);

            let s = t.scale.x;
            let next = if active {
                if s < MAX_SCALE {
                    (s + SCALE_STEP).min(MAX_SCALE)
                } else {
                    s
                }
            } else if s > MIN_SCALE {
                (s - SCALE_STEP).max(MIN_SCALE)
            } else {
                s
            };
            t.scale = Vec3::splat(next);
        }

        // The loop stays scheduled until teardown; the host delivers the next
        // frame for the same handle.
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
        true
    }

    /// Display scale changed. The next tick renders at the new size.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) -> bool {
        if !self.listeners.is_registered(ListenerKind::Resize) {
            return false;
        }
        if !self.surface.set_pixel_ratio(pixel_ratio) {
            return false;
        }
        self.renderer.configure(&self.surface);
        true
    }

    /// Stops the loop, drops every listener and releases the renderer. Safe to
    /// call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.frames.stop();
        self.listeners.clear();
        self.renderer.dispose();
        self.scene.clear();
        self.torn_down = true;
        tracing::info!(ticks = self.frames.ticks(), "hover cube torn down");
    }

    fn render(&mut self) {
        self.renderer.render(&self.scene, &self.camera);
    }

    pub fn frame_handle(&self) -> Option<LoopHandle> {
        self.frames.active()
    }

    pub fn is_hovered(&self) -> bool {
        self.active
    }

    pub fn cube(&self) -> Option<&Mesh> {
        self.scene.mesh(self.cube)
    }

    pub fn cube_id(&self) -> MeshId {
        self.cube
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

impl<R> std::fmt::Debug for CubeView<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeView")
            .field("active", &self.active)
            .field("frames", &self.frames)
            .field("listeners", &self.listeners.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::frame::FrameSink;

    fn mounted() -> CubeView<FrameSink> {
        let surface = Surface::attached(SurfaceRect::sized(800.0, 600.0), 1.0);
        CubeView::mount(Some(surface), FrameSink::default()).unwrap()
    }

    #[test]
    fn missing_surface_skips_mount() {
        let result = CubeView::mount(None, FrameSink::default());
        assert!(matches!(result, Err(MountError::SurfaceUnavailable)));
    }

    #[test]
    fn mount_renders_once_and_starts_the_loop() {
        let view = mounted();
        assert_eq!(view.renderer().frames_rendered(), 1);
        assert!(view.frame_handle().is_some());
        assert!(view.listeners().is_registered(ListenerKind::PointerMove));
        assert_eq!(view.renderer().surface().map(|s| s.clear_color), Some(Color::WHITE));
    }

    #[test]
    fn center_of_the_surface_hits_the_cube() {
        let mut view = mounted();
        view.pointer_moved(400.0, 300.0);
        assert!(view.is_hovered());
        assert_eq!(view.cube().map(|c| c.material.color), Some(Color::from_hex(HOVER_COLOR)));

        view.pointer_moved(5.0, 5.0);
        assert!(!view.is_hovered());
        assert_eq!(view.cube().map(|c| c.material.color), Some(Color::from_hex(IDLE_COLOR)));
    }

    #[test]
    fn pointer_moves_never_touch_the_transform() {
        let mut view = mounted();
        let before = view.cube().map(|c| c.transform);
        view.pointer_moved(400.0, 300.0);
        assert_eq!(view.cube().map(|c| c.transform), before);
    }
}
