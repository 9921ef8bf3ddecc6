//! Immutable per-render snapshots of a scene and the renderer that produces them.
//!
//! [`FrameSink`] is the [`Renderer`] the views talk to. Each `render` call
//! captures everything the GPU pass needs into a [`Frame`], which the shader
//! widget picks up on its next draw.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};

use crate::camera::PerspectiveCamera;
use crate::clip::{ClipMode, MAX_CLIP_PLANES, plane_mask};
use crate::geometry::Geometry;
use crate::host::{Renderer, Surface};
use crate::material::{Color, Material, Shading, Side};
use crate::scene::lines::{LineVertex, build_helper_vertices};
use crate::scene::{Light, MeshId, Scene};

static NEXT_FRAME_VERSION: AtomicU64 = AtomicU64::new(1);

/// Material state that is only refreshed when the material is marked dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledMaterial {
    pub version: u64,
    pub clip_mask: u32,
    pub clip_mode: ClipMode,
    pub alpha_to_coverage: bool,
    pub side: Side,
}

impl CompiledMaterial {
    fn compile(material: &Material) -> Self {
        Self {
            version: material.version(),
            clip_mask: plane_mask(material.clip_planes()),
            clip_mode: material.clip_mode(),
            alpha_to_coverage: material.alpha_to_coverage(),
            side: material.side(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeshDraw {
    pub mesh: MeshId,
    pub geometry: Arc<Geometry>,
    pub model: Mat4,
    pub color: Color,
    pub opacity: f32,
    pub shading: Shading,
    pub compiled: CompiledMaterial,
}

/// Lights folded into the fixed slots the shader knows about.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightRig {
    pub ambient: Vec3,
    pub sky: Vec3,
    pub ground: Vec3,
    pub hemisphere_direction: Vec3,
    pub point_position: Vec3,
    /// Color times intensity, zero when there is no point light.
    pub point_radiance: Vec3,
}

impl LightRig {
    fn collect(lights: &[Light]) -> Self {
        let mut rig = LightRig::default();
        for light in lights {
            match *light {
                Light::Ambient { color, intensity } => {
                    rig.ambient += color.to_vec3() * intensity;
                }
                Light::Point {
                    color,
                    intensity,
                    position,
                } => {
                    rig.point_position = position;
                    rig.point_radiance = color.to_vec3() * intensity;
                }
                Light::Hemisphere {
                    sky,
                    ground,
                    intensity,
                    position,
                } => {
                    rig.sky = sky.to_vec3() * intensity;
                    rig.ground = ground.to_vec3() * intensity;
                    rig.hemisphere_direction = position.normalize_or_zero();
                }
            }
        }
        rig
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    /// Unique across all sinks so the GPU side can skip frames it already uploaded.
    pub version: u64,
    pub physical_size: (u32, u32),
    pub clear_color: Color,
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub lights: LightRig,
    pub planes: [[f32; 4]; MAX_CLIP_PLANES],
    pub draws: Vec<MeshDraw>,
    pub lines: Vec<LineVertex>,
}

impl Frame {
    pub fn draw_for(&self, mesh: MeshId) -> Option<&MeshDraw> {
        self.draws.iter().find(|d| d.mesh == mesh)
    }
}

#[derive(Debug, Default)]
pub struct FrameSink {
    surface: Option<Surface>,
    compiled: HashMap<MeshId, CompiledMaterial>,
    latest: Option<Arc<Frame>>,
    frames_rendered: u64,
    recompiles: u64,
    disposed: bool,
}

impl FrameSink {
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest.clone()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Materials compiled since creation, counting the first compile of each.
    pub fn recompiles(&self) -> u64 {
        self.recompiles
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    fn compiled_for(&mut self, id: MeshId, material: &Material) -> CompiledMaterial {
        if let Some(cached) = self.compiled.get(&id) {
            if cached.version == material.version() {
                return *cached;
            }
        }
        let fresh = CompiledMaterial::compile(material);
        tracing::trace!(mesh = id.index(), version = fresh.version, "material compiled");
        self.compiled.insert(id, fresh);
        self.recompiles += 1;
        fresh
    }
}

impl Renderer for FrameSink {
    fn configure(&mut self, surface: &Surface) {
        if self.disposed {
            return;
        }
        self.surface = Some(*surface);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        if self.disposed {
            return;
        }

        let mut draws = Vec::new();
        for (id, mesh) in scene.meshes() {
            if !scene.is_rendered(id) {
                continue;
            }
            let compiled = self.compiled_for(id, &mesh.material);
            draws.push(MeshDraw {
                mesh: id,
                geometry: Arc::clone(mesh.geometry()),
                model: mesh.transform.matrix(),
                color: mesh.material.color,
                opacity: mesh.material.opacity,
                shading: mesh.material.shading,
                compiled,
            });
        }

        let (physical_size, clear_color) = match &self.surface {
            Some(surface) => (surface.physical_size(), surface.clear_color),
            None => ((1, 1), scene.background),
        };

        self.frames_rendered += 1;
        self.latest = Some(Arc::new(Frame {
            version: NEXT_FRAME_VERSION.fetch_add(1, Ordering::Relaxed),
            physical_size,
            clear_color,
            view_proj: camera.view_projection(),
            eye: camera.position,
            lights: LightRig::collect(scene.lights()),
            planes: scene.planes().packed(),
            draws,
            lines: build_helper_vertices(scene.helpers(), scene.planes()),
        }));
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        tracing::debug!(frames = self.frames_rendered, "renderer disposed");
        self.disposed = true;
        self.latest = None;
        self.compiled.clear();
        self.surface = None;
    }
}
