//! The narrow interfaces a view consumes from whatever hosts it: a drawing
//! surface, a renderer and a listener registry.

use crate::camera::{PerspectiveCamera, SurfaceRect};
use crate::material::Color;
use crate::scene::Scene;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum MountError {
    #[error("drawing surface is not available yet")]
    SurfaceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub bounds: SurfaceRect,
    pub pixel_ratio: f32,
    pub clear_color: Color,
    attached: bool,
}

impl Surface {
    pub fn new(bounds: SurfaceRect, pixel_ratio: f32) -> Self {
        Self {
            bounds,
            pixel_ratio: pixel_ratio.max(f32::EPSILON),
            clear_color: Color::BLACK,
            attached: false,
        }
    }

    /// A surface the host already placed in its layout.
    pub fn attached(bounds: SurfaceRect, pixel_ratio: f32) -> Self {
        Self {
            attached: true,
            ..Self::new(bounds, pixel_ratio)
        }
    }

    /// No-op when already attached.
    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns false when the ratio is unchanged or not a usable scale.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) -> bool {
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 || pixel_ratio == self.pixel_ratio {
            return false;
        }
        self.pixel_ratio = pixel_ratio;
        true
    }

    pub fn physical_size(&self) -> (u32, u32) {
        let w = (self.bounds.width * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.bounds.height * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

/// Renders a scene through a camera onto the surface it was configured for.
pub trait Renderer {
    fn configure(&mut self, surface: &Surface);
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera);
    /// Releases the rendering context. Later calls to `render` do nothing.
    fn dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerMove,
    Resize,
    OrbitChange,
}

/// Listener registrations a view holds against its host. The host reads this
/// to decide which event sources to deliver.
#[derive(Debug, Default)]
pub struct Listeners {
    entries: Vec<ListenerKind>,
}

impl Listeners {
    pub fn register(&mut self, kind: ListenerKind) {
        self.entries.push(kind);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_registered(&self, kind: ListenerKind) -> bool {
        self.entries.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
