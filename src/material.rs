use glam::Vec3;

use crate::clip::{ClipMode, ClipTarget, PlaneId, PlaneStore};

/// Linear RGB color. Constructors take sRGB input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self::from_srgb(r, g, b)
    }

    pub fn from_srgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: srgb_to_linear(r),
            g: srgb_to_linear(g),
            b: srgb_to_linear(b),
        }
    }

    /// Hue wraps, saturation and lightness are clamped to [0, 1].
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self::from_srgb(l, l, l);
        }

        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;

        Self::from_srgb(
            hue_to_rgb(q, p, h + 1.0 / 3.0),
            hue_to_rgb(q, p, h),
            hue_to_rgb(q, p, h - 1.0 / 3.0),
        )
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub fn to_array(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    /// Metal/rough approximation.
    Standard { roughness: f32, metalness: f32 },
    Phong { specular: Color, shininess: f32 },
}

#[derive(Debug, Clone)]
pub struct Material {
    pub color: Color,
    pub shading: Shading,
    pub opacity: f32,
    side: Side,
    clip_planes: Vec<PlaneId>,
    clip_mode: ClipMode,
    alpha_to_coverage: bool,
    version: u64,
}

impl Material {
    pub fn standard(color: Color, roughness: f32, metalness: f32) -> Self {
        Self::with_shading(
            color,
            Shading::Standard {
                roughness,
                metalness,
            },
        )
    }

    pub fn phong(color: Color) -> Self {
        Self::with_shading(
            color,
            Shading::Phong {
                specular: Color::from_hex(0x111111),
                shininess: 30.0,
            },
        )
    }

    fn with_shading(color: Color, shading: Shading) -> Self {
        Self {
            color,
            shading,
            opacity: 1.0,
            side: Side::Front,
            clip_planes: Vec::new(),
            clip_mode: ClipMode::Union,
            alpha_to_coverage: false,
            version: 0,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_clip_planes(mut self, planes: &[PlaneId], mode: ClipMode) -> Self {
        self.clip_planes = planes.to_vec();
        self.clip_mode = mode;
        self
    }

    pub fn with_alpha_to_coverage(mut self, enabled: bool) -> Self {
        self.alpha_to_coverage = enabled;
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn clip_planes(&self) -> &[PlaneId] {
        &self.clip_planes
    }

    pub fn clip_mode(&self) -> ClipMode {
        self.clip_mode
    }

    pub fn alpha_to_coverage(&self) -> bool {
        self.alpha_to_coverage
    }

    /// Bumped by `mark_dirty`. Renderers recompile cached state when it moves.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether `point` falls in the volume this material renders, given the
    /// current plane constants.
    pub fn clips_point(&self, planes: &PlaneStore, point: Vec3) -> bool {
        if self.clip_planes.is_empty() {
            return false;
        }
        let refs = self.clip_planes.iter().filter_map(|id| planes.get(*id));
        !self.clip_mode.keeps(refs, point)
    }
}

impl ClipTarget for Material {
    fn set_clip_mode(&mut self, mode: ClipMode) {
        self.clip_mode = mode;
    }

    fn set_alpha_to_coverage(&mut self, enabled: bool) {
        self.alpha_to_coverage = enabled;
    }

    fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decodes_srgb() {
        assert_eq!(Color::from_hex(0xffffff), Color::WHITE);
        assert_eq!(Color::from_hex(0x000000), Color::BLACK);
        let red = Color::from_hex(0xff0000);
        assert_eq!((red.r, red.g, red.b), (1.0, 0.0, 0.0));
        let gray = Color::from_hex(0x808080);
        assert!((gray.r - 0.2158).abs() < 1.0e-3);
    }

    #[test]
    fn hsl_primaries() {
        let red = Color::from_hsl(0.0, 1.0, 0.5);
        assert!((red.r - 1.0).abs() < 1.0e-6 && red.g.abs() < 1.0e-6 && red.b.abs() < 1.0e-6);
        let green = Color::from_hsl(1.0 / 3.0, 1.0, 0.5);
        assert!((green.g - 1.0).abs() < 1.0e-5 && green.r.abs() < 1.0e-5);
        let gray = Color::from_hsl(0.7, 0.0, 0.5);
        assert_eq!(gray, Color::from_srgb(0.5, 0.5, 0.5));
    }

    #[test]
    fn mark_dirty_bumps_version_only() {
        let mut material = Material::phong(Color::WHITE);
        material.set_clip_mode(ClipMode::Intersection);
        assert_eq!(material.version(), 0);
        material.mark_dirty();
        assert_eq!(material.version(), 1);
        assert_eq!(material.clip_mode(), ClipMode::Intersection);
    }

    #[test]
    fn material_without_planes_never_clips() {
        let planes = PlaneStore::default();
        let material = Material::standard(Color::WHITE, 0.7, 0.2);
        assert!(!material.clips_point(&planes, Vec3::splat(-100.0)));
    }
}
