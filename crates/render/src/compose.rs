//! Per-pixel compositor: gradient, wave, glass shapes, dust and rings.

use core::f32::consts::TAU;

use backdrop_common::{BackdropConfig, LayerOrder, Palette};
use backdrop_scene::march::EYE;
use backdrop_scene::math::{fract, mix, saturate, smoothstep};
use backdrop_scene::{ShapeClass, ShapeHit, WaveSample, camera_ray, dust, march_shapes, march_wave};
use glam::{Vec2, Vec3, Vec3Swizzles, vec2, vec3};

/// Near-white the wave overlay blends toward.
pub const WAVE_HIGHLIGHT: Vec3 = vec3(0.97, 0.98, 1.0);
pub const DUST_TINT: Vec3 = vec3(0.55, 1.0, 0.7);
pub const DUST_WEIGHT: f32 = 0.6;

pub const RING_COUNT: u32 = 5;
/// Ring centre in UV space, just past the bottom-right corner.
pub const RING_ANCHOR: Vec2 = vec2(1.05, -0.05);
pub const RING_SPEED: f32 = 0.05;
pub const RING_MAX_RADIUS: f32 = 1.4;
pub const RING_WIDTH: f32 = 0.004;
pub const RING_GAIN: f32 = 0.18;

const THIRD: f32 = 1.0 / 3.0;

/// Values the frame driver uploads every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub resolution: Vec2,
    pub time: f32,
    pub palette: Palette,
}

/// Build-time compositing switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeOptions {
    pub layer_order: LayerOrder,
    pub ring_overlay: bool,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            layer_order: LayerOrder::ShapesInFront,
            ring_overlay: true,
        }
    }
}

impl From<&BackdropConfig> for CompositeOptions {
    fn from(config: &BackdropConfig) -> Self {
        Self {
            layer_order: config.layer_order,
            ring_overlay: config.ring_overlay,
        }
    }
}

/// Pastel tint per shape class.
pub fn class_tint(class: ShapeClass) -> Vec3 {
    match class {
        ShapeClass::Sphere => vec3(1.0, 0.80, 0.86),
        ShapeClass::Box => vec3(0.78, 0.88, 1.0),
        ShapeClass::Pyramid => vec3(0.80, 0.98, 0.88),
        ShapeClass::Cross => vec3(1.0, 0.96, 0.78),
    }
}

/// Diagonal four-stop gradient. `uv` has its origin at the bottom-left.
pub fn background(uv: Vec2, palette: &Palette) -> Vec3 {
    let g = saturate((uv.x + uv.y) * 0.5);
    if g < THIRD {
        mix(palette.color1, palette.color2, g * 3.0)
    } else if g < 2.0 * THIRD {
        mix(palette.color2, palette.color3, (g - THIRD) * 3.0)
    } else {
        mix(palette.color3, palette.color4, (g - 2.0 * THIRD) * 3.0)
    }
}

fn wave_overlay(color: Vec3, wave: &WaveSample) -> Vec3 {
    mix(color, WAVE_HIGHLIGHT, wave.alpha)
}

fn glass_overlay(color: Vec3, uv: Vec2, hit: &ShapeHit, palette: &Palette, time: f32) -> Vec3 {
    let tint = class_tint(hit.class);
    let bend = hit.normal.xy() * 0.04 * (1.0 - hit.fresnel);
    let refraction = background(uv + bend, palette) * tint;
    let specular = Vec3::splat(hit.fresnel * 0.8);
    let band = (Vec3::splat(hit.rim) + vec3(0.0, 0.33, 0.67)) * TAU + Vec3::splat(time);
    let iridescence =
        (Vec3::splat(0.5) + 0.5 * vec3(band.x.cos(), band.y.cos(), band.z.cos())) * hit.rim * 0.6;
    let inner = tint * (1.0 - hit.rim) * 0.15 * (-hit.distance * 0.1).exp();
    let glass = refraction + specular + iridescence + inner;
    let coverage = mix(0.35, 0.9, hit.fresnel);
    mix(color, glass, coverage)
}

/// Additive expanding rings around [`RING_ANCHOR`].
pub fn ring_overlay(uv: Vec2, aspect: f32, time: f32) -> f32 {
    let q = vec2((uv.x - RING_ANCHOR.x) * aspect, uv.y - RING_ANCHOR.y);
    let d = q.length();
    let mut acc = 0.0;
    for k in 0..RING_COUNT {
        let phase = fract(time * RING_SPEED + k as f32 / RING_COUNT as f32);
        let radius = phase * RING_MAX_RADIUS;
        let line = 1.0 - smoothstep(0.0, RING_WIDTH, (d - radius).abs());
        acc += line * (1.0 - phase) * RING_GAIN;
    }
    acc
}

/// Final colour for pixel centre `frag` (origin top-left, y down), channels in [0, 1].
pub fn shade_pixel(frag: Vec2, uniforms: &FrameUniforms, options: &CompositeOptions) -> Vec3 {
    let res = uniforms.resolution;
    let t = uniforms.time;
    let frag_up = vec2(frag.x, res.y - frag.y);
    let uv = frag_up / res;
    let dir = camera_ray(frag_up, res);

    let wave = march_wave(EYE, dir, t);
    let hit = march_shapes(EYE, dir, t);

    let mut color = background(uv, &uniforms.palette);
    match options.layer_order {
        LayerOrder::ShapesInFront => {
            color = wave_overlay(color, &wave);
            if let Some(hit) = &hit {
                color = glass_overlay(color, uv, hit, &uniforms.palette, t);
            }
        }
        LayerOrder::ShapesBehind => {
            if let Some(hit) = &hit {
                color = glass_overlay(color, uv, hit, &uniforms.palette, t);
            }
            color = wave_overlay(color, &wave);
        }
    }

    color += DUST_TINT * dust(uv, t, wave.glow) * DUST_WEIGHT;
    if options.ring_overlay {
        color += Vec3::splat(ring_overlay(uv, res.x / res.y, t));
    }
    color.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Quantise a linear [0, 1] colour to RGBA8 with opaque alpha.
pub fn to_rgba8(color: Vec3) -> [u8; 4] {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_common::{Palette, PaletteSet, Theme};

    fn uniforms(w: f32, h: f32, time: f32, theme: Theme) -> FrameUniforms {
        FrameUniforms {
            resolution: vec2(w, h),
            time,
            palette: PaletteSet::default().select(theme),
        }
    }

    #[test]
    fn gradient_hits_the_end_stops() {
        let p = Palette::LIGHT;
        assert!((background(vec2(0.0, 0.0), &p) - p.color1).length() < 1e-6);
        assert!((background(vec2(1.0, 1.0), &p) - p.color4).length() < 1e-5);
        let mid = background(vec2(0.5, 0.5), &p);
        assert!((mid - mix(p.color2, p.color3, 0.5)).length() < 1e-5);
    }

    #[test]
    fn tints_are_distinct() {
        for (i, a) in ShapeClass::ALL.iter().enumerate() {
            for b in &ShapeClass::ALL[i + 1..] {
                assert_ne!(class_tint(*a), class_tint(*b));
            }
        }
    }

    #[test]
    fn rings_vanish_far_from_any_radius() {
        // the anchor itself sits at radius zero only at the wrap instant
        let v = ring_overlay(RING_ANCHOR + vec2(0.0, 0.001), 1.0, 3.0);
        assert!(v >= 0.0);
        assert!(ring_overlay(vec2(-5.0, 4.0), 1.0, 0.0) == 0.0);
    }

    #[test]
    fn shading_is_deterministic_and_bounded() {
        let u = uniforms(48.0, 27.0, 4.2, Theme::Dark);
        let opts = CompositeOptions::default();
        for y in 0..27 {
            for x in 0..48 {
                let frag = vec2(x as f32 + 0.5, y as f32 + 0.5);
                let a = shade_pixel(frag, &u, &opts);
                let b = shade_pixel(frag, &u, &opts);
                assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));
                assert!(a.cmpge(Vec3::ZERO).all() && a.cmple(Vec3::ONE).all());
            }
        }
    }

    #[test]
    fn ring_overlay_only_adds_light() {
        let u = uniforms(32.0, 18.0, 7.0, Theme::Dark);
        let with = CompositeOptions::default();
        let without = CompositeOptions {
            ring_overlay: false,
            ..with
        };
        for y in 0..18 {
            for x in 0..32 {
                let frag = vec2(x as f32 + 0.5, y as f32 + 0.5);
                let a = shade_pixel(frag, &u, &with);
                let b = shade_pixel(frag, &u, &without);
                assert!(a.cmpge(b).all());
            }
        }
    }

    #[test]
    fn layer_order_only_matters_where_shapes_are() {
        let u = uniforms(32.0, 18.0, 1.0, Theme::Light);
        let front = CompositeOptions::default();
        let behind = CompositeOptions {
            layer_order: LayerOrder::ShapesBehind,
            ..front
        };
        for y in 0..18 {
            for x in 0..32 {
                let frag = vec2(x as f32 + 0.5, y as f32 + 0.5);
                let frag_up = vec2(frag.x, u.resolution.y - frag.y);
                let dir = camera_ray(frag_up, u.resolution);
                if march_shapes(EYE, dir, u.time).is_none() {
                    assert_eq!(shade_pixel(frag, &u, &front), shade_pixel(frag, &u, &behind));
                }
            }
        }
    }

    #[test]
    fn palette_changes_the_image() {
        let opts = CompositeOptions::default();
        let light = uniforms(16.0, 9.0, 0.0, Theme::Light);
        let dark = uniforms(16.0, 9.0, 0.0, Theme::Dark);
        let frag = vec2(2.5, 2.5);
        assert_ne!(shade_pixel(frag, &light, &opts), shade_pixel(frag, &dark, &opts));
    }

    #[test]
    fn rgba8_is_opaque() {
        assert_eq!(to_rgba8(Vec3::ONE), [255, 255, 255, 255]);
        assert_eq!(to_rgba8(vec3(0.0, 0.5, 2.0)), [0, 128, 255, 255]);
    }
}
