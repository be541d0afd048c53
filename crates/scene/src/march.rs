//! Raymarch integrators.
//!
//! Both marchers start from the fixed eye at the origin looking down +Z and are
//! stateless per call.

use glam::{Vec2, Vec3};

use crate::shapes::{ShapeClass, estimate_normal, shapes_field};
use crate::wave::wave_field;

pub const EYE: Vec3 = Vec3::ZERO;
pub const CAMERA_FOCAL: f32 = 1.5;

pub const WAVE_MAX_STEPS: u32 = 96;
pub const WAVE_MAX_RANGE: f32 = 30.0;
/// Field magnitude under which a sample counts as touching the surface.
pub const WAVE_NEAR_SURFACE: f32 = 0.06;
/// Surface contributions allowed per ray.
pub const WAVE_MAX_DRAWS: u32 = 6;
pub const WAVE_DRAW_ALPHA: f32 = 0.22;
/// Glow only accumulates beyond this distance from the eye.
pub const WAVE_GLOW_MIN_RANGE: f32 = 2.0;
pub const WAVE_GLOW_FALLOFF: f32 = 8.0;
/// Initial over-relaxation factor.
pub const WAVE_OMEGA: f32 = 1.3;
pub const WAVE_MIN_STEP: f32 = 0.03;

pub const SHAPE_MAX_STEPS: u32 = 72;
pub const SHAPE_MAX_RANGE: f32 = 20.0;
pub const SHAPE_HIT_EPSILON: f32 = 0.002;
pub const SHAPE_SAFETY: f32 = 0.9;
pub const SHAPE_MIN_STEP: f32 = 0.005;

/// View direction for a pixel. `frag` has its origin at the bottom-left corner.
pub fn camera_ray(frag: Vec2, resolution: Vec2) -> Vec3 {
    let p = (2.0 * frag - resolution) / resolution.y;
    p.extend(CAMERA_FOCAL).normalize()
}

/// Output of the translucent wave marcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSample {
    /// Accumulated opacity in [0, 1].
    pub alpha: f32,
    /// Proximity glow normalised to [0, 1].
    pub glow: f32,
    /// Distance along the ray where marching stopped.
    pub distance: f32,
    pub draws: u32,
    /// Times an over-relaxed step overshot the surface and was rewound.
    pub backoffs: u32,
}

/// Over-relaxed sphere tracing with front-to-back opacity accumulation.
pub fn march_wave(origin: Vec3, dir: Vec3, time: f32) -> WaveSample {
    let mut t = 0.0_f32;
    let mut omega = WAVE_OMEGA;
    let mut step = 0.0_f32;
    let mut prev_radius = 0.0_f32;
    let mut alpha = 0.0_f32;
    let mut glow = 0.0_f32;
    let mut draws = 0;
    let mut backoffs = 0;

    for _ in 0..WAVE_MAX_STEPS {
        let radius = wave_field(origin + dir * t, time).abs();
        let crossing = omega > 1.0 && radius + prev_radius < step;
        prev_radius = radius;

        if crossing {
            // the relaxed step jumped over the surface; back off and trace plainly
            step -= omega * step;
            omega = 1.0;
            backoffs += 1;
        } else {
            step = (radius * omega).max(WAVE_MIN_STEP);
            if radius < WAVE_NEAR_SURFACE {
                alpha += (1.0 - alpha) * WAVE_DRAW_ALPHA * (1.0 - radius / WAVE_NEAR_SURFACE);
                draws += 1;
                if draws >= WAVE_MAX_DRAWS {
                    break;
                }
            }
            if t > WAVE_GLOW_MIN_RANGE {
                glow += 1.0 / (1.0 + radius * radius * WAVE_GLOW_FALLOFF);
            }
        }

        t += step;
        if t > WAVE_MAX_RANGE {
            break;
        }
    }

    WaveSample {
        alpha: alpha.min(1.0),
        glow: (glow / WAVE_MAX_STEPS as f32).min(1.0),
        distance: t,
        draws,
        backoffs,
    }
}

/// Shading inputs for the first opaque shape along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    pub fresnel: f32,
    pub rim: f32,
    pub distance: f32,
    pub class: ShapeClass,
    pub normal: Vec3,
}

/// Sphere tracing against the shapes field. `None` is a plain miss.
pub fn march_shapes(origin: Vec3, dir: Vec3, time: f32) -> Option<ShapeHit> {
    let mut t = 0.0_f32;
    for _ in 0..SHAPE_MAX_STEPS {
        let p = origin + dir * t;
        let sample = shapes_field(p, time);
        if sample.distance < SHAPE_HIT_EPSILON {
            let normal = estimate_normal(p, time)?;
            let facing = normal.dot(-dir);
            return Some(ShapeHit {
                fresnel: (1.0 - facing.max(0.0)).max(0.0).powf(2.5),
                rim: (1.0 - facing.abs()).max(0.0).powf(3.0),
                distance: t,
                class: sample.class,
                normal,
            });
        }
        t += (sample.distance * SHAPE_SAFETY).max(SHAPE_MIN_STEP);
        if t > SHAPE_MAX_RANGE {
            break;
        }
    }
    None
}
