//! Implicit wave horizon: a tilted plane displaced by a sum of sines and noise.
//!
//! Not a true distance; the scale factor keeps the marcher from overstepping.

use glam::{Vec3, vec2};

use crate::noise::value_noise;

pub const WAVE_BASE_HEIGHT: f32 = -1.6;
/// Rise of the plane per unit of depth.
pub const WAVE_TILT: f32 = 0.12;
pub const WAVE_FIELD_SCALE: f32 = 0.7;

pub fn wave_height(x: f32, z: f32, t: f32) -> f32 {
    let swell = 0.22 * (x * 0.8 + t * 0.6).sin()
        + 0.14 * (z * 1.3 - t * 0.9 + x * 0.4).sin()
        + 0.07 * ((x + z) * 2.1 + t * 1.3).sin();
    let ripple = 0.18 * (value_noise(vec2(x, z) * 0.6 + vec2(t * 0.1, -t * 0.07)) - 0.5);
    WAVE_BASE_HEIGHT + WAVE_TILT * z + swell + ripple
}

pub fn wave_field(p: Vec3, t: f32) -> f32 {
    (p.y - wave_height(p.x, p.z, t)) * WAVE_FIELD_SCALE
}
