//! Hash-based noise: lattice hashes, value noise, starfield and dust.
//!
//! Hashes floor their input onto the integer lattice, mix the bits with large
//! odd multipliers and xor-shifts, then keep the top 24 bits so the result is
//! exactly representable in [0, 1).

use core::f32::consts::PI;

use glam::{Vec2, Vec3, vec2};

use crate::math::{fract, mix};

/// Hash values above this become visible stars.
pub const STAR_THRESHOLD: f32 = 0.99;
/// Exponent applied to hashes above the threshold.
pub const STAR_POWER: f32 = 20.0;
/// Exponent applied to hashes below the threshold (suppression).
pub const STAR_FLOOR_POWER: f32 = 80.0;
pub const STAR_FLOOR_GAIN: f32 = 0.05;
pub const DUST_LAYERS: u32 = 3;

fn mix_bits(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

fn to_unit(h: u32) -> f32 {
    (h >> 8) as f32 * (1.0 / 16_777_216.0)
}

fn lattice(x: f32) -> u32 {
    x.floor() as i32 as u32
}

/// Hash of an integer index and a salt, used for per-instance seeds.
pub fn hash_index(index: u32, salt: u32) -> f32 {
    to_unit(mix_bits(
        index.wrapping_mul(0x9e37_79b1) ^ salt.wrapping_mul(0x85eb_ca77),
    ))
}

/// 2D lattice hash in [0, 1).
pub fn hash21(p: Vec2) -> f32 {
    to_unit(mix_bits(
        lattice(p.x).wrapping_mul(0x27d4_eb2d) ^ lattice(p.y).wrapping_mul(0x1656_67b1),
    ))
}

/// 3D lattice hash in [0, 1).
pub fn hash31(p: Vec3) -> f32 {
    to_unit(mix_bits(
        lattice(p.x).wrapping_mul(0x27d4_eb2d)
            ^ lattice(p.y).wrapping_mul(0x1656_67b1)
            ^ lattice(p.z).wrapping_mul(0x9e37_79b1),
    ))
}

/// Smooth 2D value noise in [0, 1].
pub fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = vec2(fract(p.x), fract(p.y));
    let u = f * f * (Vec2::splat(3.0) - 2.0 * f);
    mix(
        mix(hash21(i), hash21(i + vec2(1.0, 0.0)), u.x),
        mix(hash21(i + vec2(0.0, 1.0)), hash21(i + vec2(1.0, 1.0)), u.x),
        u.y,
    )
}

/// Sparse twinkling star brightness in [0, 1] for lattice cell `p`.
pub fn star_brightness(p: Vec2, t: f32) -> f32 {
    let h = hash21(p);
    let spark = if h > STAR_THRESHOLD {
        h.powf(STAR_POWER)
    } else {
        h.powf(STAR_FLOOR_POWER) * STAR_FLOOR_GAIN
    };
    let twinkle = value_noise(p * 0.37 + vec2(t * 0.8, t * 0.53));
    mix(spark * 0.2, spark, twinkle)
}

/// Parallax dust over screen UV in [0, 1]^2, scaled by `intensity`.
pub fn dust(uv: Vec2, t: f32, intensity: f32) -> f32 {
    let mut acc = 0.0;
    for layer in 0..DUST_LAYERS {
        let lf = layer as f32;
        let scale = 90.0 + 60.0 * lf;
        let drift = vec2(t * (0.6 + 0.4 * lf), lf * 13.7);
        acc += star_brightness(uv * scale + drift, t) / (1.0 + lf);
    }
    let falloff = ((uv.x - 0.5) * PI).cos().max(0.0);
    acc * falloff * intensity
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn hashes_are_in_unit_range() {
        for i in -50..50 {
            let p = vec2(i as f32 * 1.7, i as f32 * -3.1);
            let h2 = hash21(p);
            let h3 = hash31(vec3(p.x, p.y, i as f32));
            assert!((0.0..1.0).contains(&h2));
            assert!((0.0..1.0).contains(&h3));
        }
        for i in 0..64 {
            assert!((0.0..1.0).contains(&hash_index(i, 3)));
        }
    }

    #[test]
    fn hashes_are_lattice_constant() {
        assert_eq!(hash21(vec2(3.1, 4.9)), hash21(vec2(3.8, 4.2)));
        assert_eq!(hash31(vec3(-1.5, 2.2, 7.0)), hash31(vec3(-1.01, 2.99, 7.5)));
    }

    #[test]
    fn hash_index_depends_on_salt() {
        assert_ne!(hash_index(2, 0), hash_index(2, 1));
        assert_ne!(hash_index(0, 0), hash_index(1, 0));
        assert_eq!(hash_index(5, 4), hash_index(5, 4));
    }

    #[test]
    fn value_noise_matches_corners_and_is_bounded() {
        let corner = vec2(4.0, -2.0);
        assert_eq!(value_noise(corner), hash21(corner));
        for i in 0..200 {
            let n = value_noise(vec2(i as f32 * 0.173, i as f32 * 0.311));
            assert!((0.0..=1.0).contains(&n));
        }
    }

    #[test]
    fn stars_are_sparse() {
        let mut bright = 0;
        let total = 100 * 100;
        for y in 0..100 {
            for x in 0..100 {
                let b = star_brightness(vec2(x as f32, y as f32), 0.0);
                assert!((0.0..=1.0).contains(&b));
                if b > 0.1 {
                    bright += 1;
                }
            }
        }
        assert!(bright > 0, "expected at least one star");
        assert!(bright < total / 20, "too many bright cells: {bright}");
    }

    #[test]
    fn dust_scales_with_intensity_and_fades_at_edges() {
        let uv = vec2(0.5, 0.4);
        assert_eq!(dust(uv, 1.0, 0.0), 0.0);
        let a = dust(uv, 1.0, 1.0);
        let b = dust(uv, 1.0, 2.0);
        assert!((b - 2.0 * a).abs() <= 1e-6 * b.abs().max(1.0));
        assert!(dust(vec2(0.0, 0.4), 1.0, 1.0).abs() < 1e-6);
    }
}
