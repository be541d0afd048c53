//! Signed distance primitives. Negative inside, zero on the surface, positive outside.

use glam::{Vec2, Vec2Swizzles, Vec3, Vec3Swizzles, vec3};

pub fn sd_sphere(p: Vec3, r: f32) -> f32 {
    p.length() - r
}

/// Box with half extents `b`, corners rounded by `r`.
pub fn sd_round_box(p: Vec3, b: Vec3, r: f32) -> f32 {
    let q = p.abs() - b;
    q.max(Vec3::ZERO).length() + q.x.max(q.y.max(q.z)).min(0.0) - r
}

/// Exact square-base pyramid: unit base centred at the origin, apex at height `h`.
pub fn sd_pyramid(p: Vec3, h: f32) -> f32 {
    let m2 = h * h + 0.25;

    // symmetry
    let mut xz = p.xz().abs();
    if xz.y > xz.x {
        xz = xz.yx();
    }
    xz -= Vec2::splat(0.5);
    let (px, py, pz) = (xz.x, p.y, xz.y);

    // project into face plane
    let q = vec3(pz, h * py - 0.5 * px, h * px + 0.5 * py);

    let s = (-q.x).max(0.0);
    let t = ((q.y - 0.5 * pz) / (m2 + 0.25)).clamp(0.0, 1.0);

    let a = m2 * (q.x + s) * (q.x + s) + q.y * q.y;
    let b = m2 * (q.x + 0.5 * t) * (q.x + 0.5 * t) + (q.y - m2 * t) * (q.y - m2 * t);

    let d2 = if q.y.min(-q.x * m2 - q.y * 0.5) > 0.0 {
        0.0
    } else {
        a.min(b)
    };

    ((d2 + q.z * q.z) / m2).sqrt() * sign(q.z.max(-py))
}

/// Plus-shaped cross: union of two orthogonal slab boxes of arm length `size`.
pub fn sd_cross(p: Vec3, size: f32) -> f32 {
    let arm = size * CROSS_ARM_RATIO;
    let horizontal = sd_round_box(p, vec3(size, arm, arm), 0.0);
    let vertical = sd_round_box(p, vec3(arm, size, arm), 0.0);
    horizontal.min(vertical)
}

/// Thickness of a cross arm relative to its length.
pub const CROSS_ARM_RATIO: f32 = 0.3;

/// GLSL `sign`: zero maps to zero.
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_distance_is_length_minus_radius() {
        let samples = [
            vec3(0.0, 0.0, 0.0),
            vec3(0.3, -0.2, 0.1),
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, -2.0, 0.0),
            vec3(3.5, 1.25, -7.0),
        ];
        for p in samples {
            assert_eq!(sd_sphere(p, 1.0), p.length() - 1.0);
        }
        assert!(sd_sphere(vec3(0.2, 0.1, 0.0), 1.0) < 0.0);
        assert_eq!(sd_sphere(vec3(0.0, 1.0, 0.0), 1.0), 0.0);
        assert!(sd_sphere(vec3(0.0, 1.01, 0.0), 1.0) > 0.0);
    }

    #[test]
    fn round_box_signs() {
        let b = vec3(1.0, 0.5, 0.5);
        assert!(sd_round_box(Vec3::ZERO, b, 0.0) < 0.0);
        assert!((sd_round_box(vec3(2.0, 0.0, 0.0), b, 0.0) - 1.0).abs() < 1e-6);
        assert!((sd_round_box(vec3(2.0, 0.0, 0.0), b, 0.1) - 0.9).abs() < 1e-6);
        assert!(sd_round_box(vec3(1.0, 0.0, 0.0), b, 0.0).abs() < 1e-6);
    }

    #[test]
    fn pyramid_inside_outside() {
        let h = 1.0;
        assert!(sd_pyramid(vec3(0.0, 0.3, 0.0), h) < 0.0);
        assert!((sd_pyramid(vec3(0.0, 2.0, 0.0), h) - 1.0).abs() < 1e-5);
        assert!(sd_pyramid(vec3(0.0, -0.5, 0.0), h) > 0.0);
        assert!(sd_pyramid(vec3(2.0, 0.1, 0.0), h) > 0.0);
    }

    #[test]
    fn pyramid_is_symmetric() {
        let p = vec3(0.4, 0.2, -0.1);
        let d = sd_pyramid(p, 1.2);
        assert!((sd_pyramid(vec3(-p.x, p.y, p.z), 1.2) - d).abs() < 1e-6);
        assert!((sd_pyramid(vec3(p.z, p.y, p.x), 1.2) - d).abs() < 1e-6);
    }

    #[test]
    fn cross_covers_both_arms() {
        let size = 1.0;
        assert!(sd_cross(vec3(0.9, 0.0, 0.0), size) < 0.0);
        assert!(sd_cross(vec3(0.0, 0.9, 0.0), size) < 0.0);
        assert!(sd_cross(vec3(0.9, 0.9, 0.0), size) > 0.0);
        assert!(sd_cross(vec3(0.0, 0.0, 0.9), size) > 0.0);
    }
}
