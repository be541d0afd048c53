//! Shader-style scalar helpers shared by the CPU scene and mirrored in WGSL.

use core::ops::{Add, Mul, Sub};

use glam::{Vec3, vec3};

/// GLSL `fract`: `x - floor(x)`.
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let x = saturate((x - edge0) / (edge1 - edge0));
    x * x * (3.0 - 2.0 * x)
}

pub fn mix<X, A>(x: X, y: X, a: A) -> X
where
    X: Copy + Mul<A, Output = X> + Add<Output = X> + Sub<Output = X>,
    A: Copy,
{
    x + (y - x) * a
}

/// Wrap `x` into `[-span/2, span/2)`, floor-based so negative inputs wrap too.
pub fn wrap_centered(x: f32, span: f32) -> f32 {
    x - span * (x / span).floor() - 0.5 * span
}

pub fn rotate_y(p: Vec3, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    vec3(c * p.x + s * p.z, p.y, -s * p.x + c * p.z)
}

pub fn rotate_x(p: Vec3, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    vec3(p.x, c * p.y - s * p.z, s * p.y + c * p.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fract_handles_negatives() {
        assert_eq!(fract(1.25), 0.25);
        assert_eq!(fract(-0.25), 0.75);
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
    }

    #[test]
    fn wrap_stays_in_span() {
        for x in [-37.5_f32, -6.0, 0.0, 5.99, 6.0, 123.4] {
            let w = wrap_centered(x, 12.0);
            assert!((-6.0..6.0).contains(&w), "{x} wrapped to {w}");
        }
    }

    #[test]
    fn rotations_preserve_length() {
        let p = vec3(0.3, -1.2, 2.5);
        assert!((rotate_y(p, 1.1).length() - p.length()).abs() < 1e-5);
        assert!((rotate_x(p, -0.7).length() - p.length()).abs() < 1e-5);
        assert!((rotate_y(p, 0.0) - p).length() < 1e-6);
    }
}
