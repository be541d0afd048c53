//! The six floating shapes and their composite distance field.
//!
//! A shape has no stored state: every attribute is recomputed from a hash of its
//! index, and its pose from `(index, t)`. Positions orbit along X on a looping
//! conveyor wrapped into `[-ORBIT_SPAN / 2, ORBIT_SPAN / 2)`.

use core::f32::consts::TAU;

use glam::{Vec3, vec3};

use crate::math::{rotate_x, rotate_y, wrap_centered};
use crate::noise::hash_index;
use crate::sdf::{sd_cross, sd_pyramid, sd_round_box, sd_sphere};

pub const SHAPE_COUNT: u32 = 6;
/// Width of the X conveyor the shapes loop along.
pub const ORBIT_SPAN: f32 = 12.0;
/// The shapes field never reports more than this; beyond it the field is flat.
pub const FIELD_CAP: f32 = 4.0;
pub const NORMAL_EPSILON: f32 = 1e-3;
/// Accepted gradient length range for a usable normal.
pub const NORMAL_MIN_LEN: f32 = 0.5;
pub const NORMAL_MAX_LEN: f32 = 1.5;

/// Primitive used by a shape, assigned by `index mod 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeClass {
    Sphere,
    Box,
    Pyramid,
    Cross,
}

impl ShapeClass {
    pub const ALL: [ShapeClass; 4] = [
        ShapeClass::Sphere,
        ShapeClass::Box,
        ShapeClass::Pyramid,
        ShapeClass::Cross,
    ];

    pub fn index(self) -> u32 {
        match self {
            ShapeClass::Sphere => 0,
            ShapeClass::Box => 1,
            ShapeClass::Pyramid => 2,
            ShapeClass::Cross => 3,
        }
    }
}

pub fn shape_class(index: u32) -> ShapeClass {
    ShapeClass::ALL[(index % 4) as usize]
}

/// Per-instance attributes, derived from the index alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeInstance {
    pub index: u32,
    pub class: ShapeClass,
    /// Conveyor speed along X, units per second.
    pub speed: f32,
    pub height: f32,
    pub depth: f32,
    pub size: f32,
    /// Rotation rate, radians per second.
    pub spin: f32,
    /// Fraction of the conveyor span the shape starts at.
    pub phase: f32,
}

impl ShapeInstance {
    pub fn from_index(index: u32) -> Self {
        Self {
            index,
            class: shape_class(index),
            speed: 0.25 + 0.35 * hash_index(index, 0),
            height: -1.1 + 2.2 * hash_index(index, 1),
            depth: 5.0 + 3.0 * hash_index(index, 2),
            size: 0.35 + 0.25 * hash_index(index, 3),
            spin: 0.2 + 0.6 * hash_index(index, 4),
            phase: hash_index(index, 5),
        }
    }

    /// World position at scene time `t`.
    pub fn position(&self, t: f32) -> Vec3 {
        let fi = self.index as f32;
        let lane = fi * ORBIT_SPAN / SHAPE_COUNT as f32;
        let x = wrap_centered(t * self.speed + self.phase * ORBIT_SPAN + lane, ORBIT_SPAN);
        let y = self.height + 0.35 * (t * 0.7 + fi * 1.3).sin();
        let z = self.depth + 0.6 * (t * 0.45 + fi * 0.9).cos();
        vec3(x, y, z)
    }

    /// Y then X rotation angles at scene time `t`.
    pub fn rotation(&self, t: f32) -> (f32, f32) {
        (t * self.spin, t * self.spin * 0.7 + self.phase * TAU)
    }

    /// Transform a world point into this instance's local frame.
    pub fn to_local(&self, p: Vec3, t: f32) -> Vec3 {
        let (yaw, pitch) = self.rotation(t);
        rotate_x(rotate_y(p - self.position(t), yaw), pitch)
    }

    pub fn distance(&self, p: Vec3, t: f32) -> f32 {
        let q = self.to_local(p, t);
        let s = self.size;
        match self.class {
            ShapeClass::Sphere => sd_sphere(q, s),
            ShapeClass::Box => sd_round_box(q, Vec3::splat(s * 0.7), s * 0.1),
            ShapeClass::Pyramid => {
                let scale = s * 1.6;
                sd_pyramid(q / scale + vec3(0.0, 0.5, 0.0), 1.0) * scale
            }
            ShapeClass::Cross => sd_cross(q, s),
        }
    }
}

/// Nearest distance in the shapes field and the class that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    pub distance: f32,
    pub class: ShapeClass,
}

pub fn shapes_field(p: Vec3, t: f32) -> FieldSample {
    let mut best = FieldSample {
        distance: f32::INFINITY,
        class: ShapeClass::Sphere,
    };
    for index in 0..SHAPE_COUNT {
        let d = ShapeInstance::from_index(index).distance(p, t);
        if d < best.distance {
            best = FieldSample {
                distance: d,
                class: shape_class(index),
            };
        }
    }
    best.distance = best.distance.min(FIELD_CAP);
    best
}

/// Central-difference gradient of the shapes field.
pub fn shapes_gradient(p: Vec3, t: f32) -> Vec3 {
    let e = NORMAL_EPSILON;
    let f = |q: Vec3| shapes_field(q, t).distance;
    vec3(
        f(p + vec3(e, 0.0, 0.0)) - f(p - vec3(e, 0.0, 0.0)),
        f(p + vec3(0.0, e, 0.0)) - f(p - vec3(0.0, e, 0.0)),
        f(p + vec3(0.0, 0.0, e)) - f(p - vec3(0.0, 0.0, e)),
    ) / (2.0 * e)
}

/// Surface normal, or `None` when the gradient is degenerate.
pub fn estimate_normal(p: Vec3, t: f32) -> Option<Vec3> {
    let g = shapes_gradient(p, t);
    let len = g.length();
    if (NORMAL_MIN_LEN..=NORMAL_MAX_LEN).contains(&len) {
        Some(g / len)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_is_index_mod_four() {
        for i in 0..SHAPE_COUNT {
            assert_eq!(shape_class(i).index(), i % 4);
            assert_eq!(ShapeInstance::from_index(i).class, shape_class(i));
        }
    }

    #[test]
    fn instances_are_deterministic() {
        for i in 0..SHAPE_COUNT {
            let a = ShapeInstance::from_index(i);
            let b = ShapeInstance::from_index(i);
            assert_eq!(a, b);
            for t in [0.0_f32, 1.5, 37.25, 1000.0] {
                let pa = a.position(t);
                let pb = b.position(t);
                assert_eq!(pa.to_array().map(f32::to_bits), pb.to_array().map(f32::to_bits));
                let (ya, xa) = a.rotation(t);
                let (yb, xb) = b.rotation(t);
                assert_eq!((ya.to_bits(), xa.to_bits()), (yb.to_bits(), xb.to_bits()));
            }
        }
    }

    #[test]
    fn instances_differ_from_each_other() {
        let a = ShapeInstance::from_index(0);
        let b = ShapeInstance::from_index(1);
        assert_ne!(a.speed, b.speed);
        assert_ne!(a.position(0.0), b.position(0.0));
    }

    #[test]
    fn positions_loop_within_conveyor() {
        for i in 0..SHAPE_COUNT {
            let inst = ShapeInstance::from_index(i);
            for step in 0..200 {
                let p = inst.position(step as f32 * 0.73);
                assert!(p.x >= -ORBIT_SPAN * 0.5 && p.x <= ORBIT_SPAN * 0.5);
                assert!(p.z > 0.0);
            }
        }
    }

    #[test]
    fn field_is_negative_at_shape_centres() {
        let t = 2.0;
        for i in 0..SHAPE_COUNT {
            let inst = ShapeInstance::from_index(i);
            let c = inst.position(t);
            assert!(inst.distance(c, t) < 0.0, "shape {i} centre not inside");
            assert!(shapes_field(c, t).distance < 0.0);
        }
    }

    #[test]
    fn field_is_capped_far_away() {
        let far = vec3(0.0, 60.0, 0.0);
        let sample = shapes_field(far, 0.0);
        assert_eq!(sample.distance, FIELD_CAP);
    }

    #[test]
    fn normal_far_from_surfaces_is_rejected() {
        let far = vec3(0.0, 60.0, 0.0);
        assert!(shapes_gradient(far, 0.0).length() < NORMAL_MIN_LEN);
        assert!(estimate_normal(far, 0.0).is_none());
    }

    #[test]
    fn normal_on_sphere_points_outward() {
        let t = 0.5;
        let sphere = ShapeInstance::from_index(0);
        assert_eq!(sphere.class, ShapeClass::Sphere);
        let p = sphere.position(t) + vec3(0.0, sphere.size + 0.01, 0.0);
        let n = estimate_normal(p, t).expect("valid normal near the sphere");
        assert!(n.dot(Vec3::Y) > 0.99, "normal {n:?}");
        assert!((n.length() - 1.0).abs() < 1e-5);
    }
}
