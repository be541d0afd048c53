use backdrop_common::LayerOrder;
use backdrop_render::CompositeOptions;

/// Vertex stage: the full-screen quad is already in clip space.
pub const VERTEX_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    return out;
}
"#;

/// Fragment stage body. Mirrors the CPU scene and compositor constant for constant.
///
/// Expects `SHAPES_IN_FRONT` and `RING_OVERLAY` to be declared ahead of it, see
/// [`fragment_source`].
const FRAGMENT_BODY: &str = r#"
struct Uniforms {
    resolution: vec2<f32>,
    time: f32,
    color1: vec3<f32>,
    color2: vec3<f32>,
    color3: vec3<f32>,
    color4: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

const PI: f32 = 3.14159265;
const TAU: f32 = 6.28318531;

const SHAPE_COUNT: u32 = 6u;
const ORBIT_SPAN: f32 = 12.0;
const FIELD_CAP: f32 = 4.0;
const NORMAL_EPSILON: f32 = 0.001;
const NORMAL_MIN_LEN: f32 = 0.5;
const NORMAL_MAX_LEN: f32 = 1.5;
const CROSS_ARM_RATIO: f32 = 0.3;

const WAVE_BASE_HEIGHT: f32 = -1.6;
const WAVE_TILT: f32 = 0.12;
const WAVE_FIELD_SCALE: f32 = 0.7;

const CAMERA_FOCAL: f32 = 1.5;
const WAVE_MAX_STEPS: u32 = 96u;
const WAVE_MAX_RANGE: f32 = 30.0;
const WAVE_NEAR_SURFACE: f32 = 0.06;
const WAVE_MAX_DRAWS: u32 = 6u;
const WAVE_DRAW_ALPHA: f32 = 0.22;
const WAVE_GLOW_MIN_RANGE: f32 = 2.0;
const WAVE_GLOW_FALLOFF: f32 = 8.0;
const WAVE_OMEGA: f32 = 1.3;
const WAVE_MIN_STEP: f32 = 0.03;
const SHAPE_MAX_STEPS: u32 = 72u;
const SHAPE_MAX_RANGE: f32 = 20.0;
const SHAPE_HIT_EPSILON: f32 = 0.002;
const SHAPE_SAFETY: f32 = 0.9;
const SHAPE_MIN_STEP: f32 = 0.005;

const STAR_THRESHOLD: f32 = 0.99;
const STAR_POWER: f32 = 20.0;
const STAR_FLOOR_POWER: f32 = 80.0;
const STAR_FLOOR_GAIN: f32 = 0.05;
const DUST_LAYERS: u32 = 3u;

const WAVE_HIGHLIGHT: vec3<f32> = vec3<f32>(0.97, 0.98, 1.0);
const DUST_TINT: vec3<f32> = vec3<f32>(0.55, 1.0, 0.7);
const DUST_WEIGHT: f32 = 0.6;
const RING_COUNT: u32 = 5u;
const RING_ANCHOR: vec2<f32> = vec2<f32>(1.05, -0.05);
const RING_SPEED: f32 = 0.05;
const RING_MAX_RADIUS: f32 = 1.4;
const RING_WIDTH: f32 = 0.004;
const RING_GAIN: f32 = 0.18;

// ---- math ----

fn wrap_centered(x: f32, span: f32) -> f32 {
    return x - span * floor(x / span) - 0.5 * span;
}

fn rotate_y(p: vec3<f32>, angle: f32) -> vec3<f32> {
    let s = sin(angle);
    let c = cos(angle);
    return vec3<f32>(c * p.x + s * p.z, p.y, -s * p.x + c * p.z);
}

fn rotate_x(p: vec3<f32>, angle: f32) -> vec3<f32> {
    let s = sin(angle);
    let c = cos(angle);
    return vec3<f32>(p.x, c * p.y - s * p.z, s * p.y + c * p.z);
}

// ---- noise ----

fn mix_bits(seed: u32) -> u32 {
    var h = seed;
    h ^= h >> 16u;
    h *= 0x7feb352du;
    h ^= h >> 15u;
    h *= 0x846ca68bu;
    h ^= h >> 16u;
    return h;
}

fn to_unit(h: u32) -> f32 {
    return f32(h >> 8u) * (1.0 / 16777216.0);
}

fn lattice(x: f32) -> u32 {
    return bitcast<u32>(i32(floor(x)));
}

fn hash_index(index: u32, salt: u32) -> f32 {
    return to_unit(mix_bits((index * 0x9e3779b1u) ^ (salt * 0x85ebca77u)));
}

fn hash21(p: vec2<f32>) -> f32 {
    return to_unit(mix_bits((lattice(p.x) * 0x27d4eb2du) ^ (lattice(p.y) * 0x165667b1u)));
}

fn value_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let w = f * f * (3.0 - 2.0 * f);
    return mix(
        mix(hash21(i), hash21(i + vec2<f32>(1.0, 0.0)), w.x),
        mix(hash21(i + vec2<f32>(0.0, 1.0)), hash21(i + vec2<f32>(1.0, 1.0)), w.x),
        w.y,
    );
}

fn star_brightness(p: vec2<f32>, t: f32) -> f32 {
    let h = hash21(p);
    var spark = pow(h, STAR_FLOOR_POWER) * STAR_FLOOR_GAIN;
    if h > STAR_THRESHOLD {
        spark = pow(h, STAR_POWER);
    }
    let twinkle = value_noise(p * 0.37 + vec2<f32>(t * 0.8, t * 0.53));
    return mix(spark * 0.2, spark, twinkle);
}

fn dust(uv: vec2<f32>, t: f32, intensity: f32) -> f32 {
    var acc = 0.0;
    for (var li = 0u; li < DUST_LAYERS; li++) {
        let lf = f32(li);
        let scale = 90.0 + 60.0 * lf;
        let drift = vec2<f32>(t * (0.6 + 0.4 * lf), lf * 13.7);
        acc += star_brightness(uv * scale + drift, t) / (1.0 + lf);
    }
    let falloff = max(cos((uv.x - 0.5) * PI), 0.0);
    return acc * falloff * intensity;
}

// ---- distance fields ----

fn sd_sphere(p: vec3<f32>, r: f32) -> f32 {
    return length(p) - r;
}

fn sd_round_box(p: vec3<f32>, b: vec3<f32>, r: f32) -> f32 {
    let q = abs(p) - b;
    return length(max(q, vec3<f32>(0.0))) + min(max(q.x, max(q.y, q.z)), 0.0) - r;
}

fn sd_pyramid(p: vec3<f32>, h: f32) -> f32 {
    let m2 = h * h + 0.25;

    var xz = abs(p.xz);
    if xz.y > xz.x {
        xz = xz.yx;
    }
    xz -= vec2<f32>(0.5);
    let px = xz.x;
    let py = p.y;
    let pz = xz.y;

    let q = vec3<f32>(pz, h * py - 0.5 * px, h * px + 0.5 * py);

    let s = max(-q.x, 0.0);
    let t = clamp((q.y - 0.5 * pz) / (m2 + 0.25), 0.0, 1.0);

    let a = m2 * (q.x + s) * (q.x + s) + q.y * q.y;
    let b = m2 * (q.x + 0.5 * t) * (q.x + 0.5 * t) + (q.y - m2 * t) * (q.y - m2 * t);

    var d2 = min(a, b);
    if min(q.y, -q.x * m2 - q.y * 0.5) > 0.0 {
        d2 = 0.0;
    }
    return sqrt((d2 + q.z * q.z) / m2) * sign(max(q.z, -py));
}

fn sd_cross(p: vec3<f32>, size: f32) -> f32 {
    let arm = size * CROSS_ARM_RATIO;
    let horizontal = sd_round_box(p, vec3<f32>(size, arm, arm), 0.0);
    let vertical = sd_round_box(p, vec3<f32>(arm, size, arm), 0.0);
    return min(horizontal, vertical);
}

// ---- shapes ----

fn shape_position(index: u32, t: f32) -> vec3<f32> {
    let fi = f32(index);
    let speed = 0.25 + 0.35 * hash_index(index, 0u);
    let height = -1.1 + 2.2 * hash_index(index, 1u);
    let depth = 5.0 + 3.0 * hash_index(index, 2u);
    let phase = hash_index(index, 5u);
    let lane = fi * ORBIT_SPAN / f32(SHAPE_COUNT);
    let x = wrap_centered(t * speed + phase * ORBIT_SPAN + lane, ORBIT_SPAN);
    let y = height + 0.35 * sin(t * 0.7 + fi * 1.3);
    let z = depth + 0.6 * cos(t * 0.45 + fi * 0.9);
    return vec3<f32>(x, y, z);
}

fn shape_distance(index: u32, p: vec3<f32>, t: f32) -> f32 {
    let size = 0.35 + 0.25 * hash_index(index, 3u);
    let spin = 0.2 + 0.6 * hash_index(index, 4u);
    let phase = hash_index(index, 5u);
    let yaw = t * spin;
    let pitch = t * spin * 0.7 + phase * TAU;
    let q = rotate_x(rotate_y(p - shape_position(index, t), yaw), pitch);

    let kind = index % 4u;
    if kind == 0u {
        return sd_sphere(q, size);
    }
    if kind == 1u {
        return sd_round_box(q, vec3<f32>(size * 0.7), size * 0.1);
    }
    if kind == 2u {
        let scale = size * 1.6;
        return sd_pyramid(q / scale + vec3<f32>(0.0, 0.5, 0.0), 1.0) * scale;
    }
    return sd_cross(q, size);
}

struct FieldSample {
    distance: f32,
    kind: u32,
};

fn shapes_field(p: vec3<f32>, t: f32) -> FieldSample {
    var best: FieldSample;
    best.distance = 1e30;
    best.kind = 0u;
    for (var index = 0u; index < SHAPE_COUNT; index++) {
        let d = shape_distance(index, p, t);
        if d < best.distance {
            best.distance = d;
            best.kind = index % 4u;
        }
    }
    best.distance = min(best.distance, FIELD_CAP);
    return best;
}

fn shapes_gradient(p: vec3<f32>, t: f32) -> vec3<f32> {
    let e = NORMAL_EPSILON;
    let dx = shapes_field(p + vec3<f32>(e, 0.0, 0.0), t).distance
        - shapes_field(p - vec3<f32>(e, 0.0, 0.0), t).distance;
    let dy = shapes_field(p + vec3<f32>(0.0, e, 0.0), t).distance
        - shapes_field(p - vec3<f32>(0.0, e, 0.0), t).distance;
    let dz = shapes_field(p + vec3<f32>(0.0, 0.0, e), t).distance
        - shapes_field(p - vec3<f32>(0.0, 0.0, e), t).distance;
    return vec3<f32>(dx, dy, dz) / (2.0 * e);
}

// ---- wave ----

fn wave_height(x: f32, z: f32, t: f32) -> f32 {
    let swell = 0.22 * sin(x * 0.8 + t * 0.6)
        + 0.14 * sin(z * 1.3 - t * 0.9 + x * 0.4)
        + 0.07 * sin((x + z) * 2.1 + t * 1.3);
    let ripple = 0.18 * (value_noise(vec2<f32>(x, z) * 0.6 + vec2<f32>(t * 0.1, -t * 0.07)) - 0.5);
    return WAVE_BASE_HEIGHT + WAVE_TILT * z + swell + ripple;
}

fn wave_field(p: vec3<f32>, t: f32) -> f32 {
    return (p.y - wave_height(p.x, p.z, t)) * WAVE_FIELD_SCALE;
}

// ---- marchers ----

fn camera_ray(frag: vec2<f32>, resolution: vec2<f32>) -> vec3<f32> {
    let p = (2.0 * frag - resolution) / resolution.y;
    return normalize(vec3<f32>(p, CAMERA_FOCAL));
}

struct WaveSample {
    alpha: f32,
    glow: f32,
};

fn march_wave(origin: vec3<f32>, dir: vec3<f32>, time: f32) -> WaveSample {
    var t = 0.0;
    var omega = WAVE_OMEGA;
    var stride = 0.0;
    var prev_radius = 0.0;
    var alpha = 0.0;
    var glow = 0.0;
    var draws = 0u;

    for (var i = 0u; i < WAVE_MAX_STEPS; i++) {
        let radius = abs(wave_field(origin + dir * t, time));
        let crossing = omega > 1.0 && radius + prev_radius < stride;
        prev_radius = radius;

        if crossing {
            stride -= omega * stride;
            omega = 1.0;
        } else {
            stride = max(radius * omega, WAVE_MIN_STEP);
            if radius < WAVE_NEAR_SURFACE {
                alpha += (1.0 - alpha) * WAVE_DRAW_ALPHA * (1.0 - radius / WAVE_NEAR_SURFACE);
                draws += 1u;
                if draws >= WAVE_MAX_DRAWS {
                    break;
                }
            }
            if t > WAVE_GLOW_MIN_RANGE {
                glow += 1.0 / (1.0 + radius * radius * WAVE_GLOW_FALLOFF);
            }
        }

        t += stride;
        if t > WAVE_MAX_RANGE {
            break;
        }
    }

    var out: WaveSample;
    out.alpha = min(alpha, 1.0);
    out.glow = min(glow / f32(WAVE_MAX_STEPS), 1.0);
    return out;
}

struct ShapeHit {
    hit: bool,
    fresnel: f32,
    rim: f32,
    distance: f32,
    kind: u32,
    normal: vec3<f32>,
};

fn march_shapes(origin: vec3<f32>, dir: vec3<f32>, time: f32) -> ShapeHit {
    var out: ShapeHit;
    out.hit = false;
    var t = 0.0;
    for (var i = 0u; i < SHAPE_MAX_STEPS; i++) {
        let p = origin + dir * t;
        let nearest = shapes_field(p, time);
        if nearest.distance < SHAPE_HIT_EPSILON {
            let g = shapes_gradient(p, time);
            let len = length(g);
            if len < NORMAL_MIN_LEN || len > NORMAL_MAX_LEN {
                return out;
            }
            let normal = g / len;
            let facing = dot(normal, -dir);
            out.hit = true;
            out.fresnel = pow(max(1.0 - max(facing, 0.0), 0.0), 2.5);
            out.rim = pow(max(1.0 - abs(facing), 0.0), 3.0);
            out.distance = t;
            out.kind = nearest.kind;
            out.normal = normal;
            return out;
        }
        t += max(nearest.distance * SHAPE_SAFETY, SHAPE_MIN_STEP);
        if t > SHAPE_MAX_RANGE {
            break;
        }
    }
    return out;
}

// ---- compositor ----

fn class_tint(kind: u32) -> vec3<f32> {
    if kind == 0u {
        return vec3<f32>(1.0, 0.80, 0.86);
    }
    if kind == 1u {
        return vec3<f32>(0.78, 0.88, 1.0);
    }
    if kind == 2u {
        return vec3<f32>(0.80, 0.98, 0.88);
    }
    return vec3<f32>(1.0, 0.96, 0.78);
}

fn background(uv: vec2<f32>) -> vec3<f32> {
    let third = 1.0 / 3.0;
    let g = saturate((uv.x + uv.y) * 0.5);
    if g < third {
        return mix(uniforms.color1, uniforms.color2, g * 3.0);
    }
    if g < 2.0 * third {
        return mix(uniforms.color2, uniforms.color3, (g - third) * 3.0);
    }
    return mix(uniforms.color3, uniforms.color4, (g - 2.0 * third) * 3.0);
}

fn glass_overlay(color: vec3<f32>, uv: vec2<f32>, hit: ShapeHit, time: f32) -> vec3<f32> {
    let tint = class_tint(hit.kind);
    let bend = hit.normal.xy * 0.04 * (1.0 - hit.fresnel);
    let refraction = background(uv + bend) * tint;
    let specular = vec3<f32>(hit.fresnel * 0.8);
    let band = (vec3<f32>(hit.rim) + vec3<f32>(0.0, 0.33, 0.67)) * TAU + vec3<f32>(time);
    let iridescence = (vec3<f32>(0.5) + 0.5 * cos(band)) * hit.rim * 0.6;
    let inner = tint * (1.0 - hit.rim) * 0.15 * exp(-hit.distance * 0.1);
    let glass = refraction + specular + iridescence + inner;
    let coverage = mix(0.35, 0.9, hit.fresnel);
    return mix(color, glass, coverage);
}

fn ring_overlay(uv: vec2<f32>, aspect: f32, time: f32) -> f32 {
    let q = vec2<f32>((uv.x - RING_ANCHOR.x) * aspect, uv.y - RING_ANCHOR.y);
    let d = length(q);
    var acc = 0.0;
    for (var k = 0u; k < RING_COUNT; k++) {
        let phase = fract(time * RING_SPEED + f32(k) / f32(RING_COUNT));
        let radius = phase * RING_MAX_RADIUS;
        let line = 1.0 - smoothstep(0.0, RING_WIDTH, abs(d - radius));
        acc += line * (1.0 - phase) * RING_GAIN;
    }
    return acc;
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let res = uniforms.resolution;
    let t = uniforms.time;
    let frag = vec2<f32>(frag_coord.x, res.y - frag_coord.y);
    let uv = frag / res;
    let dir = camera_ray(frag, res);
    let eye = vec3<f32>(0.0);

    let wave = march_wave(eye, dir, t);
    let hit = march_shapes(eye, dir, t);

    var color = background(uv);
    if SHAPES_IN_FRONT {
        color = mix(color, WAVE_HIGHLIGHT, wave.alpha);
        if hit.hit {
            color = glass_overlay(color, uv, hit, t);
        }
    } else {
        if hit.hit {
            color = glass_overlay(color, uv, hit, t);
        }
        color = mix(color, WAVE_HIGHLIGHT, wave.alpha);
    }

    color += DUST_TINT * dust(uv, t, wave.glow) * DUST_WEIGHT;
    if RING_OVERLAY {
        color += vec3<f32>(ring_overlay(uv, res.x / res.y, t));
    }
    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// Full fragment source with the compositing switches baked in as constants.
pub fn fragment_source(options: &CompositeOptions) -> String {
    let in_front = options.layer_order == LayerOrder::ShapesInFront;
    let rings = options.ring_overlay;
    format!(
        "const SHAPES_IN_FRONT: bool = {in_front};\nconst RING_OVERLAY: bool = {rings};\n\
         {FRAGMENT_BODY}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_render::UniformName;

    #[test]
    fn fragment_exposes_every_uniform() {
        let src = fragment_source(&CompositeOptions::default());
        for name in UniformName::ALL {
            let field = format!("    {}: ", name.as_str());
            assert!(src.contains(&field), "missing uniform {name}");
        }
    }

    #[test]
    fn switches_are_baked_in() {
        let src = fragment_source(&CompositeOptions {
            layer_order: LayerOrder::ShapesBehind,
            ring_overlay: false,
        });
        let header = "const SHAPES_IN_FRONT: bool = false;\nconst RING_OVERLAY: bool = false;\n";
        assert!(src.starts_with(header));

        let src = fragment_source(&CompositeOptions::default());
        let header = "const SHAPES_IN_FRONT: bool = true;\nconst RING_OVERLAY: bool = true;\n";
        assert!(src.starts_with(header));
    }

    #[test]
    fn stages_have_entry_points() {
        assert!(VERTEX_SHADER.contains("fn vs_main"));
        assert!(FRAGMENT_BODY.contains("fn fs_main"));
    }
}
