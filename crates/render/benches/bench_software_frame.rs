use std::hint::black_box;
use std::time::Instant;

use backdrop_common::{Palette, Viewport};
use backdrop_render::{CompositeOptions, FrameUniforms, render_frame, shade_pixel};
use backdrop_scene::{camera_ray, march_shapes, march_wave};
use glam::vec2;

fn bench_frame(width: u32, height: u32, iterations: usize) {
    let viewport = Viewport::new(width, height);
    let options = CompositeOptions::default();

    let start = Instant::now();
    for i in 0..iterations {
        let time = i as f32 * 0.016;
        let _ = black_box(render_frame(
            black_box(viewport),
            black_box(time),
            Palette::LIGHT,
            options,
        ));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  frame ({width}x{height}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_pixel(iterations: usize) {
    let uniforms = FrameUniforms {
        resolution: vec2(1280.0, 720.0),
        time: 12.0,
        palette: Palette::DARK,
    };
    let options = CompositeOptions::default();

    let start = Instant::now();
    for i in 0..iterations {
        let frag = vec2((i % 1280) as f32 + 0.5, (i / 1280 % 720) as f32 + 0.5);
        let _ = black_box(shade_pixel(black_box(frag), &uniforms, &options));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  shade_pixel ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_marchers(iterations: usize) {
    let res = vec2(1280.0, 720.0);

    let start = Instant::now();
    for i in 0..iterations {
        // Sweep a scanline through the lower half where the wave lives
        let dir = camera_ray(vec2((i % 1280) as f32, 200.0), res);
        let _ = black_box(march_wave(glam::Vec3::ZERO, black_box(dir), 3.0));
    }
    let elapsed = start.elapsed();
    println!("  march_wave ({iterations} iters): {:?}/iter", elapsed / iterations as u32);

    let start = Instant::now();
    for i in 0..iterations {
        let dir = camera_ray(vec2((i % 1280) as f32, 360.0), res);
        let _ = black_box(march_shapes(glam::Vec3::ZERO, black_box(dir), 3.0));
    }
    let elapsed = start.elapsed();
    println!("  march_shapes ({iterations} iters): {:?}/iter", elapsed / iterations as u32);
}

fn main() {
    println!("=== Software Backdrop Benchmarks ===\n");

    println!("Marchers:");
    bench_marchers(10000);

    println!("\nPer pixel:");
    bench_pixel(10000);

    println!("\nWhole frame:");
    bench_frame(64, 36, 20);
    bench_frame(320, 180, 5);
    bench_frame(640, 360, 2);

    println!("\n=== Done ===");
}
