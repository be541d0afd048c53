//! wgpu backend for the backdrop renderer.
//!
//! Runs the same scene and compositor as the CPU reference, ported to WGSL,
//! behind the [`backdrop_render::RenderBackend`] contract.
//!
//! # Invariants
//! - One pipeline per compiled program; theme changes only rewrite the uniform block.
//! - Uniform locations are byte offsets into the fragment uniform block.
//! - A lost or outdated surface is reconfigured and the frame skipped.

mod gpu;
mod shaders;

pub use gpu::{UniformBlock, WgpuBackend, uniform_offset};
pub use shaders::{VERTEX_SHADER, fragment_source};

pub fn crate_info() -> &'static str {
    "backdrop-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
