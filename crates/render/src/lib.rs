//! Backdrop compositor and renderer-agnostic backend contract.
//!
//! # Invariants
//! - Compositing reads frame uniforms only; it never mutates scene state.
//! - Output channels are clamped to [0, 1] and alpha is always opaque.
//! - Uniform locations are resolved once per linked program and cached by the caller.
//!
//! The [`RenderBackend`] trait is the seam between the frame driver and the
//! graphics API. [`SoftwareBackend`] is the CPU reference; the wgpu backend
//! lives in its own crate and implements the same trait.

pub mod compose;
mod renderer;
mod software;

pub use compose::{
    CompositeOptions, FrameUniforms, background, class_tint, ring_overlay, shade_pixel,
};
pub use renderer::{
    BackendError, BufferId, FULL_SCREEN_QUAD, ProgramId, RenderBackend, ShaderStage,
    UniformKind, UniformLocation, UniformName, UniformTable, UniformValue, frame_uniform_values,
};
pub use software::{Frame, SoftwareBackend, UniformWrite, render_frame};

pub fn crate_info() -> &'static str {
    "backdrop-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
