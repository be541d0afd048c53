//! Shared value types for the backdrop renderer.
//!
//! # Invariants
//! - Palettes are swapped whole; there is no interpolation between themes.
//! - Viewport dimensions are physical pixels and never zero.
//! - The theme flag is plain data passed down by its owner, never looked up globally.

mod config;
mod types;

pub use config::{BackdropConfig, ConfigError, WindowConfig};
pub use types::{
    DEFAULT_DPR_CAP, LayerOrder, LogicalSize, Palette, PaletteSet, Theme, Viewport,
    clamp_device_pixel_ratio,
};

pub fn crate_info() -> &'static str {
    "backdrop-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
