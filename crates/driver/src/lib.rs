//! Frame driver: owns the render loop for one mounted backdrop.
//!
//! # Invariants
//! - At most one tick pending and one resize listener while running; none after dispose.
//! - Elapsed time is measured from start and never decreases.
//! - A theme change swaps the palette uniforms only, never the pipeline.
//! - Uniform locations are resolved once per session.
//! - Startup failures release everything and leave the backdrop static.

mod driver;
mod host;
mod pacing;

pub use driver::{DriverConfig, DriverError, DriverState, FrameDriver, TickOutcome};
pub use host::{Clock, FrameHost, ListenerId, ManualClock, SystemClock, TestHost, TickHandle};
pub use pacing::{FramePacer, FrameStats, PACING_SLACK};

pub fn crate_info() -> &'static str {
    "backdrop-driver v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("driver"));
    }
}
