use std::fmt;
use std::time::Duration;

use backdrop_common::{BackdropConfig, DEFAULT_DPR_CAP, PaletteSet, Theme, Viewport};
use backdrop_render::{
    BackendError, BufferId, CompositeOptions, FULL_SCREEN_QUAD, FrameUniforms, ProgramId,
    RenderBackend, UniformTable, frame_uniform_values,
};
use thiserror::Error;
use tracing::{debug, error, info, info_span, trace};

use crate::host::{Clock, FrameHost, ListenerId, TickHandle};
use crate::pacing::{FramePacer, FrameStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Ready,
    Running,
    Disposed,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DriverState::Uninitialized => "uninitialized",
            DriverState::Ready => "ready",
            DriverState::Running => "running",
            DriverState::Disposed => "disposed",
        })
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("rendering context unavailable: {0}")]
    Context(#[source] BackendError),
    #[error("renderer startup failed: {0}")]
    Startup(#[source] BackendError),
    #[error("cannot {action} a {from} driver")]
    InvalidTransition {
        from: DriverState,
        action: &'static str,
    },
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A frame was drawn at scene time `time` seconds.
    Drawn { time: f32 },
    /// Too soon after the last drawn frame; re-armed without drawing.
    Throttled,
    /// The driver is not running; nothing was touched.
    Stale,
}

/// Driver settings fixed for the lifetime of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub max_fps: f64,
    pub dpr_cap: f64,
    pub palettes: PaletteSet,
    pub options: CompositeOptions,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_fps: 60.0,
            dpr_cap: DEFAULT_DPR_CAP,
            palettes: PaletteSet::default(),
            options: CompositeOptions::default(),
        }
    }
}

impl From<&BackdropConfig> for DriverConfig {
    fn from(config: &BackdropConfig) -> Self {
        Self {
            max_fps: config.max_fps,
            dpr_cap: config.dpr_cap,
            palettes: config.palettes,
            options: CompositeOptions::from(config),
        }
    }
}

/// GPU-side objects owned by one running session.
#[derive(Debug)]
struct Resources {
    program: ProgramId,
    quad: BufferId,
    uniforms: UniformTable,
}

/// Owns the render loop: lifecycle, pacing, resize and per-frame uniform upload.
///
/// ```text
/// Uninitialized --init--> Ready --start--> Running --dispose--> Disposed
///        \--------------------\----------------\--(any failure)--^
/// ```
///
/// Exactly one tick is pending and one resize listener registered while
/// running; both are gone once disposed. Theme changes swap the palette
/// uniforms only.
pub struct FrameDriver<B: RenderBackend, H: FrameHost, C: Clock> {
    backend: B,
    host: H,
    clock: C,
    config: DriverConfig,
    state: DriverState,
    context_live: bool,
    resources: Option<Resources>,
    listener: Option<ListenerId>,
    pending_tick: Option<TickHandle>,
    started_at: Duration,
    last_time: f32,
    viewport: Viewport,
    pacer: FramePacer,
    stats: FrameStats,
    last_theme: Option<Theme>,
}

impl<B: RenderBackend, H: FrameHost, C: Clock> FrameDriver<B, H, C> {
    pub fn new(backend: B, host: H, clock: C, config: DriverConfig) -> Self {
        let pacer = FramePacer::new(config.max_fps);
        Self {
            backend,
            host,
            clock,
            config,
            state: DriverState::Uninitialized,
            context_live: false,
            resources: None,
            listener: None,
            pending_tick: None,
            started_at: Duration::ZERO,
            last_time: 0.0,
            viewport: Viewport::default(),
            pacer,
            stats: FrameStats::default(),
            last_theme: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.resources.as_ref().map(|r| r.program)
    }

    pub fn quad(&self) -> Option<BufferId> {
        self.resources.as_ref().map(|r| r.quad)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Scene time of the most recent tick, in seconds.
    pub fn elapsed(&self) -> f32 {
        self.last_time
    }

    /// Clock reading at which the pending tick should fire to draw.
    ///
    /// `None` when no tick is pending. A tick fired earlier is throttled, so
    /// hosts that can sleep should wait until this reading.
    pub fn next_due(&self) -> Option<Duration> {
        if self.state != DriverState::Running {
            return None;
        }
        self.pending_tick?;
        Some(self.pacer.next_due().unwrap_or_else(|| self.clock.now()))
    }

    fn expect_state(&self, want: DriverState, action: &'static str) -> Result<(), DriverError> {
        if self.state == want {
            Ok(())
        } else {
            Err(DriverError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Acquire the rendering context. The only hard failure path.
    pub fn init(&mut self) -> Result<(), DriverError> {
        self.expect_state(DriverState::Uninitialized, "init")?;
        let _span = info_span!("driver_init").entered();
        match self.backend.acquire_context() {
            Ok(()) => {
                self.context_live = true;
                self.state = DriverState::Ready;
                info!("renderer ready");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "no graphics context, animated backdrop disabled");
                self.teardown();
                Err(DriverError::Context(e))
            }
        }
    }

    /// Build the pipeline, subscribe to resizes and arm the first tick.
    ///
    /// On failure everything created so far is released and the driver is
    /// disposed. There is no retry.
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.expect_state(DriverState::Ready, "start")?;
        let _span = info_span!("driver_start").entered();

        if let Err(e) = self.build_resources() {
            error!(error = %e, "shader pipeline failed, animated backdrop disabled");
            self.teardown();
            return Err(DriverError::Startup(e));
        }

        self.listener = Some(self.host.add_resize_listener());
        let viewport = self.compute_viewport();
        if let Err(e) = self.backend.resize_surface(viewport) {
            error!(error = %e, "surface setup failed, animated backdrop disabled");
            self.teardown();
            return Err(DriverError::Startup(e));
        }
        self.viewport = viewport;

        self.started_at = self.clock.now();
        self.last_time = 0.0;
        self.pacer.reset();
        self.pending_tick = Some(self.host.request_tick());
        self.state = DriverState::Running;
        info!(
            width = viewport.width,
            height = viewport.height,
            dpr = viewport.device_pixel_ratio,
            "render loop running"
        );
        Ok(())
    }

    fn build_resources(&mut self) -> Result<(), BackendError> {
        let program = self.backend.compile_program(&self.config.options)?;
        let quad = match self.backend.upload_quad(&FULL_SCREEN_QUAD) {
            Ok(quad) => quad,
            Err(e) => {
                self.backend.release_program(program);
                return Err(e);
            }
        };
        let uniforms = match UniformTable::resolve(&self.backend, program) {
            Ok(table) => table,
            Err(e) => {
                self.backend.release_buffer(quad);
                self.backend.release_program(program);
                return Err(e);
            }
        };
        for (name, location) in uniforms.iter() {
            trace!(%name, location = location.0, "uniform resolved");
        }
        debug!(
            program = program.0,
            quad = quad.0,
            uniforms = uniforms.len(),
            "pipeline built"
        );
        self.resources = Some(Resources {
            program,
            quad,
            uniforms,
        });
        Ok(())
    }

    fn compute_viewport(&self) -> Viewport {
        Viewport::from_logical(
            self.host.logical_size(),
            self.host.device_pixel_ratio(),
            self.config.dpr_cap,
        )
    }

    /// Scene seconds at clock reading `now`, never decreasing.
    fn elapsed_at(&mut self, now: Duration) -> f32 {
        let t = now.saturating_sub(self.started_at).as_secs_f32();
        self.last_time = self.last_time.max(t);
        self.last_time
    }

    /// Handle one fired tick with the current theme flag.
    pub fn tick(&mut self, theme: Theme) -> Result<TickOutcome, DriverError> {
        if self.state != DriverState::Running {
            trace!(state = %self.state, "stale tick ignored");
            return Ok(TickOutcome::Stale);
        }
        let Some(res) = self.resources.as_ref() else {
            return Ok(TickOutcome::Stale);
        };
        let (program, quad) = (res.program, res.quad);

        // the handle that brought us here has fired
        self.pending_tick = None;
        let now = self.clock.now();
        let time = self.elapsed_at(now);
        self.pending_tick = Some(self.host.request_tick());

        if !self.pacer.should_draw(now) {
            self.stats.record_throttled();
            trace!(time, "tick throttled");
            return Ok(TickOutcome::Throttled);
        }

        if self.last_theme != Some(theme) {
            if self.last_theme.is_some() {
                debug!(theme = theme.label(), "palette swap");
            }
            self.last_theme = Some(theme);
        }

        let uniforms = FrameUniforms {
            resolution: self.viewport.resolution(),
            time,
            palette: self.config.palettes.select(theme),
        };
        self.push_uniforms(program, &uniforms)?;
        self.backend.draw(program, quad)?;
        self.backend.present()?;
        self.stats.record_drawn(now);
        trace!(time, "frame drawn");
        Ok(TickOutcome::Drawn { time })
    }

    fn push_uniforms(
        &mut self,
        program: ProgramId,
        uniforms: &FrameUniforms,
    ) -> Result<(), BackendError> {
        let Some(res) = self.resources.as_ref() else {
            return Err(BackendError::UnknownProgram(program));
        };
        for (name, value) in frame_uniform_values(uniforms) {
            let location = res
                .uniforms
                .get(name)
                .ok_or(BackendError::MissingUniform(name))?;
            self.backend.set_uniform(program, location, value)?;
        }
        Ok(())
    }

    /// React to a host resize: new drawing-buffer size and viewport transform.
    ///
    /// Elapsed time and the pipeline are left alone. Ignored unless running.
    pub fn handle_resize(&mut self) -> Result<(), DriverError> {
        if self.state != DriverState::Running {
            trace!(state = %self.state, "resize ignored");
            return Ok(());
        }
        let viewport = self.compute_viewport();
        if viewport == self.viewport {
            return Ok(());
        }
        self.backend.resize_surface(viewport)?;
        debug!(
            width = viewport.width,
            height = viewport.height,
            dpr = viewport.device_pixel_ratio,
            "surface resized"
        );
        self.viewport = viewport;
        Ok(())
    }

    /// Cancel the pending tick, drop the resize listener and release every
    /// backend resource. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.state == DriverState::Disposed {
            return;
        }
        let from = self.state;
        self.teardown();
        info!(%from, "renderer disposed");
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.pending_tick.take() {
            self.host.cancel_tick(handle);
        }
        if let Some(id) = self.listener.take() {
            self.host.remove_resize_listener(id);
        }
        if let Some(res) = self.resources.take() {
            self.backend.release_buffer(res.quad);
            self.backend.release_program(res.program);
        }
        if self.context_live {
            self.backend.release_context();
            self.context_live = false;
        }
        self.state = DriverState::Disposed;
    }
}

impl<B: RenderBackend, H: FrameHost, C: Clock> Drop for FrameDriver<B, H, C> {
    fn drop(&mut self) {
        if matches!(self.state, DriverState::Ready | DriverState::Running) {
            debug!(state = %self.state, "driver dropped without dispose");
        }
        self.dispose();
    }
}
