use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use backdrop_common::{BackdropConfig, LogicalSize, Theme};
use backdrop_driver::{
    Clock, DriverConfig, DriverState, FrameDriver, FrameHost, ListenerId, SystemClock, TickHandle,
};
use backdrop_render_wgpu::WgpuBackend;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize as WinitLogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "backdrop-desktop", about = "Animated backdrop in a desktop window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (yaml or json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start in dark mode
    #[arg(long)]
    dark: bool,

    /// Initial window width in logical pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in logical pixels
    #[arg(long)]
    height: Option<u32>,
}

/// Frame host backed by a winit window.
///
/// A tick is one `RedrawRequested`. Requesting a tick only records it; the
/// redraw is asked for from `about_to_wait` once the frame is due.
struct WinitHost {
    window: Arc<Window>,
    next_id: u64,
    pending: Option<TickHandle>,
    listener: Option<ListenerId>,
}

impl WinitHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            pending: None,
            listener: None,
        }
    }

    /// Consume the pending tick, if any. Redraws nobody asked for are not ticks.
    fn take_tick(&mut self) -> Option<TickHandle> {
        self.pending.take()
    }

    fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn listening(&self) -> bool {
        self.listener.is_some()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl FrameHost for WinitHost {
    fn request_tick(&mut self) -> TickHandle {
        let handle = TickHandle(self.allocate_id());
        self.pending = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.allocate_id());
        self.listener = Some(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        if self.listener == Some(id) {
            self.listener = None;
        }
    }

    fn logical_size(&self) -> LogicalSize {
        let size = self
            .window
            .inner_size()
            .to_logical::<f64>(self.window.scale_factor());
        LogicalSize::new(size.width, size.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }
}

type DesktopDriver = FrameDriver<WgpuBackend, WinitHost, SystemClock>;

struct BackdropApp {
    config: BackdropConfig,
    theme: Theme,
    window: Option<Arc<Window>>,
    driver: Option<DesktopDriver>,
}

impl BackdropApp {
    fn new(config: BackdropConfig, theme: Theme) -> Self {
        Self {
            config,
            theme,
            window: None,
            driver: None,
        }
    }

    fn title(&self) -> String {
        format!("Backdrop · {}", self.theme.label())
    }

    fn mount(&mut self, window: Arc<Window>) {
        let backend = WgpuBackend::new(window.clone());
        let host = WinitHost::new(window);
        let mut driver = FrameDriver::new(
            backend,
            host,
            SystemClock::new(),
            DriverConfig::from(&self.config),
        );
        // failures are logged by the driver; the window stays up without animation
        if driver.init().is_ok() && driver.start().is_ok() {
            tracing::info!("backdrop mounted");
        }
        self.driver = Some(driver);
    }

    fn unmount(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.dispose();
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        tracing::info!("theme: {}", self.theme.label());
        let title = self.title();
        if let Some(window) = &self.window {
            window.set_title(&title);
        }
    }

    fn redraw(&mut self) {
        let theme = self.theme;
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        if driver.host_mut().take_tick().is_none() {
            return;
        }
        if let Err(e) = driver.tick(theme) {
            tracing::warn!("frame skipped: {e}");
        }
    }

    /// Sleep until the pending tick can draw, then ask for the redraw.
    fn schedule(&self, event_loop: &ActiveEventLoop) {
        let Some(driver) = self.driver.as_ref() else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };
        let due = driver.next_due().filter(|_| driver.host().has_pending());
        match due {
            Some(due) if due > driver.clock().now() => {
                let deadline = driver.clock().instant_at(due);
                event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            Some(_) => {
                event_loop.set_control_flow(ControlFlow::Wait);
                driver.host().window.request_redraw();
            }
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn resized(&mut self) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        if driver.state() != DriverState::Running || !driver.host().listening() {
            return;
        }
        if let Err(e) = driver.handle_resize() {
            tracing::warn!("resize failed: {e}");
        }
    }
}

impl ApplicationHandler for BackdropApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = self.config.window;
        let attrs = Window::default_attributes()
            .with_title(self.title())
            .with_inner_size(WinitLogicalSize::new(size.width, size.height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("could not create window: {e}");
                event_loop.exit();
                return;
            }
        };

        self.window = Some(window.clone());
        self.mount(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resized();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::KeyT => self.toggle_theme(),
                KeyCode::Escape => {
                    self.unmount();
                    event_loop.exit();
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.schedule(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.unmount();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => BackdropConfig::load(path)?,
        None => BackdropConfig::default(),
    };
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }
    config.validate()?;
    let theme = if cli.dark {
        Theme::Dark
    } else {
        config.initial_theme
    };

    tracing::info!("backdrop-desktop starting");

    let event_loop = EventLoop::new()?;
    // frames are scheduled from about_to_wait against the pacing deadline
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = BackdropApp::new(config, theme);
    event_loop.run_app(&mut app)?;

    Ok(())
}
