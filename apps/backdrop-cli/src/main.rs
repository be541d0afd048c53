use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use backdrop_common::{BackdropConfig, LayerOrder, LogicalSize, Theme, Viewport};
use backdrop_driver::{DriverConfig, FrameDriver, ManualClock, TestHost, TickOutcome};
use backdrop_render::{CompositeOptions, Frame, SoftwareBackend, render_frame};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "backdrop-cli", about = "CLI tool for the backdrop renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SceneArgs {
    /// Config file (yaml or json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drawing-buffer width in pixels
    #[arg(long, default_value = "320")]
    width: u32,

    /// Drawing-buffer height in pixels
    #[arg(long, default_value = "180")]
    height: u32,

    /// Use the dark palette
    #[arg(long)]
    dark: bool,

    /// Draw shapes behind the wave overlay
    #[arg(long)]
    shapes_behind: bool,

    /// Disable the ring overlay
    #[arg(long)]
    no_rings: bool,
}

impl SceneArgs {
    fn load(&self) -> anyhow::Result<(BackdropConfig, Theme)> {
        let mut config = match &self.config {
            Some(path) => BackdropConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BackdropConfig::default(),
        };
        if self.shapes_behind {
            config.layer_order = LayerOrder::ShapesBehind;
        }
        if self.no_rings {
            config.ring_overlay = false;
        }
        config.validate()?;
        let theme = if self.dark {
            Theme::Dark
        } else {
            config.initial_theme
        };
        Ok((config, theme))
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Render one frame on the CPU and write it as PNG
    Render {
        #[command(flatten)]
        scene: SceneArgs,
        /// Scene time in seconds
        #[arg(short, long, default_value = "0")]
        time: f32,
        /// Output file
        #[arg(short, long, default_value = "backdrop.png")]
        out: PathBuf,
    },
    /// Check that rendering is deterministic and the driver matches a direct render
    Verify {
        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Print the generated WGSL fragment shader
    Shader {
        #[command(flatten)]
        scene: SceneArgs,
    },
}

fn save_png(frame: Frame, out: &PathBuf) -> anyhow::Result<()> {
    let (width, height) = (frame.width(), frame.height());
    let image = image::RgbaImage::from_raw(width, height, frame.into_bytes())
        .context("frame buffer does not match its size")?;
    image
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

/// Run one driver session on the CPU backend and return the first presented frame.
fn first_driven_frame(
    viewport: Viewport,
    config: &BackdropConfig,
    theme: Theme,
) -> anyhow::Result<Frame> {
    let host = TestHost::new(
        LogicalSize::new(viewport.width as f64, viewport.height as f64),
        1.0,
    );
    let clock = ManualClock::new();
    clock.set(Duration::from_secs(1));
    let mut driver = FrameDriver::new(
        SoftwareBackend::new(),
        host,
        clock,
        DriverConfig::from(config),
    );
    driver.init()?;
    driver.start()?;
    driver.host_mut().fire_tick();
    let outcome = driver.tick(theme)?;
    if outcome != (TickOutcome::Drawn { time: 0.0 }) {
        bail!("first tick did not draw at time zero: {outcome:?}");
    }
    let frame = driver
        .backend()
        .presented()
        .cloned()
        .context("driver presented nothing")?;
    driver.dispose();
    if driver.host().pending_ticks() != 0 || driver.host().resize_listeners() != 0 {
        bail!("driver left host registrations behind");
    }
    Ok(frame)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("backdrop-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", backdrop_common::crate_info());
            println!("scene: {}", backdrop_scene::crate_info());
            println!("render: {}", backdrop_render::crate_info());
            println!("render-wgpu: {}", backdrop_render_wgpu::crate_info());
            println!("driver: {}", backdrop_driver::crate_info());
        }
        Commands::Render { scene, time, out } => {
            let (config, theme) = scene.load()?;
            let viewport = scene.viewport();
            println!(
                "Rendering {}x{} at t={time}s, theme={}",
                viewport.width,
                viewport.height,
                theme.label()
            );
            let frame = render_frame(
                viewport,
                time,
                config.palettes.select(theme),
                CompositeOptions::from(&config),
            );
            println!("digest: {}", frame.digest());
            save_png(frame, &out)?;
            println!("Wrote {}", out.display());
        }
        Commands::Verify { scene } => {
            let (config, theme) = scene.load()?;
            let viewport = scene.viewport();
            let palette = config.palettes.select(theme);
            let options = CompositeOptions::from(&config);

            let a = render_frame(viewport, 0.0, palette, options);
            let b = render_frame(viewport, 0.0, palette, options);
            println!("Run 1:  {}", a.digest());
            println!("Run 2:  {}", b.digest());

            let driven = first_driven_frame(viewport, &config, theme)?;
            println!("Driver: {}", driven.digest());

            let other_palette = config.palettes.select(theme.toggled());
            let other = render_frame(viewport, 0.0, other_palette, options);
            println!("Other theme: {}", other.digest());

            let deterministic = a == b;
            let driver_matches = driven == a;
            let palette_applies = other != a;
            println!(
                "Deterministic: {}",
                if deterministic { "OK" } else { "MISMATCH" }
            );
            println!(
                "Driver matches: {}",
                if driver_matches { "OK" } else { "MISMATCH" }
            );
            println!(
                "Palette applies: {}",
                if palette_applies { "OK" } else { "MISMATCH" }
            );
            if !(deterministic && driver_matches && palette_applies) {
                bail!("verification failed");
            }
        }
        Commands::Shader { scene } => {
            let (config, _) = scene.load()?;
            print!(
                "{}",
                backdrop_render_wgpu::fragment_source(&CompositeOptions::from(&config))
            );
        }
    }

    Ok(())
}
