use glam::{Vec2, Vec3, vec3};
use serde::{Deserialize, Serialize};

/// Default upper bound applied to the device pixel ratio.
pub const DEFAULT_DPR_CAP: f64 = 2.0;

/// Light/dark theme flag owned by the page shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Label shown next to the theme toggle.
    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "LIGHT",
            Theme::Dark => "DARK",
        }
    }
}

/// Four RGB gradient stops, each channel in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub color1: Vec3,
    pub color2: Vec3,
    pub color3: Vec3,
    pub color4: Vec3,
}

impl Palette {
    pub const LIGHT: Palette = Palette {
        color1: vec3(0.98, 0.87, 0.91),
        color2: vec3(0.87, 0.90, 0.99),
        color3: vec3(0.82, 0.95, 0.93),
        color4: vec3(0.99, 0.95, 0.84),
    };

    pub const DARK: Palette = Palette {
        color1: vec3(0.05, 0.06, 0.14),
        color2: vec3(0.13, 0.09, 0.25),
        color3: vec3(0.06, 0.17, 0.26),
        color4: vec3(0.02, 0.03, 0.08),
    };

    pub fn stops(&self) -> [Vec3; 4] {
        [self.color1, self.color2, self.color3, self.color4]
    }

    /// True when every channel of every stop lies in [0, 1].
    pub fn is_in_range(&self) -> bool {
        self.stops().iter().all(|c| {
            c.is_finite() && c.cmpge(Vec3::ZERO).all() && c.cmple(Vec3::ONE).all()
        })
    }
}

/// The pair of palettes a backdrop switches between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteSet {
    pub light: Palette,
    pub dark: Palette,
}

impl Default for PaletteSet {
    fn default() -> Self {
        Self {
            light: Palette::LIGHT,
            dark: Palette::DARK,
        }
    }
}

impl PaletteSet {
    /// Whole-object palette swap keyed by the theme flag.
    pub fn select(&self, theme: Theme) -> Palette {
        if theme.is_dark() { self.dark } else { self.light }
    }
}

/// Whether shapes are composited in front of or behind the wave overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrder {
    #[default]
    ShapesInFront,
    ShapesBehind,
}

/// Window size in logical (CSS-like) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalSize {
    pub width: f64,
    pub height: f64,
}

impl LogicalSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Clamp a raw device pixel ratio into `[1.0, cap]`.
///
/// Non-finite or non-positive ratios fall back to 1.0.
pub fn clamp_device_pixel_ratio(raw: f64, cap: f64) -> f64 {
    let cap = if cap.is_finite() && cap >= 1.0 { cap } else { 1.0 };
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    raw.clamp(1.0, cap)
}

/// Drawing-buffer size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            device_pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            device_pixel_ratio: 1.0,
        }
    }

    /// Physical size from a logical size and a device pixel ratio clamped to `dpr_cap`.
    pub fn from_logical(size: LogicalSize, raw_dpr: f64, dpr_cap: f64) -> Self {
        let ratio = clamp_device_pixel_ratio(raw_dpr, dpr_cap);
        let scale = |v: f64| {
            let v = if v.is_finite() { v.max(0.0) } else { 0.0 };
            ((v * ratio).round() as u32).max(1)
        };
        Self {
            width: scale(size.width),
            height: scale(size.height),
            device_pixel_ratio: ratio,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn resolution(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_toggle_and_label() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert!(Theme::Light.toggled().is_dark());
        assert_eq!(Theme::Dark.label(), "DARK");
        assert_eq!(Theme::default().label(), "LIGHT");
    }

    #[test]
    fn palette_select_is_whole_swap() {
        let set = PaletteSet::default();
        assert_eq!(set.select(Theme::Light), Palette::LIGHT);
        assert_eq!(set.select(Theme::Dark), Palette::DARK);
        assert!(Palette::LIGHT.is_in_range());
        assert!(Palette::DARK.is_in_range());
    }

    #[test]
    fn dpr_is_clamped() {
        assert_eq!(clamp_device_pixel_ratio(3.0, 2.0), 2.0);
        assert_eq!(clamp_device_pixel_ratio(1.5, 2.0), 1.5);
        assert_eq!(clamp_device_pixel_ratio(0.5, 2.0), 1.0);
        assert_eq!(clamp_device_pixel_ratio(f64::NAN, 2.0), 1.0);
        assert_eq!(clamp_device_pixel_ratio(-2.0, 2.0), 1.0);
    }

    #[test]
    fn viewport_from_logical_applies_capped_ratio() {
        let vp = Viewport::from_logical(LogicalSize::new(800.0, 600.0), 3.0, DEFAULT_DPR_CAP);
        assert_eq!((vp.width, vp.height), (1600, 1200));
        assert_eq!(vp.device_pixel_ratio, 2.0);

        let vp = Viewport::from_logical(LogicalSize::new(0.0, 10.0), 1.0, DEFAULT_DPR_CAP);
        assert_eq!(vp.width, 1);
        assert_eq!(vp.height, 10);
    }

    #[test]
    fn viewport_aspect() {
        let vp = Viewport::new(1920, 1080);
        assert!((vp.aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(vp.pixel_count(), 1920 * 1080);
    }
}
