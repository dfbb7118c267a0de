//! Configuration options for volscope.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Global configuration options for a volscope run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Window settings for interactive sessions.
    pub window: WindowOptions,

    /// Background color composited behind the volume.
    pub background_color: Vec3,

    /// Ray-casting quality.
    pub quality: RenderQuality,

    /// Phong shading of volume samples.
    pub shading: ShadingOptions,

    /// Number of entries in each transfer-function lookup table.
    pub lut_resolution: u32,

    /// Largest volume payload accepted for upload, in bytes.
    pub max_volume_bytes: u64,

    /// File extension picked up when an input is a directory.
    pub volume_extension: String,

    /// Placement of the slider controls.
    pub controls: ControlLayout,

    /// Time a LUT rebuild may take before a warning is logged, in milliseconds.
    pub lut_rebuild_budget_ms: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            window: WindowOptions::default(),
            background_color: Vec3::new(0.1, 0.1, 0.1),
            quality: RenderQuality::default(),
            shading: ShadingOptions::default(),
            lut_resolution: 256,
            max_volume_bytes: 1 << 30,
            volume_extension: "nrrd".to_string(),
            controls: ControlLayout::default(),
            lut_rebuild_budget_ms: 16.0,
        }
    }
}

impl Options {
    /// Loads options from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Parses options from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut options: Self = serde_json::from_str(text)?;
        if options.lut_resolution < 2 {
            log::warn!(
                "lut_resolution {} is too small, using 2",
                options.lut_resolution
            );
            options.lut_resolution = 2;
        }
        Ok(options)
    }
}

/// Window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    /// Initial inner width in physical pixels.
    pub width: u32,
    /// Initial inner height in physical pixels.
    pub height: u32,
    /// Window title prefix; the volume file name is appended.
    pub title: String,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "volscope".to_string(),
        }
    }
}

/// Ray-casting quality settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderQuality {
    /// Distance between ray samples, in units of the smallest voxel spacing.
    pub step_size: f32,
    /// Upper bound on samples per ray.
    pub max_steps: u32,
    /// Accumulated alpha at which a ray stops marching.
    pub early_termination_alpha: f32,
    /// World distance over which a LUT opacity applies unchanged.
    pub opacity_unit_distance: f32,
}

impl Default for RenderQuality {
    fn default() -> Self {
        Self {
            step_size: 0.5,
            max_steps: 2048,
            early_termination_alpha: 0.995,
            opacity_unit_distance: 1.0,
        }
    }
}

impl RenderQuality {
    /// Smallest step size `[`/`]` can reach.
    pub const MIN_STEP_SIZE: f32 = 0.125;
    /// Largest step size `[`/`]` can reach.
    pub const MAX_STEP_SIZE: f32 = 4.0;

    /// Returns a copy with the step size scaled by `factor`, kept within limits.
    #[must_use]
    pub fn with_step_scaled(mut self, factor: f32) -> Self {
        self.step_size = (self.step_size * factor).clamp(Self::MIN_STEP_SIZE, Self::MAX_STEP_SIZE);
        self
    }
}

/// Phong shading coefficients applied to volume samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingOptions {
    /// Whether samples are lit at all.
    pub enabled: bool,
    /// Ambient coefficient.
    pub ambient: f32,
    /// Diffuse coefficient.
    pub diffuse: f32,
    /// Specular coefficient.
    pub specular: f32,
    /// Specular exponent.
    pub specular_power: f32,
}

impl Default for ShadingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ambient: 0.1,
            diffuse: 0.9,
            specular: 0.2,
            specular_power: 10.0,
        }
    }
}

/// Placement of the slider column, in physical pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlLayout {
    /// Left edge of every slider.
    pub left: f32,
    /// Top edge of the first slider.
    pub top: f32,
    /// Slider track width.
    pub width: f32,
    /// Slider hit-region height.
    pub height: f32,
    /// Vertical gap between sliders.
    pub spacing: f32,
}

impl Default for ControlLayout {
    fn default() -> Self {
        Self {
            left: 16.0,
            top: 16.0,
            width: 190.0,
            height: 24.0,
            spacing: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.window.width, 800);
        assert_eq!(options.window.height, 600);
        assert_eq!(options.background_color, Vec3::splat(0.1));
        assert_eq!(options.lut_resolution, 256);
        assert!(options.shading.enabled);
        assert_eq!(options.shading.specular_power, 10.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = Options::from_json_str(
            r#"{ "window": { "width": 1024 }, "quality": { "step_size": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(options.window.width, 1024);
        assert_eq!(options.window.height, 600);
        assert_eq!(options.quality.step_size, 1.0);
        assert_eq!(options.quality.early_termination_alpha, 0.995);
        assert_eq!(options.volume_extension, "nrrd");
    }

    #[test]
    fn test_json_round_trip() {
        let mut options = Options::default();
        options.background_color = Vec3::new(0.0, 0.2, 0.4);
        options.shading.enabled = false;
        let text = serde_json::to_string(&options).unwrap();
        assert_eq!(Options::from_json_str(&text).unwrap(), options);
    }

    #[test]
    fn test_lut_resolution_floor() {
        let options = Options::from_json_str(r#"{ "lut_resolution": 1 }"#).unwrap();
        assert_eq!(options.lut_resolution, 2);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Options::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_step_scaling_is_clamped() {
        let quality = RenderQuality::default();
        assert_eq!(quality.with_step_scaled(2.0).step_size, 1.0);
        assert_eq!(quality.with_step_scaled(0.01).step_size, RenderQuality::MIN_STEP_SIZE);
        assert_eq!(quality.with_step_scaled(100.0).step_size, RenderQuality::MAX_STEP_SIZE);
    }
}
