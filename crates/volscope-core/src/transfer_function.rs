//! The three-curve transfer function used to shade ray-cast samples.

use glam::Vec3;

use crate::curve::{ColorPoint, Curve, OpacityPoint};
use crate::error::InvalidCurveError;
use crate::volume::IntensityRange;

/// Color of the lowest intensities in the default color curve.
pub const DEFAULT_BASE_COLOR: Vec3 = Vec3::new(0.54902, 0.25098, 0.14902);
/// Color at the middle of the default color curve.
pub const DEFAULT_MID_COLOR: Vec3 = Vec3::new(0.882_353, 0.603_922, 0.290_196);
/// Color of the highest intensities in the default color curve.
pub const DEFAULT_HIGH_COLOR: Vec3 = Vec3::new(0.694, 0.478, 0.396);

/// Domain breakpoints (fractions of the intensity range) of the scalar-opacity curve.
pub const SCALAR_OPACITY_BREAKPOINTS: [f32; 3] = [0.0, 0.5, 1.0];
/// Domain breakpoints of the gradient-opacity curve.
pub const GRADIENT_OPACITY_BREAKPOINTS: [f32; 4] = [0.0, 0.25, 0.5, 1.0];
/// Domain breakpoints of the color curve.
pub const COLOR_BREAKPOINTS: [f32; 3] = [0.0, 0.5, 1.0];

const DEFAULT_SCALAR_OPACITY: [f32; 3] = [0.0, 0.6, 0.8];
const DEFAULT_GRADIENT_OPACITY: [f32; 4] = [0.0, 1.0, 0.8, 0.4];
const DEFAULT_COLORS: [Vec3; 3] = [DEFAULT_BASE_COLOR, DEFAULT_MID_COLOR, DEFAULT_HIGH_COLOR];

/// Identifies one of the three transfer-function curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    /// Opacity as a function of intensity.
    ScalarOpacity,
    /// Opacity as a function of gradient magnitude.
    GradientOpacity,
    /// RGB color as a function of intensity.
    Color,
}

impl CurveKind {
    /// All curve kinds, in LUT binding order.
    pub const ALL: [CurveKind; 3] = [
        CurveKind::ScalarOpacity,
        CurveKind::GradientOpacity,
        CurveKind::Color,
    ];

    /// Returns a display name.
    pub fn name(self) -> &'static str {
        match self {
            CurveKind::ScalarOpacity => "scalar opacity",
            CurveKind::GradientOpacity => "gradient opacity",
            CurveKind::Color => "color",
        }
    }
}

impl std::fmt::Display for CurveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A full replacement for one curve.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveUpdate {
    /// New scalar-opacity points.
    ScalarOpacity(Vec<OpacityPoint>),
    /// New gradient-opacity points.
    GradientOpacity(Vec<OpacityPoint>),
    /// New color points.
    Color(Vec<ColorPoint>),
}

impl CurveUpdate {
    /// Returns the curve this update replaces.
    pub fn kind(&self) -> CurveKind {
        match self {
            CurveUpdate::ScalarOpacity(_) => CurveKind::ScalarOpacity,
            CurveUpdate::GradientOpacity(_) => CurveKind::GradientOpacity,
            CurveUpdate::Color(_) => CurveKind::Color,
        }
    }
}

/// The value of a curve at one domain position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveSample {
    /// Sample of an opacity curve.
    Opacity(f32),
    /// Sample of the color curve.
    Color(Vec3),
}

impl CurveSample {
    /// Returns the opacity, if this is an opacity sample.
    pub fn opacity(self) -> Option<f32> {
        match self {
            CurveSample::Opacity(v) => Some(v),
            CurveSample::Color(_) => None,
        }
    }

    /// Returns the color, if this is a color sample.
    pub fn color(self) -> Option<Vec3> {
        match self {
            CurveSample::Color(c) => Some(c),
            CurveSample::Opacity(_) => None,
        }
    }
}

/// Scalar opacity, gradient opacity and color curves over a volume's intensity range.
///
/// The gradient-opacity curve reuses the intensity range as its domain.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    domain: IntensityRange,
    scalar_opacity: Curve<f32>,
    gradient_opacity: Curve<f32>,
    color: Curve<Vec3>,
    revision: u64,
}

impl TransferFunction {
    /// Creates the default transfer function for `domain`.
    ///
    /// The defaults are chosen so that a freshly loaded volume is legible
    /// before any control is touched.
    pub fn with_defaults(domain: IntensityRange) -> Self {
        let scalar_opacity = SCALAR_OPACITY_BREAKPOINTS
            .iter()
            .zip(DEFAULT_SCALAR_OPACITY)
            .map(|(&f, o)| OpacityPoint::new(domain.at_fraction(f), o))
            .collect();
        let gradient_opacity = GRADIENT_OPACITY_BREAKPOINTS
            .iter()
            .zip(DEFAULT_GRADIENT_OPACITY)
            .map(|(&f, o)| OpacityPoint::new(domain.at_fraction(f), o))
            .collect();

        Self {
            domain,
            scalar_opacity: Curve::from_trusted(scalar_opacity),
            gradient_opacity: Curve::from_trusted(gradient_opacity),
            color: Curve::from_trusted(default_color_points(domain, DEFAULT_BASE_COLOR)),
            revision: 0,
        }
    }

    /// Returns the intensity domain all three curves span.
    pub fn domain(&self) -> IntensityRange {
        self.domain
    }

    /// Returns the scalar-opacity curve.
    pub fn scalar_opacity(&self) -> &Curve<f32> {
        &self.scalar_opacity
    }

    /// Returns the gradient-opacity curve.
    pub fn gradient_opacity(&self) -> &Curve<f32> {
        &self.gradient_opacity
    }

    /// Returns the color curve.
    pub fn color(&self) -> &Curve<Vec3> {
        &self.color
    }

    /// Returns a counter bumped by every accepted replacement.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces one curve with `update`.
    ///
    /// The replacement is validated as a whole first; a rejected update leaves
    /// the current curve untouched.
    pub fn replace_curve(&mut self, update: CurveUpdate) -> Result<(), InvalidCurveError> {
        let kind = update.kind();
        let reject = |violation| InvalidCurveError { kind, violation };

        match update {
            CurveUpdate::ScalarOpacity(points) => {
                self.scalar_opacity = Curve::new(points).map_err(reject)?;
            }
            CurveUpdate::GradientOpacity(points) => {
                self.gradient_opacity = Curve::new(points).map_err(reject)?;
            }
            CurveUpdate::Color(points) => {
                self.color = Curve::new(points).map_err(reject)?;
            }
        }

        self.revision += 1;
        log::debug!("replaced {kind} curve (revision {})", self.revision);
        Ok(())
    }

    /// Evaluates the curve `kind` at `x`.
    pub fn sample(&self, kind: CurveKind, x: f32) -> CurveSample {
        match kind {
            CurveKind::ScalarOpacity => CurveSample::Opacity(self.scalar_opacity.sample(x)),
            CurveKind::GradientOpacity => CurveSample::Opacity(self.gradient_opacity.sample(x)),
            CurveKind::Color => CurveSample::Color(self.color.sample(x)),
        }
    }
}

/// Builds the default color points with `first` as the lowest color.
pub fn default_color_points(domain: IntensityRange, first: Vec3) -> Vec<ColorPoint> {
    COLOR_BREAKPOINTS
        .iter()
        .zip(DEFAULT_COLORS)
        .enumerate()
        .map(|(i, (&f, c))| ColorPoint::new(domain.at_fraction(f), if i == 0 { first } else { c }))
        .collect()
}
