//! Bindings from slider values to replacement transfer-function curves.

use glam::Vec3;

use crate::controls::{ControlId, ControlValues};
use crate::curve::OpacityPoint;
use crate::error::InvalidCurveError;
use crate::transfer_function::{
    default_color_points, CurveKind, CurveUpdate, TransferFunction, DEFAULT_BASE_COLOR,
    GRADIENT_OPACITY_BREAKPOINTS, SCALAR_OPACITY_BREAKPOINTS,
};
use crate::volume::IntensityRange;

/// The opacity curve a plateau binding reshapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpacityCurve {
    Scalar,
    Gradient,
}

impl From<OpacityCurve> for CurveKind {
    fn from(curve: OpacityCurve) -> Self {
        match curve {
            OpacityCurve::Scalar => CurveKind::ScalarOpacity,
            OpacityCurve::Gradient => CurveKind::GradientOpacity,
        }
    }
}

/// How a control value becomes a full curve.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingTemplate {
    /// Fixed domain breakpoints (fractions of the intensity range). The first
    /// output is pinned to zero and every later output takes the control value.
    Plateau {
        curve: OpacityCurve,
        breakpoints: Vec<f32>,
    },
    /// The three controls set the RGB of the first color point; the remaining
    /// points keep their default colors.
    LeadingColor { channels: [ControlId; 3] },
}

/// Binds one control to one curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub control: ControlId,
    pub template: BindingTemplate,
}

impl ParameterBinding {
    /// Returns the curve this binding replaces.
    pub fn curve(&self) -> CurveKind {
        match &self.template {
            BindingTemplate::Plateau { curve, .. } => (*curve).into(),
            BindingTemplate::LeadingColor { .. } => CurveKind::Color,
        }
    }

    /// Builds the replacement curve for `value`.
    ///
    /// `snapshot` must already hold `value` for this binding's control; the
    /// composite template reads its other channels from it. The value is not
    /// clamped, so out-of-range values surface as rejected curves.
    pub fn instantiate(
        &self,
        value: f32,
        snapshot: &ControlValues,
        domain: IntensityRange,
    ) -> CurveUpdate {
        match &self.template {
            BindingTemplate::Plateau { curve, breakpoints } => {
                let points = opacity_plateau(breakpoints, domain, |i| if i == 0 { 0.0 } else { value });
                match curve {
                    OpacityCurve::Scalar => CurveUpdate::ScalarOpacity(points),
                    OpacityCurve::Gradient => CurveUpdate::GradientOpacity(points),
                }
            }
            BindingTemplate::LeadingColor { channels } => {
                let channel = |i: usize| {
                    snapshot
                        .get(channels[i])
                        .unwrap_or(DEFAULT_BASE_COLOR[i])
                };
                let leading = Vec3::new(channel(0), channel(1), channel(2));
                CurveUpdate::Color(default_color_points(domain, leading))
            }
        }
    }
}

fn opacity_plateau(
    breakpoints: &[f32],
    domain: IntensityRange,
    output: impl Fn(usize) -> f32,
) -> Vec<OpacityPoint> {
    breakpoints
        .iter()
        .enumerate()
        .map(|(i, &f)| OpacityPoint::new(domain.at_fraction(f), output(i)))
        .collect()
}

/// The bindings of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSet {
    bindings: Vec<ParameterBinding>,
}

impl Default for BindingSet {
    /// The five default bindings: two opacity plateaus and the RGB of the
    /// lowest color.
    fn default() -> Self {
        let channels = [ControlId::COLOR_R, ControlId::COLOR_G, ControlId::COLOR_B];
        let mut bindings = vec![
            ParameterBinding {
                control: ControlId::SCALAR_OPACITY,
                template: BindingTemplate::Plateau {
                    curve: OpacityCurve::Scalar,
                    breakpoints: SCALAR_OPACITY_BREAKPOINTS.to_vec(),
                },
            },
            ParameterBinding {
                control: ControlId::GRADIENT_OPACITY,
                template: BindingTemplate::Plateau {
                    curve: OpacityCurve::Gradient,
                    breakpoints: GRADIENT_OPACITY_BREAKPOINTS.to_vec(),
                },
            },
        ];
        bindings.extend(channels.iter().map(|&control| ParameterBinding {
            control,
            template: BindingTemplate::LeadingColor { channels },
        }));
        Self { bindings }
    }
}

impl BindingSet {
    /// Creates a set from explicit bindings.
    pub fn new(bindings: Vec<ParameterBinding>) -> Self {
        Self { bindings }
    }

    /// Returns the bindings.
    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Returns the binding for `control`, if any.
    pub fn binding_for(&self, control: ControlId) -> Option<&ParameterBinding> {
        self.bindings.iter().find(|b| b.control == control)
    }

    /// Applies a control change to `tf`.
    ///
    /// Returns the curve that changed, or `None` if no binding exists for
    /// `control`. A rejected curve leaves `tf` unchanged.
    pub fn apply_control_change(
        &self,
        control: ControlId,
        value: f32,
        snapshot: &ControlValues,
        tf: &mut TransferFunction,
    ) -> Result<Option<CurveKind>, InvalidCurveError> {
        let Some(binding) = self.binding_for(control) else {
            log::debug!("no binding for control '{control}'");
            return Ok(None);
        };

        let snapshot = snapshot.clone().with(control, value);
        let update = binding.instantiate(value, &snapshot, tf.domain());
        let kind = update.kind();
        tf.replace_curve(update)?;
        Ok(Some(kind))
    }
}
