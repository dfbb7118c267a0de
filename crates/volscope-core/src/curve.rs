//! Piecewise-linear curves over an intensity domain.

use glam::Vec3;

use crate::error::CurveViolation;

/// A value a curve can carry at its control points.
pub trait CurveValue: Copy + PartialEq + std::fmt::Debug {
    /// Linear interpolation; `t == 0.0` must return `self` exactly.
    fn lerp(self, other: Self, t: f32) -> Self;

    /// Returns whether the value lies in the output range `[0, 1]`.
    fn is_valid_output(&self) -> bool;
}

impl CurveValue for f32 {
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn is_valid_output(&self) -> bool {
        self.is_finite() && (0.0..=1.0).contains(self)
    }
}

impl CurveValue for Vec3 {
    fn lerp(self, other: Self, t: f32) -> Self {
        Vec3::lerp(self, other, t)
    }

    fn is_valid_output(&self) -> bool {
        self.to_array().iter().all(CurveValue::is_valid_output)
    }
}

/// A single `(domain, output)` control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint<T> {
    /// Position in the intensity domain.
    pub domain: f32,
    /// Curve value at `domain`.
    pub output: T,
}

impl<T> ControlPoint<T> {
    /// Creates a control point.
    pub const fn new(domain: f32, output: T) -> Self {
        Self { domain, output }
    }
}

/// Control point of an opacity curve.
pub type OpacityPoint = ControlPoint<f32>;

/// Control point of a color curve.
pub type ColorPoint = ControlPoint<Vec3>;

/// A validated piecewise-linear curve.
///
/// Invariants: at least one point, finite non-decreasing domain values (equal
/// neighbours encode a step), and outputs in `[0, 1]`. A `Curve` can only be
/// obtained through [`Curve::new`], so a held curve always satisfies them.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve<T> {
    points: Vec<ControlPoint<T>>,
}

impl<T: CurveValue> Curve<T> {
    /// Validates `points` and builds a curve from them.
    pub fn new(points: Vec<ControlPoint<T>>) -> Result<Self, CurveViolation> {
        validate(&points)?;
        Ok(Self { points })
    }

    /// Builds a curve from points known to satisfy the invariants.
    pub(crate) fn from_trusted(points: Vec<ControlPoint<T>>) -> Self {
        debug_assert!(validate(&points).is_ok(), "untrusted curve points");
        Self { points }
    }

    /// Returns the control points in domain order.
    pub fn points(&self) -> &[ControlPoint<T>] {
        &self.points
    }

    /// Returns the number of control points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; curves have at least one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the first control point.
    pub fn first(&self) -> ControlPoint<T> {
        self.points[0]
    }

    /// Returns the last control point.
    pub fn last(&self) -> ControlPoint<T> {
        self.points[self.points.len() - 1]
    }

    /// Evaluates the curve at `x`.
    ///
    /// Between control points the surrounding outputs are interpolated
    /// linearly. Outside `[first.domain, last.domain]` the nearest endpoint's
    /// output is returned. Where several points share a domain value the last
    /// of them wins. NaN evaluates to the first output.
    pub fn sample(&self, x: f32) -> T {
        let first = self.first();
        let last = self.last();

        if x.is_nan() || x < first.domain {
            return first.output;
        }
        if x >= last.domain {
            return last.output;
        }

        // first.domain <= x < last.domain, so 1 <= upper <= len - 1
        let upper = self.points.partition_point(|p| p.domain <= x);
        let a = self.points[upper - 1];
        let b = self.points[upper];
        let t = (x - a.domain) / (b.domain - a.domain);
        a.output.lerp(b.output, t)
    }
}

fn validate<T: CurveValue>(points: &[ControlPoint<T>]) -> Result<(), CurveViolation> {
    if points.is_empty() {
        return Err(CurveViolation::Empty);
    }
    for (index, point) in points.iter().enumerate() {
        if !point.domain.is_finite() {
            return Err(CurveViolation::NonFiniteDomain { index });
        }
        if !point.output.is_valid_output() {
            return Err(CurveViolation::OutputOutOfRange { index });
        }
        if index > 0 && point.domain < points[index - 1].domain {
            return Err(CurveViolation::DecreasingDomain {
                index,
                previous: points[index - 1].domain,
                current: point.domain,
            });
        }
    }
    Ok(())
}
