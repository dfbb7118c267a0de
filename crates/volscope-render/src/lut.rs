//! Tabulated transfer-function curves.
//!
//! A lookup table holds `N` evenly spaced samples of one curve across the
//! intensity domain: entry `i` is the curve at `lo + i / (N - 1) * (hi - lo)`.
//! Tabulation is a pure function of the curve, so the same tables feed the
//! GPU textures and the CPU reference ray caster.

use glam::Vec3;
use volscope_core::{Curve, CurveKind, CurveValue, IntensityRange, TransferFunction};

/// Default number of entries per table.
pub const DEFAULT_LUT_RESOLUTION: u32 = 256;

/// A tabulated curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut<T> {
    domain: IntensityRange,
    entries: Vec<T>,
}

impl<T: CurveValue> Lut<T> {
    /// Samples `curve` at `resolution` (at least two) points spanning `domain`.
    pub fn tabulate(curve: &Curve<T>, domain: IntensityRange, resolution: u32) -> Self {
        let n = resolution.max(2);
        let entries = (0..n)
            .map(|i| curve.sample(Self::position(domain, i, n)))
            .collect();
        Self { domain, entries }
    }

    fn position(domain: IntensityRange, i: u32, n: u32) -> f32 {
        if i == n - 1 {
            domain.max
        } else {
            domain.min + i as f32 / (n - 1) as f32 * domain.span()
        }
    }

    /// Returns the domain value entry `i` was sampled at.
    pub fn domain_value(&self, i: usize) -> f32 {
        Self::position(self.domain, i as u32, self.entries.len() as u32)
    }

    /// Returns the entries.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; tables have at least two entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the domain the table spans.
    pub fn domain(&self) -> IntensityRange {
        self.domain
    }

    /// Looks `x` up with linear filtering between entries, clamped to the ends.
    pub fn lookup(&self, x: f32) -> T {
        let last = self.entries.len() - 1;
        let u = self.domain.normalize(x);
        if u.is_nan() || u <= 0.0 {
            return self.entries[0];
        }
        if u >= 1.0 {
            return self.entries[last];
        }
        let f = u * last as f32;
        let i = (f.floor() as usize).min(last - 1);
        self.entries[i].lerp(self.entries[i + 1], f - i as f32)
    }
}

/// Tabulated opacity curve.
pub type ScalarLut = Lut<f32>;

/// Tabulated color curve.
pub type ColorLut = Lut<Vec3>;

/// One table ready for upload, tagged with the curve it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LutTable {
    ScalarOpacity(ScalarLut),
    GradientOpacity(ScalarLut),
    Color(ColorLut),
}

impl LutTable {
    /// Tabulates curve `kind` of `tf`.
    pub fn from_transfer_function(tf: &TransferFunction, kind: CurveKind, resolution: u32) -> Self {
        let domain = tf.domain();
        match kind {
            CurveKind::ScalarOpacity => {
                Self::ScalarOpacity(Lut::tabulate(tf.scalar_opacity(), domain, resolution))
            }
            CurveKind::GradientOpacity => {
                Self::GradientOpacity(Lut::tabulate(tf.gradient_opacity(), domain, resolution))
            }
            CurveKind::Color => Self::Color(Lut::tabulate(tf.color(), domain, resolution)),
        }
    }

    /// Returns the curve this table was built from.
    pub fn kind(&self) -> CurveKind {
        match self {
            Self::ScalarOpacity(_) => CurveKind::ScalarOpacity,
            Self::GradientOpacity(_) => CurveKind::GradientOpacity,
            Self::Color(_) => CurveKind::Color,
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::ScalarOpacity(lut) | Self::GradientOpacity(lut) => lut.len(),
            Self::Color(lut) => lut.len(),
        }
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three tables a frame is rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct LutSet {
    pub scalar_opacity: ScalarLut,
    pub gradient_opacity: ScalarLut,
    pub color: ColorLut,
}

impl LutSet {
    /// Tabulates all three curves of `tf`.
    pub fn from_transfer_function(tf: &TransferFunction, resolution: u32) -> Self {
        let domain = tf.domain();
        Self {
            scalar_opacity: Lut::tabulate(tf.scalar_opacity(), domain, resolution),
            gradient_opacity: Lut::tabulate(tf.gradient_opacity(), domain, resolution),
            color: Lut::tabulate(tf.color(), domain, resolution),
        }
    }

    /// Swaps in one rebuilt table.
    pub fn replace(&mut self, table: LutTable) {
        match table {
            LutTable::ScalarOpacity(lut) => self.scalar_opacity = lut,
            LutTable::GradientOpacity(lut) => self.gradient_opacity = lut,
            LutTable::Color(lut) => self.color = lut,
        }
    }

    /// Returns the table for `kind` as an upload-ready copy.
    pub fn table(&self, kind: CurveKind) -> LutTable {
        match kind {
            CurveKind::ScalarOpacity => LutTable::ScalarOpacity(self.scalar_opacity.clone()),
            CurveKind::GradientOpacity => LutTable::GradientOpacity(self.gradient_opacity.clone()),
            CurveKind::Color => LutTable::Color(self.color.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use volscope_core::{OpacityPoint, CurveUpdate};

    fn tf() -> TransferFunction {
        TransferFunction::with_defaults(IntensityRange::new(0.0, 99.0))
    }

    #[test]
    fn test_entry_positions_span_domain() {
        let lut = Lut::tabulate(tf().scalar_opacity(), IntensityRange::new(0.0, 99.0), 256);
        assert_eq!(lut.len(), 256);
        assert_eq!(lut.domain_value(0), 0.0);
        assert_eq!(lut.domain_value(255), 99.0);
        assert_eq!(lut.entries()[0], 0.0);
        assert_eq!(lut.entries()[255], 0.8);
    }

    #[test]
    fn test_resolution_floor_is_two() {
        let lut = Lut::tabulate(tf().scalar_opacity(), IntensityRange::new(0.0, 99.0), 0);
        assert_eq!(lut.len(), 2);
        assert_eq!(lut.entries(), &[0.0, 0.8]);
    }

    #[test]
    fn test_lookup_clamps_and_interpolates() {
        let mut tf = tf();
        tf.replace_curve(CurveUpdate::ScalarOpacity(vec![
            OpacityPoint::new(0.0, 0.0),
            OpacityPoint::new(99.0, 1.0),
        ]))
        .unwrap();
        let lut = Lut::tabulate(tf.scalar_opacity(), tf.domain(), 100);
        assert_eq!(lut.lookup(-10.0), 0.0);
        assert_eq!(lut.lookup(500.0), 1.0);
        assert!((lut.lookup(49.5) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_domain() {
        let domain = IntensityRange::new(7.0, 7.0);
        let tf = TransferFunction::with_defaults(domain);
        let set = LutSet::from_transfer_function(&tf, 16);
        assert_eq!(set.scalar_opacity.lookup(7.0), set.scalar_opacity.entries()[0]);
    }

    #[test]
    fn test_replace_swaps_one_table() {
        let mut tf = tf();
        let mut set = LutSet::from_transfer_function(&tf, 64);
        let color_before = set.color.clone();

        tf.replace_curve(CurveUpdate::GradientOpacity(vec![OpacityPoint::new(0.0, 0.25)]))
            .unwrap();
        set.replace(LutTable::from_transfer_function(&tf, CurveKind::GradientOpacity, 64));

        assert!(set.gradient_opacity.entries().iter().all(|&v| v == 0.25));
        assert_eq!(set.color, color_before);
    }

    proptest! {
        #[test]
        fn prop_entry_matches_curve(resolution in 2u32..512, lo in -1000.0f32..0.0, span in 1.0f32..5000.0) {
            let domain = IntensityRange::new(lo, lo + span);
            let tf = TransferFunction::with_defaults(domain);
            let lut = Lut::tabulate(tf.color(), domain, resolution);
            for i in [0, (resolution / 2) as usize, resolution as usize - 1] {
                prop_assert_eq!(lut.entries()[i], tf.color().sample(lut.domain_value(i)));
            }
        }
    }
}
