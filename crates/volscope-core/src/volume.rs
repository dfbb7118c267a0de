//! Dense scalar volumes.

use glam::Vec3;

use crate::error::VolumeError;

/// Inclusive `(min, max)` intensity range of a volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityRange {
    /// Smallest sample value.
    pub min: f32,
    /// Largest sample value.
    pub max: f32,
}

impl IntensityRange {
    /// Creates a range, swapping the bounds if given in the wrong order.
    pub fn new(a: f32, b: f32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Returns `max - min`.
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Returns the domain value at `fraction` of the way from `min` to `max`.
    ///
    /// `0.0` and `1.0` return the bounds exactly.
    pub fn at_fraction(&self, fraction: f32) -> f32 {
        if fraction <= 0.0 {
            self.min
        } else if fraction >= 1.0 {
            self.max
        } else {
            self.min + fraction * self.span()
        }
    }

    /// Maps `value` into `[0, 1]` relative to this range (unclamped).
    ///
    /// A degenerate range maps everything to `0.0`.
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.span();
        if span > 0.0 {
            (value - self.min) / span
        } else {
            0.0
        }
    }

    /// Returns whether `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// An immutable dense 3D grid of scalar intensities.
///
/// Axis order for `dimensions` and `spacing` is `(depth, height, width)`, i.e.
/// `(z, y, x)`. Samples are row-major with depth outermost:
/// `index = z * height * width + y * width + x`.
#[derive(Debug, Clone)]
pub struct Volume {
    dimensions: [usize; 3],
    spacing: [f32; 3],
    origin: Vec3,
    samples: Vec<f32>,
    intensity_range: IntensityRange,
}

impl Volume {
    /// Creates a volume, validating the grid and computing its intensity range.
    pub fn new(
        dimensions: [usize; 3],
        spacing: [f32; 3],
        samples: Vec<f32>,
    ) -> Result<Self, VolumeError> {
        if dimensions.contains(&0) {
            return Err(VolumeError::EmptyDimension(dimensions));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(VolumeError::InvalidSpacing(spacing));
        }
        let expected = dimensions
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or(VolumeError::TooManyVoxels(dimensions))?;
        if samples.len() != expected {
            return Err(VolumeError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }

        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for (index, &v) in samples.iter().enumerate() {
            if !v.is_finite() {
                return Err(VolumeError::NonFiniteSample { index });
            }
            min = min.min(v);
            max = max.max(v);
        }

        Ok(Self {
            dimensions,
            spacing,
            origin: Vec3::ZERO,
            samples,
            intensity_range: IntensityRange { min, max },
        })
    }

    /// Sets the world position of voxel `(0, 0, 0)`.
    #[must_use]
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Returns `(depth, height, width)`.
    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// Returns the per-axis spacing in `(depth, height, width)` order.
    pub fn spacing(&self) -> [f32; 3] {
        self.spacing
    }

    /// Returns the spacing as an `(x, y, z)` vector.
    pub fn spacing_xyz(&self) -> Vec3 {
        Vec3::new(self.spacing[2], self.spacing[1], self.spacing[0])
    }

    /// Returns the grid size as an `(x, y, z)` vector of voxel counts.
    pub fn dims_xyz(&self) -> Vec3 {
        Vec3::new(
            self.dimensions[2] as f32,
            self.dimensions[1] as f32,
            self.dimensions[0] as f32,
        )
    }

    /// Returns the world position of voxel `(0, 0, 0)`.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Returns all samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the intensity range computed at construction.
    pub fn intensity_range(&self) -> IntensityRange {
        self.intensity_range
    }

    /// Returns the total number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.samples.len()
    }

    /// Returns the physical extent `(x, y, z)` of the grid.
    pub fn physical_size(&self) -> Vec3 {
        self.dims_xyz() * self.spacing_xyz()
    }

    /// Returns the world-space bounding box `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.origin, self.origin + self.physical_size())
    }

    /// Returns the sample at `(z, y, x)`, or `None` outside the grid.
    pub fn get(&self, z: usize, y: usize, x: usize) -> Option<f32> {
        let [d, h, w] = self.dimensions;
        if z >= d || y >= h || x >= w {
            return None;
        }
        Some(self.samples[z * h * w + y * w + x])
    }

    /// Returns every sample mapped into `[0, 1]` by the intensity range.
    pub fn normalized_samples(&self) -> Vec<f32> {
        let range = self.intensity_range;
        self.samples.iter().map(|&v| range.normalize(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(d: usize, h: usize, w: usize) -> Volume {
        let samples = (0..d * h * w).map(|i| i as f32).collect();
        Volume::new([d, h, w], [1.0, 1.0, 1.0], samples).unwrap()
    }

    #[test]
    fn test_intensity_range_computed_at_load() {
        let volume = ramp(2, 3, 4);
        let range = volume.intensity_range();
        assert_eq!(range.min, 0.0);
        assert_eq!(range.max, 23.0);
        assert!(volume.samples().iter().all(|&v| range.contains(v)));
    }

    #[test]
    fn test_row_major_depth_outermost() {
        let volume = ramp(2, 3, 4);
        assert_eq!(volume.get(0, 0, 1), Some(1.0));
        assert_eq!(volume.get(0, 1, 0), Some(4.0));
        assert_eq!(volume.get(1, 0, 0), Some(12.0));
        assert_eq!(volume.get(2, 0, 0), None);
    }

    #[test]
    fn test_rejects_size_mismatch() {
        let err = Volume::new([2, 2, 2], [1.0; 3], vec![0.0; 7]).unwrap_err();
        assert_eq!(
            err,
            VolumeError::SizeMismatch {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn test_rejects_bad_spacing_and_dims() {
        assert!(matches!(
            Volume::new([2, 2, 2], [1.0, 0.0, 1.0], vec![0.0; 8]),
            Err(VolumeError::InvalidSpacing(_))
        ));
        assert!(matches!(
            Volume::new([0, 2, 2], [1.0; 3], vec![]),
            Err(VolumeError::EmptyDimension(_))
        ));
        assert_eq!(
            Volume::new([usize::MAX, 2, 1], [1.0; 3], vec![]).unwrap_err(),
            VolumeError::TooManyVoxels([usize::MAX, 2, 1])
        );
    }

    #[test]
    fn test_rejects_nan_sample() {
        let mut samples = vec![0.0; 8];
        samples[5] = f32::NAN;
        assert_eq!(
            Volume::new([2, 2, 2], [1.0; 3], samples).unwrap_err(),
            VolumeError::NonFiniteSample { index: 5 }
        );
    }

    #[test]
    fn test_physical_size_uses_xyz_spacing() {
        let volume = Volume::new([2, 3, 4], [3.0, 2.0, 0.5], vec![0.0; 24])
            .unwrap()
            .with_origin(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(volume.physical_size(), Vec3::new(2.0, 6.0, 6.0));
        assert_eq!(volume.bounds().1, Vec3::new(3.0, 7.0, 7.0));
    }

    #[test]
    fn test_range_fraction_and_normalize() {
        let range = IntensityRange::new(-100.0, 300.0);
        assert_eq!(range.at_fraction(0.0), -100.0);
        assert_eq!(range.at_fraction(0.5), 100.0);
        assert_eq!(range.at_fraction(1.0), 300.0);
        assert_eq!(range.normalize(100.0), 0.5);

        let flat = IntensityRange::new(5.0, 5.0);
        assert_eq!(flat.normalize(5.0), 0.0);
    }
}
