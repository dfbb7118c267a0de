//! CPU reference ray caster.
//!
//! Mirrors `shaders/volume_raycast.wgsl` step for step: box entry/exit,
//! trilinear sampling, central-difference gradients, two-LUT opacity with
//! step-length correction, headlight Phong shading and front-to-back
//! compositing with early termination.

use glam::{Vec3, Vec4};
use volscope_core::{RenderQuality, ShadingOptions, Volume};

use crate::camera::Ray;
use crate::lut::LutSet;

/// Result of marching one ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySample {
    /// Final color with the background composited behind.
    pub color: Vec3,
    /// Accumulated opacity of the volume alone.
    pub alpha: f32,
    /// Number of volume samples taken.
    pub steps: u32,
}

/// Intersects `ray` with the box `min..max`. Returns `(t_enter, t_exit)` with
/// `t_enter` clamped to zero, or `None` on a miss.
pub fn intersect_box(ray: &Ray, min: Vec3, max: Vec3) -> Option<(f32, f32)> {
    let inv = ray.direction.recip();
    let t0 = (min - ray.origin) * inv;
    let t1 = (max - ray.origin) * inv;
    let t_near = t0.min(t1).max_element().max(0.0);
    let t_far = t0.max(t1).min_element();
    (t_near < t_far).then_some((t_near, t_far))
}

/// Marches rays through one volume with one set of lookup tables.
pub struct RayCaster<'a> {
    volume: &'a Volume,
    luts: &'a LutSet,
    quality: RenderQuality,
    shading: ShadingOptions,
    background: Vec3,
}

impl<'a> RayCaster<'a> {
    /// Creates a ray caster.
    pub fn new(
        volume: &'a Volume,
        luts: &'a LutSet,
        quality: RenderQuality,
        shading: ShadingOptions,
        background: Vec3,
    ) -> Self {
        Self {
            volume,
            luts,
            quality,
            shading,
            background,
        }
    }

    /// World-space distance between samples.
    pub fn step_length(&self) -> f32 {
        let smallest = self.volume.spacing_xyz().min_element();
        (self.quality.step_size * smallest).max(1e-6)
    }

    /// Marches `ray` and returns the composited pixel.
    pub fn cast(&self, ray: &Ray) -> RaySample {
        let (min, max) = self.volume.bounds();
        let Some((t_enter, t_exit)) = intersect_box(ray, min, max) else {
            return RaySample {
                color: self.background,
                alpha: 0.0,
                steps: 0,
            };
        };

        let step = self.step_length();
        let exponent = step / self.quality.opacity_unit_distance.max(1e-6);
        let mut color = Vec3::ZERO;
        let mut alpha = 0.0f32;
        let mut steps = 0u32;
        let mut t = t_enter + 0.5 * step;

        while t < t_exit && steps < self.quality.max_steps {
            let position = ray.at(t);
            let value = self.sample(position);
            let gradient = self.gradient(position);
            steps += 1;
            t += step;

            let opacity = self.luts.scalar_opacity.lookup(value)
                * self.luts.gradient_opacity.lookup(gradient.length());
            if opacity <= 0.0 {
                continue;
            }
            let opacity = 1.0 - (1.0 - opacity.min(1.0)).powf(exponent);
            let sample_color = self.shade(self.luts.color.lookup(value), gradient, ray.direction);

            color += (1.0 - alpha) * sample_color * opacity;
            alpha += (1.0 - alpha) * opacity;
            if alpha >= self.quality.early_termination_alpha {
                break;
            }
        }

        RaySample {
            color: color + (1.0 - alpha) * self.background,
            alpha,
            steps,
        }
    }

    /// Casts `ray` and returns an opaque RGBA color.
    pub fn cast_rgba(&self, ray: &Ray) -> Vec4 {
        self.cast(ray).color.extend(1.0)
    }

    /// Trilinear intensity at a world position, clamped to the edge voxels.
    pub fn sample(&self, position: Vec3) -> f32 {
        let local = (position - self.volume.origin()) / self.volume.spacing_xyz() - 0.5;
        self.sample_index(local)
    }

    /// Central-difference gradient in intensity units per world unit.
    pub fn gradient(&self, position: Vec3) -> Vec3 {
        let spacing = self.volume.spacing_xyz();
        let local = (position - self.volume.origin()) / spacing - 0.5;
        let axis = |offset: Vec3| self.sample_index(local + offset) - self.sample_index(local - offset);
        Vec3::new(axis(Vec3::X), axis(Vec3::Y), axis(Vec3::Z)) / (2.0 * spacing)
    }

    fn sample_index(&self, index: Vec3) -> f32 {
        let [d, h, w] = self.volume.dimensions();
        let limit = Vec3::new((w - 1) as f32, (h - 1) as f32, (d - 1) as f32);
        let p = index.clamp(Vec3::ZERO, limit);
        let base = p.floor();
        let frac = p - base;
        let (x0, y0, z0) = (base.x as usize, base.y as usize, base.z as usize);
        let (x1, y1, z1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1), (z0 + 1).min(d - 1));

        let v = |z: usize, y: usize, x: usize| self.volume.get(z, y, x).unwrap_or(0.0);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let c00 = lerp(v(z0, y0, x0), v(z0, y0, x1), frac.x);
        let c10 = lerp(v(z0, y1, x0), v(z0, y1, x1), frac.x);
        let c01 = lerp(v(z1, y0, x0), v(z1, y0, x1), frac.x);
        let c11 = lerp(v(z1, y1, x0), v(z1, y1, x1), frac.x);
        lerp(lerp(c00, c10, frac.y), lerp(c01, c11, frac.y), frac.z)
    }

    /// Two-sided Phong with a light at the eye.
    fn shade(&self, color: Vec3, gradient: Vec3, view_dir: Vec3) -> Vec3 {
        let shading = &self.shading;
        if !shading.enabled {
            return color;
        }
        let length = gradient.length();
        if length <= 1e-6 {
            return color * (shading.ambient + shading.diffuse);
        }
        let normal = -gradient / length;
        let to_eye = -view_dir;
        let n_dot_l = normal.dot(to_eye).abs();
        let specular = shading.specular * n_dot_l.powf(shading.specular_power);
        (color * (shading.ambient + shading.diffuse * n_dot_l) + Vec3::splat(specular))
            .clamp(Vec3::ZERO, Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use volscope_core::{CurveUpdate, IntensityRange, OpacityPoint, TransferFunction};

    fn ramp_volume() -> Volume {
        // 10 x 10 x 10, intensity grows along x.
        let samples = (0..1000).map(|i| (i % 10) as f32 * 11.0).collect();
        Volume::new([10, 10, 10], [1.0; 3], samples).unwrap()
    }

    fn center_ray(volume: &Volume) -> Ray {
        let (min, max) = volume.bounds();
        let mut camera = Camera::new(1.0);
        camera.fit_box(min, max);
        camera.ray_for_ndc(0.0, 0.0)
    }

    #[test]
    fn test_box_intersection() {
        let ray = Ray {
            origin: Vec3::new(0.5, 0.5, 5.0),
            direction: Vec3::NEG_Z,
        };
        let (t0, t1) = intersect_box(&ray, Vec3::ZERO, Vec3::ONE).unwrap();
        assert!((t0 - 4.0).abs() < 1e-6);
        assert!((t1 - 5.0).abs() < 1e-6);

        let miss = Ray {
            origin: Vec3::new(3.0, 3.0, 5.0),
            direction: Vec3::NEG_Z,
        };
        assert!(intersect_box(&miss, Vec3::ZERO, Vec3::ONE).is_none());
    }

    #[test]
    fn test_trilinear_sample_and_gradient() {
        let volume = ramp_volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let luts = LutSet::from_transfer_function(&tf, 256);
        let caster = RayCaster::new(&volume, &luts, RenderQuality::default(), ShadingOptions::default(), Vec3::ZERO);

        // Voxel centers sit at i + 0.5.
        assert!((caster.sample(Vec3::new(2.5, 5.0, 5.0)) - 22.0).abs() < 1e-4);
        assert!((caster.sample(Vec3::new(3.0, 5.0, 5.0)) - 27.5).abs() < 1e-4);

        let g = caster.gradient(Vec3::new(4.5, 4.5, 4.5));
        assert!((g.x - 11.0).abs() < 1e-4);
        assert!(g.y.abs() < 1e-5 && g.z.abs() < 1e-5);
    }

    #[test]
    fn test_transparent_volume_shows_background() {
        let volume = ramp_volume();
        let mut tf = TransferFunction::with_defaults(volume.intensity_range());
        tf.replace_curve(CurveUpdate::ScalarOpacity(vec![OpacityPoint::new(0.0, 0.0)]))
            .unwrap();
        let luts = LutSet::from_transfer_function(&tf, 256);
        let background = Vec3::new(0.1, 0.2, 0.3);
        let caster = RayCaster::new(&volume, &luts, RenderQuality::default(), ShadingOptions::default(), background);

        let sample = caster.cast(&center_ray(&volume));
        assert_eq!(sample.alpha, 0.0);
        assert!((sample.color - background).length() < 1e-6);
    }

    #[test]
    fn test_early_termination_within_tolerance() {
        let samples = vec![50.0; 1000];
        let mut samples = samples;
        samples[0] = 0.0;
        let volume = Volume::new([10, 10, 10], [1.0; 3], samples).unwrap();
        let mut tf = TransferFunction::with_defaults(IntensityRange::new(0.0, 50.0));
        tf.replace_curve(CurveUpdate::ScalarOpacity(vec![OpacityPoint::new(0.0, 0.6)]))
            .unwrap();
        tf.replace_curve(CurveUpdate::GradientOpacity(vec![OpacityPoint::new(0.0, 1.0)]))
            .unwrap();
        let luts = LutSet::from_transfer_function(&tf, 256);
        let ray = center_ray(&volume);

        let early = RenderQuality::default();
        let full = RenderQuality {
            early_termination_alpha: 2.0,
            ..early
        };
        let shading = ShadingOptions::default();
        let a = RayCaster::new(&volume, &luts, early, shading, Vec3::splat(0.5)).cast(&ray);
        let b = RayCaster::new(&volume, &luts, full, shading, Vec3::splat(0.5)).cast(&ray);

        assert!(a.steps < b.steps);
        assert!(a.alpha >= early.early_termination_alpha);
        assert!((a.color - b.color).abs().max_element() < 0.01);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let volume = ramp_volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let luts = LutSet::from_transfer_function(&tf, 256);
        let caster = RayCaster::new(&volume, &luts, RenderQuality::default(), ShadingOptions::default(), Vec3::splat(0.1));
        let ray = center_ray(&volume);
        assert_eq!(caster.cast(&ray), caster.cast(&ray));
    }

    #[test]
    fn test_max_steps_bounds_march() {
        let volume = ramp_volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let luts = LutSet::from_transfer_function(&tf, 256);
        let quality = RenderQuality {
            max_steps: 3,
            early_termination_alpha: 2.0,
            ..RenderQuality::default()
        };
        let caster = RayCaster::new(&volume, &luts, quality, ShadingOptions::default(), Vec3::ZERO);
        assert_eq!(caster.cast(&center_ray(&volume)).steps, 3);
    }
}
