//! Orbit camera framing a volume, and the per-pixel rays cast through it.

use glam::{Mat4, Vec3, Vec4Swizzles};

/// How eye rays spread out from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Rays fan out from `position`.
    #[default]
    Perspective,
    /// Rays are parallel to the view direction.
    Orthographic,
}

/// A world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    /// Returns the point at parameter `t`.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Orbiting camera looking at a volume.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Orbit center, normally the volume center.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Viewport width over height.
    pub aspect_ratio: f32,
    /// Distance to the plane rays start from.
    pub near: f32,
    /// Distance to the plane rays end at.
    pub far: f32,
    pub projection_mode: ProjectionMode,
    /// Half height of the view volume in orthographic mode.
    pub ortho_scale: f32,
}

impl Camera {
    /// Creates a camera on +Z looking at the origin; call [`Camera::fit_box`]
    /// to frame a volume.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_6, // 30 degrees
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
        }
    }

    /// Keeps rays in step with a resized viewport.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix (depth range `[0, 1]`).
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Clip-from-world matrix; its inverse unprojects eye rays.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit vector from the eye towards the orbit center.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Screen-right direction in world space.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize()
    }

    /// Returns the distance from the camera to its target.
    #[must_use]
    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Orbits the camera around the target (turntable around `up`).
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let radius = self.distance();
        let offset = self.position - self.target;
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta -= delta_x;
        phi = (phi - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Pans camera and target together by world-space amounts along the
    /// screen axes.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let offset = self.right() * delta_x + self.up * delta_y;
        self.position += offset;
        self.target += offset;
    }

    /// Zooms by a fraction of the current distance; positive moves closer.
    pub fn zoom(&mut self, delta: f32) {
        let factor = (1.0 - delta * 0.1).clamp(0.1, 10.0);
        match self.projection_mode {
            ProjectionMode::Perspective => {
                let distance = (self.distance() * factor).max(self.near * 2.0);
                self.position = self.target - self.forward() * distance;
            }
            ProjectionMode::Orthographic => {
                self.ortho_scale = (self.ortho_scale * factor).clamp(0.01, 1.0e5);
            }
        }
    }

    /// Frames the box `min..max`, looking down -Z with +Y up.
    pub fn fit_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);
        let horizontal = ((self.fov * 0.5).tan() * self.aspect_ratio).atan();
        let half_fov = (self.fov * 0.5).min(horizontal).max(1e-3);
        let distance = radius / half_fov.sin();

        self.up = Vec3::Y;
        self.target = center;
        self.position = center + Vec3::new(0.0, 0.0, distance);
        self.near = (distance - radius).max(radius * 1e-3) * 0.5;
        self.far = (distance + radius) * 2.0;
        self.ortho_scale = radius;
    }

    /// Returns the ray through the center of pixel `(px, py)` of a
    /// `width` x `height` viewport (top-left origin).
    #[must_use]
    pub fn ray_for_pixel(&self, px: u32, py: u32, width: u32, height: u32) -> Ray {
        let ndc_x = 2.0 * (px as f32 + 0.5) / width as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * (py as f32 + 0.5) / height as f32;
        self.ray_for_ndc(ndc_x, ndc_y)
    }

    /// Unprojects an NDC position on the near and far planes into a ray.
    #[must_use]
    pub fn ray_for_ndc(&self, ndc_x: f32, ndc_y: f32) -> Ray {
        let inv = self.view_projection_matrix().inverse();
        let near = inv * glam::Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inv * glam::Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray {
            origin: near,
            direction: (far - near).normalize(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(4.0 / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_box_looks_at_volume_center() {
        let mut camera = Camera::new(1.5);
        camera.fit_box(Vec3::new(0.0, 0.0, 0.0), Vec3::new(64.0, 32.0, 16.0));
        assert_eq!(camera.target, Vec3::new(32.0, 16.0, 8.0));
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert!((camera.right() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let mut camera = Camera::new(4.0 / 3.0);
        camera.fit_box(Vec3::ZERO, Vec3::splat(10.0));
        let ray = camera.ray_for_ndc(0.0, 0.0);
        assert!((ray.direction - camera.forward()).length() < 1e-4);

        // The ray passes through the box center.
        let t = (camera.target - ray.origin).dot(ray.direction);
        assert!((ray.at(t) - camera.target).length() < 1e-3);
    }

    #[test]
    fn test_pixel_rays_diverge_left_to_right() {
        let camera = Camera::new(1.0);
        let left = camera.ray_for_pixel(0, 50, 100, 100);
        let right = camera.ray_for_pixel(99, 50, 100, 100);
        assert!(left.direction.x < 0.0);
        assert!(right.direction.x > 0.0);

        let top = camera.ray_for_pixel(50, 0, 100, 100);
        assert!(top.direction.y > 0.0);
    }

    #[test]
    fn test_orthographic_rays_are_parallel() {
        let mut camera = Camera::new(1.0);
        camera.projection_mode = ProjectionMode::Orthographic;
        let a = camera.ray_for_pixel(0, 0, 64, 64);
        let b = camera.ray_for_pixel(63, 63, 64, 64);
        assert!((a.direction - b.direction).length() < 1e-4);
        assert!((a.origin - b.origin).length() > 0.1);
    }

    #[test]
    fn test_fit_box_keeps_box_between_planes() {
        let mut camera = Camera::new(1.0);
        camera.fit_box(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        let radius = Vec3::new(2.0, 4.0, 6.0).length() * 0.5;
        assert!(camera.near < camera.distance() - radius);
        assert!(camera.far > camera.distance() + radius);
    }

    #[test]
    fn test_orbit_keeps_volume_centered() {
        let mut camera = Camera::new(1.0);
        camera.fit_box(Vec3::ZERO, Vec3::splat(8.0));
        let distance = camera.distance();
        camera.orbit(0.7, -0.3);
        assert!((camera.distance() - distance).abs() < 1e-3);
        let ray = camera.ray_for_ndc(0.0, 0.0);
        assert!((ray.direction - camera.forward()).length() < 1e-4);
    }

    #[test]
    fn test_zoom_moves_along_view_axis() {
        let mut camera = Camera::new(1.0);
        camera.fit_box(Vec3::ZERO, Vec3::splat(2.0));
        let before = camera.distance();
        camera.zoom(1.0);
        assert!(camera.distance() < before);
        assert_eq!(camera.target, Vec3::ONE);
        camera.zoom(-2.0);
        assert!(camera.distance() > before * 0.9);
    }

    #[test]
    fn test_orthographic_zoom_shrinks_view() {
        let mut camera = Camera::new(1.0);
        camera.fit_box(Vec3::ZERO, Vec3::splat(4.0));
        camera.projection_mode = ProjectionMode::Orthographic;
        let scale = camera.ortho_scale;
        camera.zoom(1.0);
        assert!(camera.ortho_scale < scale);
    }
}
