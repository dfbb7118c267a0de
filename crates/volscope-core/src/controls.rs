//! On-screen slider controls.

use glam::Vec3;

use crate::options::ControlLayout;
use crate::transfer_function::DEFAULT_BASE_COLOR;

/// Identifier of a slider control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub &'static str);

impl ControlId {
    /// Scalar opacity plateau.
    pub const SCALAR_OPACITY: ControlId = ControlId("scalar_opacity");
    /// Gradient opacity plateau.
    pub const GRADIENT_OPACITY: ControlId = ControlId("gradient_opacity");
    /// Red channel of the lowest color.
    pub const COLOR_R: ControlId = ControlId("color_r");
    /// Green channel of the lowest color.
    pub const COLOR_G: ControlId = ControlId("color_g");
    /// Blue channel of the lowest color.
    pub const COLOR_B: ControlId = ControlId("color_b");

    /// Returns the identifier string.
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Axis-aligned rectangle in physical pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns whether `(px, py)` lies inside the rectangle (edges included).
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// Maps `px` to `[0, 1]` across the rectangle's width, clamped.
    pub fn normalized_x(&self, px: f32) -> f32 {
        if self.width <= 0.0 {
            return 0.0;
        }
        ((px - self.x) / self.width).clamp(0.0, 1.0)
    }
}

/// A horizontal slider whose value lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    pub id: ControlId,
    pub label: &'static str,
    pub region: Rect,
    pub value: f32,
    /// Fill color used when drawing the slider.
    pub accent: Vec3,
}

/// Read-only snapshot of every control value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlValues {
    values: Vec<(ControlId, f32)>,
}

impl ControlValues {
    /// Builds a snapshot from `(id, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ControlId, f32)>) -> Self {
        let mut snapshot = Self::default();
        for (id, value) in pairs {
            snapshot.set(id, value);
        }
        snapshot
    }

    /// Returns the value of `id`, if present.
    pub fn get(&self, id: ControlId) -> Option<f32> {
        self.values.iter().find(|(c, _)| *c == id).map(|&(_, v)| v)
    }

    /// Returns a copy with `id` set to `value`.
    #[must_use]
    pub fn with(mut self, id: ControlId, value: f32) -> Self {
        self.set(id, value);
        self
    }

    /// Iterates over `(id, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ControlId, f32)> + '_ {
        self.values.iter().copied()
    }

    fn set(&mut self, id: ControlId, value: f32) {
        match self.values.iter_mut().find(|(c, _)| *c == id) {
            Some(entry) => entry.1 = value,
            None => self.values.push((id, value)),
        }
    }
}

/// The slider column of a session.
#[derive(Debug, Clone)]
pub struct ControlSet {
    sliders: Vec<Slider>,
}

impl ControlSet {
    /// Creates the default five sliders laid out by `layout`.
    pub fn with_defaults(layout: &ControlLayout) -> Self {
        let specs = [
            (ControlId::SCALAR_OPACITY, "Scalar Opacity", 0.6, Vec3::splat(0.85)),
            (ControlId::GRADIENT_OPACITY, "Gradient Opacity", 0.8, Vec3::splat(0.65)),
            (ControlId::COLOR_R, "Red", DEFAULT_BASE_COLOR.x, Vec3::new(0.9, 0.2, 0.2)),
            (ControlId::COLOR_G, "Green", DEFAULT_BASE_COLOR.y, Vec3::new(0.2, 0.8, 0.2)),
            (ControlId::COLOR_B, "Blue", DEFAULT_BASE_COLOR.z, Vec3::new(0.25, 0.4, 0.95)),
        ];

        let sliders = specs
            .into_iter()
            .enumerate()
            .map(|(i, (id, label, value, accent))| Slider {
                id,
                label,
                region: Rect::new(
                    layout.left,
                    layout.top + i as f32 * (layout.height + layout.spacing),
                    layout.width,
                    layout.height,
                ),
                value,
                accent,
            })
            .collect();

        Self { sliders }
    }

    /// Creates a set from explicit sliders.
    pub fn from_sliders(sliders: Vec<Slider>) -> Self {
        Self { sliders }
    }

    /// Returns the sliders in layout order.
    pub fn sliders(&self) -> &[Slider] {
        &self.sliders
    }

    /// Returns the slider with the given id.
    pub fn slider(&self, id: ControlId) -> Option<&Slider> {
        self.sliders.iter().find(|s| s.id == id)
    }

    /// Returns the current value of `id`.
    pub fn value(&self, id: ControlId) -> Option<f32> {
        self.slider(id).map(|s| s.value)
    }

    /// Returns the slider whose hit region contains `(x, y)`.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&Slider> {
        self.sliders.iter().find(|s| s.region.contains(x, y))
    }

    /// Moves slider `id` to the pointer position `x` and returns its new value.
    pub fn set_from_pointer(&mut self, id: ControlId, x: f32) -> Option<f32> {
        let slider = self.sliders.iter_mut().find(|s| s.id == id)?;
        slider.value = slider.region.normalized_x(x);
        Some(slider.value)
    }

    /// Sets slider `id` to `value` clamped to `[0, 1]`.
    pub fn set_value(&mut self, id: ControlId, value: f32) -> Option<f32> {
        let slider = self.sliders.iter_mut().find(|s| s.id == id)?;
        slider.value = value.clamp(0.0, 1.0);
        Some(slider.value)
    }

    /// Takes a snapshot of all values.
    pub fn snapshot(&self) -> ControlValues {
        ControlValues::from_pairs(self.sliders.iter().map(|s| (s.id, s.value)))
    }

    /// Recomputes hit regions after the layout changed.
    pub fn relayout(&mut self, layout: &ControlLayout) {
        for (i, slider) in self.sliders.iter_mut().enumerate() {
            slider.region = Rect::new(
                layout.left,
                layout.top + i as f32 * (layout.height + layout.spacing),
                layout.width,
                layout.height,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_and_layout() {
        let layout = ControlLayout::default();
        let set = ControlSet::with_defaults(&layout);
        assert_eq!(set.sliders().len(), 5);
        assert_eq!(set.value(ControlId::SCALAR_OPACITY), Some(0.6));
        assert_eq!(set.value(ControlId::GRADIENT_OPACITY), Some(0.8));
        assert_eq!(set.value(ControlId::COLOR_B), Some(0.14902));

        let first = set.sliders()[0].region;
        let second = set.sliders()[1].region;
        assert_eq!(first.y, layout.top);
        assert_eq!(second.y, layout.top + layout.height + layout.spacing);
    }

    #[test]
    fn test_hit_test() {
        let set = ControlSet::with_defaults(&ControlLayout::default());
        let region = set.slider(ControlId::COLOR_G).unwrap().region;
        let hit = set.hit_test(region.x + 1.0, region.y + 1.0).unwrap();
        assert_eq!(hit.id, ControlId::COLOR_G);
        assert!(set.hit_test(700.0, 500.0).is_none());
    }

    #[test]
    fn test_pointer_value_is_clamped() {
        let mut set = ControlSet::with_defaults(&ControlLayout::default());
        let region = set.slider(ControlId::SCALAR_OPACITY).unwrap().region;
        assert_eq!(set.set_from_pointer(ControlId::SCALAR_OPACITY, region.x - 50.0), Some(0.0));
        assert_eq!(
            set.set_from_pointer(ControlId::SCALAR_OPACITY, region.x + region.width + 50.0),
            Some(1.0)
        );
        let mid = set
            .set_from_pointer(ControlId::SCALAR_OPACITY, region.x + region.width * 0.25)
            .unwrap();
        assert!((mid - 0.25).abs() < 1e-6);
        assert_eq!(set.set_from_pointer(ControlId("missing"), 0.0), None);
    }

    #[test]
    fn test_snapshot_with_overrides() {
        let set = ControlSet::with_defaults(&ControlLayout::default());
        let snapshot = set.snapshot().with(ControlId::COLOR_R, 0.9);
        assert_eq!(snapshot.get(ControlId::COLOR_R), Some(0.9));
        assert_eq!(snapshot.get(ControlId::COLOR_G), Some(0.25098));
        assert_eq!(snapshot.iter().count(), 5);
        assert_eq!(snapshot.get(ControlId("missing")), None);
    }
}
