//! Slider overlay geometry shared by the GPU and software backends.

use glam::Vec4;
use volscope_core::{Rect, Slider};

/// Knob width in pixels.
const KNOB_WIDTH: f32 = 6.0;
/// Track height as a fraction of the slider's hit region.
const TRACK_FRACTION: f32 = 0.35;

const TRACK_COLOR: Vec4 = Vec4::new(0.25, 0.25, 0.25, 0.85);
const KNOB_COLOR: Vec4 = Vec4::new(0.95, 0.95, 0.95, 1.0);

/// A solid rectangle drawn over the volume image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayQuad {
    pub rect: Rect,
    /// Straight (non-premultiplied) RGBA.
    pub color: Vec4,
}

/// Builds the quads for `sliders`, back to front: track, filled part, knob.
pub fn slider_quads(sliders: &[Slider]) -> Vec<OverlayQuad> {
    let mut quads = Vec::with_capacity(sliders.len() * 3);
    for slider in sliders {
        let region = slider.region;
        let track_height = region.height * TRACK_FRACTION;
        let track = Rect::new(
            region.x,
            region.y + (region.height - track_height) * 0.5,
            region.width,
            track_height,
        );
        let value = slider.value.clamp(0.0, 1.0);
        let knob_x = region.x + region.width * value;

        quads.push(OverlayQuad {
            rect: track,
            color: TRACK_COLOR,
        });
        quads.push(OverlayQuad {
            rect: Rect::new(track.x, track.y, region.width * value, track.height),
            color: slider.accent.extend(1.0),
        });
        quads.push(OverlayQuad {
            rect: Rect::new(knob_x - KNOB_WIDTH * 0.5, region.y, KNOB_WIDTH, region.height),
            color: KNOB_COLOR,
        });
    }
    quads
}

/// Alpha-blends `quads` into a tightly packed RGBA8 image.
pub fn rasterize_quads(quads: &[OverlayQuad], rgba: &mut [u8], width: u32, height: u32) {
    for quad in quads {
        let x0 = quad.rect.x.max(0.0).round() as u32;
        let y0 = quad.rect.y.max(0.0).round() as u32;
        let x1 = ((quad.rect.x + quad.rect.width).round().max(0.0) as u32).min(width);
        let y1 = ((quad.rect.y + quad.rect.height).round().max(0.0) as u32).min(height);
        let alpha = quad.color.w.clamp(0.0, 1.0);

        for y in y0..y1 {
            for x in x0..x1 {
                let offset = ((y * width + x) * 4) as usize;
                for channel in 0..3 {
                    let dst = f32::from(rgba[offset + channel]) / 255.0;
                    let blended = quad.color[channel] * alpha + dst * (1.0 - alpha);
                    rgba[offset + channel] = (blended.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
                rgba[offset + 3] = 255;
            }
        }
    }
}
