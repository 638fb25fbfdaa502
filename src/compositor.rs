//! Paints the overlay photo onto a transparent surface laid over the video.
//!
//! Every frame starts from a cleared surface, so the output depends only on
//! the overlay state and the video size.

use tracing::trace;

use crate::overlay::{OverlayImage, OverlayState, Pose};
use crate::types::Surface;
use crate::video::VideoSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// Nothing to draw or nowhere to draw it.
    Skipped,
}

pub struct Compositor {
    surface: Option<Surface>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self { surface: Some(Surface::default()) }
    }

    /// No drawing surface attached; every frame is skipped.
    pub fn detached() -> Self {
        Self { surface: None }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Drop whatever was drawn (overlay removed).
    pub fn clear(&mut self) {
        if let Some(s) = self.surface.as_mut() {
            s.clear();
        }
    }

    pub fn render_frame(&mut self, state: &OverlayState, video: &dyn VideoSource) -> FrameOutcome {
        let (Some(surface), Some(image)) = (self.surface.as_mut(), state.image()) else {
            return FrameOutcome::Skipped;
        };
        let (w, h) = video.resolved_size();
        if w == 0 || h == 0 {
            return FrameOutcome::Skipped;
        }

        // 1) match the video's pixel size (only reallocates on change)
        if surface.resize(w as usize, h as usize) {
            trace!(w, h, "overlay surface resized");
        }
        // 2) clear
        surface.clear();
        // 3-6) transparency + transform + draw; nothing carries over to the next frame
        draw_overlay(surface, image, state.pose(), state.opacity());
        FrameOutcome::Rendered
    }
}

/// Draw `image` centered at (surface center + offset), rotated by
/// `pose.rotation` degrees (clockwise on screen) and scaled by `pose.scale`,
/// with every pixel's alpha multiplied by `opacity`.
pub fn draw_overlay(surface: &mut Surface, image: &OverlayImage, pose: Pose, opacity: f64) {
    let opacity = opacity.clamp(0.0, 1.0);
    if surface.is_empty() || opacity <= 0.0 || pose.scale <= 0.0 {
        return;
    }
    let img = image.pixels();
    let (iw, ih) = (img.width() as f64, img.height() as f64);
    let cx = surface.width as f64 / 2.0 + pose.x;
    let cy = surface.height as f64 / 2.0 + pose.y;
    let (sin, cos) = pose.rotation.to_radians().sin_cos();
    let s = pose.scale;

    // Screen-space bounding box of the transformed photo; only scan inside it.
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for (u, v) in [(-iw, -ih), (iw, -ih), (iw, ih), (-iw, ih)] {
        let (u, v) = (u / 2.0 * s, v / 2.0 * s);
        let x = cx + u * cos - v * sin;
        let y = cy + u * sin + v * cos;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let x0 = min_x.floor().max(0.0) as usize;
    let y0 = min_y.floor().max(0.0) as usize;
    let x1 = (max_x.ceil().max(0.0) as usize).min(surface.width);
    let y1 = (max_y.ceil().max(0.0) as usize).min(surface.height);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for py in y0..y1 {
        let dy = py as f64 + 0.5 - cy;
        let row = py * surface.width;
        for px in x0..x1 {
            let dx = px as f64 + 0.5 - cx;
            // inverse transform: undo rotation, then scale, then re-center on the photo
            let u = (dx * cos + dy * sin) / s + iw / 2.0;
            let v = (-dx * sin + dy * cos) / s + ih / 2.0;
            if u < 0.0 || v < 0.0 || u >= iw || v >= ih {
                continue;
            }
            let [r, g, b, a] = sample_bilinear(img, u - 0.5, v - 0.5);
            let out_a = (a as f64 * opacity).round() as u32;
            if out_a == 0 {
                continue;
            }
            surface.pixels[row + px] =
                (out_a.min(255) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
        }
    }
}

/// Bilinear sample at fractional coords, clamp-to-edge outside the image.
#[inline]
fn sample_bilinear(img: &image::RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let at = |sx: i64, sy: i64| -> [f64; 4] {
        let p = img.get_pixel(sx.clamp(0, w - 1) as u32, sy.clamp(0, h - 1) as u32).0;
        [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
    };
    let (p00, p10, p01, p11) = (at(x0, y0), at(x0 + 1, y0), at(x0, y0 + 1), at(x0 + 1, y0 + 1));
    let (w00, w10, w01, w11) =
        ((1.0 - fx) * (1.0 - fy), fx * (1.0 - fy), (1.0 - fx) * fy, fx * fy);

    let mut out = [0u8; 4];
    for (c, o) in out.iter_mut().enumerate() {
        let v = p00[c] * w00 + p10[c] * w10 + p01[c] * w01 + p11[c] * w11;
        *o = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}
