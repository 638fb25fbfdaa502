//! Source-over blend of the overlay surface onto an opaque camera frame.
//! The historic photo shows through at its painted alpha; where the
//! surface is transparent the live camera image is untouched.

use image::imageops::{self, FilterType};

use crate::error::{Error, Result};
use crate::types::{FrameBuffer, Surface};

/// Blend `overlay` on top of `frame`. Both must have the same size.
pub fn blend_over_in_place(frame: &mut FrameBuffer, overlay: &Surface) -> Result<()> {
    if frame.width != overlay.width || frame.height != overlay.height {
        return Err(Error::SurfaceMismatch(format!(
            "blend: frame {}x{} vs overlay {}x{}",
            frame.width, frame.height, overlay.width, overlay.height
        )));
    }
    if !frame.is_consistent() || overlay.pixels.len() != overlay.width * overlay.height {
        return Err(Error::SurfaceMismatch("blend: pixel buffer length".into()));
    }

    for (dst, &src) in frame.pixels.iter_mut().zip(overlay.pixels.iter()) {
        let a = src >> 24;
        if a == 0 { continue; }               // visual: keep raw live
        if a == 255 {                         // visual: photo fully covers the pixel
            *dst = src & 0x00FF_FFFF;
            continue;
        }
        let inv = 255 - a;
        let under = *dst;
        let mix = |shift: u32| -> u32 {
            let s = (src >> shift) & 0xFF;
            let d = (under >> shift) & 0xFF;
            // rounded (s*a + d*(255-a)) / 255
            (s * a + d * inv + 127) / 255
        };
        *dst = (mix(16) << 16) | (mix(8) << 8) | mix(0);
    }
    Ok(())
}

/// Blend an overlay of any size, stretching it to cover the whole frame.
pub fn blend_scaled(frame: &mut FrameBuffer, overlay: &Surface) -> Result<()> {
    if frame.width == overlay.width && frame.height == overlay.height {
        return blend_over_in_place(frame, overlay);
    }
    let rgba = overlay
        .to_rgba_image()
        .ok_or_else(|| Error::SurfaceMismatch("overlay pixel buffer length".into()))?;
    let resized = imageops::resize(&rgba, frame.width as u32, frame.height as u32, FilterType::Triangle);
    blend_over_in_place(frame, &Surface::from_rgba_image(&resized))
}
