//! Pixel containers shared by the compositor, the capture pipeline and the window.

/// Opaque RGB frame, one `u32` per pixel packed as 0x00RRGGBB (minifb's layout).
/// Camera frames and the final on-screen image use this.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is (pixels)
    pub height: usize,     // how tall the frame is (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB
}

impl FrameBuffer {
    /// A frame filled with one colour.
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color & 0x00FF_FFFF; width * height] }
    }

    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width * self.height
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Nearest-neighbour resample to a new size.
    pub fn resized(&self, width: usize, height: usize) -> FrameBuffer {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            let sy = (y * self.height) / height.max(1);
            for x in 0..width {
                let sx = (x * self.width) / width.max(1);
                pixels.push(self.pixels[sy * self.width + sx]);
            }
        }
        FrameBuffer { width, height, pixels }
    }

    /// Unpack into an `image` RGB buffer (for JPEG encoding).
    pub fn to_rgb_image(&self) -> image::RgbImage {
        let mut raw = Vec::with_capacity(self.pixels.len() * 3);
        for px in &self.pixels {
            raw.push(((px >> 16) & 0xFF) as u8);
            raw.push(((px >> 8) & 0xFF) as u8);
            raw.push((px & 0xFF) as u8);
        }
        image::RgbImage::from_raw(self.width as u32, self.height as u32, raw)
            .unwrap_or_else(|| image::RgbImage::new(self.width as u32, self.height as u32))
    }
}

/// Transparent drawing surface the overlay is painted onto.
/// Straight (non-premultiplied) alpha, one `u32` per pixel packed as 0xAARRGGBB.
/// A 0x0 surface is "unavailable": nothing gets drawn onto or from it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Surface {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0; width * height] }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Reallocate only when the size actually changes.
    /// Returns true when the buffer was reallocated.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if self.width == width && self.height == height && self.pixels.len() == width * height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width * height];
        true
    }

    /// Back to fully transparent.
    pub fn clear(&mut self) {
        for p in &mut self.pixels { *p = 0; }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn alpha_at(&self, x: usize, y: usize) -> u8 {
        (self.pixel(x, y) >> 24) as u8
    }

    /// Convert to an `image` RGBA buffer; `None` if the buffer is inconsistent.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        if self.pixels.len() != self.width * self.height {
            return None;
        }
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            raw.push(((px >> 16) & 0xFF) as u8);
            raw.push(((px >> 8) & 0xFF) as u8);
            raw.push((px & 0xFF) as u8);
            raw.push((px >> 24) as u8);
        }
        image::RgbaImage::from_raw(self.width as u32, self.height as u32, raw)
    }

    pub fn from_rgba_image(img: &image::RgbaImage) -> Self {
        let pixels = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
            })
            .collect();
        Self { width: img.width() as usize, height: img.height() as usize, pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_resize_only_reallocates_on_change() {
        let mut s = Surface::new(4, 3);
        s.pixels[0] = 0xFF00_00FF;
        assert!(!s.resize(4, 3));
        assert_eq!(s.pixels[0], 0xFF00_00FF);
        assert!(s.resize(8, 2));
        assert_eq!(s.pixels.len(), 16);
        assert!(s.pixels.iter().all(|p| *p == 0));
    }

    #[test]
    fn frame_resize_nearest() {
        let fb = FrameBuffer { width: 2, height: 1, pixels: vec![0x00FF_0000, 0x0000_00FF] };
        let big = fb.resized(4, 2);
        assert_eq!(big.pixels, vec![
            0x00FF_0000, 0x00FF_0000, 0x0000_00FF, 0x0000_00FF,
            0x00FF_0000, 0x00FF_0000, 0x0000_00FF, 0x0000_00FF,
        ]);
    }

    #[test]
    fn surface_rgba_conversion_keeps_channels() {
        let mut s = Surface::new(1, 1);
        s.pixels[0] = 0x80_11_22_33;
        let img = s.to_rgba_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0x11, 0x22, 0x33, 0x80]);
        assert_eq!(Surface::from_rgba_image(&img), s);
    }
}
