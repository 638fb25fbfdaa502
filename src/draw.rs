// Window, keyboard, and mouse-as-touch.
// Visual effects provided here:
// 1) A window showing the live camera with the historic photo on top.
// 2) Keys that nudge the photo or take a picture.
// 3) Mouse drags turned into the same touch events a phone would send.

use historic_overlay::error::Error;
use historic_overlay::gesture::TouchEvent;
use historic_overlay::types::FrameBuffer;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

/// Something the user asked for from the keyboard this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Capture,
    Reset,
    Remove,
    Load,
    OpacityUp,
    OpacityDown,
    ScaleUp,
    ScaleDown,
    RotateLeft,
    RotateRight,
    SwitchCamera,
}

// (key, action, repeats while held?)
const KEYMAP: &[(Key, Action, bool)] = &[
    (Key::Space, Action::Capture, false),
    (Key::R, Action::Reset, false),
    (Key::X, Action::Remove, false),
    (Key::L, Action::Load, false),
    (Key::Up, Action::OpacityUp, true),
    (Key::Down, Action::OpacityDown, true),
    (Key::Equal, Action::ScaleUp, true),
    (Key::NumPadPlus, Action::ScaleUp, true),
    (Key::Minus, Action::ScaleDown, true),
    (Key::NumPadMinus, Action::ScaleDown, true),
    (Key::LeftBracket, Action::RotateLeft, true),
    (Key::RightBracket, Action::RotateRight, true),
    (Key::Tab, Action::SwitchCamera, false),
];

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Create a window sized to the camera feed.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push this frame's pixels.
    /// Visual: the window shows the new image immediately.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Process window events without a new picture.
    /// Visual: the window stays responsive (close, ESC) while the camera stalls.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// False once the user closes the window or presses ESC.
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Keys pressed since the last frame, in keymap order.
    pub fn actions(&self) -> Vec<Action> {
        let mut out = Vec::new();
        for &(key, action, repeat) in KEYMAP {
            let mode = if repeat { KeyRepeat::Yes } else { KeyRepeat::No };
            if self.window.is_key_pressed(key, mode) && !out.contains(&action) {
                out.push(action);
            }
        }
        out
    }

    /// Current mouse state for [`MouseTouch::update`], in the pixel space of
    /// a `frame_w` x `frame_h` frame (the camera may differ from the window
    /// after a switch).
    pub fn pointer(&self, frame_w: usize, frame_h: usize) -> Pointer {
        let (win_w, win_h) = self.window.get_size();
        let sx = if win_w > 0 { frame_w as f64 / win_w as f64 } else { 1.0 };
        let sy = if win_h > 0 { frame_h as f64 / win_h as f64 } else { 1.0 };
        Pointer {
            left: self.window.get_mouse_down(MouseButton::Left),
            right: self.window.get_mouse_down(MouseButton::Right),
            pos: self
                .window
                .get_mouse_pos(MouseMode::Clamp)
                .map(|(x, y)| (x as f64 * sx, y as f64 * sy)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    pub left: bool,
    pub right: bool,
    pub pos: Option<(f64, f64)>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Held {
    Nothing,
    // one finger at the cursor
    Left { last: (f64, f64) },
    // a fixed finger at `pivot` plus one at the cursor
    Right { pivot: (f64, f64), last: (f64, f64) },
}

/// Turns mouse drags into touch events.
/// Left drag = one finger. Right drag = two fingers, one pinned at the pivot
/// (the photo's center when the drag began), so moving away zooms and
/// circling rotates.
#[derive(Debug)]
pub struct MouseTouch {
    held: Held,
}

impl Default for MouseTouch {
    fn default() -> Self {
        Self { held: Held::Nothing }
    }
}

impl MouseTouch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this frame's pointer; `pivot` is only read when a right drag starts.
    pub fn update(&mut self, p: Pointer, pivot: (f64, f64)) -> Option<TouchEvent> {
        match (self.held, p.pos) {
            (Held::Nothing, Some(pos)) if p.left => {
                self.held = Held::Left { last: pos };
                Some(TouchEvent::start(&[pos]))
            }
            (Held::Nothing, Some(pos)) if p.right => {
                self.held = Held::Right { pivot, last: pos };
                Some(TouchEvent::start(&[pivot, pos]))
            }
            (Held::Nothing, _) => None,

            (Held::Left { last }, pos) if p.left => match pos {
                Some(pos) if pos != last => {
                    self.held = Held::Left { last: pos };
                    Some(TouchEvent::moved(&[pos]))
                }
                _ => None,
            },
            (Held::Right { pivot, last }, pos) if p.right => match pos {
                Some(pos) if pos != last => {
                    self.held = Held::Right { pivot, last: pos };
                    Some(TouchEvent::moved(&[pivot, pos]))
                }
                _ => None,
            },

            // button released (or swapped): lift every finger
            (Held::Left { .. } | Held::Right { .. }, _) => {
                self.held = Held::Nothing;
                Some(TouchEvent::end(&[]))
            }
        }
    }
}

/* ---------- Software drawing ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Bresenham line.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Small "+" marker.
/// Visual: shows where the pinned pinch finger sits during a right drag.
pub fn draw_crosshair(fb: &mut FrameBuffer, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(fb, cx - size, cy, cx - 2, cy, color);
    draw_line(fb, cx + 2, cy, cx + size, cy, color);
    draw_line(fb, cx, cy - size, cx, cy - 2, color);
    draw_line(fb, cx, cy + 2, cx, cy + size, color);
    put_pixel(fb, cx, cy, color);
}

/// Dim a horizontal band so HUD text stays readable on bright video.
pub fn shade_band(fb: &mut FrameBuffer, y: usize, height: usize) {
    let end = (y + height).min(fb.height);
    for row in y.min(end)..end {
        for px in &mut fb.pixels[row * fb.width..(row + 1) * fb.width] {
            *px = (*px >> 1) & 0x007F_7F7F;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use historic_overlay::gesture::TouchPhase;

    fn ptr(left: bool, right: bool, x: f64, y: f64) -> Pointer {
        Pointer { left, right, pos: Some((x, y)) }
    }

    #[test]
    fn left_drag_is_one_finger() {
        let mut mt = MouseTouch::new();
        let start = mt.update(ptr(true, false, 10.0, 10.0), (0.0, 0.0)).unwrap();
        assert_eq!(start.phase, TouchPhase::Start);
        assert_eq!(start.touches.len(), 1);

        assert!(mt.update(ptr(true, false, 10.0, 10.0), (0.0, 0.0)).is_none());
        let mv = mt.update(ptr(true, false, 12.0, 15.0), (0.0, 0.0)).unwrap();
        assert_eq!(mv.phase, TouchPhase::Move);
        assert_eq!((mv.touches[0].x, mv.touches[0].y), (12.0, 15.0));

        let end = mt.update(ptr(false, false, 12.0, 15.0), (0.0, 0.0)).unwrap();
        assert_eq!(end.phase, TouchPhase::End);
        assert!(end.touches.is_empty());
        assert!(mt.update(Pointer::default(), (0.0, 0.0)).is_none());
    }

    #[test]
    fn right_drag_pins_pivot_at_start() {
        let mut mt = MouseTouch::new();
        let start = mt.update(ptr(false, true, 150.0, 100.0), (100.0, 100.0)).unwrap();
        assert_eq!(start.touches.len(), 2);
        // pivot moving later doesn't move the pinned finger
        let mv = mt.update(ptr(false, true, 200.0, 100.0), (500.0, 500.0)).unwrap();
        assert_eq!((mv.touches[0].x, mv.touches[0].y), (100.0, 100.0));
        assert_eq!(mv.touches[1].x, 200.0);
    }

    #[test]
    fn shade_band_clips_to_frame() {
        let mut fb = FrameBuffer::filled(2, 2, 0x00FF_FFFF);
        shade_band(&mut fb, 1, 10);
        assert_eq!(fb.pixel(0, 0), 0x00FF_FFFF);
        assert_eq!(fb.pixel(1, 1), 0x007F_7F7F);
    }
}
