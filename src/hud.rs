// Heads-up display: a status line and a short-lived notification line,
// drawn with a tiny 5x7 bitmap font straight into the frame.

use std::time::{Duration, Instant};

use historic_overlay::overlay::OverlayState;
use historic_overlay::session::{Notification, NoticeLevel};
use historic_overlay::types::FrameBuffer;

use crate::draw::{put_pixel, shade_band};

const NOTICE_TTL: Duration = Duration::from_secs(3);
const LINE_HEIGHT: usize = 11;
const WHITE: u32 = 0x00FF_FFFF;
const AMBER: u32 = 0x00FF_C040;
const RED: u32 = 0x00FF_5050;

/// What the status line says about the photo right now.
pub fn status_line(overlay: &OverlayState, loading: bool, fps: f32) -> String {
    let photo = if loading {
        "LOADING".to_string()
    } else if overlay.is_active() {
        format!(
            "OPACITY {}% | SCALE {}% | ROT {}",
            overlay.opacity_percent(),
            overlay.scale_percent(),
            overlay.rotation_degrees_rounded(),
        )
    } else {
        "NO PHOTO - PRESS L".to_string()
    };
    format!("{photo} | FPS: {fps:.1}")
}

#[derive(Debug, Default)]
pub struct Hud {
    notice: Option<(Notification, Instant)>,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the notification line; it fades out after a few seconds.
    pub fn show(&mut self, notice: Notification, now: Instant) {
        self.notice = Some((notice, now));
    }

    pub fn notice(&self, now: Instant) -> Option<&Notification> {
        self.notice
            .as_ref()
            .filter(|(_, shown)| now.duration_since(*shown) < NOTICE_TTL)
            .map(|(n, _)| n)
    }

    /// Visual: a dark strip at the top with the status text, and a second
    /// strip under it while a notification is live.
    pub fn draw(&mut self, fb: &mut FrameBuffer, status: &str, now: Instant) {
        shade_band(fb, 0, LINE_HEIGHT);
        draw_text_5x7(fb, 4, 2, status, WHITE);

        if self.notice(now).is_none() {
            self.notice = None;
            return;
        }
        if let Some((n, _)) = &self.notice {
            let color = match n.level {
                NoticeLevel::Info => AMBER,
                NoticeLevel::Error => RED,
            };
            let line = format!("{}: {}", n.title, n.message);
            shade_band(fb, LINE_HEIGHT, LINE_HEIGHT);
            draw_text_5x7(fb, 4, LINE_HEIGHT as i32 + 2, &line, color);
        }
    }
}

/* ---------- 5x7 bitmap font ---------- */

/// 5x7 glyph rows; the low 5 bits are pixels (bit 4 = leftmost).
/// Lowercase is drawn as uppercase.
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '%' => g!(0b11000,0b11001,0b00010,0b00100,0b01000,0b10011,0b00011),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),
        '/' => g!(0b00001,0b00001,0b00010,0b00100,0b01000,0b10000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '\'' => g!(0b00100,0b00100,0b01000,0b00000,0b00000,0b00000,0b00000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),

        _ => None,
    }
}

/// One glyph with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (offset, c) in [(1, 0x0000_0000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(fb, x + rx + offset, y + ry as i32 + offset, c);
                }
            }
        }
    }
}

/// Glyphs are 5 wide with 1 pixel spacing; unknown characters leave a gap.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_without_photo() {
        let s = status_line(&OverlayState::new(), false, 29.96);
        assert_eq!(s, "NO PHOTO - PRESS L | FPS: 30.0");
        assert!(status_line(&OverlayState::new(), true, 0.0).starts_with("LOADING"));
    }

    #[test]
    fn every_status_character_has_a_glyph() {
        let s = "OPACITY 50% | SCALE 100% | ROT 359 | FPS: 12.5 NO PHOTO - PRESS L";
        for ch in s.chars() {
            assert!(glyph5x7(ch).is_some(), "missing glyph for {ch:?}");
        }
        assert_eq!(glyph5x7('a'), glyph5x7('A'));
        assert!(glyph5x7('~').is_none());
    }

    #[test]
    fn text_lands_inside_its_cell() {
        let mut fb = FrameBuffer::filled(20, 10, 0x0012_3456);
        draw_text_5x7(&mut fb, 0, 0, "I", WHITE);
        // top bar of the I
        assert_eq!(fb.pixel(1, 0), WHITE);
        assert_eq!(fb.pixel(10, 5), 0x0012_3456);
    }

    #[test]
    fn notice_expires() {
        let t0 = Instant::now();
        let mut hud = Hud::new();
        hud.show(
            Notification { level: NoticeLevel::Info, title: "Photo captured".into(), message: "ok".into() },
            t0,
        );
        assert!(hud.notice(t0 + Duration::from_secs(1)).is_some());
        assert!(hud.notice(t0 + NOTICE_TTL).is_none());

        let mut fb = FrameBuffer::filled(64, 32, 0);
        hud.draw(&mut fb, "X", t0 + NOTICE_TTL);
        assert!(hud.notice.is_none());
    }
}
