//! Per-frame render scheduling.
//!
//! A [`FrameLoop`] stands for "the next frame is scheduled". Each tick checks
//! the cancellation token first, runs the frame, and schedules the following
//! one only if the frame asks for it, so an inactive overlay ends the loop on
//! its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Frame ran; another one is scheduled.
    Continue,
    /// Frame ran and asked not to be rescheduled.
    Finished,
    /// Loop was not scheduled or had been cancelled; nothing ran.
    Stopped,
}

#[derive(Debug)]
pub struct FrameLoop {
    token: CancelToken,
    scheduled: bool,
    frames: u64,
}

impl FrameLoop {
    /// Schedule the first frame.
    pub fn start() -> Self {
        debug!("frame loop started");
        Self { token: CancelToken::new(), scheduled: true, frames: 0 }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.scheduled && !self.token.is_cancelled()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame. `frame` returns whether the next one should be scheduled.
    pub fn tick(&mut self, frame: impl FnOnce() -> bool) -> Tick {
        if !self.is_running() {
            self.scheduled = false;
            return Tick::Stopped;
        }
        let again = frame();
        self.frames += 1;
        if again {
            Tick::Continue
        } else {
            self.scheduled = false;
            debug!(frames = self.frames, "frame loop finished");
            Tick::Finished
        }
    }

    /// Drop the pending frame.
    pub fn cancel(&mut self) {
        if self.scheduled {
            debug!(frames = self.frames, "frame loop cancelled");
        }
        self.scheduled = false;
        self.token.cancel();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Frames-per-second over one-second windows.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self { window_start: now, frames: 0, fps: 0.0 }
    }

    /// Count a frame; returns the new rate when a window closes.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(self.fps)
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_while_frames_ask_for_more() {
        let mut fl = FrameLoop::start();
        assert_eq!(fl.tick(|| true), Tick::Continue);
        assert_eq!(fl.tick(|| true), Tick::Continue);
        assert_eq!(fl.tick(|| false), Tick::Finished);
        assert!(!fl.is_running());

        let mut ran = false;
        assert_eq!(fl.tick(|| { ran = true; true }), Tick::Stopped);
        assert!(!ran);
        assert_eq!(fl.frames(), 3);
    }

    #[test]
    fn cancelled_token_stops_at_entry() {
        let mut fl = FrameLoop::start();
        let token = fl.token();
        token.cancel();
        let mut ran = false;
        assert_eq!(fl.tick(|| { ran = true; true }), Tick::Stopped);
        assert!(!ran);
    }

    #[test]
    fn drop_cancels_token() {
        let fl = FrameLoop::start();
        let token = fl.token();
        assert!(!token.is_cancelled());
        drop(fl);
        assert!(token.is_cancelled());
    }

    #[test]
    fn fps_reports_once_per_second() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(t0);
        for i in 1..30 {
            assert!(fps.frame(t0 + Duration::from_millis(i * 30)).is_none());
        }
        let rate = fps.frame(t0 + Duration::from_millis(1000)).unwrap();
        assert!((rate - 30.0).abs() < 0.01);
        assert_eq!(fps.fps(), rate);
    }
}
