//! The overlay session: owns the overlay state and wires gestures, rendering,
//! decoding and capture together on one thread.
//!
//! The shell calls [`Session::tick`] once per display refresh. Everything that
//! finished in the background since the last tick (decode, encode) is picked
//! up there, touch input is drained in delivery order, and the overlay is
//! rendered if the frame loop is running.

use std::collections::VecDeque;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::capture::{self, CapturedImage, DEFAULT_QUALITY};
use crate::compositor::{Compositor, FrameOutcome};
use crate::error::{Error, Result};
use crate::frame_loop::{FrameLoop, Tick};
use crate::gesture::{GestureMode, GestureRecognizer, GestureSignal, TouchEvent, TouchResponse};
use crate::input::{TouchInput, TouchSubscription};
use crate::overlay::{ImageFile, OverlayImage, OverlayState, Pose};
use crate::task::BackgroundTask;
use crate::types::{FrameBuffer, Surface};
use crate::video::VideoSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient message for the user (toast).
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn info(title: &str, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, title: title.into(), message: message.into() }
    }

    fn error(title: &str, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, title: title.into(), message: message.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOptions {
    /// Initial overlay opacity, 0..=100.
    pub opacity_percent: f64,
    /// JPEG quality for captures, 0..=1.
    pub jpeg_quality: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { opacity_percent: 50.0, jpeg_quality: DEFAULT_QUALITY }
    }
}

pub struct Session {
    overlay: OverlayState,
    recognizer: GestureRecognizer,
    /// Pose when the current gesture baseline was taken.
    anchor: Pose,
    touch: Option<TouchSubscription>,
    compositor: Compositor,
    frame_loop: Option<FrameLoop>,
    pending_load: Option<BackgroundTask<OverlayImage>>,
    pending_captures: Vec<BackgroundTask<CapturedImage>>,
    finished_captures: Vec<CapturedImage>,
    notifications: VecDeque<Notification>,
    options: SessionOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        let mut recognizer = GestureRecognizer::new();
        // no photo yet, nothing to move
        recognizer.set_disabled(true);
        Self {
            overlay: OverlayState::with_opacity_percent(options.opacity_percent),
            recognizer,
            anchor: Pose::default(),
            touch: None,
            compositor: Compositor::new(),
            frame_loop: None,
            pending_load: None,
            pending_captures: Vec::new(),
            finished_captures: Vec::new(),
            notifications: VecDeque::new(),
            options,
        }
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn gesture_mode(&self) -> GestureMode {
        self.recognizer.mode()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn is_rendering(&self) -> bool {
        self.frame_loop.as_ref().is_some_and(FrameLoop::is_running)
    }

    /// The overlay drawing surface, while an overlay is shown.
    pub fn overlay_surface(&self) -> Option<&Surface> {
        if self.overlay.is_active() { self.compositor.surface() } else { None }
    }

    // ---------------------------------------------------------------- input

    /// Listen to a touch surface. Replaces any earlier subscription.
    pub fn attach_input(&mut self, input: &TouchInput) {
        self.touch = Some(input.subscribe());
        self.recognizer.reset();
    }

    pub fn detach_input(&mut self) {
        if self.touch.take().is_some() {
            debug!("touch input detached");
        }
        self.recognizer.reset();
    }

    /// Run one touch event through the recognizer and fold the result into the pose.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> TouchResponse {
        let response = self.recognizer.handle(event);
        match response.signal {
            GestureSignal::Began(_) => self.anchor = self.overlay.pose(),
            GestureSignal::Delta(delta) => self.overlay.apply_delta_from(self.anchor, &delta),
            GestureSignal::Ended | GestureSignal::None => {}
        }
        response
    }

    fn drain_input(&mut self) {
        let Some(sub) = self.touch.take() else { return };
        while let Some(event) = sub.next_event() {
            self.handle_touch(&event);
        }
        self.touch = Some(sub);
    }

    // ---------------------------------------------------------------- model

    /// Validate now, decode in the background; the photo shows up on a later tick.
    pub fn load_image(&mut self, file: ImageFile) -> Result<()> {
        match self.overlay.load_image(file) {
            Ok(task) => {
                if let Some(mut old) = self.pending_load.replace(task) {
                    old.cancel();
                    debug!("earlier overlay load superseded");
                }
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error("Error loading image", e.to_string()));
                Err(e)
            }
        }
    }

    /// Block until a pending load resolves and apply it.
    pub fn wait_for_load(&mut self) -> Result<()> {
        match self.pending_load.take() {
            Some(task) => self.finish_load(task.wait()),
            None => Ok(()),
        }
    }

    fn poll_load(&mut self) {
        let Some(result) = self.pending_load.as_mut().and_then(BackgroundTask::poll) else {
            return;
        };
        self.pending_load = None;
        // already reported through notifications
        let _ = self.finish_load(result);
    }

    fn finish_load(&mut self, result: Result<OverlayImage>) -> Result<()> {
        match result {
            Ok(image) => {
                self.overlay.install_image(image);
                self.anchor = self.overlay.pose();
                self.recognizer.reset();
                self.recognizer.set_disabled(false);
                self.start_rendering();
                self.notify(Notification::info("Overlay loaded", "Historic photo ready for overlay"));
                Ok(())
            }
            Err(e) => {
                warn!("overlay image failed to load: {e}");
                self.notify(Notification::error("Error loading image", e.to_string()));
                Err(e)
            }
        }
    }

    pub fn update_opacity(&mut self, percent: f64) {
        self.overlay.update_opacity(percent);
    }

    pub fn set_scale_percent(&mut self, percent: f64) {
        self.overlay.set_scale_percent(percent);
    }

    pub fn set_rotation_degrees(&mut self, degrees: f64) {
        self.overlay.set_rotation_degrees(degrees);
    }

    pub fn reset_overlay(&mut self) {
        self.overlay.reset_overlay();
        self.anchor = self.overlay.pose();
    }

    /// Drop the photo, stop rendering and gesture tracking.
    pub fn remove_overlay(&mut self) {
        if let Some(mut task) = self.pending_load.take() {
            task.cancel();
        }
        self.overlay.remove_overlay();
        self.recognizer.set_disabled(true);
        self.anchor = Pose::default();
        self.stop_rendering();
        self.compositor.clear();
    }

    // ------------------------------------------------------------ rendering

    fn start_rendering(&mut self) {
        if !self.is_rendering() {
            self.frame_loop = Some(FrameLoop::start());
        }
    }

    fn stop_rendering(&mut self) {
        if let Some(mut fl) = self.frame_loop.take() {
            fl.cancel();
        }
    }

    /// One display refresh.
    pub fn tick(&mut self, video: &dyn VideoSource) -> FrameOutcome {
        self.poll_load();
        self.poll_captures();
        self.drain_input();

        let Some(fl) = self.frame_loop.as_mut() else {
            return FrameOutcome::Skipped;
        };
        let (overlay, compositor) = (&self.overlay, &mut self.compositor);
        let mut outcome = FrameOutcome::Skipped;
        let tick = fl.tick(|| {
            outcome = compositor.render_frame(overlay, video);
            overlay.is_active()
        });
        if tick != Tick::Continue {
            self.frame_loop = None;
        }
        outcome
    }

    /// Put the rendered overlay on top of a camera frame for display.
    pub fn compose_display(&self, frame: &mut FrameBuffer) {
        if let Some(surface) = self.overlay_surface().filter(|s| !s.is_empty()) {
            if let Err(e) = crate::blend::blend_scaled(frame, surface) {
                warn!("overlay not shown this frame: {e}");
            }
        }
    }

    // -------------------------------------------------------------- capture

    /// Flatten now, encode on a worker; pick it up with [`take_captures`](Self::take_captures).
    pub fn begin_capture(&mut self, video: &dyn VideoSource) -> Result<()> {
        let taken_at = Utc::now();
        let frame = match capture::flatten(video, self.overlay_surface()) {
            Ok(frame) => frame,
            Err(e) => {
                self.notify(Notification::error("Capture failed", e.to_string()));
                return Err(e);
            }
        };
        let quality = self.options.jpeg_quality;
        self.pending_captures.push(BackgroundTask::spawn("encode-capture", move || {
            capture::encode_capture(&frame, quality, taken_at)
        }));
        Ok(())
    }

    /// Flatten and encode on this thread.
    pub fn capture_now(&mut self, video: &dyn VideoSource) -> Result<CapturedImage> {
        let result = capture::capture(video, self.overlay_surface(), self.options.jpeg_quality);
        self.report_capture(result.as_ref().err());
        result
    }

    fn poll_captures(&mut self) {
        let mut done = Vec::new();
        self.pending_captures.retain_mut(|task| match task.poll() {
            Some(result) => {
                done.push(result);
                false
            }
            None => true,
        });
        for result in done {
            self.report_capture(result.as_ref().err());
            if let Ok(shot) = result {
                self.finished_captures.push(shot);
            }
        }
    }

    fn report_capture(&mut self, err: Option<&Error>) {
        match err {
            None => {
                info!("photo captured");
                self.notify(Notification::info("Photo captured", "Historic recreation saved successfully"));
            }
            Some(e) => {
                warn!("capture failed: {e}");
                self.notify(Notification::error("Capture failed", e.to_string()));
            }
        }
    }

    pub fn captures_pending(&self) -> usize {
        self.pending_captures.len()
    }

    /// Encoded captures ready to hand to the user.
    pub fn take_captures(&mut self) -> Vec<CapturedImage> {
        std::mem::take(&mut self.finished_captures)
    }

    // -------------------------------------------------------- notifications

    fn notify(&mut self, n: Notification) {
        debug!(title = %n.title, message = %n.message, "notification");
        self.notifications.push_back(n);
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Stop everything scheduled and let go of the input surface.
    pub fn teardown(&mut self) {
        self.stop_rendering();
        self.detach_input();
        if let Some(mut task) = self.pending_load.take() {
            task.cancel();
        }
        for mut task in self.pending_captures.drain(..) {
            task.cancel();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::LiveFrame;
    use image::{Rgba, RgbaImage};
    use std::time::{Duration, Instant};

    fn png(w: u32, h: u32) -> ImageFile {
        let img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        ImageFile::new("photo.png", "image/png", out.into_inner())
    }

    fn loaded() -> Session {
        let mut s = Session::default();
        s.load_image(png(4, 4)).unwrap();
        s.wait_for_load().unwrap();
        s.drain_notifications();
        s
    }

    #[test]
    fn validation_error_is_reported_and_nothing_spawned() {
        let mut s = Session::default();
        let err = s.load_image(ImageFile::new("a.txt", "text/plain", vec![1, 2, 3])).unwrap_err();
        assert!(err.is_validation());
        assert!(!s.is_loading());
        let notes = s.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NoticeLevel::Error);
    }

    #[test]
    fn load_arrives_on_a_later_tick() {
        let mut s = Session::default();
        s.load_image(png(3, 3)).unwrap();
        let video = FrameBuffer::filled(10, 10, 0);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !s.overlay().is_active() {
            assert!(Instant::now() < deadline);
            s.tick(&video);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(s.is_rendering());
        assert_eq!(s.tick(&video), FrameOutcome::Rendered);
        assert_eq!(s.drain_notifications()[0].title, "Overlay loaded");
    }

    #[test]
    fn failed_decode_leaves_state_alone() {
        let mut s = loaded();
        s.update_opacity(70.0);
        let before = (s.overlay().pose(), s.overlay().opacity());
        s.load_image(ImageFile::new("x.png", "image/png", vec![9, 9, 9])).unwrap();
        assert!(s.wait_for_load().is_err());
        assert_eq!((s.overlay().pose(), s.overlay().opacity()), before);
        assert!(s.overlay().is_active());
    }

    #[test]
    fn drag_moves_overlay() {
        let mut s = loaded();
        s.handle_touch(&TouchEvent::start(&[(100.0, 100.0)]));
        let r = s.handle_touch(&TouchEvent::moved(&[(130.0, 115.0)]));
        assert!(r.suppress_default);
        assert_eq!((s.overlay().x(), s.overlay().y()), (30.0, 15.0));
    }

    #[test]
    fn pinch_scales_from_gesture_start() {
        let mut s = loaded();
        s.handle_touch(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0)]));
        s.handle_touch(&TouchEvent::moved(&[(0.0, 0.0), (150.0, 0.0)]));
        assert!((s.overlay().scale() - 1.5).abs() < 1e-9);
        s.handle_touch(&TouchEvent::moved(&[(0.0, 0.0), (120.0, 0.0)]));
        assert!((s.overlay().scale() - 1.2).abs() < 1e-9);

        // a second pinch starts from the new scale
        s.handle_touch(&TouchEvent::end(&[]));
        s.handle_touch(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0)]));
        s.handle_touch(&TouchEvent::moved(&[(0.0, 0.0), (200.0, 0.0)]));
        assert!((s.overlay().scale() - 2.4).abs() < 1e-9);
    }

    #[test]
    fn gestures_ignored_without_overlay() {
        let mut s = Session::default();
        s.handle_touch(&TouchEvent::start(&[(0.0, 0.0)]));
        let r = s.handle_touch(&TouchEvent::moved(&[(50.0, 0.0)]));
        assert!(!r.suppress_default);
        assert_eq!(s.overlay().x(), 0.0);
    }

    #[test]
    fn input_hub_events_are_applied_on_tick() {
        let mut s = loaded();
        let input = TouchInput::new();
        s.attach_input(&input);
        input.dispatch(TouchEvent::start(&[(10.0, 10.0)]));
        input.dispatch(TouchEvent::moved(&[(15.0, 30.0)]));
        s.tick(&FrameBuffer::filled(8, 8, 0));
        assert_eq!((s.overlay().x(), s.overlay().y()), (5.0, 20.0));
        assert_eq!(s.gesture_mode(), GestureMode::Dragging);

        s.detach_input();
        assert_eq!(input.subscriber_count(), 0);
    }

    #[test]
    fn remove_stops_the_loop() {
        let mut s = loaded();
        let video = FrameBuffer::filled(8, 8, 0);
        assert_eq!(s.tick(&video), FrameOutcome::Rendered);
        s.remove_overlay();
        assert!(!s.is_rendering());
        assert!(s.overlay_surface().is_none());
        assert_eq!(s.tick(&video), FrameOutcome::Skipped);
    }

    #[test]
    fn display_composition_shows_overlay() {
        let mut s = loaded();
        s.update_opacity(100.0);
        let video = FrameBuffer::filled(8, 8, 0);
        s.tick(&video);
        let mut shown = video.clone();
        s.compose_display(&mut shown);
        assert_eq!(shown.pixel(4, 4), 0x0000_00FF);
        assert_eq!(shown.pixel(0, 0), 0);
    }

    #[test]
    fn zero_sized_capture_notifies() {
        let mut s = loaded();
        assert!(s.begin_capture(&LiveFrame::waiting((0, 0))).is_err());
        assert_eq!(s.captures_pending(), 0);
        assert_eq!(s.drain_notifications()[0].title, "Capture failed");
    }

    #[test]
    fn background_capture_is_collected() {
        let mut s = loaded();
        let video = FrameBuffer::filled(8, 8, 0x0080_8080);
        s.tick(&video);
        s.begin_capture(&video).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while s.captures_pending() > 0 {
            assert!(Instant::now() < deadline);
            s.tick(&video);
            std::thread::sleep(Duration::from_millis(1));
        }
        let shots = s.take_captures();
        assert_eq!(shots.len(), 1);
        assert_eq!((shots[0].width, shots[0].height), (8, 8));
        assert!(s.take_captures().is_empty());
    }

    #[test]
    fn capture_now_without_overlay_is_video_only() {
        let mut s = Session::default();
        let shot = s.capture_now(&FrameBuffer::filled(6, 4, 0)).unwrap();
        assert_eq!((shot.width, shot.height), (6, 4));
    }

    #[test]
    fn teardown_cancels_everything() {
        let mut s = loaded();
        let input = TouchInput::new();
        s.attach_input(&input);
        s.teardown();
        assert!(!s.is_rendering());
        assert_eq!(input.subscriber_count(), 0);
    }
}
