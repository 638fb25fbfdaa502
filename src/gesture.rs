//! Multi-touch gesture recognizer: one finger drags, two fingers pinch and rotate.
//!
//! Feed it every [`TouchEvent`] in delivery order. Drag deltas are relative
//! to the previous sample. Pinch scale factor and rotation delta are
//! cumulative since the two-finger baseline was taken, so the caller composes
//! them against the pose it had at that moment (see [`GestureSignal::Began`]).

use tracing::{debug, trace};

/// Below this the two contacts are treated as sitting on the same spot.
pub const MIN_PINCH_DISTANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One raw input event. `touches` lists the contacts still down *after* it.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: Vec<TouchPoint>,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>) -> Self {
        Self { phase, touches }
    }

    pub fn start(touches: &[(f64, f64)]) -> Self {
        Self::new(TouchPhase::Start, points(touches))
    }

    pub fn moved(touches: &[(f64, f64)]) -> Self {
        Self::new(TouchPhase::Move, points(touches))
    }

    pub fn end(touches: &[(f64, f64)]) -> Self {
        Self::new(TouchPhase::End, points(touches))
    }
}

fn points(raw: &[(f64, f64)]) -> Vec<TouchPoint> {
    raw.iter()
        .enumerate()
        .map(|(i, &(x, y))| TouchPoint::new(i as u64, x, y))
        .collect()
}

/// Incremental change produced by one move event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformDelta {
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    /// Ratio against the baseline distance; multiply, don't add.
    pub scale_factor: Option<f64>,
    /// Degrees since the baseline angle; add.
    pub rotation_degrees: Option<f64>,
}

impl TransformDelta {
    pub fn is_empty(&self) -> bool {
        self.dx.is_none()
            && self.dy.is_none()
            && self.scale_factor.is_none()
            && self.rotation_degrees.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureMode {
    Idle,
    Dragging,
    PinchingRotating,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureSignal {
    None,
    /// A fresh baseline was captured for this mode.
    Began(GestureMode),
    Delta(TransformDelta),
    /// Back to idle.
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchResponse {
    /// The platform must not run its own scroll/zoom for this event.
    pub suppress_default: bool,
    pub signal: GestureSignal,
}

impl TouchResponse {
    fn ignored() -> Self {
        Self { suppress_default: false, signal: GestureSignal::None }
    }

    pub fn delta(&self) -> Option<TransformDelta> {
        match self.signal {
            GestureSignal::Delta(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Baseline {
    distance: f64,
    angle: f64,
}

impl Baseline {
    fn between(a: &TouchPoint, b: &TouchPoint) -> Self {
        Self { distance: distance(a, b), angle: angle(a, b) }
    }

    fn is_degenerate(&self) -> bool {
        self.distance < MIN_PINCH_DISTANCE
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum GestureState {
    Idle,
    Dragging { last: (f64, f64) },
    PinchingRotating { baseline: Baseline },
}

impl GestureState {
    fn mode(&self) -> GestureMode {
        match self {
            GestureState::Idle => GestureMode::Idle,
            GestureState::Dragging { .. } => GestureMode::Dragging,
            GestureState::PinchingRotating { .. } => GestureMode::PinchingRotating,
        }
    }
}

#[derive(Debug)]
pub struct GestureRecognizer {
    state: GestureState,
    disabled: bool,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self { state: GestureState::Idle, disabled: false }
    }

    pub fn mode(&self) -> GestureMode {
        self.state.mode()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// A disabled recognizer ignores input and drops any gesture in progress.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.state = GestureState::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
    }

    pub fn handle(&mut self, event: &TouchEvent) -> TouchResponse {
        if self.disabled {
            return TouchResponse::ignored();
        }
        let signal = match event.phase {
            TouchPhase::Start => self.on_start(&event.touches),
            TouchPhase::Move => self.on_move(&event.touches),
            TouchPhase::End | TouchPhase::Cancel => self.on_end(&event.touches),
        };
        trace!(phase = ?event.phase, contacts = event.touches.len(), ?signal, "touch");
        TouchResponse {
            suppress_default: matches!(event.phase, TouchPhase::Start | TouchPhase::Move),
            signal,
        }
    }

    fn on_start(&mut self, touches: &[TouchPoint]) -> GestureSignal {
        match touches {
            [only] => {
                self.state = GestureState::Dragging { last: (only.x, only.y) };
                self.began()
            }
            [a, b] => {
                self.state = GestureState::PinchingRotating { baseline: Baseline::between(a, b) };
                self.began()
            }
            // 0 or 3+ contacts: keep whatever is going on.
            _ => GestureSignal::None,
        }
    }

    fn on_move(&mut self, touches: &[TouchPoint]) -> GestureSignal {
        match (&mut self.state, touches) {
            (GestureState::Dragging { last }, [p]) => {
                let delta = TransformDelta {
                    dx: Some(p.x - last.0),
                    dy: Some(p.y - last.1),
                    ..Default::default()
                };
                *last = (p.x, p.y);
                GestureSignal::Delta(delta)
            }
            (GestureState::PinchingRotating { baseline }, [a, b]) => {
                if baseline.is_degenerate() {
                    // Fingers landed on one spot: adopt the first usable sample
                    // as the baseline and report no change for this event.
                    let current = Baseline::between(a, b);
                    if !current.is_degenerate() {
                        debug!(distance = current.distance, "pinch baseline adopted late");
                        *baseline = current;
                    }
                    return GestureSignal::Delta(TransformDelta {
                        scale_factor: Some(1.0),
                        rotation_degrees: Some(0.0),
                        ..Default::default()
                    });
                }
                let scale = distance(a, b) / baseline.distance;
                let rotation = (angle(a, b) - baseline.angle).to_degrees();
                GestureSignal::Delta(TransformDelta {
                    scale_factor: Some(scale),
                    rotation_degrees: Some(rotation),
                    ..Default::default()
                })
            }
            _ => GestureSignal::None,
        }
    }

    fn on_end(&mut self, remaining: &[TouchPoint]) -> GestureSignal {
        match (self.state, remaining) {
            (GestureState::Idle, []) => GestureSignal::None,
            (_, []) => {
                self.state = GestureState::Idle;
                debug!("gesture ended");
                GestureSignal::Ended
            }
            // Lifting one finger mid-pinch: continue as a drag from where the
            // remaining finger is, so the overlay does not jump.
            (GestureState::PinchingRotating { .. } | GestureState::Idle, [p]) => {
                self.state = GestureState::Dragging { last: (p.x, p.y) };
                self.began()
            }
            (GestureState::PinchingRotating { .. }, [a, b]) => {
                self.state = GestureState::PinchingRotating { baseline: Baseline::between(a, b) };
                self.began()
            }
            _ => GestureSignal::None,
        }
    }

    fn began(&self) -> GestureSignal {
        let mode = self.state.mode();
        debug!(?mode, "gesture began");
        GestureSignal::Began(mode)
    }
}

fn distance(a: &TouchPoint, b: &TouchPoint) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

fn angle(a: &TouchPoint, b: &TouchPoint) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn single_finger_starts_drag() {
        let mut g = GestureRecognizer::new();
        let r = g.handle(&TouchEvent::start(&[(100.0, 100.0)]));
        assert!(r.suppress_default);
        assert_eq!(r.signal, GestureSignal::Began(GestureMode::Dragging));
        assert_eq!(g.mode(), GestureMode::Dragging);
    }

    #[test]
    fn drag_emits_relative_deltas() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(100.0, 100.0)]));
        let d = g.handle(&TouchEvent::moved(&[(130.0, 115.0)])).delta().unwrap();
        assert_eq!((d.dx, d.dy), (Some(30.0), Some(15.0)));
        assert!(d.scale_factor.is_none() && d.rotation_degrees.is_none());

        let d = g.handle(&TouchEvent::moved(&[(131.0, 110.0)])).delta().unwrap();
        assert_eq!((d.dx, d.dy), (Some(1.0), Some(-5.0)));
    }

    #[test]
    fn pinch_ratio_is_cumulative_since_baseline() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0)]));
        let r = g.handle(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0)]));
        assert_eq!(r.signal, GestureSignal::Began(GestureMode::PinchingRotating));

        let d = g.handle(&TouchEvent::moved(&[(0.0, 0.0), (150.0, 0.0)])).delta().unwrap();
        assert!(approx(d.scale_factor.unwrap(), 1.5));
        assert!(approx(d.rotation_degrees.unwrap(), 0.0));
        assert!(d.dx.is_none());

        // Same baseline: 200px reads as 2.0, not 1.5 * 1.33.
        let d = g.handle(&TouchEvent::moved(&[(0.0, 0.0), (200.0, 0.0)])).delta().unwrap();
        assert!(approx(d.scale_factor.unwrap(), 2.0));
    }

    #[test]
    fn rotation_reported_in_degrees() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0)]));
        let d = g.handle(&TouchEvent::moved(&[(0.0, 0.0), (0.0, 100.0)])).delta().unwrap();
        assert!(approx(d.rotation_degrees.unwrap(), 90.0));
        assert!(approx(d.scale_factor.unwrap(), 1.0));
    }

    #[test]
    fn zero_distance_pinch_never_yields_nan() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(50.0, 50.0), (50.0, 50.0)]));

        let d = g.handle(&TouchEvent::moved(&[(50.0, 50.0), (50.0, 50.0)])).delta().unwrap();
        assert_eq!(d.scale_factor, Some(1.0));
        assert_eq!(d.rotation_degrees, Some(0.0));

        // First non-zero sample becomes the baseline.
        let d = g.handle(&TouchEvent::moved(&[(50.0, 50.0), (90.0, 50.0)])).delta().unwrap();
        assert_eq!(d.scale_factor, Some(1.0));

        let d = g.handle(&TouchEvent::moved(&[(50.0, 50.0), (130.0, 50.0)])).delta().unwrap();
        assert!(approx(d.scale_factor.unwrap(), 2.0));
        assert!(d.scale_factor.unwrap().is_finite());
    }

    #[test]
    fn lifting_one_finger_mid_pinch_continues_as_drag() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0)]));
        g.handle(&TouchEvent::moved(&[(0.0, 0.0), (120.0, 0.0)]));

        let r = g.handle(&TouchEvent::end(&[(120.0, 0.0)]));
        assert!(!r.suppress_default);
        assert_eq!(r.signal, GestureSignal::Began(GestureMode::Dragging));

        // No jump: the remaining finger is the new drag origin.
        let d = g.handle(&TouchEvent::moved(&[(125.0, 2.0)])).delta().unwrap();
        assert_eq!((d.dx, d.dy), (Some(5.0), Some(2.0)));
    }

    #[test]
    fn all_fingers_up_returns_to_idle() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(1.0, 1.0)]));
        assert_eq!(g.handle(&TouchEvent::end(&[])).signal, GestureSignal::Ended);
        assert_eq!(g.mode(), GestureMode::Idle);
        assert_eq!(g.handle(&TouchEvent::moved(&[(5.0, 5.0)])).signal, GestureSignal::None);
    }

    #[test]
    fn cancel_behaves_like_end() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0), (10.0, 0.0)]));
        let r = g.handle(&TouchEvent::new(TouchPhase::Cancel, vec![]));
        assert_eq!(r.signal, GestureSignal::Ended);
        assert_eq!(g.mode(), GestureMode::Idle);
    }

    #[test]
    fn third_finger_is_ignored_and_lifting_it_rebaselines() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0)]));
        let r = g.handle(&TouchEvent::start(&[(0.0, 0.0), (100.0, 0.0), (50.0, 50.0)]));
        assert_eq!(r.signal, GestureSignal::None);
        assert_eq!(g.mode(), GestureMode::PinchingRotating);

        // Three contacts: not a pinch sample.
        assert_eq!(
            g.handle(&TouchEvent::moved(&[(0.0, 0.0), (100.0, 0.0), (60.0, 60.0)])).signal,
            GestureSignal::None
        );

        let r = g.handle(&TouchEvent::end(&[(0.0, 0.0), (200.0, 0.0)]));
        assert_eq!(r.signal, GestureSignal::Began(GestureMode::PinchingRotating));
        let d = g.handle(&TouchEvent::moved(&[(0.0, 0.0), (200.0, 0.0)])).delta().unwrap();
        assert!(approx(d.scale_factor.unwrap(), 1.0));
    }

    #[test]
    fn mismatched_contact_count_emits_nothing() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0)]));
        let r = g.handle(&TouchEvent::moved(&[(0.0, 0.0), (5.0, 5.0)]));
        assert!(r.suppress_default);
        assert_eq!(r.signal, GestureSignal::None);
    }

    #[test]
    fn disabled_recognizer_is_inert() {
        let mut g = GestureRecognizer::new();
        g.handle(&TouchEvent::start(&[(0.0, 0.0)]));
        g.set_disabled(true);
        assert_eq!(g.mode(), GestureMode::Idle);
        let r = g.handle(&TouchEvent::start(&[(0.0, 0.0)]));
        assert_eq!(r, TouchResponse { suppress_default: false, signal: GestureSignal::None });
        assert!(g.handle(&TouchEvent::moved(&[(9.0, 9.0)])).delta().is_none());

        g.set_disabled(false);
        g.handle(&TouchEvent::start(&[(0.0, 0.0)]));
        assert!(g.handle(&TouchEvent::moved(&[(9.0, 9.0)])).delta().is_some());
    }
}
