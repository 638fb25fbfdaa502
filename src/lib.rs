//! Live camera view with a historic photo laid over it.
//!
//! The photo can be dragged with one finger, pinched and rotated with two,
//! faded with an opacity slider, and the combined view captured as a JPEG.
//! Everything here is headless; the desktop window and camera live in the
//! binary.

pub mod blend;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod gesture;
pub mod input;
pub mod logging;
pub mod overlay;
pub mod session;
pub mod task;
pub mod types;
pub mod video;

pub use capture::CapturedImage;
pub use compositor::{Compositor, FrameOutcome};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use gesture::{GestureMode, GestureRecognizer, TouchEvent, TouchPhase, TouchPoint, TransformDelta};
pub use input::TouchInput;
pub use overlay::{ImageFile, OverlayState, Pose};
pub use session::{Notification, NoticeLevel, Session, SessionOptions};
pub use types::{FrameBuffer, Surface};
pub use video::{LiveFrame, VideoSource};
