//! What the core needs from the camera side: a size and the current picture.

use crate::types::FrameBuffer;

pub trait VideoSource {
    /// Pixel size the camera delivers; (0, 0) until the stream reports it.
    fn native_size(&self) -> (u32, u32);

    /// Size the video is shown at on screen.
    fn display_size(&self) -> (u32, u32);

    /// The picture currently on screen, if one has arrived yet.
    fn current_frame(&self) -> Option<&FrameBuffer>;

    /// Native size, or the displayed size while the native one is unknown.
    fn resolved_size(&self) -> (u32, u32) {
        let (w, h) = self.native_size();
        if w > 0 && h > 0 { (w, h) } else { self.display_size() }
    }
}

/// A camera frame as it stands this tick.
#[derive(Clone, Debug)]
pub struct LiveFrame {
    pub frame: Option<FrameBuffer>,
    pub display: (u32, u32),
}

impl LiveFrame {
    pub fn new(frame: FrameBuffer, display: (u32, u32)) -> Self {
        Self { frame: Some(frame), display }
    }

    /// Stream opened but no frame yet: only the element size is known.
    pub fn waiting(display: (u32, u32)) -> Self {
        Self { frame: None, display }
    }
}

impl VideoSource for LiveFrame {
    fn native_size(&self) -> (u32, u32) {
        self.frame
            .as_ref()
            .map(|f| (f.width as u32, f.height as u32))
            .unwrap_or((0, 0))
    }

    fn display_size(&self) -> (u32, u32) {
        self.display
    }

    fn current_frame(&self) -> Option<&FrameBuffer> {
        self.frame.as_ref()
    }
}

impl VideoSource for FrameBuffer {
    fn native_size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn display_size(&self) -> (u32, u32) {
        self.native_size()
    }

    fn current_frame(&self) -> Option<&FrameBuffer> {
        Some(self)
    }
}
