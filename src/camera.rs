// Opens a webcam and turns its frames into 0x00RRGGBB buffers for the window.
// Visual expectation: `next_frame()` gives the picture the overlay sits on.

use historic_overlay::config::ResolutionPreset;
use historic_overlay::error::Error;
use historic_overlay::types::FrameBuffer;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};
use tracing::{debug, info, warn};

const FALLBACK_SIZE: (u32, u32) = (1280, 720);

/// Failed grabs in a row before the stream counts as lost.
pub const MAX_FRAME_FAILURES: u32 = 30;

pub struct CameraCapture {
    cam: Camera,
    index: u32,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open `index` asking for the preset, then 1280x720, then whatever the
    /// device offers.
    /// Visual: nothing on screen yet, we just hold an open stream.
    pub fn open_with_fallback(index: u32, preset: ResolutionPreset, fps: u32) -> Result<Self, Error> {
        let (w, h) = preset.dimensions();
        let attempts = [
            RequestedFormatType::Closest(CameraFormat::new(Resolution::new(w, h), FrameFormat::MJPEG, fps)),
            RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(FALLBACK_SIZE.0, FALLBACK_SIZE.1),
                FrameFormat::YUYV,
                fps,
            )),
            RequestedFormatType::AbsoluteHighestFrameRate,
        ];

        let mut last_err = Error::CameraInit(format!("no camera at index {index}"));
        for req in attempts {
            match Self::open(index, req) {
                Ok(cam) => return Ok(cam),
                Err(e) => {
                    warn!(index, "camera request not satisfied, trying next: {e}");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn open(index: u32, kind: RequestedFormatType) -> Result<Self, Error> {
        let req = RequestedFormat::new::<RgbFormat>(kind);

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // the stream may settle on a different size than requested
        let actual = cam.resolution();
        info!(index, width = actual.width(), height = actual.height(), "camera stream open");
        Ok(Self { cam, index, width: actual.width(), height: actual.height() })
    }

    /// Grab one frame, packed as 0x00RRGGBB.
    /// Visual: after `present`, the live image moves on by one frame.
    pub fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;
        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb.dimensions();
        let pixels = rgb
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        Ok(FrameBuffer { width: w as usize, height: h as usize, pixels })
    }

    /// Size the camera is actually delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Streak of failed frame grabs. A single bad frame is skipped; a long run
/// means the device went away.
#[derive(Debug, Default)]
pub struct FrameFailures {
    streak: u32,
}

impl FrameFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self) {
        self.streak = 0;
    }

    /// Count a failure; true once the streak reaches [`MAX_FRAME_FAILURES`].
    pub fn failed(&mut self) -> bool {
        self.streak = self.streak.saturating_add(1);
        self.streak >= MAX_FRAME_FAILURES
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}

/// How many cameras the system reports; 1 if it won't say.
pub fn camera_count() -> u32 {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(list) if !list.is_empty() => list.len() as u32,
        Ok(_) => 1,
        Err(e) => {
            debug!("camera query failed: {e}");
            1
        }
    }
}

/// Open the next camera in line. On failure the previous one is reopened and
/// the switch error comes back alongside it; `Err` only if neither opens.
pub fn switch_camera(
    current: CameraCapture,
    preset: ResolutionPreset,
    fps: u32,
) -> Result<(CameraCapture, Option<Error>), Error> {
    let count = camera_count();
    if count < 2 {
        return Ok((current, Some(Error::CameraInit("no other camera available".into()))));
    }
    let old_index = current.index;
    let next = (old_index + 1) % count;
    // some backends allow only one open stream
    drop(current);
    match CameraCapture::open_with_fallback(next, preset, fps) {
        Ok(cam) => Ok((cam, None)),
        Err(e) => {
            warn!(next, "camera switch failed, going back to {old_index}: {e}");
            let cam = CameraCapture::open_with_fallback(old_index, preset, fps)?;
            Ok((cam, Some(e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_is_lost_after_a_run_of_failures() {
        let mut f = FrameFailures::new();
        for _ in 1..MAX_FRAME_FAILURES {
            assert!(!f.failed());
        }
        assert!(f.failed());
        assert_eq!(f.streak(), MAX_FRAME_FAILURES);
    }

    #[test]
    fn a_good_frame_resets_the_streak() {
        let mut f = FrameFailures::new();
        for _ in 1..MAX_FRAME_FAILURES {
            f.failed();
        }
        f.succeeded();
        assert_eq!(f.streak(), 0);
        assert!(!f.failed());
    }
}
