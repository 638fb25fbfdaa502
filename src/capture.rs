//! Still capture: flatten the live frame and the overlay surface into one JPEG.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use tracing::{info, warn};

use crate::blend::blend_scaled;
use crate::error::{Error, Result};
use crate::types::{FrameBuffer, Surface};
use crate::video::VideoSource;

pub const DEFAULT_QUALITY: f32 = 0.9;
const FILE_PREFIX: &str = "historic-recreation";

/// An encoded capture waiting to be saved.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub taken_at: DateTime<Utc>,
}

impl CapturedImage {
    /// `historic-recreation-<unix millis>.jpg`
    pub fn file_name(&self) -> String {
        capture_file_name(self.taken_at)
    }

    /// Write into `dir` (created if missing) under [`file_name`](Self::file_name).
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        std::fs::create_dir_all(dir)
            .map_err(|source| Error::SaveCapture { path: path.clone(), source })?;
        std::fs::write(&path, &self.bytes)
            .map_err(|source| Error::SaveCapture { path: path.clone(), source })?;
        info!(path = %path.display(), bytes = self.bytes.len(), "capture saved");
        Ok(path)
    }
}

pub fn capture_file_name(taken_at: DateTime<Utc>) -> String {
    format!("{FILE_PREFIX}-{}.jpg", taken_at.timestamp_millis())
}

/// Draw the video frame, then the overlay on top, into a fresh frame sized
/// to the video. A failing overlay is logged and left out.
pub fn flatten(video: &dyn VideoSource, overlay: Option<&Surface>) -> Result<FrameBuffer> {
    let (w, h) = video.resolved_size();
    if w == 0 || h == 0 {
        return Err(Error::CaptureDimensions { width: w, height: h });
    }
    let (w, h) = (w as usize, h as usize);

    let mut out = match video.current_frame() {
        Some(frame) if frame.is_consistent() && frame.width > 0 && frame.height > 0 => {
            frame.resized(w, h)
        }
        Some(_) => {
            warn!("video frame buffer is inconsistent; capturing black");
            FrameBuffer::filled(w, h, 0)
        }
        None => FrameBuffer::filled(w, h, 0),
    };

    if let Some(surface) = overlay.filter(|s| !s.is_empty()) {
        if let Err(e) = blend_scaled(&mut out, surface) {
            warn!("overlay could not be composited, capturing video only: {e}");
        }
    }
    Ok(out)
}

/// Encode a flattened frame. `quality` is 0..=1 like a canvas export.
pub fn encode_capture(frame: &FrameBuffer, quality: f32, taken_at: DateTime<Utc>) -> Result<CapturedImage> {
    let q = if quality.is_finite() { quality } else { DEFAULT_QUALITY };
    let q = ((q.clamp(0.0, 1.0) * 100.0).round() as u8).clamp(1, 100);

    let rgb = frame.to_rgb_image();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, q)
        .encode_image(&rgb)
        .map_err(|e| Error::Encode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(Error::Encode("encoder produced no data".into()));
    }
    Ok(CapturedImage { bytes, width: rgb.width(), height: rgb.height(), taken_at })
}

/// Flatten and encode in one go.
pub fn capture(video: &dyn VideoSource, overlay: Option<&Surface>, quality: f32) -> Result<CapturedImage> {
    let taken_at = Utc::now();
    let frame = flatten(video, overlay)?;
    encode_capture(&frame, quality, taken_at)
}
