//! Transform model: the overlay photo and its pose.
//!
//! All mutation goes through the methods here so the invariants hold after
//! every call: scale stays in [`MIN_SCALE`, `MAX_SCALE`], opacity in [0, 1],
//! rotation in [0, 360).

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gesture::TransformDelta;
use crate::task::BackgroundTask;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 3.0;
pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_OPACITY: f64 = 0.5;

/// Largest file accepted for decoding (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Decoded overlay bitmap. Cheap to clone; the pixels are shared.
#[derive(Clone)]
pub struct OverlayImage(Arc<RgbaImage>);

impl OverlayImage {
    pub fn new(img: RgbaImage) -> Self {
        Self(Arc::new(img))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    pub fn same_as(&self, other: &OverlayImage) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OverlayImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OverlayImage({}x{})", self.width(), self.height())
    }
}

/// A picked file as the file-input side hands it over.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self { name: name.into(), mime: mime.into(), size, bytes }
    }

    /// Read a file from disk; the MIME type comes from the extension.
    /// Type and size are checked against the file's metadata before any
    /// bytes are read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let read_err = |source| Error::ReadFile { path: path.to_path_buf(), source };
        let mime = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let size = std::fs::metadata(path).map_err(read_err)?.len();
        Self { name: name.clone(), mime: mime.clone(), size, bytes: Vec::new() }.validate()?;

        let bytes = std::fs::read(path).map_err(read_err)?;
        Ok(Self::new(name, mime, bytes))
    }

    /// Type and size checks. Runs before any decoding starts.
    pub fn validate(&self) -> Result<()> {
        if !self.mime.starts_with("image/") {
            return Err(Error::NotAnImage { mime: self.mime.clone() });
        }
        if self.size > MAX_IMAGE_BYTES {
            return Err(Error::FileTooLarge { size: self.size, limit: MAX_IMAGE_BYTES });
        }
        Ok(())
    }
}

/// Decode file bytes into an overlay bitmap.
pub fn decode_image(bytes: &[u8]) -> Result<OverlayImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| Error::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(Error::Decode("image has no pixels".into()));
    }
    Ok(OverlayImage::new(rgba))
}

/// Absolute values for any subset of the pose.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
}

/// The placement part of the state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl Default for Pose {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, scale: DEFAULT_SCALE, rotation: 0.0 }
    }
}

pub fn clamp_scale(s: f64) -> f64 {
    s.clamp(MIN_SCALE, MAX_SCALE)
}

/// Wrap degrees into [0, 360).
pub fn normalize_rotation(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360.0
    if r >= 360.0 { 0.0 } else { r }
}

#[derive(Clone, Debug)]
pub struct OverlayState {
    image: Option<OverlayImage>,
    pose: Pose,
    opacity: f64,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self { image: None, pose: Pose::default(), opacity: DEFAULT_OPACITY }
    }
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a non-default opacity (percent, as the slider reports it).
    pub fn with_opacity_percent(percent: f64) -> Self {
        let mut state = Self::default();
        state.update_opacity(percent);
        state
    }

    pub fn image(&self) -> Option<&OverlayImage> {
        self.image.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.image.is_some()
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn x(&self) -> f64 { self.pose.x }
    pub fn y(&self) -> f64 { self.pose.y }
    pub fn scale(&self) -> f64 { self.pose.scale }
    pub fn rotation(&self) -> f64 { self.pose.rotation }
    pub fn opacity(&self) -> f64 { self.opacity }

    /// Apply absolute values. Non-finite inputs are ignored.
    pub fn update_transform(&mut self, update: TransformUpdate) {
        if let Some(x) = update.x.filter(|v| v.is_finite()) {
            self.pose.x = x;
        }
        if let Some(y) = update.y.filter(|v| v.is_finite()) {
            self.pose.y = y;
        }
        if let Some(s) = update.scale.filter(|v| v.is_finite()) {
            self.pose.scale = clamp_scale(s);
        }
        if let Some(r) = update.rotation.filter(|v| v.is_finite()) {
            self.pose.rotation = normalize_rotation(r);
        }
    }

    /// Fold a gesture delta into the current pose.
    ///
    /// Drag offsets are added; the scale factor multiplies and the rotation
    /// delta adds. This is the composition done at the call site before
    /// [`update_transform`](Self::update_transform).
    pub fn apply_delta(&mut self, delta: &TransformDelta) {
        let base = self.pose;
        self.apply_delta_from(base, delta);
    }

    /// Like [`apply_delta`](Self::apply_delta), but scale and rotation are
    /// composed against `anchor` (the pose when the gesture baseline was taken)
    /// because pinch values are cumulative since that baseline.
    pub fn apply_delta_from(&mut self, anchor: Pose, delta: &TransformDelta) {
        let mut update = TransformUpdate::default();
        if delta.dx.is_some() || delta.dy.is_some() {
            update.x = Some(self.pose.x + delta.dx.unwrap_or(0.0));
            update.y = Some(self.pose.y + delta.dy.unwrap_or(0.0));
        }
        if let Some(f) = delta.scale_factor {
            update.scale = Some(anchor.scale * f);
        }
        if let Some(r) = delta.rotation_degrees {
            update.rotation = Some(anchor.rotation + r);
        }
        self.update_transform(update);
    }

    /// Slider value 0..=100.
    pub fn update_opacity(&mut self, percent: f64) {
        if percent.is_finite() {
            self.opacity = (percent / 100.0).clamp(0.0, 1.0);
        }
    }

    /// Slider value 10..=300.
    pub fn set_scale_percent(&mut self, percent: f64) {
        self.update_transform(TransformUpdate { scale: Some(percent / 100.0), ..Default::default() });
    }

    pub fn set_rotation_degrees(&mut self, degrees: f64) {
        self.update_transform(TransformUpdate { rotation: Some(degrees), ..Default::default() });
    }

    pub fn opacity_percent(&self) -> u32 {
        (self.opacity * 100.0).round() as u32
    }

    pub fn scale_percent(&self) -> u32 {
        (self.pose.scale * 100.0).round() as u32
    }

    pub fn rotation_degrees_rounded(&self) -> u32 {
        // 359.6 rounds to 360, which reads as 0 on the dial
        (self.pose.rotation.round() as u32) % 360
    }

    /// Back to the default pose; keeps the photo and opacity.
    pub fn reset_overlay(&mut self) {
        self.pose = Pose::default();
        debug!("overlay pose reset");
    }

    /// Drop the photo and return every field to its default.
    pub fn remove_overlay(&mut self) {
        *self = Self::default();
        debug!("overlay removed");
    }

    /// Validate synchronously, then decode on a worker.
    ///
    /// On a validation error nothing is spawned and the state is untouched.
    /// The caller installs the decoded image with [`install_image`](Self::install_image).
    pub fn load_image(&self, file: ImageFile) -> Result<BackgroundTask<OverlayImage>> {
        file.validate()?;
        info!(name = %file.name, mime = %file.mime, size = file.size, "decoding overlay image");
        Ok(BackgroundTask::spawn("decode-overlay", move || decode_image(&file.bytes)))
    }

    /// Put a decoded image in place and reset the pose.
    pub fn install_image(&mut self, image: OverlayImage) {
        info!(width = image.width(), height = image.height(), "overlay image loaded");
        self.image = Some(image);
        self.pose = Pose::default();
    }
}
