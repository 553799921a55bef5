//! Physical camera calibration as reported by the device.
//!
//! A calibration may be absent entirely or only partly filled in; both are
//! normal and select the uncalibrated reconstruction path.
//!
//! Camera space follows the pinhole convention: +X right, +Y down, +Z
//! forward. The lens rotation maps camera space into the device's tracked
//! frame, so it carries the axis change to the device's -Z-forward
//! convention (for a camera looking straight ahead that is a half turn about
//! X).

use crate::error::ConfigError;
use crate::geometry::Pose;
use glam::{Quat, Vec2, Vec3};
use serde::Deserialize;
use std::path::Path;

/// Pinhole intrinsics in pixels of the calibration's reference image.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PinholeIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl PinholeIntrinsics {
    /// Returns `true` when all values are finite and both focal lengths are
    /// non-zero.
    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx.abs() > 1e-6
            && self.fy.abs() > 1e-6
    }

    /// Inverse pinhole projection onto the `z = 1` plane.
    #[inline]
    pub fn pixel_to_normalized(&self, pixel: Vec2) -> Vec2 {
        Vec2::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }
}

/// The physical camera's offset from the device's tracked pose.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LensPose {
    /// Quaternion as `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Translation in meters.
    pub translation: [f32; 3],
}

impl LensPose {
    /// Converts to a rigid pose. Returns `None` for non-finite values or a
    /// rotation that cannot be normalized.
    pub fn to_pose(&self) -> Option<Pose> {
        let q = Quat::from_array(self.rotation);
        let t = Vec3::from(self.translation);
        if !q.is_finite() || !t.is_finite() || q.length_squared() < 1e-12 {
            return None;
        }
        Some(Pose::new(t, q.normalize()))
    }
}

/// Calibration record as supplied by the device settings query.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraCalibration {
    /// Size of the image the intrinsics were measured against.
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub intrinsics: Option<PinholeIntrinsics>,
    #[serde(default)]
    pub lens_pose: Option<LensPose>,
}

impl CameraCalibration {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The usable subset, if every field needed for the calibrated path is
    /// present and well formed.
    pub fn complete(&self) -> Option<CompleteCalibration> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let intrinsics = self.intrinsics.filter(PinholeIntrinsics::is_valid)?;
        let lens = self.lens_pose.as_ref()?.to_pose()?;
        Some(CompleteCalibration {
            width: self.width as f32,
            height: self.height as f32,
            intrinsics,
            lens,
        })
    }
}

/// A calibration with every field validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompleteCalibration {
    pub width: f32,
    pub height: f32,
    pub intrinsics: PinholeIntrinsics,
    pub lens: Pose,
}

impl CompleteCalibration {
    /// Camera-space unit direction through an image UV.
    ///
    /// The UV is scaled by the calibration's own image size, which may differ
    /// from the live frame size.
    pub fn camera_direction(&self, image_uv: Vec2) -> Vec3 {
        let pixel = Vec2::new(image_uv.x * self.width, image_uv.y * self.height);
        let n = self.intrinsics.pixel_to_normalized(pixel);
        Vec3::new(n.x, n.y, 1.0).normalize()
    }
}
