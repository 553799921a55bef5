//! Panel UV → room-space ray.
//!
//! The pipeline is
//!
//! 1. panel UV → panel pixel,
//! 2. panel pixel → source-image UV (undoing the letterbox, clamped),
//! 3. image UV → ray, through either the physical camera's calibration or,
//!    when that is unavailable, the viewer's own projection.
//!
//! The uncalibrated path treats the capture camera as if it sat at the
//! viewer's eye with the viewer's field of view. Neither is true on real
//! hardware, so rays from that path carry a systematic offset that grows
//! with the camera/eye baseline and the FOV mismatch. It is kept as an
//! explicit approximation until calibration data is available.

use crate::calibration::{CameraCalibration, CompleteCalibration};
use crate::error::ReconstructError;
use crate::geometry::Ray;
use crate::mapping::PanelImageMapping;
use crate::projector::ViewerState;
use glam::{Vec2, Vec3};

/// Room-space ray through the real-world point under a panel sample.
pub type ReconstructedRay = Ray;

/// How image UVs are lifted into rays for this session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayStrategy {
    /// Inverse pinhole through the physical camera.
    Calibrated(CompleteCalibration),
    /// Unproject through the viewer's projection, origin at the viewer.
    Uncalibrated,
}

impl RayStrategy {
    pub fn select(calibration: Option<&CameraCalibration>) -> Self {
        match calibration.and_then(CameraCalibration::complete) {
            Some(complete) => RayStrategy::Calibrated(complete),
            None => RayStrategy::Uncalibrated,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, RayStrategy::Calibrated(_))
    }
}

/// Reconstructs the room-space ray for `panel_uv`.
///
/// This is a pure function of its inputs. An error means "no sample this
/// tick": the caller skips or falls back, it never aborts.
pub fn reconstruct_ray(
    panel_uv: Vec2,
    mapping: Option<&PanelImageMapping>,
    strategy: &RayStrategy,
    viewer: Option<&ViewerState>,
) -> Result<ReconstructedRay, ReconstructError> {
    let mapping = mapping.ok_or(ReconstructError::NoMapping)?;
    let viewer = viewer.ok_or(ReconstructError::NoViewerPose)?;
    if mapping.render_width == 0 || mapping.render_height == 0 {
        return Err(ReconstructError::DegenerateMapping);
    }

    let image_uv = mapping.panel_uv_to_image_uv(panel_uv);

    let (origin, direction) = match strategy {
        RayStrategy::Calibrated(calib) => {
            let camera = viewer.pose.compose(&calib.lens);
            let dir = camera.transform_vector(calib.camera_direction(image_uv));
            (camera.position, dir)
        }
        RayStrategy::Uncalibrated => {
            let ndc = Vec3::new(image_uv.x * 2.0 - 1.0, 1.0 - image_uv.y * 2.0, 0.5);
            // The eye sits at the view-space origin, so any unprojected point
            // on the pixel's line is also its direction.
            let view_point = viewer.projection.inverse().project_point3(ndc);
            (viewer.pose.position, viewer.pose.transform_vector(view_point))
        }
    };

    Ray::new(origin, direction).ok_or(ReconstructError::DegenerateDirection)
}
