//! Contract with the platform's asynchronous surface-detection service.

use crate::error::ProbeError;
use crate::geometry::{Pose, Ray};
use glam::Vec3;

/// Opaque token for an outstanding probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeHandle(pub u64);

/// A ray expressed relative to the viewer frame, which is the frame probe
/// requests are defined against.
///
/// `viewer` is the viewer frame's room pose at request time; the service
/// resolves the ray through it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerRelativeRay {
    pub viewer: Pose,
    pub ray: Ray,
}

impl ViewerRelativeRay {
    /// Re-expresses a room-space ray in `viewer`'s frame.
    pub fn from_room(viewer: &Pose, room_ray: &Ray) -> Self {
        Self {
            viewer: *viewer,
            ray: room_ray.transformed(&viewer.inverse()),
        }
    }

    pub fn to_room(&self) -> Ray {
        self.ray.transformed(&self.viewer)
    }
}

/// One detected surface intersection, in room space. The pose's +Y axis is
/// the surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    pub pose: Pose,
}

impl ProbeHit {
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.pose.up()
    }

    /// Whether the pose can anchor anything: finite, with a rotation that
    /// normalizes.
    pub fn is_well_formed(&self) -> bool {
        self.pose.is_finite() && self.pose.orientation.length_squared() > 1e-12
    }
}

/// An asynchronous ray/surface intersection service.
///
/// `request_probe` returns immediately; results are pulled once per tick
/// through `poll_results`. Implementations must accept `cancel` for any
/// handle they issued, including one whose poll just failed.
pub trait SurfaceDetector {
    /// Starts a probe. Fails with [`ProbeError::Unsupported`] when the
    /// session cannot probe at all.
    fn request_probe(&mut self, ray: &ViewerRelativeRay) -> Result<ProbeHandle, ProbeError>;

    /// Results available for `handle` this tick, in the service's order.
    /// An empty list means "not yet".
    fn poll_results(&mut self, handle: ProbeHandle) -> Result<Vec<ProbeHit>, ProbeError>;

    /// Releases the probe's resources.
    fn cancel(&mut self, handle: ProbeHandle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn viewer_relative_ray_round_trips() {
        let viewer = Pose::new(Vec3::new(0.3, 1.6, -0.2), Quat::from_rotation_y(-0.8));
        let room = Ray::new(Vec3::new(0.35, 1.55, -0.25), Vec3::new(0.2, -0.5, -1.0)).unwrap();
        let rel = ViewerRelativeRay::from_room(&viewer, &room);
        let back = rel.to_room();
        assert!((back.origin - room.origin).length() < 1e-5);
        assert!((back.direction() - room.direction()).length() < 1e-5);
    }

    #[test]
    fn degenerate_hit_poses_are_not_well_formed() {
        let ok = ProbeHit {
            pose: Pose::from_position(Vec3::new(0.0, 0.0, -2.0)),
        };
        assert!(ok.is_well_formed());
        let zero = ProbeHit {
            pose: Pose::new(Vec3::new(0.0, 0.0, -2.0), Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)),
        };
        assert!(!zero.is_well_formed());
        let nan = ProbeHit {
            pose: Pose::from_position(Vec3::new(f32::NAN, 0.0, -2.0)),
        };
        assert!(!nan.is_well_formed());
    }

    #[test]
    fn straight_ahead_is_negative_z_in_viewer_frame() {
        let viewer = Pose::new(Vec3::new(2.0, 1.6, 0.0), Quat::from_rotation_y(1.1));
        let room = Ray::new(viewer.position, viewer.forward()).unwrap();
        let rel = ViewerRelativeRay::from_room(&viewer, &room);
        assert!(rel.ray.origin.length() < 1e-5);
        assert!((rel.ray.direction() - Vec3::NEG_Z).length() < 1e-5);
    }
}
