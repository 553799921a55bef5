//! The ring-shaped aim marker.

use crate::config::AimConfig;
use crate::error::MarkerError;
use crate::geometry::Ray;
use crate::probe::ProbeHit;
use glam::{Mat3, Mat4, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Where the marker sits. The orientation's local +Y is the surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPose {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: f32,
}

impl MarkerPose {
    pub fn normal(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Rotation for a ring mesh built in its local XY plane (face normal +Z):
    /// a quarter turn about X lays the ring flat on the surface.
    pub fn face_rotation(&self) -> Quat {
        self.orientation * Quat::from_rotation_x(-FRAC_PI_2)
    }

    /// Model matrix for the ring mesh.
    pub fn mesh_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            self.face_rotation(),
            self.position,
        )
    }
}

/// Marker state as read by the renderer: a pose and a visibility flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pose: Option<MarkerPose>,
    visible: bool,
    inner_radius: f32,
    outer_radius: f32,
    surface_offset: f32,
}

impl Marker {
    /// Creates a hidden marker. Fails if the configured radii do not describe
    /// a drawable ring.
    pub fn new(config: &AimConfig) -> Result<Self, MarkerError> {
        let inner = config.marker_inner_radius_m;
        let outer = config.marker_outer_radius_m;
        if !(inner.is_finite() && outer.is_finite() && inner >= 0.0 && outer > inner) {
            return Err(MarkerError::NoSurface { inner, outer });
        }
        Ok(Self {
            pose: None,
            visible: false,
            inner_radius: inner,
            outer_radius: outer,
            surface_offset: config.marker_surface_offset_m,
        })
    }

    pub fn pose(&self) -> Option<&MarkerPose> {
        self.pose.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn radii(&self) -> (f32, f32) {
        (self.inner_radius, self.outer_radius)
    }

    /// Anchors the marker to a detected surface, lifted off it along the
    /// surface normal.
    pub(crate) fn place_on_surface(&mut self, hit: &ProbeHit) -> MarkerPose {
        let pose = MarkerPose {
            position: hit.pose.position + hit.normal() * self.surface_offset,
            orientation: hit.pose.orientation.normalize(),
            scale: 1.0,
        };
        self.show(pose)
    }

    /// Parks the marker `distance` along `ray`, facing back toward the ray
    /// origin.
    pub(crate) fn place_fallback(&mut self, ray: &Ray, distance: f32) -> MarkerPose {
        let up = -ray.direction();
        let (tangent, _) = up.any_orthonormal_pair();
        let bitangent = tangent.cross(up);
        let pose = MarkerPose {
            position: ray.at(distance),
            orientation: Quat::from_mat3(&Mat3::from_cols(tangent, up, bitangent)).normalize(),
            scale: 1.0,
        };
        self.show(pose)
    }

    fn show(&mut self, pose: MarkerPose) -> MarkerPose {
        self.pose = Some(pose);
        self.visible = true;
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pose;

    fn marker() -> Marker {
        Marker::new(&AimConfig::default()).unwrap()
    }

    #[test]
    fn starts_hidden() {
        let m = marker();
        assert!(!m.is_visible());
        assert!(m.pose().is_none());
        assert_eq!(m.radii(), (0.06, 0.08));
    }

    #[test]
    fn rejects_inverted_or_empty_ring() {
        let mut config = AimConfig::default();
        config.marker_inner_radius_m = 0.1;
        config.marker_outer_radius_m = 0.1;
        assert!(matches!(Marker::new(&config), Err(MarkerError::NoSurface { .. })));

        config.marker_outer_radius_m = f32::NAN;
        assert!(Marker::new(&config).is_err());
    }

    #[test]
    fn surface_placement_lifts_along_normal() {
        let mut m = marker();
        // A wall facing +X: rotate +Y onto +X.
        let orientation = Quat::from_rotation_arc(Vec3::Y, Vec3::X);
        let hit = ProbeHit {
            pose: Pose::new(Vec3::new(2.0, 1.0, -3.0), orientation),
        };
        let pose = m.place_on_surface(&hit);
        assert!((pose.position - Vec3::new(2.005, 1.0, -3.0)).length() < 1e-6);
        assert!((pose.normal() - Vec3::X).length() < 1e-6);
        assert!(m.is_visible());
    }

    #[test]
    fn ring_face_matches_surface_normal() {
        let mut m = marker();
        let hit = ProbeHit {
            pose: Pose::new(Vec3::ZERO, Quat::from_rotation_arc(Vec3::Y, Vec3::new(0.0, 0.6, 0.8))),
        };
        let pose = m.place_on_surface(&hit);
        let face = pose.face_rotation() * Vec3::Z;
        assert!((face - hit.normal()).length() < 1e-5);
    }

    #[test]
    fn mesh_matrix_scales_and_places_the_ring() {
        let mut m = marker();
        let hit = ProbeHit {
            pose: Pose::from_position(Vec3::new(1.0, 0.0, -2.0)),
        };
        let pose = m.place_on_surface(&hit);
        let rim = pose.mesh_matrix().transform_point3(Vec3::new(0.08, 0.0, 0.0));
        assert!((rim - Vec3::new(1.08, 0.005, -2.0)).length() < 1e-5);
        // The ring's local +Z maps onto the floor normal.
        let face = pose.mesh_matrix().transform_vector3(Vec3::Z);
        assert!((face - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn fallback_faces_the_ray_origin() {
        let mut m = marker();
        let ray = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.3, -0.4, -1.0)).unwrap();
        let pose = m.place_fallback(&ray, 2.0);
        assert!((pose.position - ray.at(2.0)).length() < 1e-6);
        assert!((pose.normal() + ray.direction()).length() < 1e-5);
        assert!((pose.orientation.length() - 1.0).abs() < 1e-5);
    }
}
