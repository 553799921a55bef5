use glam::{Mat4, Quat, Vec3};
use panel_aim::panel::PanelSurface;
use panel_aim::projector::{PoseSource, TrackedPointer, ViewerState};
use panel_aim::{Handedness, Pose};
use std::time::Duration;

const STANDING_EYE_HEIGHT_M: f32 = 1.6;
const HEAD_FOV_DEG: f32 = 90.0;
/// Controller held low and to the side of the head, in the viewer's frame.
const GRIP_OFFSET: Vec3 = Vec3::new(0.2, -0.35, -0.3);
/// Tracking drops out for this window of every cycle.
const DROPOUT_PERIOD_S: f32 = 7.0;
const DROPOUT_LEN_S: f32 = 0.25;
const TRIGGER_PERIOD_S: f32 = 2.0;
const TRIGGER_HOLD_S: f32 = 0.12;

/// A standing user gently swaying their head while sweeping the designated
/// controller across the panel. The other controller points at the floor
/// with its trigger held.
pub struct ScriptedRig {
    panel: PanelSurface,
    hand: Handedness,
    t: f32,
}

impl ScriptedRig {
    pub fn new(panel: PanelSurface, hand: Handedness) -> Self {
        Self { panel, hand, t: 0.0 }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.t += dt.as_secs_f32();
    }

    fn viewer_pose(&self) -> Pose {
        let yaw = 0.25 * (0.3 * self.t).sin();
        let pitch = -0.1 + 0.05 * (0.2 * self.t).sin();
        Pose::new(
            Vec3::new(0.0, STANDING_EYE_HEIGHT_M, 0.0),
            Quat::from_euler(glam::EulerRot::YXZ, yaw, pitch, 0.0),
        )
    }

    /// Point on the panel the designated hand aims at, in panel-local meters.
    fn sweep_target(&self) -> Vec3 {
        // Slightly overshoots the panel so some ticks miss it.
        let hx = self.panel.width_m * 0.55;
        let hy = self.panel.height_m * 0.55;
        Vec3::new(hx * (0.7 * self.t).sin(), hy * (0.45 * self.t).sin(), 0.0)
    }

    fn aim(origin: Vec3, target: Vec3) -> Quat {
        let (_, rotation, _) = Mat4::look_at_rh(origin, target, Vec3::Y)
            .inverse()
            .to_scale_rotation_translation();
        rotation
    }

    fn tracking_lost(&self) -> bool {
        self.t % DROPOUT_PERIOD_S < DROPOUT_LEN_S && self.t > DROPOUT_LEN_S
    }
}

impl PoseSource for ScriptedRig {
    fn pointer(&self, hand: Handedness) -> Option<TrackedPointer> {
        let viewer = self.viewer_pose();
        if hand != self.hand {
            let origin = viewer.transform_point(GRIP_OFFSET * Vec3::new(-1.0, 1.0, 1.0));
            return Some(TrackedPointer {
                pose: Some(Pose::new(origin, Self::aim(origin, Vec3::new(origin.x, 0.0, origin.z - 0.5)))),
                trigger_pressed: true,
            });
        }
        if self.tracking_lost() {
            return Some(TrackedPointer {
                pose: None,
                trigger_pressed: false,
            });
        }

        let origin = viewer.transform_point(GRIP_OFFSET);
        let target = self
            .panel
            .world_pose(&viewer)
            .transform_point(self.sweep_target());
        Some(TrackedPointer {
            pose: Some(Pose::new(origin, Self::aim(origin, target))),
            trigger_pressed: self.t % TRIGGER_PERIOD_S < TRIGGER_HOLD_S,
        })
    }

    fn viewer(&self) -> Option<ViewerState> {
        Some(ViewerState {
            pose: self.viewer_pose(),
            projection: Mat4::perspective_rh(HEAD_FOV_DEG.to_radians(), 1.0, 0.05, 100.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_aim::config::PanelConfig;
    use panel_aim::projector::ray_panel_uv;
    use panel_aim::Ray;

    fn rig() -> ScriptedRig {
        ScriptedRig::new(PanelSurface::from_config(&PanelConfig::default()), Handedness::Right)
    }

    #[test]
    fn designated_hand_starts_on_the_panel_center() {
        let rig = rig();
        let pose = rig.pointer(Handedness::Right).unwrap().pose.unwrap();
        let viewer = rig.viewer().unwrap().pose;
        let panel = rig.panel.world_pose(&viewer);
        let ray = Ray::new(pose.position, pose.forward()).unwrap();
        let uv = ray_panel_uv(&ray, &panel, rig.panel.width_m, rig.panel.height_m).unwrap();
        assert!((uv - glam::Vec2::splat(0.5)).length() < 1e-3, "{uv}");
    }

    #[test]
    fn tracking_drops_out_periodically() {
        let mut rig = rig();
        rig.advance(Duration::from_secs_f32(7.1));
        assert!(rig.pointer(Handedness::Right).unwrap().pose.is_none());
        rig.advance(Duration::from_secs_f32(0.5));
        assert!(rig.pointer(Handedness::Right).unwrap().pose.is_some());
    }

    #[test]
    fn other_hand_is_always_present() {
        let rig = rig();
        let left = rig.pointer(Handedness::Left).unwrap();
        assert!(left.pose.is_some());
        assert!(left.trigger_pressed);
    }
}
