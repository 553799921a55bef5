//! Projects the designated controller's pointing ray onto the live panel.

use crate::context::AimContext;
use crate::geometry::{Handedness, Pose, Ray};
use crate::panel::PanelSurface;
use glam::{Mat4, Vec2};

/// A tracked pointing device as seen on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPointer {
    /// `None` while the runtime has lost tracking.
    pub pose: Option<Pose>,
    pub trigger_pressed: bool,
}

/// The viewer's rendering eye: pose in room space plus its projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    pub pose: Pose,
    pub projection: Mat4,
}

/// Per-tick tracking data from the runtime.
pub trait PoseSource {
    /// The pointing device held in `hand`, or `None` if no such device is
    /// connected.
    fn pointer(&self, hand: Handedness) -> Option<TrackedPointer>;
    fn viewer(&self) -> Option<ViewerState>;
}

/// Turns one hand's pointer into hover and tap samples on the panel.
///
/// Only the configured hand is ever queried; the other hand cannot move the
/// cursor.
#[derive(Debug, Clone)]
pub struct PointerProjector {
    hand: Handedness,
    trigger_was_pressed: bool,
}

impl PointerProjector {
    pub fn new(hand: Handedness) -> Self {
        Self {
            hand,
            trigger_was_pressed: false,
        }
    }

    /// Samples the pointer once. Returns the hover UV written this tick.
    ///
    /// When the viewer or the pointer is untracked the tick is skipped
    /// without touching `ctx`, so the last hover survives short dropouts.
    pub fn tick(
        &mut self,
        poses: &impl PoseSource,
        panel: &PanelSurface,
        ctx: &mut AimContext,
    ) -> Option<Vec2> {
        let Some(viewer) = poses.viewer() else {
            tracing::trace!("Viewer untracked; skipping pointer sample");
            return None;
        };
        let pointer = poses.pointer(self.hand)?;
        let Some(pose) = pointer.pose else {
            tracing::trace!(hand = ?self.hand, "Pointer untracked; skipping pointer sample");
            return None;
        };
        let ray = Ray::new(pose.position, pose.forward())?;

        let panel_pose = panel.world_pose(&viewer.pose);
        let uv = ray_panel_uv(&ray, &panel_pose, panel.width_m, panel.height_m);
        ctx.record_hover(uv);

        let pressed_now = pointer.trigger_pressed && !self.trigger_was_pressed;
        self.trigger_was_pressed = pointer.trigger_pressed;
        if pressed_now {
            if let Some(uv) = uv {
                ctx.record_tap(uv);
            }
        }

        uv
    }
}

/// Intersects `ray` with a `width` x `height` quad centered on `panel`'s
/// local XY plane. The result is a UV with `(0, 0)` at the top-left corner.
pub fn ray_panel_uv(ray: &Ray, panel: &Pose, width: f32, height: f32) -> Option<Vec2> {
    let to_local = panel.inverse();
    let origin = to_local.transform_point(ray.origin);
    let dir = to_local.transform_vector(ray.direction());

    if dir.z.abs() < 1e-6 {
        return None;
    }
    let t = -origin.z / dir.z;
    if t < 0.0 {
        return None;
    }

    let hit = origin + dir * t;
    let (hw, hh) = (width * 0.5, height * 0.5);
    if hit.x < -hw || hit.x > hw || hit.y < -hh || hit.y > hh {
        return None;
    }

    // Panel +Y is up; UV V grows downward like image rows.
    Some(Vec2::new((hit.x + hw) / width, (hh - hit.y) / height))
}
