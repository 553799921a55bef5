//! The shared per-session record that the panel renderer and pointer
//! projector write and the hit-test orchestrator reads.
//!
//! Each field has exactly one writer:
//! - `mapping`: the panel renderer ([`AimContext::publish_mapping`]).
//! - `hover`, `pending_ray_uv`, `last_tap_uv`: the pointer projector
//!   ([`AimContext::record_hover`], [`AimContext::record_tap`]).
//!
//! The orchestrator only ever clears `pending_ray_uv`, and does so at the
//! moment it consumes the sample.

use crate::mapping::PanelImageMapping;
use glam::Vec2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AimContext {
    mapping: Option<PanelImageMapping>,
    hover: Option<Vec2>,
    pending_ray_uv: Option<Vec2>,
    last_tap_uv: Option<Vec2>,
}

impl AimContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest letterbox mapping, if any frame has been presented.
    pub fn mapping(&self) -> Option<&PanelImageMapping> {
        self.mapping.as_ref()
    }

    /// Where the pointer is over the panel this tick, in panel UV.
    pub fn hover(&self) -> Option<Vec2> {
        self.hover
    }

    /// The unconsumed hover sample, without consuming it.
    pub fn pending_ray_uv(&self) -> Option<Vec2> {
        self.pending_ray_uv
    }

    pub fn last_tap_uv(&self) -> Option<Vec2> {
        self.last_tap_uv
    }

    pub(crate) fn publish_mapping(&mut self, mapping: PanelImageMapping) {
        self.mapping = Some(mapping);
    }

    /// Writes this tick's hover value. An intersecting hover also becomes the
    /// pending sample, overwriting any unread one.
    pub(crate) fn record_hover(&mut self, uv: Option<Vec2>) {
        self.hover = uv;
        if let Some(uv) = uv {
            self.pending_ray_uv = Some(uv);
        }
    }

    pub(crate) fn record_tap(&mut self, uv: Vec2) {
        self.last_tap_uv = Some(uv);
    }

    /// Consumes the pending sample.
    pub(crate) fn take_pending_ray_uv(&mut self) -> Option<Vec2> {
        self.pending_ray_uv.take()
    }
}
