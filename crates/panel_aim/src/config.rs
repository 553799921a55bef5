//! Policy constants for the aiming pipeline.
//!
//! Every field has a default, so a config file only needs to name the values
//! it overrides:
//!
//! ```json
//! { "fallback_distance_m": 3.0, "pointing_hand": "left" }
//! ```

use crate::error::ConfigError;
use crate::geometry::Handedness;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AimConfig {
    /// Distance along the ray at which the marker is parked when no surface
    /// is resolved.
    pub fallback_distance_m: f32,
    /// How long a probe may stay unresolved before falling back.
    pub probe_timeout_ms: u64,
    pub marker_inner_radius_m: f32,
    pub marker_outer_radius_m: f32,
    /// Lift along the surface normal that keeps the marker out of the
    /// surface's depth.
    pub marker_surface_offset_m: f32,
    /// The only hand whose pointer drives the panel.
    pub pointing_hand: Handedness,
    pub panel: PanelConfig,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            fallback_distance_m: 2.0,
            probe_timeout_ms: 400,
            marker_inner_radius_m: 0.06,
            marker_outer_radius_m: 0.08,
            marker_surface_offset_m: 0.005,
            pointing_hand: Handedness::Right,
            panel: PanelConfig::default(),
        }
    }
}

/// Size and placement of the head-locked live panel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    /// Backing canvas size in pixels.
    pub canvas_width_px: u32,
    pub canvas_height_px: u32,
    /// Physical size of the panel quad in meters.
    pub width_m: f32,
    pub height_m: f32,
    /// Panel center relative to the viewer, in the viewer's frame.
    pub head_offset_m: [f32; 3],
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            canvas_width_px: 1280,
            canvas_height_px: 1280,
            width_m: 0.6,
            height_m: 0.6,
            head_offset_m: [0.0, 0.0, -1.0],
        }
    }
}

impl AimConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[inline]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.fallback_distance_m.is_finite() && self.fallback_distance_m > 0.0) {
            return invalid(format!(
                "fallback_distance_m must be positive, got {}",
                self.fallback_distance_m
            ));
        }
        if self.probe_timeout_ms == 0 {
            return invalid("probe_timeout_ms must be non-zero".into());
        }
        if !(self.marker_surface_offset_m.is_finite() && self.marker_surface_offset_m >= 0.0) {
            return invalid(format!(
                "marker_surface_offset_m must be non-negative, got {}",
                self.marker_surface_offset_m
            ));
        }
        let p = &self.panel;
        if p.canvas_width_px == 0 || p.canvas_height_px == 0 {
            return invalid(format!(
                "panel canvas must be non-empty, got {}x{}",
                p.canvas_width_px, p.canvas_height_px
            ));
        }
        if !(p.width_m.is_finite() && p.width_m > 0.0 && p.height_m.is_finite() && p.height_m > 0.0)
        {
            return invalid(format!(
                "panel size must be positive, got {}x{} m",
                p.width_m, p.height_m
            ));
        }
        if p.head_offset_m.iter().any(|c| !c.is_finite()) {
            return invalid("panel head_offset_m must be finite".into());
        }
        // Ring radii are checked by `Marker::new`, which owns that precondition.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AimConfig::default();
        config.validate().unwrap();
        assert_eq!(config.probe_timeout(), Duration::from_millis(400));
        assert_eq!(config.fallback_distance_m, 2.0);
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let config = AimConfig::from_json_str(
            r#"{ "fallback_distance_m": 3.5, "pointing_hand": "left", "panel": { "width_m": 0.8 } }"#,
        )
        .unwrap();
        assert_eq!(config.fallback_distance_m, 3.5);
        assert_eq!(config.pointing_hand, Handedness::Left);
        assert_eq!(config.panel.width_m, 0.8);
        assert_eq!(config.panel.canvas_width_px, 1280);
        assert_eq!(config.probe_timeout_ms, 400);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = AimConfig::from_json_str(r#"{ "fallback_distance": 3.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_timeout_and_empty_canvas() {
        let err = AimConfig::from_json_str(r#"{ "probe_timeout_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AimConfig::from_json_str(r#"{ "panel": { "canvas_height_px": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
