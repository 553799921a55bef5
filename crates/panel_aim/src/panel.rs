//! The head-locked live panel: its backing canvas and its place in the room.

use crate::config::PanelConfig;
use crate::context::AimContext;
use crate::error::CanvasError;
use crate::geometry::Pose;
use crate::mapping::PanelImageMapping;
use glam::Vec3;
use image::{imageops, Rgba, RgbaImage};

/// Pull-based source of camera frames.
pub trait FrameSource {
    /// The newest frame captured since the last call, or `None` if nothing
    /// new has arrived. Must not block.
    fn latest_frame(&mut self) -> Option<RgbaImage>;
}

const LETTERBOX_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Copies camera frames into a fixed-size canvas and publishes the
/// [`PanelImageMapping`] for each one.
pub struct PanelRenderer {
    canvas: Option<RgbaImage>,
    width: u32,
    height: u32,
    frames_presented: u64,
}

impl PanelRenderer {
    /// Allocates the backing canvas. A zero-sized canvas is tolerated here and
    /// reported on every subsequent present instead.
    pub fn new(width: u32, height: u32) -> Self {
        let canvas = if width > 0 && height > 0 {
            Some(RgbaImage::from_pixel(width, height, LETTERBOX_FILL))
        } else {
            tracing::warn!(width, height, "Panel canvas could not be created");
            None
        };
        Self {
            canvas,
            width,
            height,
            frames_presented: 0,
        }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(config.canvas_width_px, config.canvas_height_px)
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Draws `frame` (if any) and publishes its mapping into `ctx`.
    ///
    /// Without a new frame the previous image and mapping stay in place.
    /// Canvas failures are logged and skipped; they never reach the caller.
    pub fn present(&mut self, frame: Option<&RgbaImage>, ctx: &mut AimContext) {
        let Some(frame) = frame else { return };
        if let Err(err) = self.try_present(frame, ctx) {
            tracing::warn!(error = %err, "Skipping panel update");
        }
    }

    fn try_present(
        &mut self,
        frame: &RgbaImage,
        ctx: &mut AimContext,
    ) -> Result<PanelImageMapping, CanvasError> {
        let canvas = self.canvas.as_mut().ok_or(CanvasError::Missing)?;
        let mapping =
            PanelImageMapping::letterbox(frame.dimensions(), (self.width, self.height))
                .ok_or(CanvasError::ZeroArea {
                    width: frame.width(),
                    height: frame.height(),
                })?;

        for px in canvas.pixels_mut() {
            *px = LETTERBOX_FILL;
        }

        let scaled = if frame.dimensions() == (mapping.render_width, mapping.render_height) {
            frame.clone()
        } else {
            imageops::resize(
                frame,
                mapping.render_width,
                mapping.render_height,
                imageops::FilterType::Triangle,
            )
        };
        imageops::replace(
            canvas,
            &scaled,
            i64::from(mapping.offset_x),
            i64::from(mapping.offset_y),
        );

        ctx.publish_mapping(mapping);
        self.frames_presented += 1;
        Ok(mapping)
    }
}

/// The panel quad as a physical object: a `width_m` x `height_m` rectangle in
/// its local XY plane, facing +Z, held at a fixed pose relative to the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSurface {
    pub width_m: f32,
    pub height_m: f32,
    /// Panel pose in the viewer's frame.
    pub head_offset: Pose,
}

impl PanelSurface {
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            width_m: config.width_m,
            height_m: config.height_m,
            head_offset: Pose::from_position(Vec3::from(config.head_offset_m)),
        }
    }

    /// Where the panel is in the room for a given viewer pose.
    pub fn world_pose(&self, viewer: &Pose) -> Pose {
        viewer.compose(&self.head_offset)
    }
}
