//! Wires the components together and runs them once per frame tick.

use crate::calibration::CameraCalibration;
use crate::config::AimConfig;
use crate::context::AimContext;
use crate::error::SessionError;
use crate::marker::Marker;
use crate::orchestrator::{HitTestOrchestrator, Resolution};
use crate::panel::{FrameSource, PanelRenderer, PanelSurface};
use crate::probe::SurfaceDetector;
use crate::projector::{PointerProjector, PoseSource};
use crate::reconstruct::RayStrategy;
use glam::Vec2;
use std::time::Duration;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub frame_presented: bool,
    /// Hover UV written by the projector this tick.
    pub hover: Option<Vec2>,
    /// Set when the marker moved.
    pub resolution: Option<Resolution>,
    /// Whether a probe is outstanding after the tick.
    pub probing: bool,
}

/// One aiming session over a set of external collaborators.
///
/// The calibration is read once, here; it is not re-queried afterwards.
pub struct AimSession<F, P, D>
where
    F: FrameSource,
    P: PoseSource,
    D: SurfaceDetector,
{
    ctx: AimContext,
    panel: PanelRenderer,
    surface: PanelSurface,
    projector: PointerProjector,
    orchestrator: HitTestOrchestrator,
    marker: Marker,
    strategy: RayStrategy,
    frames: F,
    poses: P,
    detector: D,
}

impl<F, P, D> AimSession<F, P, D>
where
    F: FrameSource,
    P: PoseSource,
    D: SurfaceDetector,
{
    pub fn new(
        config: &AimConfig,
        calibration: Option<&CameraCalibration>,
        frames: F,
        poses: P,
        detector: D,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let marker = Marker::new(config)?;
        let strategy = RayStrategy::select(calibration);

        tracing::info!(
            calibrated = strategy.is_calibrated(),
            calibration_present = calibration.is_some(),
            hand = ?config.pointing_hand,
            "Aim session created"
        );
        if calibration.is_some() && !strategy.is_calibrated() {
            tracing::info!("Calibration incomplete; using viewer-projection rays");
        }

        Ok(Self {
            ctx: AimContext::new(),
            panel: PanelRenderer::from_config(&config.panel),
            surface: PanelSurface::from_config(&config.panel),
            projector: PointerProjector::new(config.pointing_hand),
            orchestrator: HitTestOrchestrator::new(config),
            marker,
            strategy,
            frames,
            poses,
            detector,
        })
    }

    /// Runs panel → projector → orchestrator → marker, in that order.
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        let frame = self.frames.latest_frame();
        let before = self.panel.frames_presented();
        self.panel.present(frame.as_ref(), &mut self.ctx);

        let hover = self.projector.tick(&self.poses, &self.surface, &mut self.ctx);

        let viewer = self.poses.viewer();
        let resolution = self.orchestrator.tick(
            dt,
            &mut self.ctx,
            viewer.as_ref(),
            &self.strategy,
            &mut self.detector,
            &mut self.marker,
        );

        TickReport {
            frame_presented: self.panel.frames_presented() > before,
            hover,
            resolution,
            probing: self.orchestrator.is_probing(),
        }
    }

    pub fn context(&self) -> &AimContext {
        &self.ctx
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    pub fn panel(&self) -> &PanelRenderer {
        &self.panel
    }

    pub fn orchestrator(&self) -> &HitTestOrchestrator {
        &self.orchestrator
    }

    pub fn strategy(&self) -> &RayStrategy {
        &self.strategy
    }

    pub fn poses_mut(&mut self) -> &mut P {
        &mut self.poses
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<F, P, D> Drop for AimSession<F, P, D>
where
    F: FrameSource,
    P: PoseSource,
    D: SurfaceDetector,
{
    fn drop(&mut self) {
        self.orchestrator.cancel(&mut self.detector);
    }
}
