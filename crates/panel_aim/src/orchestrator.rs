//! The hit-test state machine: one probe at a time, polled each tick.
//!
//! ```text
//!        pending sample
//!   Idle ──────────────▶ Probing ──┐ hit / timeout / error
//!    ▲                             │ (cancel handle, move marker)
//!    └─────────────────────────────┘
//! ```
//!
//! Hover samples are only read in `Idle`, so a burst of samples arriving
//! while a probe is outstanding collapses to whatever is pending once the
//! probe resolves.

use crate::config::AimConfig;
use crate::context::AimContext;
use crate::error::ProbeError;
use crate::geometry::Ray;
use crate::marker::{Marker, MarkerPose};
use crate::probe::{ProbeHandle, ProbeHit, SurfaceDetector, ViewerRelativeRay};
use crate::projector::ViewerState;
use crate::reconstruct::{reconstruct_ray, RayStrategy, ReconstructedRay};
use std::time::Duration;

/// The single outstanding probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitProbe {
    pub handle: ProbeHandle,
    /// The room-space ray the probe was issued for; reused on fallback.
    pub ray: ReconstructedRay,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ProbeState {
    #[default]
    Idle,
    Probing(HitProbe),
}

/// How a sample ended up moving the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// Anchored to a detected surface.
    SurfaceHit,
    /// No result within the timeout.
    TimedOut,
    /// The session cannot probe.
    Unsupported,
    /// The service rejected or dropped the probe.
    Rejected,
    /// The sample could not be reconstructed; parked along the viewer's gaze.
    NoRay,
}

impl ResolutionKind {
    pub fn is_fallback(self) -> bool {
        !matches!(self, ResolutionKind::SurfaceHit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionKind::SurfaceHit => "surface_hit",
            ResolutionKind::TimedOut => "timed_out",
            ResolutionKind::Unsupported => "unsupported",
            ResolutionKind::Rejected => "rejected",
            ResolutionKind::NoRay => "no_ray",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub kind: ResolutionKind,
    pub marker: MarkerPose,
}

enum PollOutcome {
    Pending,
    Hit(ProbeHit),
    Malformed,
    TimedOut,
    Failed(ProbeError),
}

pub struct HitTestOrchestrator {
    state: ProbeState,
    fallback_distance: f32,
    timeout: Duration,
    probes_issued: u64,
}

impl HitTestOrchestrator {
    pub fn new(config: &AimConfig) -> Self {
        Self::with_policy(config.fallback_distance_m, config.probe_timeout())
    }

    pub fn with_policy(fallback_distance: f32, timeout: Duration) -> Self {
        Self {
            state: ProbeState::Idle,
            fallback_distance,
            timeout,
            probes_issued: 0,
        }
    }

    pub fn state(&self) -> &ProbeState {
        &self.state
    }

    pub fn is_probing(&self) -> bool {
        matches!(self.state, ProbeState::Probing(_))
    }

    pub fn probes_issued(&self) -> u64 {
        self.probes_issued
    }

    /// Advances the state machine by one tick of length `dt`.
    ///
    /// Returns the resolution if the marker moved this tick. Never fails:
    /// every error path ends in either a skipped tick or a fallback
    /// placement.
    pub fn tick(
        &mut self,
        dt: Duration,
        ctx: &mut AimContext,
        viewer: Option<&ViewerState>,
        strategy: &RayStrategy,
        detector: &mut impl SurfaceDetector,
        marker: &mut Marker,
    ) -> Option<Resolution> {
        match self.state {
            ProbeState::Idle => self.start(ctx, viewer, strategy, detector, marker),
            ProbeState::Probing(_) => self.poll(dt, detector, marker),
        }
    }

    /// Drops any outstanding probe, releasing its handle.
    pub fn cancel(&mut self, detector: &mut impl SurfaceDetector) {
        if let ProbeState::Probing(probe) = std::mem::take(&mut self.state) {
            detector.cancel(probe.handle);
            tracing::debug!(handle = probe.handle.0, "Outstanding probe cancelled");
        }
    }

    fn start(
        &mut self,
        ctx: &mut AimContext,
        viewer: Option<&ViewerState>,
        strategy: &RayStrategy,
        detector: &mut impl SurfaceDetector,
        marker: &mut Marker,
    ) -> Option<Resolution> {
        let uv = ctx.take_pending_ray_uv()?;

        let ray = match reconstruct_ray(uv, ctx.mapping(), strategy, viewer) {
            Ok(ray) => ray,
            Err(err) => {
                // Without a sample ray the best remaining guess is the gaze;
                // without a viewer there is nothing to place at all.
                let gaze = viewer.and_then(|v| Ray::new(v.pose.position, v.pose.forward()));
                tracing::debug!(error = %err, u = uv.x, v = uv.y, has_gaze = gaze.is_some(), "Sample not reconstructable");
                return gaze.map(|ray| self.fallback(ResolutionKind::NoRay, &ray, marker));
            }
        };
        // Reconstruction only succeeds with a viewer.
        let viewer = viewer?;

        let request = ViewerRelativeRay::from_room(&viewer.pose, &ray);
        match detector.request_probe(&request) {
            Ok(handle) => {
                self.probes_issued += 1;
                self.state = ProbeState::Probing(HitProbe {
                    handle,
                    ray,
                    elapsed: Duration::ZERO,
                });
                tracing::trace!(handle = handle.0, calibrated = strategy.is_calibrated(), "Probe issued");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "Probe request failed; using fallback placement");
                Some(self.fallback(kind_for(&err), &ray, marker))
            }
        }
    }

    fn poll(
        &mut self,
        dt: Duration,
        detector: &mut impl SurfaceDetector,
        marker: &mut Marker,
    ) -> Option<Resolution> {
        let ProbeState::Probing(probe) = &mut self.state else {
            return None;
        };
        probe.elapsed += dt;
        let probe = *probe;

        let outcome = match detector.poll_results(probe.handle) {
            Ok(hits) => match hits.first() {
                Some(hit) if hit.is_well_formed() => PollOutcome::Hit(*hit),
                Some(_) => PollOutcome::Malformed,
                None if probe.elapsed > self.timeout => PollOutcome::TimedOut,
                None => PollOutcome::Pending,
            },
            Err(err) => PollOutcome::Failed(err),
        };

        let resolution = match outcome {
            PollOutcome::Pending => return None,
            PollOutcome::Hit(hit) => {
                let pose = marker.place_on_surface(&hit);
                tracing::debug!(
                    handle = probe.handle.0,
                    elapsed_ms = probe.elapsed.as_millis() as u64,
                    x = pose.position.x,
                    y = pose.position.y,
                    z = pose.position.z,
                    "Probe hit surface"
                );
                Resolution {
                    kind: ResolutionKind::SurfaceHit,
                    marker: pose,
                }
            }
            PollOutcome::Malformed => {
                tracing::warn!(handle = probe.handle.0, "Probe returned a malformed hit pose; using fallback placement");
                self.fallback(ResolutionKind::Rejected, &probe.ray, marker)
            }
            PollOutcome::TimedOut => {
                tracing::info!(
                    handle = probe.handle.0,
                    elapsed_ms = probe.elapsed.as_millis() as u64,
                    "Probe timed out; using fallback placement"
                );
                self.fallback(ResolutionKind::TimedOut, &probe.ray, marker)
            }
            PollOutcome::Failed(err) => {
                tracing::warn!(handle = probe.handle.0, error = %err, "Probe failed; using fallback placement");
                self.fallback(kind_for(&err), &probe.ray, marker)
            }
        };

        detector.cancel(probe.handle);
        self.state = ProbeState::Idle;
        Some(resolution)
    }

    fn fallback(&self, kind: ResolutionKind, ray: &Ray, marker: &mut Marker) -> Resolution {
        Resolution {
            kind,
            marker: marker.place_fallback(ray, self.fallback_distance),
        }
    }
}

fn kind_for(err: &ProbeError) -> ResolutionKind {
    match err {
        ProbeError::Unsupported => ResolutionKind::Unsupported,
        ProbeError::Rejected(_) | ProbeError::SessionEnded => ResolutionKind::Rejected,
    }
}
