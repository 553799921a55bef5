mod camera;
mod config;
mod metrics;
mod rig;
mod world;

use crate::camera::SyntheticCamera;
use crate::config::Config;
use crate::metrics::SimMetrics;
use crate::rig::ScriptedRig;
use crate::world::PlaneWorld;
use anyhow::Context;
use clap::Parser;
use panel_aim::orchestrator::ResolutionKind;
use panel_aim::panel::PanelSurface;
use panel_aim::{AimConfig, AimSession, CameraCalibration};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
    let config = Config::parse();
    config.validate()?;
    tracing::info!(config = ?config, "Simulator starting with configuration");

    let aim_config = match &config.aim_config {
        Some(path) => AimConfig::from_json_file(path)
            .with_context(|| format!("loading aim config {}", path.display()))?,
        None => AimConfig::default(),
    };
    let calibration = config
        .calibration
        .as_ref()
        .map(|path| {
            CameraCalibration::from_json_file(path)
                .with_context(|| format!("loading calibration {}", path.display()))
        })
        .transpose()?;

    let metrics = SimMetrics::new()?;

    // --- 2. Start Metrics Server ---
    if let Some(addr) = config.metrics_listen_addr {
        let router = metrics.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics listener on {addr}"))?;
        tracing::info!(addr = %addr, "Metrics server started");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service()).await {
                tracing::error!(error = %e, "Metrics server exited with an error.");
            }
        });
    }

    // --- 3. Build the session ---
    let camera = SyntheticCamera::new(config.frame_width, config.frame_height, config.frame_every);
    let rig = ScriptedRig::new(
        PanelSurface::from_config(&aim_config.panel),
        aim_config.pointing_hand,
    );
    let world = if config.no_probe_support {
        PlaneWorld::unsupported()
    } else {
        PlaneWorld::new(
            config.probe_latency_polls,
            config.reject_probability,
            config.seed,
        )
    };
    let mut session = AimSession::new(&aim_config, calibration.as_ref(), camera, rig, world)?;

    // --- 4. Main Tick Loop ---
    let mut interval = tokio::time::interval(config.tick_period());
    let mut last_tick = Instant::now();
    let mut ticks: u64 = 0;

    tracing::info!("Starting tick loop...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received.");
                break;
            },
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick);
                last_tick = now;

                session.poses_mut().advance(dt);
                let report = session.tick(dt);
                metrics.record_tick(&report, session.orchestrator().probes_issued());

                if let Some(res) = report.resolution {
                    tracing::debug!(
                        kind = res.kind.as_str(),
                        x = res.marker.position.x,
                        y = res.marker.position.y,
                        z = res.marker.position.z,
                        "Marker placed"
                    );
                }

                ticks += 1;
                if config.ticks.is_some_and(|limit| ticks >= limit) {
                    break;
                }
            }
        }
    }

    tracing::info!(
        ticks,
        frames = session.panel().frames_presented(),
        probes = session.orchestrator().probes_issued(),
        surface_hits = metrics.resolutions(ResolutionKind::SurfaceHit),
        fallbacks = metrics.fallbacks_total.get(),
        timed_out = metrics.resolutions(ResolutionKind::TimedOut),
        rejected = metrics.resolutions(ResolutionKind::Rejected),
        unsupported = metrics.resolutions(ResolutionKind::Unsupported),
        outstanding = session.detector().outstanding(),
        "Simulator shutting down."
    );
    Ok(())
}
