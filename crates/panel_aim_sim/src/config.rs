use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Above this the tick period no longer fits the timer's resolution.
const MAX_TICK_RATE_HZ: f64 = 10_000.0;

/// `panel_aim_sim` - A headless driver for the panel aiming pipeline.
///
/// This process runs the aiming session's tick loop against a synthetic
/// camera, a scripted head and controller rig, and a plane-based surface
/// detector with configurable latency and failure rate.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// JSON file overriding the pipeline's policy constants.
    ///
    /// Any field left out keeps its default (2 m fallback distance, 400 ms
    /// probe timeout, right-hand pointing).
    #[arg(long, env = "AIM_CONFIG_PATH")]
    pub aim_config: Option<PathBuf>,

    /// JSON file with the physical camera's calibration.
    ///
    /// Without it, or with an incomplete record, rays are reconstructed
    /// through the viewer's projection instead.
    #[arg(long, env = "AIM_CALIBRATION_PATH")]
    pub calibration: Option<PathBuf>,

    /// Simulated display refresh rate.
    #[arg(long, env = "SIM_TICK_RATE_HZ", default_value_t = 72.0)]
    pub tick_rate_hz: f64,

    /// Stop after this many ticks. Runs until Ctrl-C when unset.
    #[arg(long, env = "SIM_TICKS")]
    pub ticks: Option<u64>,

    /// Listen address for the Prometheus metrics endpoint. Disabled when unset.
    #[arg(long, env = "SIM_METRICS_LISTEN_ADDR")]
    pub metrics_listen_addr: Option<SocketAddr>,

    /// Polls before the detector answers a probe.
    #[arg(long, default_value_t = 6)]
    pub probe_latency_polls: u32,

    /// Chance that the detector rejects an outstanding probe.
    #[arg(long, default_value_t = 0.05)]
    pub reject_probability: f64,

    /// Make the detector report that surface probing is unsupported.
    #[arg(long)]
    pub no_probe_support: bool,

    /// Deliver a camera frame every N ticks.
    #[arg(long, default_value_t = 3)]
    pub frame_every: u32,

    #[arg(long, default_value_t = 1280)]
    pub frame_width: u32,

    #[arg(long, default_value_t = 720)]
    pub frame_height: u32,

    /// Seed for the detector's failure injection.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.tick_rate_hz.is_finite()
                && self.tick_rate_hz > 0.0
                && self.tick_rate_hz <= MAX_TICK_RATE_HZ,
            "tick rate must be within (0, {}] Hz, got {}",
            MAX_TICK_RATE_HZ,
            self.tick_rate_hz
        );
        anyhow::ensure!(!self.tick_period().is_zero(), "tick period rounds to zero");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.reject_probability),
            "reject probability must be within [0, 1], got {}",
            self.reject_probability
        );
        anyhow::ensure!(self.frame_every > 0, "frame_every must be at least 1");
        Ok(())
    }

    /// Interval between ticks. Only meaningful after [`Config::validate`].
    pub fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.tick_rate_hz).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("panel_aim_sim").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]);
        config.validate().unwrap();
        assert_eq!(config.tick_period(), Duration::from_secs_f64(1.0 / 72.0));
    }

    #[test]
    fn absurd_tick_rate_is_rejected_before_the_timer_sees_it() {
        assert!(parse(&["--tick-rate-hz", "1e10"]).validate().is_err());
        assert!(parse(&["--tick-rate-hz", "0"]).validate().is_err());
        assert!(parse(&["--tick-rate-hz", "inf"]).validate().is_err());
        parse(&["--tick-rate-hz", "10000"]).validate().unwrap();
    }
}
