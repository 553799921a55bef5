use axum::{http::StatusCode, routing::get, Router};
use panel_aim::orchestrator::ResolutionKind;
use panel_aim::TickReport;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct SimMetrics {
    pub registry: Registry,
    pub ticks_total: IntCounter,
    pub frames_presented_total: IntCounter,
    pub hover_ticks_total: IntCounter,
    pub resolutions_total: IntCounterVec,
    pub fallbacks_total: IntCounter,
    pub probes_issued_total: IntCounter,
    pub marker_x: Gauge,
    pub marker_y: Gauge,
    pub marker_z: Gauge,
}

impl SimMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("panel_aim_sim".into()), None)?;

        macro_rules! reg {
            ($m:expr) => {{
                let m = $m;
                registry.register(Box::new(m.clone()))?;
                m
            }};
        }

        Ok(Self {
            ticks_total: reg!(IntCounter::new("ticks_total", "Session ticks run")?),
            frames_presented_total: reg!(IntCounter::new(
                "frames_presented_total",
                "Camera frames drawn into the panel"
            )?),
            hover_ticks_total: reg!(IntCounter::new(
                "hover_ticks_total",
                "Ticks on which the pointer hovered the panel"
            )?),
            resolutions_total: reg!(IntCounterVec::new(
                Opts::new("resolutions_total", "Marker placements by outcome"),
                &["kind"]
            )?),
            fallbacks_total: reg!(IntCounter::new(
                "fallbacks_total",
                "Marker placements that did not land on a detected surface"
            )?),
            probes_issued_total: reg!(IntCounter::new(
                "probes_issued_total",
                "Surface probes issued"
            )?),
            marker_x: reg!(Gauge::new("marker_x", "Marker X position (m)")?),
            marker_y: reg!(Gauge::new("marker_y", "Marker Y position (m)")?),
            marker_z: reg!(Gauge::new("marker_z", "Marker Z position (m)")?),
            registry,
        })
    }

    /// `probes_issued` is the session's running total; the counter is
    /// advanced by whatever it has not seen yet.
    pub fn record_tick(&self, report: &TickReport, probes_issued: u64) {
        self.ticks_total.inc();
        if report.frame_presented {
            self.frames_presented_total.inc();
        }
        if report.hover.is_some() {
            self.hover_ticks_total.inc();
        }
        if let Some(res) = report.resolution {
            self.resolutions_total
                .with_label_values(&[res.kind.as_str()])
                .inc();
            if res.kind.is_fallback() {
                self.fallbacks_total.inc();
            }
            self.marker_x.set(res.marker.position.x as f64);
            self.marker_y.set(res.marker.position.y as f64);
            self.marker_z.set(res.marker.position.z as f64);
        }
        self.probes_issued_total
            .inc_by(probes_issued.saturating_sub(self.probes_issued_total.get()));
    }

    pub fn resolutions(&self, kind: ResolutionKind) -> u64 {
        self.resolutions_total
            .with_label_values(&[kind.as_str()])
            .get()
    }

    pub fn router(&self) -> Router {
        let reg = self.registry.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let reg = reg.clone();
                async move {
                    let mut buf = Vec::new();
                    TextEncoder::new()
                        .encode(&reg.gather(), &mut buf)
                        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
                    String::from_utf8(buf)
                        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
                }
            }),
        )
    }
}
