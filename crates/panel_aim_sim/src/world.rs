use glam::{Quat, Vec3};
use panel_aim::error::ProbeError;
use panel_aim::probe::{ProbeHandle, ProbeHit, SurfaceDetector, ViewerRelativeRay};
use panel_aim::{Pose, Ray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// An infinite plane, `normal · p = offset`, that faces along `normal`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let denom = self.normal.dot(ray.direction());
        // Only surfaces facing the ray are detectable.
        if denom > -1e-6 {
            return None;
        }
        let t = (self.offset - self.normal.dot(ray.origin)) / denom;
        (t > 0.0).then_some(t)
    }
}

struct PendingProbe {
    hits: Vec<ProbeHit>,
    polls_left: u32,
}

/// A room made of a floor and a front wall, answering probes after a fixed
/// number of polls. Probes can be rejected at random to exercise the
/// fallback path.
pub struct PlaneWorld {
    planes: Vec<Plane>,
    latency_polls: u32,
    reject_probability: f64,
    supported: bool,
    rng: StdRng,
    next_handle: u64,
    pending: HashMap<ProbeHandle, PendingProbe>,
}

impl PlaneWorld {
    pub fn new(latency_polls: u32, reject_probability: f64, seed: u64) -> Self {
        Self {
            planes: vec![
                Plane {
                    normal: Vec3::Y,
                    offset: 0.0,
                },
                Plane {
                    normal: Vec3::Z,
                    offset: -3.0,
                },
            ],
            latency_polls,
            reject_probability: reject_probability.clamp(0.0, 1.0),
            supported: true,
            rng: StdRng::seed_from_u64(seed),
            next_handle: 1,
            pending: HashMap::new(),
        }
    }

    /// A world whose session cannot probe at all.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(0, 0.0, 0)
        }
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Room-space intersections of `ray`, nearest first.
    pub fn cast(&self, ray: &Ray) -> Vec<ProbeHit> {
        let mut hits: Vec<(f32, Plane)> = self
            .planes
            .iter()
            .filter_map(|plane| plane.intersect(ray).map(|t| (t, *plane)))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter()
            .map(|(t, plane)| ProbeHit {
                pose: Pose::new(ray.at(t), Quat::from_rotation_arc(Vec3::Y, plane.normal)),
            })
            .collect()
    }
}

impl SurfaceDetector for PlaneWorld {
    fn request_probe(&mut self, ray: &ViewerRelativeRay) -> Result<ProbeHandle, ProbeError> {
        if !self.supported {
            return Err(ProbeError::Unsupported);
        }
        let handle = ProbeHandle(self.next_handle);
        self.next_handle += 1;
        let hits = self.cast(&ray.to_room());
        tracing::debug!(handle = handle.0, hits = hits.len(), "Probe accepted");
        self.pending.insert(
            handle,
            PendingProbe {
                hits,
                polls_left: self.latency_polls,
            },
        );
        Ok(handle)
    }

    fn poll_results(&mut self, handle: ProbeHandle) -> Result<Vec<ProbeHit>, ProbeError> {
        let Some(probe) = self.pending.get_mut(&handle) else {
            return Err(ProbeError::SessionEnded);
        };
        if self.rng.gen_bool(self.reject_probability) {
            return Err(ProbeError::Rejected("tracking quality too low".into()));
        }
        if probe.polls_left > 0 {
            probe.polls_left -= 1;
            return Ok(Vec::new());
        }
        // A ray that misses every plane never reports anything.
        Ok(probe.hits.clone())
    }

    fn cancel(&mut self, handle: ProbeHandle) {
        self.pending.remove(&handle);
    }
}
