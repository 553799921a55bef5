use glam::{Mat4, Quat, Vec2, Vec3};
use image::{Rgba, RgbaImage};
use panel_aim::calibration::{LensPose, PinholeIntrinsics};
use panel_aim::error::ProbeError;
use panel_aim::orchestrator::ResolutionKind;
use panel_aim::panel::FrameSource;
use panel_aim::probe::{ProbeHandle, ProbeHit, SurfaceDetector, ViewerRelativeRay};
use panel_aim::projector::{PoseSource, TrackedPointer, ViewerState};
use panel_aim::{AimConfig, AimSession, CameraCalibration, Handedness, Pose};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const DT: Duration = Duration::from_millis(14);

/// Delivers one 1920x1080 frame on the first call, then nothing.
struct OneFrame(Option<RgbaImage>);

impl OneFrame {
    fn new() -> Self {
        Self(Some(RgbaImage::from_pixel(1920, 1080, Rgba([90, 120, 150, 255]))))
    }
}

impl FrameSource for OneFrame {
    fn latest_frame(&mut self) -> Option<RgbaImage> {
        self.0.take()
    }
}

struct Rig {
    viewer: Option<Pose>,
    hand: Handedness,
    target: Vec3,
    tracked: bool,
}

impl Rig {
    fn aiming_at(target: Vec3) -> Self {
        Self {
            viewer: Some(Pose::IDENTITY),
            hand: Handedness::Right,
            target,
            tracked: true,
        }
    }
}

impl PoseSource for Rig {
    fn pointer(&self, hand: Handedness) -> Option<TrackedPointer> {
        if hand != self.hand {
            return None;
        }
        let origin = Vec3::new(0.15, -0.25, -0.3);
        let (_, orientation, _) = Mat4::look_at_rh(origin, self.target, Vec3::Y)
            .inverse()
            .to_scale_rotation_translation();
        Some(TrackedPointer {
            pose: self.tracked.then(|| Pose::new(origin, orientation)),
            trigger_pressed: false,
        })
    }

    fn viewer(&self) -> Option<ViewerState> {
        self.viewer.map(|pose| ViewerState {
            pose,
            projection: Mat4::perspective_rh(80f32.to_radians(), 1.0, 0.05, 50.0),
        })
    }
}

#[derive(Default)]
struct DetectorLog {
    requests: Vec<ViewerRelativeRay>,
    polls: u32,
    cancelled: Vec<ProbeHandle>,
}

/// Answers every probe with a floor hit after `latency_polls` polls, or never
/// if `latency_polls` is `None`.
struct DelayedFloor {
    latency_polls: Option<u32>,
    waited: u32,
    log: Rc<RefCell<DetectorLog>>,
}

impl DelayedFloor {
    fn new(latency_polls: Option<u32>) -> (Self, Rc<RefCell<DetectorLog>>) {
        let log = Rc::new(RefCell::new(DetectorLog::default()));
        (
            Self {
                latency_polls,
                waited: 0,
                log: log.clone(),
            },
            log,
        )
    }
}

impl SurfaceDetector for DelayedFloor {
    fn request_probe(&mut self, ray: &ViewerRelativeRay) -> Result<ProbeHandle, ProbeError> {
        let mut log = self.log.borrow_mut();
        log.requests.push(*ray);
        self.waited = 0;
        Ok(ProbeHandle(log.requests.len() as u64))
    }

    fn poll_results(&mut self, _handle: ProbeHandle) -> Result<Vec<ProbeHit>, ProbeError> {
        self.log.borrow_mut().polls += 1;
        self.waited += 1;
        match self.latency_polls {
            Some(latency) if self.waited >= latency => Ok(vec![ProbeHit {
                pose: Pose::from_position(Vec3::new(0.0, -1.6, -2.5)),
            }]),
            _ => Ok(Vec::new()),
        }
    }

    fn cancel(&mut self, handle: ProbeHandle) {
        self.log.borrow_mut().cancelled.push(handle);
    }
}

fn calibration() -> CameraCalibration {
    CameraCalibration {
        width: 1920,
        height: 1080,
        intrinsics: Some(PinholeIntrinsics {
            fx: 1400.0,
            fy: 1400.0,
            cx: 960.0,
            cy: 540.0,
        }),
        lens_pose: Some(LensPose {
            rotation: [1.0, 0.0, 0.0, 0.0],
            translation: [0.0, -0.03, -0.05],
        }),
    }
}

#[test]
fn hover_to_surface_hit() {
    let (detector, log) = DelayedFloor::new(Some(2));
    let mut session = AimSession::new(
        &AimConfig::default(),
        None,
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0)),
        detector,
    )
    .unwrap();
    assert!(!session.strategy().is_calibrated());

    let first = session.tick(DT);
    assert!(first.frame_presented);
    let hover = first.hover.unwrap();
    assert!((hover - Vec2::splat(0.5)).length() < 1e-4, "{hover}");
    assert!(first.probing);
    assert_eq!(log.borrow().requests.len(), 1);

    let mapping = session.context().mapping().copied().unwrap();
    assert_eq!((mapping.render_width, mapping.render_height), (1280, 720));

    let second = session.tick(DT);
    assert!(!second.frame_presented);
    assert!(second.resolution.is_none());

    let third = session.tick(DT);
    let res = third.resolution.unwrap();
    assert_eq!(res.kind, ResolutionKind::SurfaceHit);
    assert!((res.marker.position - Vec3::new(0.0, -1.595, -2.5)).length() < 1e-5);
    assert!(session.marker().is_visible());
    assert_eq!(log.borrow().cancelled, vec![ProbeHandle(1)]);

    // Still hovering: the next idle tick issues a fresh probe.
    let fourth = session.tick(DT);
    assert!(fourth.probing);
    assert_eq!(log.borrow().requests.len(), 2);
}

#[test]
fn silent_detector_times_out_to_fallback() {
    let (detector, log) = DelayedFloor::new(None);
    let config = AimConfig::default();
    let mut session = AimSession::new(
        &config,
        None,
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0)),
        detector,
    )
    .unwrap();

    session.tick(DT);
    let mut resolutions = Vec::new();
    // 400 ms at 14 ms per tick resolves on the 29th poll (406 ms).
    for _ in 0..29 {
        if let Some(res) = session.tick(DT).resolution {
            resolutions.push(res);
        }
    }
    assert_eq!(resolutions.len(), 1);
    let res = resolutions[0];
    assert_eq!(res.kind, ResolutionKind::TimedOut);
    // Uncalibrated, viewer at the origin, sample at the image center.
    assert!((res.marker.position - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-3);
    assert_eq!(log.borrow().polls, 29);
    assert_eq!(log.borrow().cancelled.len(), 1);
}

#[test]
fn calibrated_session_probes_from_the_camera() {
    let (detector, log) = DelayedFloor::new(None);
    let session_calibration = calibration();
    let mut session = AimSession::new(
        &AimConfig::default(),
        Some(&session_calibration),
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0)),
        detector,
    )
    .unwrap();
    assert!(session.strategy().is_calibrated());

    session.tick(DT);
    let request = log.borrow().requests[0];
    let room = request.to_room();
    assert!((room.origin - Vec3::new(0.0, -0.03, -0.05)).length() < 1e-5);
    assert!((room.direction() - Vec3::NEG_Z).length() < 1e-3);
}

#[test]
fn lost_tracking_keeps_the_last_hover() {
    let (detector, _log) = DelayedFloor::new(None);
    let mut session = AimSession::new(
        &AimConfig::default(),
        None,
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.1, 0.1, -1.0)),
        detector,
    )
    .unwrap();
    let hover = session.tick(DT).hover;
    assert!(hover.is_some());

    session.poses_mut().tracked = false;
    let report = session.tick(DT);
    assert!(report.hover.is_none());
    assert_eq!(session.context().hover(), hover);
}

#[test]
fn only_the_configured_hand_drives_the_panel() {
    let (detector, log) = DelayedFloor::new(Some(1));
    let config = AimConfig::from_json_str(r#"{ "pointing_hand": "left" }"#).unwrap();
    let mut session = AimSession::new(
        &config,
        None,
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0)),
        detector,
    )
    .unwrap();
    for _ in 0..5 {
        let report = session.tick(DT);
        assert!(report.hover.is_none());
        assert!(report.resolution.is_none());
    }
    assert!(log.borrow().requests.is_empty());
    assert!(!session.marker().is_visible());
}

#[test]
fn dropping_the_session_cancels_the_outstanding_probe() {
    let (detector, log) = DelayedFloor::new(None);
    let mut session = AimSession::new(
        &AimConfig::default(),
        None,
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0)),
        detector,
    )
    .unwrap();
    session.tick(DT);
    assert!(session.orchestrator().is_probing());
    drop(session);
    assert_eq!(log.borrow().cancelled, vec![ProbeHandle(1)]);
}

#[test]
fn undrawable_marker_is_an_initialization_error() {
    let (detector, _log) = DelayedFloor::new(None);
    let mut config = AimConfig::default();
    config.marker_outer_radius_m = 0.01;
    let result = AimSession::new(
        &config,
        None,
        OneFrame::new(),
        Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0)),
        detector,
    );
    assert!(result.is_err());
}

#[test]
fn viewer_rotation_is_carried_into_the_request() {
    let (detector, log) = DelayedFloor::new(None);
    let mut rig = Rig::aiming_at(Vec3::new(0.0, 0.0, -1.0));
    let viewer = Pose::new(Vec3::new(0.0, 1.7, 0.0), Quat::from_rotation_y(0.6));
    rig.viewer = Some(viewer);
    // The panel follows the head, so re-aim at its new center.
    rig.target = viewer.transform_point(Vec3::new(0.0, 0.0, -1.0));
    let mut session =
        AimSession::new(&AimConfig::default(), None, OneFrame::new(), rig, detector).unwrap();

    // The pointer origin is fixed in room space; it must still face the panel.
    let report = session.tick(DT);
    assert!(report.hover.is_some());
    let request = log.borrow().requests[0];
    assert_eq!(request.viewer, viewer);
    assert!((request.to_room().direction() - viewer.forward()).length() < 1e-3);
}
