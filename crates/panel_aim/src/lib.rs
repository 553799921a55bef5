// src/lib.rs
//! Aiming at real-world surfaces through a live camera panel.
//!
//! A controller ray hovering over a head-locked camera panel is turned into a
//! room-space ray (through the physical camera's calibration when available,
//! the viewer's projection otherwise), probed against detected surfaces one
//! request at a time, and resolved into a ring marker pose. Every failure
//! path ends in a skipped tick or a fallback placement; nothing escapes
//! [`AimSession::tick`].

pub mod calibration;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod mapping;
pub mod marker;
pub mod orchestrator;
pub mod panel;
pub mod probe;
pub mod projector;
pub mod reconstruct;
pub mod session;

pub use calibration::CameraCalibration;
pub use config::AimConfig;
pub use geometry::{Handedness, Pose, Ray};
pub use session::{AimSession, TickReport};
