//! Error types. Only [`ConfigError`], [`MarkerError`] and [`SessionError`]
//! can reach a caller; everything else is absorbed inside a tick.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Why a panel sample could not be turned into a room-space ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReconstructError {
    #[error("no panel image mapping has been published yet")]
    NoMapping,
    #[error("viewer pose is unavailable this tick")]
    NoViewerPose,
    #[error("panel image mapping has an empty render rectangle")]
    DegenerateMapping,
    #[error("reconstructed direction is zero or non-finite")]
    DegenerateDirection,
}

/// Failures reported by a surface-detection service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("surface probing is not supported by this session")]
    Unsupported,
    #[error("probe request rejected: {0}")]
    Rejected(String),
    #[error("session ended while a probe was outstanding")]
    SessionEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CanvasError {
    #[error("panel canvas has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
    #[error("panel canvas was never created")]
    Missing,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkerError {
    #[error("marker ring has no drawable surface (inner {inner} m, outer {outer} m)")]
    NoSurface { inner: f32, outer: f32 },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Marker(#[from] MarkerError),
}
