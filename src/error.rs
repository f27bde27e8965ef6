// src/error.rs
//
// Typed failures for the pose pipeline. Per-frame faults are recovered by
// the session and shown as degraded feedback; only startup failures and
// SessionError end the process.

use crate::classifier::PoseClass;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    #[error("camera read timed out after {0:?}")]
    Timeout(Duration),

    #[error("camera disconnected: {0}")]
    Disconnected(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AngleComputeError {
    #[error("no joint angle could be computed ({missing} required keypoints missing)")]
    NoDefinedAngles { missing: usize },
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier model unavailable: {0}")]
    Unavailable(String),

    #[error("classifier metadata invalid: {0}")]
    Metadata(String),

    #[error("feature layout mismatch: model expects {expected}, pipeline produces {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("classifier inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("no reference pose for '{0}'")]
pub struct ReferenceNotFound(pub PoseClass);

/// Fatal end of a running session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("camera read timed out {attempts} consecutive times")]
    CaptureTimeout { attempts: u32 },

    #[error("capture failed: {0}")]
    CaptureLost(String),
}
