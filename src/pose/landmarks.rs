// src/pose/landmarks.rs
//
// Frame → Skeleton. The extractor never fails: model errors and poor
// visibility both come back as Extraction::Incomplete so one bad frame
// cannot stop the session.

use super::skeleton::{Keypoint, KeypointKind, Skeleton, KEYPOINT_COUNT};
use crate::inference::InferenceEngine;
use crate::preprocessing::{input_shape, preprocess};
use crate::types::{Frame, LandmarkConfig};
use anyhow::{bail, Result};
use tracing::debug;

/// Values per keypoint in the model output: (y, x, score).
const VALUES_PER_KEYPOINT: usize = 3;

/// Produces raw keypoints for the single most prominent person in a frame.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Keypoint>>;
}

/// MoveNet-style single-person model: output holds 17 rows of
/// (y, x, score), coordinates normalized to the input image.
pub struct OnnxPoseDetector {
    engine: InferenceEngine,
    config: LandmarkConfig,
}

impl OnnxPoseDetector {
    pub fn new(config: LandmarkConfig) -> Result<Self> {
        let engine = InferenceEngine::new(
            &config.model_path,
            &config.input_name,
            config.num_threads,
            config.use_cuda,
        )?;
        Ok(Self { engine, config })
    }
}

impl LandmarkDetector for OnnxPoseDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Keypoint>> {
        let input = preprocess(
            &frame.data,
            frame.width,
            frame.height,
            self.config.input_width,
            self.config.input_height,
            self.config.layout,
            self.config.input_scale,
        )?;
        let shape = input_shape(
            self.config.input_width,
            self.config.input_height,
            self.config.layout,
        );
        let output = self.engine.infer(&shape, &input)?;
        decode_keypoints(&output)
    }
}

pub fn decode_keypoints(output: &[f32]) -> Result<Vec<Keypoint>> {
    let expected = KEYPOINT_COUNT * VALUES_PER_KEYPOINT;
    if output.len() != expected {
        bail!(
            "Landmark output has {} values, expected {}",
            output.len(),
            expected
        );
    }

    let keypoints = output
        .chunks_exact(VALUES_PER_KEYPOINT)
        .zip(KeypointKind::ALL)
        .map(|(row, kind)| Keypoint::new(kind, row[1], row[0], row[2].clamp(0.0, 1.0)))
        .collect();
    Ok(keypoints)
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncompleteReason {
    LowVisibility { visible: usize, total: usize },
    InferenceFailed(String),
}

#[derive(Debug, Clone)]
pub enum Extraction {
    Complete(Skeleton),
    Incomplete(IncompleteReason),
}

impl Extraction {
    pub fn skeleton(&self) -> Option<&Skeleton> {
        match self {
            Extraction::Complete(s) => Some(s),
            Extraction::Incomplete(_) => None,
        }
    }
}

pub struct LandmarkExtractor<D: LandmarkDetector> {
    detector: D,
    keypoint_confidence: f32,
    min_visible_fraction: f32,
}

impl<D: LandmarkDetector> LandmarkExtractor<D> {
    pub fn new(detector: D, keypoint_confidence: f32, min_visible_fraction: f32) -> Self {
        Self {
            detector,
            keypoint_confidence,
            min_visible_fraction,
        }
    }

    pub fn extract(&mut self, frame: &Frame) -> Extraction {
        let keypoints = match self.detector.detect(frame) {
            Ok(kps) => kps,
            Err(e) => {
                debug!("Landmark detection failed on frame {}: {}", frame.seq, e);
                return Extraction::Incomplete(IncompleteReason::InferenceFailed(e.to_string()));
            }
        };

        let skeleton = Skeleton::new(&keypoints, self.keypoint_confidence);
        if skeleton.visible_fraction() < self.min_visible_fraction {
            return Extraction::Incomplete(IncompleteReason::LowVisibility {
                visible: skeleton.visible_count(),
                total: KEYPOINT_COUNT,
            });
        }

        Extraction::Complete(skeleton)
    }
}
