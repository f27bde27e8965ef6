// src/classifier.rs
//
// FeatureVector → PoseLabel. The trained model is loaded once at startup
// together with a metadata sidecar describing the feature layout it was
// trained on; any mismatch with this build's layout is fatal.

use crate::error::ClassifierError;
use crate::inference::InferenceEngine;
use crate::pose::geometry::{FeatureVector, JointAngle, FEATURE_LAYOUT_VERSION, JOINT_COUNT};
use crate::types::ClassifierConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;
use tracing::{info, warn};

/// Pose classes the trained model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseClass {
    Downdog,
    Goddess,
    Plank,
    Tree,
    Warrior2,
}

impl PoseClass {
    pub const ALL: [PoseClass; 5] = [
        PoseClass::Downdog,
        PoseClass::Goddess,
        PoseClass::Plank,
        PoseClass::Tree,
        PoseClass::Warrior2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoseClass::Downdog => "downdog",
            PoseClass::Goddess => "goddess",
            PoseClass::Plank => "plank",
            PoseClass::Tree => "tree",
            PoseClass::Warrior2 => "warrior2",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PoseClass::Downdog => "Downward Dog",
            PoseClass::Goddess => "Goddess",
            PoseClass::Plank => "Plank",
            PoseClass::Tree => "Tree",
            PoseClass::Warrior2 => "Warrior II",
        }
    }
}

impl fmt::Display for PoseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoseClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoseClass::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown pose class '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseLabel {
    Known(PoseClass),
    Unknown,
}

impl PoseLabel {
    pub fn display_name(&self) -> &'static str {
        match self {
            PoseLabel::Known(c) => c.display_name(),
            PoseLabel::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: PoseLabel,
    pub confidence: f32,
    /// Probability per label in model output order.
    pub probabilities: Vec<f32>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            label: PoseLabel::Unknown,
            confidence: 0.0,
            probabilities: Vec::new(),
        }
    }
}

/// Raw model: feature tensor in, one score per label out.
pub trait PoseModel {
    fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>>;
}

pub struct OnnxPoseModel {
    engine: InferenceEngine,
}

impl OnnxPoseModel {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let engine = InferenceEngine::new(
            &config.model_path,
            &config.input_name,
            config.num_threads,
            config.use_cuda,
        )?;
        Ok(Self { engine })
    }
}

impl PoseModel for OnnxPoseModel {
    fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.engine
            .infer(&[1, input.len()], input)
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)).into())
    }
}

/// Sidecar written next to the model by the training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_version: u32,
    pub features: Vec<String>,
    pub labels: Vec<String>,
}

impl ModelMetadata {
    pub fn load(path: &str) -> Result<Self, ClassifierError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ClassifierError::Unavailable(format!("{}: {}", path, e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ClassifierError::Metadata(format!("{}: {}", path, e)))
    }

    /// Metadata describing this build's feature layout for the given labels.
    pub fn current(labels: &[PoseClass]) -> Self {
        Self {
            feature_version: FEATURE_LAYOUT_VERSION,
            features: JointAngle::ALL.iter().map(|j| j.name().to_string()).collect(),
            labels: labels.iter().map(|l| l.as_str().to_string()).collect(),
        }
    }

    /// Checks the artifact was trained on the layout this build produces and
    /// returns its labels in output order.
    pub fn validate(&self) -> Result<Vec<PoseClass>, ClassifierError> {
        if self.feature_version != FEATURE_LAYOUT_VERSION {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("feature_version {}", self.feature_version),
                actual: format!("feature_version {}", FEATURE_LAYOUT_VERSION),
            });
        }

        let ours: Vec<&str> = JointAngle::ALL.iter().map(|j| j.name()).collect();
        if self.features.iter().map(String::as_str).ne(ours.iter().copied()) {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("[{}]", self.features.join(", ")),
                actual: format!("[{}]", ours.join(", ")),
            });
        }

        if self.labels.is_empty() {
            return Err(ClassifierError::Metadata("no labels listed".to_string()));
        }

        let mut labels = Vec::with_capacity(self.labels.len());
        for name in &self.labels {
            let class = name.parse::<PoseClass>().map_err(ClassifierError::Metadata)?;
            if labels.contains(&class) {
                return Err(ClassifierError::Metadata(format!(
                    "label '{}' listed twice",
                    name
                )));
            }
            labels.push(class);
        }
        Ok(labels)
    }
}

pub struct PoseClassifier<M: PoseModel> {
    model: M,
    labels: Vec<PoseClass>,
    confidence_threshold: f32,
    apply_softmax: bool,
    missing_angle_value: f32,
}

impl<M: PoseModel> PoseClassifier<M> {
    /// Wraps a loaded model after a probe inference confirms the output
    /// width matches the label list.
    pub fn new(
        mut model: M,
        metadata: &ModelMetadata,
        config: &ClassifierConfig,
    ) -> Result<Self, ClassifierError> {
        let labels = metadata.validate()?;

        let probe = vec![config.missing_angle_value; JOINT_COUNT];
        let output = model
            .predict(&probe)
            .map_err(|e| ClassifierError::Unavailable(format!("probe inference failed: {}", e)))?;
        if output.len() != labels.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("{} labels in metadata", labels.len()),
                actual: format!("{} model outputs", output.len()),
            });
        }

        info!(
            "✓ Pose classifier ready: {} labels, threshold {:.2}",
            labels.len(),
            config.confidence_threshold
        );

        Ok(Self {
            model,
            labels,
            confidence_threshold: config.confidence_threshold,
            apply_softmax: config.apply_softmax,
            missing_angle_value: config.missing_angle_value,
        })
    }

    pub fn labels(&self) -> &[PoseClass] {
        &self.labels
    }

    /// Model input: each defined angle scaled to [0, 1], undefined angles
    /// replaced by the configured sentinel.
    pub fn encode(&self, features: &FeatureVector) -> Vec<f32> {
        features
            .angles()
            .iter()
            .map(|a| a.map(|deg| deg / 180.0).unwrap_or(self.missing_angle_value))
            .collect()
    }

    pub fn classify(&mut self, features: &FeatureVector) -> Classification {
        let input = self.encode(features);
        let raw = match self.model.predict(&input) {
            Ok(raw) if raw.len() == self.labels.len() => raw,
            Ok(raw) => {
                warn!(
                    "Classifier returned {} scores for {} labels",
                    raw.len(),
                    self.labels.len()
                );
                return Classification::unknown();
            }
            Err(e) => {
                warn!("Classifier inference failed: {}", e);
                return Classification::unknown();
            }
        };

        let probabilities = if self.apply_softmax {
            softmax(&raw)
        } else {
            raw
        };

        let best = probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

        let (label, confidence) = match best {
            Some((idx, p)) if *p >= self.confidence_threshold => {
                (PoseLabel::Known(self.labels[idx]), *p)
            }
            Some((_, p)) => (PoseLabel::Unknown, *p),
            None => (PoseLabel::Unknown, 0.0),
        };

        Classification {
            label,
            confidence,
            probabilities,
        }
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; logits.len()]
    }
}
