// src/session/smoother.rs

use crate::classifier::PoseLabel;
use crate::pose::geometry::{FeatureVector, JointAngle, JOINT_COUNT};
use std::collections::{HashMap, VecDeque};

/// Temporal smoother over the last N classified frames.
///
/// - Label: changes only when one label holds a strict majority of the window
/// - Angles: per-joint median over the window (resistant to outliers)
pub struct PoseSmoother {
    labels: VecDeque<PoseLabel>,
    features: VecDeque<FeatureVector>,
    window_size: usize,
    displayed: Option<PoseLabel>,
}

impl PoseSmoother {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            labels: VecDeque::with_capacity(window_size),
            features: VecDeque::with_capacity(window_size),
            window_size,
            displayed: None,
        }
    }

    /// Record one frame and return the label to display, if any label has
    /// ever won a majority.
    pub fn push(&mut self, label: PoseLabel, features: FeatureVector) -> Option<PoseLabel> {
        self.labels.push_back(label);
        self.features.push_back(features);

        // Maintain window size
        if self.labels.len() > self.window_size {
            self.labels.pop_front();
        }
        if self.features.len() > self.window_size {
            self.features.pop_front();
        }

        if let Some(winner) = self.majority_label() {
            self.displayed = Some(winner);
        }
        self.displayed
    }

    /// Label holding more than half of a full window, counted against the
    /// configured window size so a short history cannot win early.
    fn majority_label(&self) -> Option<PoseLabel> {
        let mut counts: HashMap<PoseLabel, usize> = HashMap::new();
        for label in &self.labels {
            *counts.entry(*label).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .find(|(_, count)| *count * 2 > self.window_size)
            .map(|(label, _)| label)
    }

    /// Median angle per joint over the window, only for joints defined in
    /// the newest frame.
    pub fn smoothed_features(&self) -> FeatureVector {
        let Some(latest) = self.features.back() else {
            return FeatureVector::undefined();
        };

        let mut smoothed = [None; JOINT_COUNT];
        for joint in JointAngle::ALL {
            if latest.get(joint).is_none() {
                continue;
            }
            let mut values: Vec<f32> = self.features.iter().filter_map(|f| f.get(joint)).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            smoothed[joint.index()] = Some(values[values.len() / 2]);
        }
        FeatureVector::new(smoothed)
    }

    pub fn displayed(&self) -> Option<PoseLabel> {
        self.displayed
    }

    /// Reset the smoother (e.g. when the person leaves the frame)
    pub fn reset(&mut self) {
        self.labels.clear();
        self.features.clear();
        self.displayed = None;
    }

    pub fn history_size(&self) -> usize {
        self.labels.len()
    }
}
