// src/feedback.rs
//
// Observed angles vs reference → per-joint corrections.
// Everything here is a pure function of its arguments: the same inputs
// always give the same FeedbackResult, message text included.

use crate::classifier::{Classification, PoseLabel};
use crate::pose::geometry::{FeatureVector, JointAngle};
use crate::reference::{ReferencePose, ReferenceStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which unverified joints block an overall "correct" verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Every joint the reference assesses must be verified.
    Strict,
    /// Only the pose's required joints must be verified.
    #[default]
    Required,
    /// Unverified joints never block.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Joint is more open than the reference.
    Bend,
    /// Joint is more closed than the reference.
    Straighten,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    NeedsCorrection,
    NotRecognized,
    NoGuidance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointCorrection {
    pub joint: JointAngle,
    pub observed: f32,
    pub reference: f32,
    pub deviation: f32,
    pub direction: Direction,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackResult {
    pub label: PoseLabel,
    pub confidence: f32,
    pub verdict: Verdict,
    pub is_correct: bool,
    /// Out-of-tolerance joints, largest deviation first.
    pub corrections: Vec<JointCorrection>,
    /// Assessed joints whose angle could not be measured this frame.
    pub unverified: Vec<JointAngle>,
}

impl FeedbackResult {
    pub fn not_recognized(confidence: f32) -> Self {
        Self {
            label: PoseLabel::Unknown,
            confidence,
            verdict: Verdict::NotRecognized,
            is_correct: false,
            corrections: Vec::new(),
            unverified: Vec::new(),
        }
    }

    pub fn no_guidance(label: PoseLabel, confidence: f32) -> Self {
        Self {
            label,
            confidence,
            verdict: Verdict::NoGuidance,
            is_correct: false,
            corrections: Vec::new(),
            unverified: Vec::new(),
        }
    }

    pub fn is_flagged(&self, joint: JointAngle) -> bool {
        self.corrections.iter().any(|c| c.joint == joint)
    }

    /// Headline shown above the correction list.
    pub fn summary(&self) -> String {
        match self.verdict {
            Verdict::Correct => format!("{}: looking good", self.label.display_name()),
            Verdict::NeedsCorrection if self.corrections.is_empty() => format!(
                "{}: some joints not visible",
                self.label.display_name()
            ),
            Verdict::NeedsCorrection => format!(
                "{}: {} adjustment{} needed",
                self.label.display_name(),
                self.corrections.len(),
                if self.corrections.len() == 1 { "" } else { "s" }
            ),
            Verdict::NotRecognized => "Pose not recognized".to_string(),
            Verdict::NoGuidance => format!(
                "{}: no guidance available",
                self.label.display_name()
            ),
        }
    }
}

pub fn correction_message(joint: JointAngle, deviation: f32, direction: Direction) -> String {
    let action = match direction {
        Direction::Bend => "bend more",
        Direction::Straighten => "open up",
    };
    format!(
        "{}: {} (off by {:.0} deg)",
        joint.display_name(),
        action,
        deviation.round()
    )
}

pub fn score(
    features: &FeatureVector,
    reference: &ReferencePose,
    strictness: Strictness,
) -> FeedbackResult {
    let mut corrections = Vec::new();
    let mut unverified = Vec::new();

    for joint in reference.assessed_joints() {
        let Some(target) = reference.angle(joint) else {
            continue;
        };
        let Some(observed) = features.get(joint) else {
            unverified.push(joint);
            continue;
        };

        let deviation = (observed - target).abs();
        if deviation > reference.tolerance(joint) {
            let direction = if observed > target {
                Direction::Bend
            } else {
                Direction::Straighten
            };
            corrections.push(JointCorrection {
                joint,
                observed,
                reference: target,
                deviation,
                direction,
                message: correction_message(joint, deviation, direction),
            });
        }
    }

    corrections.sort_by(|a, b| {
        b.deviation
            .partial_cmp(&a.deviation)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.joint.cmp(&b.joint))
    });

    let blocking_unverified = unverified.iter().any(|j| match strictness {
        Strictness::Strict => true,
        Strictness::Required => reference.is_required(*j),
        Strictness::Lenient => false,
    });
    let is_correct = corrections.is_empty() && !blocking_unverified;

    FeedbackResult {
        label: PoseLabel::Known(reference.class),
        confidence: 1.0,
        verdict: if is_correct {
            Verdict::Correct
        } else {
            Verdict::NeedsCorrection
        },
        is_correct,
        corrections,
        unverified,
    }
}

/// Turns one frame's classification and angles into feedback, degrading to
/// "not recognized" or "no guidance" instead of failing.
pub struct FeedbackGenerator<'a> {
    store: &'a ReferenceStore,
    strictness: Strictness,
}

impl<'a> FeedbackGenerator<'a> {
    pub fn new(store: &'a ReferenceStore, strictness: Strictness) -> Self {
        Self { store, strictness }
    }

    pub fn generate(
        &self,
        classification: &Classification,
        features: &FeatureVector,
    ) -> FeedbackResult {
        let class = match classification.label {
            PoseLabel::Known(class) => class,
            PoseLabel::Unknown => return FeedbackResult::not_recognized(classification.confidence),
        };

        match self.store.lookup(class) {
            Ok(reference) => FeedbackResult {
                confidence: classification.confidence,
                ..self.score_either_side(features, reference)
            },
            Err(e) => {
                warn!("{}; classifier and reference table disagree", e);
                FeedbackResult::no_guidance(classification.label, classification.confidence)
            }
        }
    }

    /// Asymmetric poses can be held facing either way. Score both and keep
    /// the closer side; ties stay with the table's side.
    fn score_either_side(
        &self,
        features: &FeatureVector,
        reference: &ReferencePose,
    ) -> FeedbackResult {
        let as_listed = score(features, reference, self.strictness);
        let mirrored = score(features, &reference.mirrored(), self.strictness);
        if closeness(&mirrored) < closeness(&as_listed) {
            mirrored
        } else {
            as_listed
        }
    }
}

/// Ordering key for picking a side: correct first, then fewer corrections,
/// then smaller total deviation.
fn closeness(result: &FeedbackResult) -> (bool, usize, f32) {
    let total: f32 = result.corrections.iter().map(|c| c.deviation).sum();
    (!result.is_correct, result.corrections.len(), total)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::classifier::PoseClass;
    use crate::pose::geometry::JOINT_COUNT;
    use proptest::prelude::*;

    fn single_joint_reference(target: f32) -> ReferencePose {
        let mut angles = [None; JOINT_COUNT];
        angles[JointAngle::LeftKnee.index()] = Some(target);
        ReferencePose {
            class: PoseClass::Warrior2,
            angles,
            tolerance: [0.0; JOINT_COUNT],
            required: Vec::new(),
        }
    }

    fn left_knee(observed: f32) -> FeatureVector {
        let mut fv = FeatureVector::undefined();
        fv.set(JointAngle::LeftKnee, Some(observed));
        fv
    }

    proptest! {
        #[test]
        fn prop_deviation_symmetric_direction_opposite(
            observed in 0.0f32..180.0,
            target in 0.0f32..180.0,
        ) {
            prop_assume!((observed - target).abs() > 1e-3);

            let a = score(&left_knee(observed), &single_joint_reference(target), Strictness::Lenient);
            let b = score(&left_knee(target), &single_joint_reference(observed), Strictness::Lenient);

            prop_assert_eq!(a.corrections.len(), 1);
            prop_assert_eq!(b.corrections.len(), 1);
            prop_assert_eq!(a.corrections[0].deviation, b.corrections[0].deviation);
            prop_assert_ne!(a.corrections[0].direction, b.corrections[0].direction);
        }

        #[test]
        fn prop_corrections_sorted_descending(
            angles in proptest::array::uniform8(0.0f32..180.0),
        ) {
            let reference = ReferencePose {
                class: PoseClass::Plank,
                angles: [Some(90.0); JOINT_COUNT],
                tolerance: [10.0; JOINT_COUNT],
                required: Vec::new(),
            };
            let fv = FeatureVector::new(angles.map(Some));
            let result = score(&fv, &reference, Strictness::Lenient);

            for pair in result.corrections.windows(2) {
                prop_assert!(pair[0].deviation >= pair[1].deviation);
            }
            for c in &result.corrections {
                prop_assert!(c.deviation > 10.0);
            }
        }
    }
}
