// src/pose/geometry.rs
//
// Joint angles from keypoints. The FeatureVector layout here is the contract
// with the classifier artifact; bump FEATURE_LAYOUT_VERSION whenever the
// joint set or order changes.

use super::skeleton::{KeypointKind, Skeleton};
use crate::error::AngleComputeError;
use serde::Serialize;
use std::fmt;

pub const JOINT_COUNT: usize = 8;
pub const FEATURE_LAYOUT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JointAngle {
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
}

impl JointAngle {
    pub const ALL: [JointAngle; JOINT_COUNT] = [
        JointAngle::LeftElbow,
        JointAngle::RightElbow,
        JointAngle::LeftShoulder,
        JointAngle::RightShoulder,
        JointAngle::LeftHip,
        JointAngle::RightHip,
        JointAngle::LeftKnee,
        JointAngle::RightKnee,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// (A, B, C): the angle is measured at B between rays B→A and B→C.
    pub fn keypoints(self) -> (KeypointKind, KeypointKind, KeypointKind) {
        use KeypointKind::*;
        match self {
            JointAngle::LeftElbow => (LeftShoulder, LeftElbow, LeftWrist),
            JointAngle::RightElbow => (RightShoulder, RightElbow, RightWrist),
            JointAngle::LeftShoulder => (LeftHip, LeftShoulder, LeftElbow),
            JointAngle::RightShoulder => (RightHip, RightShoulder, RightElbow),
            JointAngle::LeftHip => (LeftShoulder, LeftHip, LeftKnee),
            JointAngle::RightHip => (RightShoulder, RightHip, RightKnee),
            JointAngle::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            JointAngle::RightKnee => (RightHip, RightKnee, RightAnkle),
        }
    }

    pub fn vertex(self) -> KeypointKind {
        self.keypoints().1
    }

    /// Same joint on the other side of the body.
    pub fn mirror(self) -> Self {
        match self {
            JointAngle::LeftElbow => JointAngle::RightElbow,
            JointAngle::RightElbow => JointAngle::LeftElbow,
            JointAngle::LeftShoulder => JointAngle::RightShoulder,
            JointAngle::RightShoulder => JointAngle::LeftShoulder,
            JointAngle::LeftHip => JointAngle::RightHip,
            JointAngle::RightHip => JointAngle::LeftHip,
            JointAngle::LeftKnee => JointAngle::RightKnee,
            JointAngle::RightKnee => JointAngle::LeftKnee,
        }
    }

    /// Stable snake_case name used in config files and model metadata.
    pub fn name(self) -> &'static str {
        match self {
            JointAngle::LeftElbow => "left_elbow",
            JointAngle::RightElbow => "right_elbow",
            JointAngle::LeftShoulder => "left_shoulder",
            JointAngle::RightShoulder => "right_shoulder",
            JointAngle::LeftHip => "left_hip",
            JointAngle::RightHip => "right_hip",
            JointAngle::LeftKnee => "left_knee",
            JointAngle::RightKnee => "right_knee",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|j| j.name() == name)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            JointAngle::LeftElbow => "Left elbow",
            JointAngle::RightElbow => "Right elbow",
            JointAngle::LeftShoulder => "Left shoulder",
            JointAngle::RightShoulder => "Right shoulder",
            JointAngle::LeftHip => "Left hip",
            JointAngle::RightHip => "Right hip",
            JointAngle::LeftKnee => "Left knee",
            JointAngle::RightKnee => "Right knee",
        }
    }
}

impl fmt::Display for JointAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every keypoint some joint angle depends on.
pub fn required_keypoints() -> Vec<KeypointKind> {
    let mut kinds: Vec<KeypointKind> = Vec::new();
    for joint in JointAngle::ALL {
        let (a, b, c) = joint.keypoints();
        for kind in [a, b, c] {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }
    kinds
}

/// Joint angles of one frame in [`JointAngle::ALL`] order. `None` marks an
/// angle that could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    angles: [Option<f32>; JOINT_COUNT],
}

impl FeatureVector {
    pub fn new(angles: [Option<f32>; JOINT_COUNT]) -> Self {
        Self { angles }
    }

    pub fn undefined() -> Self {
        Self {
            angles: [None; JOINT_COUNT],
        }
    }

    pub fn get(&self, joint: JointAngle) -> Option<f32> {
        self.angles[joint.index()]
    }

    pub fn set(&mut self, joint: JointAngle, value: Option<f32>) {
        self.angles[joint.index()] = value;
    }

    pub fn angles(&self) -> &[Option<f32>; JOINT_COUNT] {
        &self.angles
    }

    pub fn defined_count(&self) -> usize {
        self.angles.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.defined_count() == JOINT_COUNT
    }

    pub fn undefined_joints(&self) -> Vec<JointAngle> {
        JointAngle::ALL
            .into_iter()
            .filter(|j| self.get(*j).is_none())
            .collect()
    }
}

/// Angle at `b` in degrees between rays b→a and b→c, in [0, 180].
/// Returns `None` for degenerate rays or non-finite input.
pub fn angle_at(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> Option<f32> {
    let ba = (a.0 - b.0, a.1 - b.1);
    let bc = (c.0 - b.0, c.1 - b.1);

    let norm_ba = (ba.0 * ba.0 + ba.1 * ba.1).sqrt();
    let norm_bc = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();
    if !norm_ba.is_finite() || !norm_bc.is_finite() || norm_ba < 1e-6 || norm_bc < 1e-6 {
        return None;
    }

    let cos = ((ba.0 * bc.0 + ba.1 * bc.1) / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    let degrees = cos.acos().to_degrees();
    degrees.is_finite().then(|| degrees.clamp(0.0, 180.0))
}

/// All joint angles of one skeleton, treating its coordinates as square.
#[allow(dead_code)]
pub fn compute_angles(skeleton: &Skeleton) -> Result<FeatureVector, AngleComputeError> {
    compute_angles_with_aspect(skeleton, 1.0)
}

/// All joint angles of one skeleton. x is stretched by `aspect_ratio`
/// (width/height) so normalized coordinates from non-square frames give true
/// angles. Joints with a missing keypoint stay undefined.
pub fn compute_angles_with_aspect(
    skeleton: &Skeleton,
    aspect_ratio: f32,
) -> Result<FeatureVector, AngleComputeError> {
    let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    };
    let point = |kind: KeypointKind| skeleton.get(kind).map(|kp| (kp.x * aspect, kp.y));

    let mut features = FeatureVector::undefined();
    for joint in JointAngle::ALL {
        let (a, b, c) = joint.keypoints();
        let angle = match (point(a), point(b), point(c)) {
            (Some(pa), Some(pb), Some(pc)) => angle_at(pa, pb, pc),
            _ => None,
        };
        features.set(joint, angle);
    }

    if features.defined_count() == 0 {
        return Err(AngleComputeError::NoDefinedAngles {
            missing: skeleton.missing().len(),
        });
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::skeleton::Keypoint;

    /// Standing figure, arms straight down, facing the camera.
    fn standing_keypoints(confidence: f32) -> Vec<Keypoint> {
        use KeypointKind::*;
        let points = [
            (Nose, 0.50, 0.10),
            (LeftEye, 0.52, 0.08),
            (RightEye, 0.48, 0.08),
            (LeftEar, 0.54, 0.09),
            (RightEar, 0.46, 0.09),
            (LeftShoulder, 0.60, 0.25),
            (RightShoulder, 0.40, 0.25),
            (LeftElbow, 0.62, 0.40),
            (RightElbow, 0.38, 0.40),
            (LeftWrist, 0.63, 0.55),
            (RightWrist, 0.37, 0.55),
            (LeftHip, 0.57, 0.55),
            (RightHip, 0.43, 0.55),
            (LeftKnee, 0.57, 0.75),
            (RightKnee, 0.43, 0.75),
            (LeftAnkle, 0.57, 0.95),
            (RightAnkle, 0.43, 0.95),
        ];
        points
            .iter()
            .map(|(k, x, y)| Keypoint::new(*k, *x, *y, confidence))
            .collect()
    }

    fn standing_skeleton(confidence: f32) -> Skeleton {
        Skeleton::new(&standing_keypoints(confidence), 0.3)
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_at((1.0, 0.0), (0.0, 0.0), (0.0, 1.0)).unwrap();
        assert!((angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_straight_and_folded() {
        let straight = angle_at((-1.0, 0.0), (0.0, 0.0), (1.0, 0.0)).unwrap();
        assert!((straight - 180.0).abs() < 1e-3);
        let folded = angle_at((1.0, 0.0), (0.0, 0.0), (2.0, 0.0)).unwrap();
        assert!(folded.abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_ray_is_undefined() {
        assert!(angle_at((0.0, 0.0), (0.0, 0.0), (1.0, 0.0)).is_none());
        assert!(angle_at((f32::NAN, 0.0), (0.0, 0.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_complete_skeleton_has_no_undefined_angles() {
        let skeleton = standing_skeleton(0.9);
        let features = compute_angles(&skeleton).unwrap();
        assert!(features.is_fully_defined());
        for angle in features.angles().iter().flatten() {
            assert!((0.0..=180.0).contains(angle));
        }
        // Straight legs
        assert!(features.get(JointAngle::LeftKnee).unwrap() > 175.0);
        assert!(features.get(JointAngle::RightKnee).unwrap() > 175.0);
    }

    #[test]
    fn test_missing_keypoint_marks_angle_undefined() {
        let mut kps = standing_keypoints(0.9);
        kps[KeypointKind::LeftAnkle.index()].confidence = 0.05;
        let skeleton = Skeleton::new(&kps, 0.3);

        let features = compute_angles(&skeleton).unwrap();
        assert_eq!(features.get(JointAngle::LeftKnee), None);
        assert!(features.get(JointAngle::RightKnee).is_some());
        assert_eq!(features.undefined_joints(), vec![JointAngle::LeftKnee]);
    }

    #[test]
    fn test_empty_skeleton_is_error() {
        let skeleton = Skeleton::new(&[], 0.3);
        assert!(matches!(
            compute_angles(&skeleton),
            Err(AngleComputeError::NoDefinedAngles { .. })
        ));
    }

    #[test]
    fn test_aspect_ratio_corrects_normalized_coordinates() {
        // 90 degrees in pixel space on a 2:1 frame is not 90 in normalized space.
        use KeypointKind::*;
        let kps = [
            Keypoint::new(LeftHip, 0.25, 0.5, 0.9),
            Keypoint::new(LeftKnee, 0.5, 0.5, 0.9),
            Keypoint::new(LeftAnkle, 0.5, 1.0, 0.9),
        ];
        let skeleton = Skeleton::new(&kps, 0.3);
        let square = compute_angles(&skeleton).unwrap();
        let wide = compute_angles_with_aspect(&skeleton, 2.0).unwrap();
        assert!((square.get(JointAngle::LeftKnee).unwrap() - 90.0).abs() < 1e-3);
        assert!((wide.get(JointAngle::LeftKnee).unwrap() - 90.0).abs() < 1e-3);

        let diagonal = [
            Keypoint::new(LeftHip, 0.0, 0.0, 0.9),
            Keypoint::new(LeftKnee, 0.5, 0.5, 0.9),
            Keypoint::new(LeftAnkle, 1.0, 0.0, 0.9),
        ];
        let skeleton = Skeleton::new(&diagonal, 0.3);
        let square = compute_angles(&skeleton).unwrap();
        let wide = compute_angles_with_aspect(&skeleton, 2.0).unwrap();
        assert!((square.get(JointAngle::LeftKnee).unwrap() - 90.0).abs() < 1e-3);
        assert!(wide.get(JointAngle::LeftKnee).unwrap() > 120.0);
    }

    #[test]
    fn test_joint_names_round_trip() {
        for joint in JointAngle::ALL {
            assert_eq!(JointAngle::from_name(joint.name()), Some(joint));
        }
        assert_eq!(JointAngle::from_name("left_ankle"), None);
    }

    #[test]
    fn test_mirror_swaps_side_keeps_limb() {
        for joint in JointAngle::ALL {
            let other = joint.mirror();
            assert_ne!(joint, other);
            assert_eq!(other.mirror(), joint);
            assert_eq!(
                joint.name().split_once('_').map(|(_, limb)| limb),
                other.name().split_once('_').map(|(_, limb)| limb)
            );
        }
    }
}
