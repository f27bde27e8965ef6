// src/pose/skeleton.rs

use serde::Serialize;

pub const KEYPOINT_COUNT: usize = 17;

/// COCO body keypoints, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    pub const ALL: [KeypointKind; KEYPOINT_COUNT] = [
        KeypointKind::Nose,
        KeypointKind::LeftEye,
        KeypointKind::RightEye,
        KeypointKind::LeftEar,
        KeypointKind::RightEar,
        KeypointKind::LeftShoulder,
        KeypointKind::RightShoulder,
        KeypointKind::LeftElbow,
        KeypointKind::RightElbow,
        KeypointKind::LeftWrist,
        KeypointKind::RightWrist,
        KeypointKind::LeftHip,
        KeypointKind::RightHip,
        KeypointKind::LeftKnee,
        KeypointKind::RightKnee,
        KeypointKind::LeftAnkle,
        KeypointKind::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Limb connections drawn on the overlay.
pub const EDGES: [(KeypointKind, KeypointKind); 16] = [
    (KeypointKind::Nose, KeypointKind::LeftEye),
    (KeypointKind::Nose, KeypointKind::RightEye),
    (KeypointKind::LeftEye, KeypointKind::LeftEar),
    (KeypointKind::RightEye, KeypointKind::RightEar),
    (KeypointKind::LeftShoulder, KeypointKind::RightShoulder),
    (KeypointKind::LeftShoulder, KeypointKind::LeftElbow),
    (KeypointKind::LeftElbow, KeypointKind::LeftWrist),
    (KeypointKind::RightShoulder, KeypointKind::RightElbow),
    (KeypointKind::RightElbow, KeypointKind::RightWrist),
    (KeypointKind::LeftShoulder, KeypointKind::LeftHip),
    (KeypointKind::RightShoulder, KeypointKind::RightHip),
    (KeypointKind::LeftHip, KeypointKind::RightHip),
    (KeypointKind::LeftHip, KeypointKind::LeftKnee),
    (KeypointKind::LeftKnee, KeypointKind::LeftAnkle),
    (KeypointKind::RightHip, KeypointKind::RightKnee),
    (KeypointKind::RightKnee, KeypointKind::RightAnkle),
];

/// A single keypoint in normalized image coordinates ([0, 1] on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keypoint {
    pub kind: KeypointKind,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(kind: KeypointKind, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            kind,
            x,
            y,
            confidence,
        }
    }
}

/// All body keypoints of one person in one frame.
///
/// Keypoints under the confidence threshold stay stored but are never handed
/// out by [`Skeleton::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    keypoints: [Keypoint; KEYPOINT_COUNT],
    min_confidence: f32,
}

impl Skeleton {
    /// Builds a skeleton from decoded keypoints. Kinds absent from `points`
    /// are stored with zero confidence.
    pub fn new(points: &[Keypoint], min_confidence: f32) -> Self {
        let mut keypoints = KeypointKind::ALL.map(|kind| Keypoint::new(kind, 0.0, 0.0, 0.0));
        for kp in points {
            keypoints[kp.kind.index()] = *kp;
        }
        Self {
            keypoints,
            min_confidence,
        }
    }

    pub fn get(&self, kind: KeypointKind) -> Option<&Keypoint> {
        let kp = &self.keypoints[kind.index()];
        let usable = kp.confidence >= self.min_confidence && kp.x.is_finite() && kp.y.is_finite();
        usable.then_some(kp)
    }

    pub fn is_present(&self, kind: KeypointKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn visible_count(&self) -> usize {
        KeypointKind::ALL
            .iter()
            .filter(|k| self.is_present(**k))
            .count()
    }

    pub fn visible_fraction(&self) -> f32 {
        self.visible_count() as f32 / KEYPOINT_COUNT as f32
    }

    /// Keypoints the geometry engine needs that are not usable in this frame.
    pub fn missing(&self) -> Vec<KeypointKind> {
        super::geometry::required_keypoints()
            .into_iter()
            .filter(|k| !self.is_present(*k))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}
