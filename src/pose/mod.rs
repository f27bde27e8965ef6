// src/pose/mod.rs
//
// Per-frame body geometry:
//   Frame → landmarks (Skeleton) → geometry (FeatureVector)

pub mod geometry;
pub mod landmarks;
pub mod skeleton;

pub use geometry::{
    compute_angles, compute_angles_with_aspect, FeatureVector, JointAngle, JOINT_COUNT,
};
pub use landmarks::{Extraction, IncompleteReason, LandmarkDetector, LandmarkExtractor};
pub use skeleton::{Keypoint, KeypointKind, Skeleton};
