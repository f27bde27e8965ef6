// src/reference.rs
//
// Ideal joint angles per pose class. Loaded once, then shared read-only
// with the scorer for the lifetime of the session.

use crate::classifier::PoseClass;
use crate::error::ReferenceNotFound;
use crate::pose::geometry::{JointAngle, JOINT_COUNT};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use tracing::info;

pub const DEFAULT_TOLERANCE_DEG: f32 = 15.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePose {
    pub class: PoseClass,
    /// Ideal angle per joint; `None` means the joint is not assessed.
    pub angles: [Option<f32>; JOINT_COUNT],
    pub tolerance: [f32; JOINT_COUNT],
    /// Joints that must be verified for an overall "correct" verdict.
    pub required: Vec<JointAngle>,
}

impl ReferencePose {
    pub fn angle(&self, joint: JointAngle) -> Option<f32> {
        self.angles[joint.index()]
    }

    pub fn tolerance(&self, joint: JointAngle) -> f32 {
        self.tolerance[joint.index()]
    }

    pub fn is_required(&self, joint: JointAngle) -> bool {
        self.required.contains(&joint)
    }

    pub fn assessed_joints(&self) -> impl Iterator<Item = JointAngle> + '_ {
        JointAngle::ALL
            .into_iter()
            .filter(|j| self.angle(*j).is_some())
    }

    /// The same pose done facing the other way: every left/right pair of
    /// angles, tolerances and required joints swapped.
    pub fn mirrored(&self) -> Self {
        let mut angles = [None; JOINT_COUNT];
        let mut tolerance = [DEFAULT_TOLERANCE_DEG; JOINT_COUNT];
        for joint in JointAngle::ALL {
            angles[joint.mirror().index()] = self.angle(joint);
            tolerance[joint.mirror().index()] = self.tolerance(joint);
        }
        Self {
            class: self.class,
            angles,
            tolerance,
            required: self.required.iter().map(|j| j.mirror()).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        for joint in JointAngle::ALL {
            if let Some(angle) = self.angle(joint) {
                if !(0.0..=180.0).contains(&angle) {
                    bail!(
                        "{}: {} reference angle {} outside [0, 180]",
                        self.class,
                        joint,
                        angle
                    );
                }
            }
            let tol = self.tolerance(joint);
            if !(tol.is_finite() && tol > 0.0) {
                bail!("{}: {} tolerance must be positive, got {}", self.class, joint, tol);
            }
        }
        for joint in &self.required {
            if self.angle(*joint).is_none() {
                bail!(
                    "{}: {} is required but has no reference angle",
                    self.class,
                    joint
                );
            }
        }
        Ok(())
    }
}

pub struct ReferenceStore {
    poses: HashMap<PoseClass, ReferencePose>,
}

impl ReferenceStore {
    pub fn new(poses: Vec<ReferencePose>) -> Result<Self> {
        let mut map = HashMap::new();
        for pose in poses {
            pose.validate()?;
            if map.insert(pose.class, pose).is_some() {
                bail!("duplicate reference pose entry");
            }
        }
        Ok(Self { poses: map })
    }

    pub fn lookup(&self, class: PoseClass) -> Result<&ReferencePose, ReferenceNotFound> {
        self.poses.get(&class).ok_or(ReferenceNotFound(class))
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn classes(&self) -> Vec<PoseClass> {
        let mut classes: Vec<PoseClass> = self.poses.keys().copied().collect();
        classes.sort();
        classes
    }

    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference table {}", path))?;
        let store = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid reference table {}", path))?;
        info!("✓ Loaded {} reference poses from {}", store.len(), path);
        Ok(store)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let table: ReferenceTable = serde_yaml::from_str(contents)?;
        let poses = table
            .poses
            .into_iter()
            .map(ReferenceEntry::into_pose)
            .collect::<Result<Vec<_>>>()?;
        Self::new(poses)
    }

    /// Reference angles for the five trained classes. Values are the
    /// textbook form seen from the front or side the model was trained on.
    pub fn builtin() -> Self {
        use JointAngle::*;

        let pose = |class: PoseClass, angles: &[(JointAngle, f32)], tol: f32, required: &[JointAngle]| {
            let mut a = [None; JOINT_COUNT];
            for (joint, deg) in angles {
                a[joint.index()] = Some(*deg);
            }
            ReferencePose {
                class,
                angles: a,
                tolerance: [tol; JOINT_COUNT],
                required: required.to_vec(),
            }
        };

        let poses = vec![
            pose(
                PoseClass::Downdog,
                &[
                    (LeftElbow, 175.0),
                    (RightElbow, 175.0),
                    (LeftShoulder, 170.0),
                    (RightShoulder, 170.0),
                    (LeftHip, 70.0),
                    (RightHip, 70.0),
                    (LeftKnee, 175.0),
                    (RightKnee, 175.0),
                ],
                15.0,
                &[LeftHip, RightHip, LeftKnee, RightKnee],
            ),
            pose(
                PoseClass::Goddess,
                &[
                    (LeftElbow, 90.0),
                    (RightElbow, 90.0),
                    (LeftShoulder, 90.0),
                    (RightShoulder, 90.0),
                    (LeftHip, 120.0),
                    (RightHip, 120.0),
                    (LeftKnee, 100.0),
                    (RightKnee, 100.0),
                ],
                20.0,
                &[LeftKnee, RightKnee],
            ),
            pose(
                PoseClass::Plank,
                &[
                    (LeftElbow, 175.0),
                    (RightElbow, 175.0),
                    (LeftShoulder, 75.0),
                    (RightShoulder, 75.0),
                    (LeftHip, 175.0),
                    (RightHip, 175.0),
                    (LeftKnee, 175.0),
                    (RightKnee, 175.0),
                ],
                12.0,
                &[LeftHip, RightHip],
            ),
            pose(
                PoseClass::Tree,
                &[
                    (LeftShoulder, 170.0),
                    (RightShoulder, 170.0),
                    (LeftHip, 175.0),
                    (RightHip, 125.0),
                    (LeftKnee, 175.0),
                    (RightKnee, 50.0),
                ],
                20.0,
                &[LeftKnee, RightKnee],
            ),
            pose(
                PoseClass::Warrior2,
                &[
                    (LeftElbow, 175.0),
                    (RightElbow, 175.0),
                    (LeftShoulder, 95.0),
                    (RightShoulder, 95.0),
                    (LeftHip, 110.0),
                    (RightHip, 135.0),
                    (LeftKnee, 90.0),
                    (RightKnee, 175.0),
                ],
                DEFAULT_TOLERANCE_DEG,
                &[LeftKnee, RightKnee, LeftShoulder, RightShoulder],
            ),
        ];

        let poses = poses.into_iter().map(|p| (p.class, p)).collect();
        Self { poses }
    }
}

// ============================================================================
// YAML TABLE
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReferenceTable {
    poses: Vec<ReferenceEntry>,
}

#[derive(Debug, Deserialize)]
struct ReferenceEntry {
    label: PoseClass,
    angles: BTreeMap<String, f32>,
    #[serde(default)]
    tolerance: BTreeMap<String, f32>,
    #[serde(default = "default_tolerance")]
    default_tolerance: f32,
    #[serde(default)]
    required: Vec<String>,
}

fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE_DEG
}

fn joint(name: &str) -> Result<JointAngle> {
    match JointAngle::from_name(name) {
        Some(j) => Ok(j),
        None => bail!("unknown joint '{}'", name),
    }
}

impl ReferenceEntry {
    fn into_pose(self) -> Result<ReferencePose> {
        let mut angles = [None; JOINT_COUNT];
        for (name, deg) in &self.angles {
            angles[joint(name)?.index()] = Some(*deg);
        }

        let mut tolerance = [self.default_tolerance; JOINT_COUNT];
        for (name, tol) in &self.tolerance {
            tolerance[joint(name)?.index()] = *tol;
        }

        let required = self
            .required
            .iter()
            .map(|name| joint(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(ReferencePose {
            class: self.label,
            angles,
            tolerance,
            required,
        })
    }
}
