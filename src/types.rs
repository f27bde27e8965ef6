// src/types.rs

use crate::feedback::Strictness;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub landmarks: LandmarkConfig,
    pub classifier: ClassifierConfig,
    pub reference: ReferenceConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device_id: i32,
    pub width: u32,
    pub height: u32,
    pub read_timeout_ms: u64,
    pub max_consecutive_timeouts: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            read_timeout_ms: 1000,
            max_consecutive_timeouts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    Nhwc,
    Nchw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    pub model_path: String,
    pub input_name: String,
    pub input_width: usize,
    pub input_height: usize,
    pub layout: TensorLayout,
    /// Multiplier applied to 0..255 pixel values before inference.
    pub input_scale: f32,
    pub keypoint_confidence: f32,
    pub min_visible_fraction: f32,
    pub num_threads: usize,
    pub use_cuda: bool,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            model_path: "models/movenet_singlepose.onnx".to_string(),
            input_name: "input".to_string(),
            input_width: 192,
            input_height: 192,
            layout: TensorLayout::Nhwc,
            input_scale: 1.0,
            keypoint_confidence: 0.3,
            min_visible_fraction: 0.6,
            num_threads: 2,
            use_cuda: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_path: String,
    pub metadata_path: String,
    pub input_name: String,
    pub confidence_threshold: f32,
    pub apply_softmax: bool,
    pub missing_angle_value: f32,
    pub num_threads: usize,
    pub use_cuda: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yoga_pose_classifier.onnx".to_string(),
            metadata_path: "models/yoga_pose_classifier.meta.yaml".to_string(),
            input_name: "features".to_string(),
            confidence_threshold: 0.6,
            apply_softmax: false,
            missing_angle_value: -1.0,
            num_threads: 1,
            use_cuda: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// YAML reference table. The built-in table is used when unset.
    pub table_path: Option<String>,
    pub strictness: Strictness,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub smoothing_window: usize,
    pub target_fps: u32,
    pub max_stale_frames: u32,
    pub max_messages: usize,
    pub show_window: bool,
    pub window_title: String,
    pub stats_interval_frames: u64,
    pub feedback_log: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            target_fps: 30,
            max_stale_frames: 15,
            max_messages: 3,
            show_window: true,
            window_title: "Yoga Pose Coach".to_string(),
            stats_interval_frames: 300,
            feedback_log: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One captured RGB frame. `seq` increases by one per camera read, so gaps
/// mean frames were superseded before the session picked them up.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub seq: u64,
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}
