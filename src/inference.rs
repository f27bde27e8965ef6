// src/inference.rs

use anyhow::{Context, Result};
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{debug, info};

/// Single-input, single-output ONNX session shared by the landmark and
/// classifier models. Loaded once and owned by whoever runs it.
pub struct InferenceEngine {
    session: Session,
    input_name: String,
    model_path: String,
}

impl InferenceEngine {
    pub fn new(model_path: &str, input_name: &str, num_threads: usize, use_cuda: bool) -> Result<Self> {
        info!("Loading ONNX model: {}", model_path);

        let mut session_builder = Session::builder()?;

        if use_cuda {
            info!("Enabling CUDA execution provider");
            session_builder = session_builder.with_execution_providers([
                CUDAExecutionProvider::default().with_device_id(0).build(),
            ])?;
        }

        let session = session_builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_threads.max(1))?
            .with_inter_threads(1)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model {}", model_path))?;

        info!("✓ Model ready: {}", model_path);

        Ok(Self {
            session,
            input_name: input_name.to_string(),
            model_path: model_path.to_string(),
        })
    }

    pub fn infer(&mut self, shape: &[usize], input: &[f32]) -> Result<Vec<f32>> {
        debug!("Running inference on {}", self.model_path);

        let input_value =
            ort::value::Value::from_array((shape, input.to_vec().into_boxed_slice()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Inference failed")?;

        let output = &outputs[0];
        let (_, data_slice) = output.try_extract_tensor::<f32>()?;

        Ok(data_slice.to_vec())
    }
}
