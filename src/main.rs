// src/main.rs

mod camera;
mod classifier;
mod config;
mod error;
mod feedback;
mod inference;
mod overlay;
mod pose;
mod preprocessing;
mod reference;
mod session;
mod types;

use anyhow::{Context, Result};
use camera::CameraSource;
use classifier::{ModelMetadata, OnnxPoseModel, PoseClassifier};
use overlay::{NullSink, WindowSink};
use pose::landmarks::OnnxPoseDetector;
use pose::LandmarkExtractor;
use reference::ReferenceStore;
use session::feedback_log::FeedbackLog;
use session::state::StopReason;
use session::{FrameSink, Session};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::Config;

const CONFIG_ENV: &str = "POSE_COACH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path =
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // Logging comes up before the config is parsed, so peek at the level
    let level = Config::load_or_default(&config_path)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("yoga_pose_coach={},ort=warn", level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🧘 Yoga Pose Coach starting");

    match run(&config_path).await {
        Ok(StopReason::Cancelled) => ExitCode::SUCCESS,
        Ok(StopReason::Failed(e)) => {
            error!("Stopped: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Fatal: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str) -> Result<StopReason> {
    let config = Config::load_or_default(config_path)?;
    info!("✓ Configuration loaded");

    let detector = OnnxPoseDetector::new(config.landmarks.clone())
        .context("Failed to load landmark model")?;
    let extractor = LandmarkExtractor::new(
        detector,
        config.landmarks.keypoint_confidence,
        config.landmarks.min_visible_fraction,
    );
    info!("✓ Landmark extractor ready");

    let classifier = build_classifier(&config)?;
    let references = build_references(&config, classifier.labels())?;

    let camera = CameraSource::open(&config.camera)?;

    if config.session.show_window {
        let sink = WindowSink::new(&config.session.window_title)?;
        run_session(config, camera, sink, extractor, classifier, references).await
    } else {
        info!("Preview window disabled");
        run_session(config, camera, NullSink, extractor, classifier, references).await
    }
}

fn build_classifier(config: &Config) -> Result<PoseClassifier<OnnxPoseModel>> {
    let metadata = ModelMetadata::load(&config.classifier.metadata_path)?;
    let model = OnnxPoseModel::new(&config.classifier).map_err(|e| {
        error::ClassifierError::Unavailable(format!("{}: {:#}", config.classifier.model_path, e))
    })?;
    Ok(PoseClassifier::new(model, &metadata, &config.classifier)?)
}

fn build_references(config: &Config, labels: &[classifier::PoseClass]) -> Result<ReferenceStore> {
    let store = match &config.reference.table_path {
        Some(path) => ReferenceStore::load(path)?,
        None => ReferenceStore::builtin(),
    };

    for label in labels {
        if store.lookup(*label).is_err() {
            warn!("No reference pose for '{}'; it will show without guidance", label);
        }
    }
    info!(
        "✓ Reference table ready: {:?}, strictness {:?}",
        store.classes(),
        config.reference.strictness
    );
    Ok(store)
}

async fn run_session<K: FrameSink>(
    config: Config,
    camera: CameraSource,
    sink: K,
    extractor: LandmarkExtractor<OnnxPoseDetector>,
    classifier: PoseClassifier<OnnxPoseModel>,
    references: ReferenceStore,
) -> Result<StopReason> {
    let feedback_log = config
        .session
        .feedback_log
        .as_deref()
        .map(FeedbackLog::create)
        .transpose()?;

    let mut session = Session::new(
        camera,
        sink,
        extractor,
        classifier,
        references,
        config.reference.strictness,
        config.session.clone(),
        config.camera.max_consecutive_timeouts,
    );
    if let Some(log) = feedback_log {
        info!("Recording feedback changes");
        session = session.with_feedback_log(log);
    }

    let stop = session.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current frame");
            stop.request_stop();
        }
    });

    let reason = session.run().await;

    let summary = session.metrics().summary();
    match serde_json::to_string(&summary) {
        Ok(json) => info!("Session summary: {}", json),
        Err(e) => warn!("Failed to serialize session summary: {}", e),
    }

    Ok(reason)
}
