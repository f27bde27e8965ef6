// src/session/mod.rs
//
// The live loop: capture, extract, measure, classify, smooth, score, render.
// All cross-frame state lives in `SessionState`; every stage it calls is a
// function of the current frame only.

pub mod feedback_log;
pub mod metrics;
pub mod smoother;
pub mod state;

use crate::classifier::{Classification, PoseLabel, PoseClassifier, PoseModel};
use crate::error::{AngleComputeError, CaptureError, SessionError};
use crate::feedback::{FeedbackGenerator, FeedbackResult, Strictness, Verdict};
use crate::overlay::{self, Overlay};
use crate::pose::{compute_angles_with_aspect, Extraction, LandmarkDetector, LandmarkExtractor};
use crate::reference::ReferenceStore;
use crate::types::{Frame, SessionConfig};
use feedback_log::FeedbackLog;
use metrics::SessionMetrics;
use state::{FrameStatus, SessionPhase, SessionState, StopReason};
use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Produces the newest available frame.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    async fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Continue,
    QuitRequested,
}

/// Shows a frame with its overlay. Failures are reported per frame and never
/// end the session.
pub trait FrameSink {
    fn show(&mut self, frame: &Frame, overlay: &Overlay) -> anyhow::Result<SinkEvent>;
}

/// Cooperative cancellation, honored at the next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Session<S, K, D, M>
where
    S: FrameSource,
    K: FrameSink,
    D: LandmarkDetector,
    M: PoseModel,
{
    source: S,
    sink: K,
    extractor: LandmarkExtractor<D>,
    classifier: PoseClassifier<M>,
    references: ReferenceStore,
    strictness: Strictness,
    config: SessionConfig,
    max_consecutive_timeouts: u32,
    state: SessionState,
    metrics: SessionMetrics,
    stop: StopHandle,
    feedback_log: Option<FeedbackLog<BufWriter<File>>>,
}

impl<S, K, D, M> Session<S, K, D, M>
where
    S: FrameSource,
    K: FrameSink,
    D: LandmarkDetector,
    M: PoseModel,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        sink: K,
        extractor: LandmarkExtractor<D>,
        classifier: PoseClassifier<M>,
        references: ReferenceStore,
        strictness: Strictness,
        config: SessionConfig,
        max_consecutive_timeouts: u32,
    ) -> Self {
        let state = SessionState::new(config.smoothing_window);
        Self {
            source,
            sink,
            extractor,
            classifier,
            references,
            strictness,
            config,
            max_consecutive_timeouts: max_consecutive_timeouts.max(1),
            state,
            metrics: SessionMetrics::new(),
            stop: StopHandle::new(),
            feedback_log: None,
        }
    }

    pub fn with_feedback_log(mut self, log: FeedbackLog<BufWriter<File>>) -> Self {
        self.feedback_log = Some(log);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs until cancelled or capture fails for good.
    pub async fn run(&mut self) -> StopReason {
        info!(
            "▶ Session started (window {}, target {} FPS, strictness {:?})",
            self.config.smoothing_window, self.config.target_fps, self.strictness
        );
        self.transition(SessionPhase::Running);

        let frame_budget = Duration::from_secs_f64(1.0 / self.config.target_fps.max(1) as f64);

        loop {
            if self.stop.is_stop_requested() {
                info!("Stop requested");
                return self.finish(StopReason::Cancelled);
            }

            self.transition(SessionPhase::Capturing);
            let frame = match self.source.next_frame().await {
                Ok(frame) => {
                    self.state.consecutive_timeouts = 0;
                    frame
                }
                Err(CaptureError::Timeout(after)) => {
                    self.state.consecutive_timeouts += 1;
                    self.metrics.inc(&self.metrics.capture_timeouts);
                    warn!(
                        "No frame within {:?} ({}/{})",
                        after, self.state.consecutive_timeouts, self.max_consecutive_timeouts
                    );
                    if self.state.consecutive_timeouts >= self.max_consecutive_timeouts {
                        return self.finish(StopReason::Failed(SessionError::CaptureTimeout {
                            attempts: self.state.consecutive_timeouts,
                        }));
                    }
                    self.transition(SessionPhase::Running);
                    continue;
                }
                Err(CaptureError::Disconnected(reason)) => {
                    return self.finish(StopReason::Failed(SessionError::CaptureLost(reason)));
                }
            };

            let started = Instant::now();
            let dropped = self.state.note_seq(frame.seq);
            if dropped > 0 {
                self.metrics.add(&self.metrics.frames_dropped, dropped);
                debug!("Skipped {} stale frame(s) before {}", dropped, frame.seq);
            }

            self.transition(SessionPhase::Processing);
            let extraction = self.extractor.extract(&frame);
            let status = self.process(&frame, &extraction);

            self.transition(SessionPhase::Rendering);
            let overlay = overlay::compose(
                self.state.displayed.as_ref(),
                extraction.skeleton(),
                &status,
                self.config.max_messages,
            );
            self.state.last_status = status;
            match self.sink.show(&frame, &overlay) {
                Ok(SinkEvent::Continue) => {}
                Ok(SinkEvent::QuitRequested) => {
                    info!("Quit key pressed");
                    self.stop.request_stop();
                }
                Err(e) => {
                    self.metrics.inc(&self.metrics.display_failures);
                    warn!("Display failed on frame {}: {}", frame.seq, e);
                }
            }

            let elapsed = started.elapsed();
            self.metrics.inc(&self.metrics.frames_processed);
            self.metrics.record_processing(elapsed.as_micros() as u64);
            if elapsed > frame_budget {
                self.metrics.inc(&self.metrics.budget_overruns);
                debug!(
                    "Frame {} took {:.1}ms (budget {:.1}ms)",
                    frame.seq,
                    elapsed.as_secs_f64() * 1000.0,
                    frame_budget.as_secs_f64() * 1000.0
                );
            }

            let processed = self.metrics.frames_processed.load(Ordering::Relaxed);
            if self.config.stats_interval_frames > 0
                && processed % self.config.stats_interval_frames == 0
            {
                self.log_stats();
            }

            self.transition(SessionPhase::Running);
        }
    }

    /// One frame through geometry, classification, smoothing and scoring.
    /// Updates the displayed feedback and returns what happened to the frame.
    fn process(&mut self, frame: &Frame, extraction: &Extraction) -> FrameStatus {
        let skeleton = match extraction {
            Extraction::Complete(skeleton) => skeleton,
            Extraction::Incomplete(reason) => {
                self.metrics.inc(&self.metrics.incomplete_skeletons);
                self.note_unusable_frame();
                return FrameStatus::NoSkeleton(reason.clone());
            }
        };

        let features = match compute_angles_with_aspect(skeleton, frame.aspect_ratio()) {
            Ok(features) => features,
            Err(AngleComputeError::NoDefinedAngles { missing }) => {
                self.metrics.inc(&self.metrics.undefined_geometry);
                debug!("Frame {}: no joint angle defined ({} keypoints missing)", frame.seq, missing);
                self.note_unusable_frame();
                return FrameStatus::NoAngles;
            }
        };
        self.state.frames_without_skeleton = 0;
        if !features.is_fully_defined() {
            debug!("Frame {}: undefined angles {:?}", frame.seq, features.undefined_joints());
        }
        let tracked = if skeleton.is_complete() {
            FrameStatus::Tracked
        } else {
            FrameStatus::Partial {
                missing: skeleton.missing().len(),
            }
        };

        let classification = self.classifier.classify(&features);
        if classification.label == PoseLabel::Unknown {
            self.metrics.inc(&self.metrics.unknown_poses);
        }

        let Some(displayed) = self.state.smoother.push(classification.label, features) else {
            // no label has held a majority yet
            return tracked;
        };

        let shown = self.displayed_classification(displayed, &classification);
        let smoothed = self.state.smoother.smoothed_features();
        let feedback = FeedbackGenerator::new(&self.references, self.strictness)
            .generate(&shown, &smoothed);

        match feedback.verdict {
            Verdict::Correct => self.metrics.inc(&self.metrics.correct_frames),
            Verdict::NoGuidance => self.metrics.inc(&self.metrics.no_guidance),
            Verdict::NeedsCorrection | Verdict::NotRecognized => {}
        }

        self.record_feedback(frame, &feedback);
        self.state.displayed = Some(feedback);
        tracked
    }

    /// Confidence shown with the smoothed label is this frame's probability
    /// for that label, not the probability of the raw winner.
    fn displayed_classification(&self, displayed: PoseLabel, raw: &Classification) -> Classification {
        let confidence = match displayed {
            PoseLabel::Known(class) => self
                .classifier
                .labels()
                .iter()
                .position(|c| *c == class)
                .and_then(|i| raw.probabilities.get(i).copied())
                .unwrap_or(0.0),
            PoseLabel::Unknown => raw.confidence,
        };
        Classification {
            label: displayed,
            confidence,
            probabilities: raw.probabilities.clone(),
        }
    }

    fn note_unusable_frame(&mut self) {
        self.state.frames_without_skeleton += 1;
        if self.state.frames_without_skeleton == self.config.max_stale_frames {
            debug!(
                "No usable skeleton for {} frames, clearing feedback",
                self.state.frames_without_skeleton
            );
            self.state.clear_feedback();
        }
    }

    fn record_feedback(&mut self, frame: &Frame, feedback: &FeedbackResult) {
        let Some(log) = self.feedback_log.as_mut() else {
            return;
        };
        if let Err(e) = log.record(frame.seq, frame.timestamp_ms, feedback) {
            warn!("Feedback log write failed, disabling it: {}", e);
            self.feedback_log = None;
        }
    }

    fn transition(&mut self, next: SessionPhase) {
        if let Err(e) = self.state.phase.advance(next) {
            error!("{}", e);
        }
    }

    fn finish(&mut self, reason: StopReason) -> StopReason {
        match &reason {
            StopReason::Cancelled => info!("■ Session stopped"),
            StopReason::Failed(e) => error!("Session failed: {}", e),
        }
        self.transition(SessionPhase::Stopped(reason.clone()));
        self.log_stats();
        reason
    }

    fn log_stats(&self) {
        let s = self.metrics.summary();
        info!(
            "📊 {} frames | {:.1} FPS | avg {:.1}ms | dropped {} | no skeleton {} | unknown {} | correct {} | overruns {}",
            s.frames_processed,
            s.fps,
            s.avg_processing_us as f64 / 1000.0,
            s.frames_dropped,
            s.incomplete_skeletons,
            s.unknown_poses,
            s.correct_frames,
            s.budget_overruns
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ModelMetadata, PoseClass};
    use crate::pose::{Keypoint, KeypointKind};
    use crate::types::ClassifierConfig;
    use anyhow::{anyhow, Result};
    use std::collections::VecDeque;

    const LABELS: [PoseClass; 5] = [
        PoseClass::Downdog,
        PoseClass::Goddess,
        PoseClass::Plank,
        PoseClass::Tree,
        PoseClass::Warrior2,
    ];

    fn frame(seq: u64) -> Frame {
        Frame {
            data: vec![0; 8 * 8 * 3],
            width: 8,
            height: 8,
            seq,
            timestamp_ms: seq as f64 * 33.0,
        }
    }

    struct ScriptedSource(VecDeque<Result<Frame, CaptureError>>);

    impl ScriptedSource {
        fn frames(count: u64) -> Self {
            Self((1..=count).map(|seq| Ok(frame(seq))).collect())
        }
    }

    impl FrameSource for ScriptedSource {
        async fn next_frame(&mut self) -> Result<Frame, CaptureError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(CaptureError::Disconnected("script exhausted".to_string())))
        }
    }

    /// Records overlays; asks to quit after `quit_after` frames.
    #[derive(Default)]
    struct RecordingSink {
        shown: Vec<Overlay>,
        quit_after: Option<usize>,
        fail: bool,
    }

    impl FrameSink for RecordingSink {
        fn show(&mut self, _frame: &Frame, overlay: &Overlay) -> Result<SinkEvent> {
            if self.fail {
                return Err(anyhow!("no display"));
            }
            self.shown.push(overlay.clone());
            match self.quit_after {
                Some(n) if self.shown.len() >= n => Ok(SinkEvent::QuitRequested),
                _ => Ok(SinkEvent::Continue),
            }
        }
    }

    /// Whole body visible in a standing posture, or nothing at all.
    /// `hidden` drops one keypoint below the confidence threshold.
    struct StandingDetector {
        visible: bool,
        hidden: Option<KeypointKind>,
    }

    impl LandmarkDetector for StandingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Keypoint>> {
            Ok(KeypointKind::ALL
                .iter()
                .map(|k| {
                    let (x, y) = standing_position(*k);
                    let shown = self.visible && self.hidden != Some(*k);
                    let confidence = if shown { 0.9 } else { 0.0 };
                    Keypoint::new(*k, x, y, confidence)
                })
                .collect())
        }
    }

    fn standing_position(kind: KeypointKind) -> (f32, f32) {
        use KeypointKind::*;
        match kind {
            Nose | LeftEye | RightEye | LeftEar | RightEar => (0.5, 0.1),
            LeftShoulder => (0.45, 0.25),
            RightShoulder => (0.55, 0.25),
            LeftElbow => (0.45, 0.4),
            RightElbow => (0.55, 0.4),
            LeftWrist => (0.45, 0.55),
            RightWrist => (0.55, 0.55),
            LeftHip => (0.46, 0.55),
            RightHip => (0.54, 0.55),
            LeftKnee => (0.46, 0.72),
            RightKnee => (0.54, 0.72),
            LeftAnkle => (0.46, 0.9),
            RightAnkle => (0.54, 0.9),
        }
    }

    /// Pops one score vector per call, repeating the last one when drained.
    struct ScriptedModel {
        outputs: VecDeque<Vec<f32>>,
        last: Vec<f32>,
    }

    impl ScriptedModel {
        fn new(outputs: Vec<Vec<f32>>) -> Self {
            let last = outputs.last().cloned().unwrap_or_default();
            // first call is the probe at construction
            let mut outputs: VecDeque<Vec<f32>> = outputs.into();
            outputs.push_front(vec![0.2; LABELS.len()]);
            Self { outputs, last }
        }
    }

    impl PoseModel for ScriptedModel {
        fn predict(&mut self, _input: &[f32]) -> Result<Vec<f32>> {
            Ok(self.outputs.pop_front().unwrap_or_else(|| self.last.clone()))
        }
    }

    fn scores(class: PoseClass, p: f32) -> Vec<f32> {
        let rest = (1.0 - p) / (LABELS.len() - 1) as f32;
        LABELS
            .iter()
            .map(|c| if *c == class { p } else { rest })
            .collect()
    }

    fn session(
        source: ScriptedSource,
        sink: RecordingSink,
        visible: bool,
        outputs: Vec<Vec<f32>>,
    ) -> Session<ScriptedSource, RecordingSink, StandingDetector, ScriptedModel> {
        let config = ClassifierConfig::default();
        let classifier = PoseClassifier::new(
            ScriptedModel::new(outputs),
            &ModelMetadata::current(&LABELS),
            &config,
        )
        .unwrap();
        let session_config = SessionConfig {
            smoothing_window: 5,
            max_stale_frames: 3,
            show_window: false,
            ..SessionConfig::default()
        };
        Session::new(
            source,
            sink,
            LandmarkExtractor::new(
                StandingDetector {
                    visible,
                    hidden: None,
                },
                0.3,
                0.6,
            ),
            classifier,
            ReferenceStore::builtin(),
            Strictness::Required,
            session_config,
            3,
        )
    }

    #[tokio::test]
    async fn test_three_timeouts_stop_the_session() {
        let timeout = || Err(CaptureError::Timeout(Duration::from_millis(1000)));
        let source = ScriptedSource(VecDeque::from(vec![timeout(), timeout(), timeout()]));
        let mut s = session(source, RecordingSink::default(), true, vec![scores(PoseClass::Tree, 0.9)]);

        let reason = s.run().await;
        assert_eq!(
            reason,
            StopReason::Failed(SessionError::CaptureTimeout { attempts: 3 })
        );
        assert!(s.state().phase.is_stopped());
        assert_eq!(s.metrics().summary().capture_timeouts, 3);
        assert_eq!(s.metrics().summary().frames_processed, 0);
    }

    #[tokio::test]
    async fn test_timeout_counter_resets_on_frame() {
        let timeout = || Err(CaptureError::Timeout(Duration::from_millis(1000)));
        let source = ScriptedSource(VecDeque::from(vec![
            timeout(),
            timeout(),
            Ok(frame(1)),
            timeout(),
            timeout(),
            Ok(frame(2)),
        ]));
        let sink = RecordingSink {
            quit_after: Some(2),
            ..Default::default()
        };
        let mut s = session(source, sink, true, vec![scores(PoseClass::Tree, 0.9)]);

        assert_eq!(s.run().await, StopReason::Cancelled);
        assert_eq!(s.metrics().summary().capture_timeouts, 4);
    }

    #[tokio::test]
    async fn test_disconnect_is_fatal() {
        let source = ScriptedSource(VecDeque::from(vec![
            Ok(frame(1)),
            Err(CaptureError::Disconnected("unplugged".to_string())),
        ]));
        let mut s = session(source, RecordingSink::default(), true, vec![scores(PoseClass::Tree, 0.9)]);

        assert_eq!(
            s.run().await,
            StopReason::Failed(SessionError::CaptureLost("unplugged".to_string()))
        );
        assert_eq!(s.metrics().summary().frames_processed, 1);
    }

    #[tokio::test]
    async fn test_stop_handle_checked_before_capture() {
        let mut s = session(
            ScriptedSource::frames(10),
            RecordingSink::default(),
            true,
            vec![scores(PoseClass::Tree, 0.9)],
        );
        s.stop_handle().request_stop();

        assert_eq!(s.run().await, StopReason::Cancelled);
        assert_eq!(s.metrics().summary().frames_processed, 0);
    }

    #[tokio::test]
    async fn test_quit_key_stops_after_current_frame() {
        let sink = RecordingSink {
            quit_after: Some(2),
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(10), sink, true, vec![scores(PoseClass::Tree, 0.9)]);

        assert_eq!(s.run().await, StopReason::Cancelled);
        assert_eq!(s.metrics().summary().frames_processed, 2);
        assert_eq!(
            s.state().phase,
            SessionPhase::Stopped(StopReason::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_display_failure_is_not_fatal() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(4), sink, true, vec![scores(PoseClass::Tree, 0.9)]);

        // ends when the script runs out, not at the first display error
        assert!(matches!(
            s.run().await,
            StopReason::Failed(SessionError::CaptureLost(_))
        ));
        let summary = s.metrics().summary();
        assert_eq!(summary.frames_processed, 4);
        assert_eq!(summary.display_failures, 4);
    }

    #[tokio::test]
    async fn test_incomplete_skeleton_skips_feedback() {
        let sink = RecordingSink {
            quit_after: Some(3),
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(10), sink, false, vec![scores(PoseClass::Tree, 0.9)]);

        s.run().await;
        assert!(s.state().displayed.is_none());
        assert_eq!(s.state().smoother.history_size(), 0);
        assert_eq!(s.metrics().summary().incomplete_skeletons, 3);
        assert!(matches!(s.state().last_status, FrameStatus::NoSkeleton(_)));
        assert_eq!(s.sink.shown[0].status, "Step into view (0/17 keypoints visible)");
    }

    #[tokio::test]
    async fn test_single_outlier_does_not_change_label() {
        let outputs = vec![
            scores(PoseClass::Warrior2, 0.9),
            scores(PoseClass::Warrior2, 0.9),
            scores(PoseClass::Tree, 0.9),
            scores(PoseClass::Warrior2, 0.9),
            scores(PoseClass::Warrior2, 0.9),
        ];
        let sink = RecordingSink {
            quit_after: Some(5),
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(10), sink, true, outputs);

        s.run().await;
        let displayed = s.state().displayed.as_ref().unwrap();
        assert_eq!(displayed.label, PoseLabel::Known(PoseClass::Warrior2));
        assert_eq!(s.state().smoother.displayed(), Some(PoseLabel::Known(PoseClass::Warrior2)));
    }

    #[tokio::test]
    async fn test_low_confidence_reads_not_recognized() {
        let sink = RecordingSink {
            quit_after: Some(5),
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(10), sink, true, vec![scores(PoseClass::Tree, 0.4)]);

        s.run().await;
        let displayed = s.state().displayed.as_ref().unwrap();
        assert_eq!(displayed.label, PoseLabel::Unknown);
        assert_eq!(displayed.verdict, Verdict::NotRecognized);
        assert!(displayed.corrections.is_empty());
        assert_eq!(s.metrics().summary().unknown_poses, 5);

        let last = s.sink.shown.last().unwrap();
        assert_eq!(last.headline.as_ref().unwrap().0, "Pose not recognized");
    }

    #[tokio::test]
    async fn test_feedback_cleared_after_stale_frames() {
        let mut s = session(
            ScriptedSource::frames(5),
            RecordingSink::default(),
            true,
            vec![scores(PoseClass::Tree, 0.9)],
        );
        s.run().await;
        assert!(s.state().displayed.is_some());

        // same session state, person leaves the frame
        let detector = StandingDetector {
            visible: false,
            hidden: None,
        };
        s.extractor = LandmarkExtractor::new(detector, 0.3, 0.6);
        s.source = ScriptedSource((6..=8).map(|seq| Ok(frame(seq))).collect());
        s.state.phase = SessionPhase::Idle;
        s.run().await;

        assert!(s.state().displayed.is_none());
        assert_eq!(s.state().frames_without_skeleton, 3);
    }

    #[tokio::test]
    async fn test_hidden_keypoint_reports_partial_tracking() {
        let sink = RecordingSink {
            quit_after: Some(5),
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(10), sink, true, vec![scores(PoseClass::Tree, 0.9)]);
        let detector = StandingDetector {
            visible: true,
            hidden: Some(KeypointKind::LeftAnkle),
        };
        s.extractor = LandmarkExtractor::new(detector, 0.3, 0.6);

        s.run().await;
        assert_eq!(s.state().last_status, FrameStatus::Partial { missing: 1 });
        assert_eq!(s.sink.shown[0].status, "Tracking (1 keypoints hidden)");
        // still scored, with the left knee unmeasured
        let displayed = s.state().displayed.as_ref().unwrap();
        assert_eq!(displayed.label, PoseLabel::Known(PoseClass::Tree));
        assert_eq!(s.metrics().summary().incomplete_skeletons, 0);
    }

    #[tokio::test]
    async fn test_full_skeleton_reports_tracking() {
        let sink = RecordingSink {
            quit_after: Some(1),
            ..Default::default()
        };
        let mut s = session(ScriptedSource::frames(3), sink, true, vec![scores(PoseClass::Tree, 0.9)]);

        s.run().await;
        assert_eq!(s.state().last_status, FrameStatus::Tracked);
        assert_eq!(s.sink.shown[0].status, "Tracking");
    }

    #[tokio::test]
    async fn test_sequence_gaps_count_as_dropped() {
        let source = ScriptedSource(VecDeque::from(vec![Ok(frame(1)), Ok(frame(4)), Ok(frame(5))]));
        let mut s = session(source, RecordingSink::default(), true, vec![scores(PoseClass::Tree, 0.9)]);

        s.run().await;
        assert_eq!(s.metrics().summary().frames_dropped, 2);
    }

    #[test]
    fn test_stop_handle_is_shared() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stop_requested());
        clone.request_stop();
        assert!(handle.is_stop_requested());
    }
}
