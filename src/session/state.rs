// src/session/state.rs

use super::smoother::PoseSmoother;
use crate::error::SessionError;
use crate::feedback::FeedbackResult;
use crate::pose::landmarks::IncompleteReason;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Cancelled,
    Failed(SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Running,
    Capturing,
    Processing,
    Rendering,
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session transition {:?} -> {:?}", self.from, self.to)
    }
}

impl SessionPhase {
    pub fn can_advance_to(&self, next: &SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, Capturing)
                | (Capturing, Processing)
                | (Processing, Rendering)
                | (Rendering, Running)
                // capture timeout retried: back to the iteration boundary
                | (Capturing, Running)
                | (Running, Stopped(_))
                | (Capturing, Stopped(_))
        )
    }

    pub fn advance(&mut self, next: SessionPhase) -> Result<(), InvalidTransition> {
        if !self.can_advance_to(&next) {
            return Err(InvalidTransition {
                from: self.clone(),
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionPhase::Stopped(_))
    }
}

/// What the pipeline made of the latest frame, before smoothing.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    /// Skeleton, angles and classification all produced.
    Tracked,
    /// Tracked, but some keypoints fell below the confidence threshold.
    Partial { missing: usize },
    NoSkeleton(IncompleteReason),
    NoAngles,
}

impl FrameStatus {
    pub fn message(&self) -> String {
        match self {
            FrameStatus::Tracked => "Tracking".to_string(),
            FrameStatus::Partial { missing } => {
                format!("Tracking ({} keypoints hidden)", missing)
            }
            FrameStatus::NoSkeleton(IncompleteReason::LowVisibility { visible, total }) => {
                format!("Step into view ({}/{} keypoints visible)", visible, total)
            }
            FrameStatus::NoSkeleton(IncompleteReason::InferenceFailed(_)) => {
                "Landmark detection unavailable".to_string()
            }
            FrameStatus::NoAngles => "Joints not visible".to_string(),
        }
    }
}

/// Cross-frame state. Only the session loop writes it, once per frame.
pub struct SessionState {
    pub phase: SessionPhase,
    pub smoother: PoseSmoother,
    pub displayed: Option<FeedbackResult>,
    pub last_status: FrameStatus,
    pub frames_without_skeleton: u32,
    pub consecutive_timeouts: u32,
    pub last_seq: Option<u64>,
}

impl SessionState {
    pub fn new(smoothing_window: usize) -> Self {
        Self {
            phase: SessionPhase::Idle,
            smoother: PoseSmoother::new(smoothing_window),
            displayed: None,
            last_status: FrameStatus::NoAngles,
            frames_without_skeleton: 0,
            consecutive_timeouts: 0,
            last_seq: None,
        }
    }

    /// Frames superseded between the previous pick-up and `seq`.
    pub fn note_seq(&mut self, seq: u64) -> u64 {
        let dropped = match self.last_seq {
            Some(prev) if seq > prev + 1 => seq - prev - 1,
            _ => 0,
        };
        self.last_seq = Some(seq);
        dropped
    }

    pub fn clear_feedback(&mut self) {
        self.smoother.reset();
        self.displayed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_iteration() {
        let mut phase = SessionPhase::Idle;
        for next in [
            SessionPhase::Running,
            SessionPhase::Capturing,
            SessionPhase::Processing,
            SessionPhase::Rendering,
            SessionPhase::Running,
            SessionPhase::Stopped(StopReason::Cancelled),
        ] {
            phase.advance(next).unwrap();
        }
        assert!(phase.is_stopped());
    }

    #[test]
    fn test_cannot_stop_mid_frame() {
        let mut phase = SessionPhase::Processing;
        assert!(phase
            .advance(SessionPhase::Stopped(StopReason::Cancelled))
            .is_err());
        assert_eq!(phase, SessionPhase::Processing);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut phase = SessionPhase::Stopped(StopReason::Cancelled);
        assert!(phase.advance(SessionPhase::Running).is_err());
    }

    #[test]
    fn test_capture_failure_stops() {
        let mut phase = SessionPhase::Capturing;
        let reason = StopReason::Failed(SessionError::CaptureTimeout { attempts: 3 });
        phase.advance(SessionPhase::Stopped(reason.clone())).unwrap();
        assert_eq!(phase, SessionPhase::Stopped(reason));
    }

    #[test]
    fn test_dropped_frame_count() {
        let mut state = SessionState::new(5);
        assert_eq!(state.note_seq(1), 0);
        assert_eq!(state.note_seq(2), 0);
        assert_eq!(state.note_seq(5), 2);
        assert_eq!(state.note_seq(5), 0);
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(FrameStatus::Tracked.message(), "Tracking");
        assert_eq!(
            FrameStatus::Partial { missing: 2 }.message(),
            "Tracking (2 keypoints hidden)"
        );
        assert_eq!(FrameStatus::NoAngles.message(), "Joints not visible");
    }
}
