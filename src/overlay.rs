// src/overlay.rs
//
// Overlay composition is pure data (testable without a display); drawing
// and the preview window go through OpenCV.

use crate::feedback::{FeedbackResult, Verdict};
use crate::pose::geometry::JointAngle;
use crate::pose::skeleton::{Skeleton, EDGES};
use crate::session::state::FrameStatus;
use crate::session::{FrameSink, SinkEvent};
use crate::types::Frame;
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    highgui, imgproc,
    prelude::*,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointMark {
    Ok,
    Flagged,
    Unverified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub status: String,
    pub headline: Option<(String, Tone)>,
    pub messages: Vec<String>,
    /// Normalized endpoints of limbs whose keypoints are both present.
    pub edges: Vec<((f32, f32), (f32, f32))>,
    pub joints: Vec<(JointAngle, (f32, f32), JointMark)>,
}

pub fn compose(
    feedback: Option<&FeedbackResult>,
    skeleton: Option<&Skeleton>,
    status: &FrameStatus,
    max_messages: usize,
) -> Overlay {
    let headline = feedback.map(|f| {
        let tone = match f.verdict {
            Verdict::Correct => Tone::Good,
            Verdict::NeedsCorrection => Tone::Warn,
            Verdict::NotRecognized | Verdict::NoGuidance => Tone::Neutral,
        };
        (f.summary(), tone)
    });

    let messages = feedback
        .map(|f| {
            f.corrections
                .iter()
                .take(max_messages)
                .map(|c| c.message.clone())
                .collect()
        })
        .unwrap_or_default();

    let mut edges = Vec::new();
    let mut joints = Vec::new();
    if let Some(skeleton) = skeleton {
        for (a, b) in EDGES {
            if let (Some(pa), Some(pb)) = (skeleton.get(a), skeleton.get(b)) {
                edges.push(((pa.x, pa.y), (pb.x, pb.y)));
            }
        }

        for joint in JointAngle::ALL {
            let Some(vertex) = skeleton.get(joint.vertex()) else {
                continue;
            };
            let mark = match feedback {
                Some(f) if f.is_flagged(joint) => JointMark::Flagged,
                Some(f) if f.unverified.contains(&joint) => JointMark::Unverified,
                _ => JointMark::Ok,
            };
            joints.push((joint, (vertex.x, vertex.y), mark));
        }
    }

    Overlay {
        status: status.message(),
        headline,
        messages,
        edges,
        joints,
    }
}

fn tone_color(tone: Tone) -> core::Scalar {
    match tone {
        Tone::Good => core::Scalar::new(0.0, 200.0, 0.0, 0.0),
        Tone::Warn => core::Scalar::new(0.0, 165.0, 255.0, 0.0),
        Tone::Neutral => core::Scalar::new(220.0, 220.0, 220.0, 0.0),
    }
}

fn mark_color(mark: JointMark) -> core::Scalar {
    match mark {
        JointMark::Ok => core::Scalar::new(0.0, 255.0, 0.0, 0.0),
        JointMark::Flagged => core::Scalar::new(0.0, 0.0, 255.0, 0.0),
        JointMark::Unverified => core::Scalar::new(0.0, 255.0, 255.0, 0.0),
    }
}

/// Draw the overlay on a copy of the frame. Returns a BGR image.
pub fn render(frame: &Frame, overlay: &Overlay) -> Result<Mat> {
    let mat = Mat::from_slice(&frame.data)?;
    let mat = mat.reshape(3, frame.height as i32)?;

    let mut output = Mat::default();
    imgproc::cvt_color(&mat, &mut output, imgproc::COLOR_RGB2BGR, 0)?;

    let w = frame.width as f32;
    let h = frame.height as f32;
    let to_px = |p: (f32, f32)| core::Point::new((p.0 * w) as i32, (p.1 * h) as i32);

    // Skeleton
    for (a, b) in &overlay.edges {
        imgproc::line(
            &mut output,
            to_px(*a),
            to_px(*b),
            core::Scalar::new(255.0, 255.0, 255.0, 0.0),
            2,
            imgproc::LINE_AA,
            0,
        )?;
    }
    for (_, point, mark) in &overlay.joints {
        imgproc::circle(
            &mut output,
            to_px(*point),
            7,
            mark_color(*mark),
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }

    // Info panel background
    let panel_height = 58 + 24 * overlay.messages.len() as i32;
    imgproc::rectangle(
        &mut output,
        core::Rect::new(5, 5, (frame.width as i32 - 10).max(1), panel_height),
        core::Scalar::new(40.0, 40.0, 40.0, 0.0),
        -1,
        imgproc::LINE_8,
        0,
    )?;

    if let Some((headline, tone)) = &overlay.headline {
        imgproc::put_text(
            &mut output,
            headline,
            core::Point::new(15, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            tone_color(*tone),
            2,
            imgproc::LINE_8,
            false,
        )?;
    }

    imgproc::put_text(
        &mut output,
        &overlay.status,
        core::Point::new(15, 52),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.45,
        core::Scalar::new(200.0, 200.0, 200.0, 0.0),
        1,
        imgproc::LINE_8,
        false,
    )?;

    for (i, message) in overlay.messages.iter().enumerate() {
        imgproc::put_text(
            &mut output,
            message,
            core::Point::new(15, 78 + 24 * i as i32),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.55,
            core::Scalar::new(0.0, 0.0, 255.0, 0.0),
            1,
            imgproc::LINE_AA,
            false,
        )?;
    }

    Ok(output)
}

/// Desktop preview window. `q` or Esc asks the session to stop.
pub struct WindowSink {
    title: String,
}

impl WindowSink {
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        info!("✓ Preview window opened: {}", title);
        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl FrameSink for WindowSink {
    fn show(&mut self, frame: &Frame, overlay: &Overlay) -> Result<SinkEvent> {
        let image = render(frame, overlay)?;
        highgui::imshow(&self.title, &image)?;

        let key = highgui::wait_key(1)?;
        if key == 'q' as i32 || key == 27 {
            return Ok(SinkEvent::QuitRequested);
        }
        Ok(SinkEvent::Continue)
    }
}

impl Drop for WindowSink {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            debug!("Failed to close preview window: {}", e);
        }
    }
}

/// Sink for headless runs: nothing is drawn.
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _frame: &Frame, _overlay: &Overlay) -> Result<SinkEvent> {
        Ok(SinkEvent::Continue)
    }
}
