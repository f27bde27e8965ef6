// src/session/feedback_log.rs
//
// Optional JSON Lines record of what the user was shown. One line per change
// of displayed label or verdict, not per frame.

use crate::classifier::PoseLabel;
use crate::feedback::{FeedbackResult, Verdict};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct FeedbackRecord<'a> {
    wall_time: chrono::DateTime<chrono::Utc>,
    frame_seq: u64,
    timestamp_ms: f64,
    feedback: &'a FeedbackResult,
}

pub struct FeedbackLog<W: Write> {
    writer: W,
    last: Option<(PoseLabel, Verdict)>,
}

impl FeedbackLog<BufWriter<File>> {
    pub fn create(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create feedback log {}", path))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FeedbackLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last: None }
    }

    /// Writes `feedback` if its label or verdict differs from the last
    /// record. Returns whether a line was written.
    pub fn record(
        &mut self,
        frame_seq: u64,
        timestamp_ms: f64,
        feedback: &FeedbackResult,
    ) -> Result<bool> {
        let key = (feedback.label, feedback.verdict);
        if self.last == Some(key) {
            return Ok(false);
        }
        self.last = Some(key);

        let record = FeedbackRecord {
            wall_time: chrono::Utc::now(),
            frame_seq,
            timestamp_ms,
            feedback,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
