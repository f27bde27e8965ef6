// src/camera.rs
//
// Webcam capture on a dedicated thread. The thread owns the VideoCapture
// and publishes only the newest frame through a watch channel, so a slow
// pipeline iteration skips stale frames instead of queueing them.

use crate::error::CaptureError;
use crate::session::FrameSource;
use crate::types::{CameraConfig, Frame};
use anyhow::{anyhow, Context, Result};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Back-off after the driver hands back an empty frame.
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(5);
/// How long drop waits for a capture thread stuck inside a driver read.
const JOIN_GRACE: Duration = Duration::from_millis(500);
const JOIN_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum CapturePacket {
    Frame(Frame),
    Lost(String),
}

pub struct CameraSource {
    rx: watch::Receiver<Option<CapturePacket>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    read_timeout: Duration,
}

impl CameraSource {
    /// Opens the camera on the capture thread and waits for it to report
    /// whether the device is usable. Failure here is fatal for the session.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        info!("Opening camera {}", config.device_id);

        let (tx, rx) = watch::channel(None);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(i32, i32), String>>(1);
        let stop = Arc::new(AtomicBool::new(false));

        let worker_config = config.clone();
        let worker_stop = stop.clone();
        let worker = thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                let (cap, width, height) = match open_device(&worker_config) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok((width, height)));
                capture_loop(cap, tx, worker_stop);
            })
            .context("Failed to spawn capture thread")?;

        let (width, height) = ready_rx
            .recv()
            .map_err(|_| anyhow!("Capture thread exited before opening the camera"))?
            .map_err(|e| anyhow!("Camera {} unavailable: {}", config.device_id, e))?;

        info!("✓ Camera ready: {}x{}", width, height);

        Ok(Self {
            rx,
            stop,
            worker: Some(worker),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        })
    }
}

fn open_device(config: &CameraConfig) -> Result<(VideoCapture, i32, i32)> {
    let mut cap = VideoCapture::new(config.device_id, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        anyhow::bail!("Failed to open camera");
    }

    VideoCaptureTrait::set(&mut cap, videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
    VideoCaptureTrait::set(&mut cap, videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;

    let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
    let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
    Ok((cap, width, height))
}

fn capture_loop(
    mut cap: VideoCapture,
    tx: watch::Sender<Option<CapturePacket>>,
    stop: Arc<AtomicBool>,
) {
    let started = Instant::now();
    let mut seq: u64 = 0;

    while !stop.load(Ordering::Relaxed) && !tx.is_closed() {
        match read_rgb(&mut cap) {
            Ok(Some((data, width, height))) => {
                seq += 1;
                tx.send_replace(Some(CapturePacket::Frame(Frame {
                    data,
                    width,
                    height,
                    seq,
                    timestamp_ms: started.elapsed().as_secs_f64() * 1000.0,
                })));
            }
            Ok(None) => {
                // Nothing published: a camera that keeps returning empty
                // frames surfaces as read timeouts on the session side.
                thread::sleep(EMPTY_READ_BACKOFF);
            }
            Err(e) => {
                error!("Camera read failed: {}", e);
                tx.send_replace(Some(CapturePacket::Lost(e.to_string())));
                break;
            }
        }
    }

    debug!("Capture thread exiting after {} frames", seq);
    // `cap` dropped here releases the device
}

fn read_rgb(cap: &mut VideoCapture) -> Result<Option<(Vec<u8>, usize, usize)>> {
    let mut mat = Mat::default();
    if !VideoCaptureTrait::read(cap, &mut mat)? || mat.empty() {
        return Ok(None);
    }

    let mut rgb_mat = Mat::default();
    imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

    let data = rgb_mat.data_bytes()?.to_vec();
    Ok(Some((data, rgb_mat.cols() as usize, rgb_mat.rows() as usize)))
}

impl FrameSource for CameraSource {
    async fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        match tokio::time::timeout(self.read_timeout, self.rx.changed()).await {
            Err(_) => Err(CaptureError::Timeout(self.read_timeout)),
            Ok(Err(_)) => Err(CaptureError::Disconnected(
                "capture thread stopped".to_string(),
            )),
            Ok(Ok(())) => {
                let packet = self.rx.borrow_and_update().clone();
                match packet {
                    Some(CapturePacket::Frame(frame)) => Ok(frame),
                    Some(CapturePacket::Lost(reason)) => Err(CaptureError::Disconnected(reason)),
                    None => Err(CaptureError::Disconnected(
                        "capture thread published no frame".to_string(),
                    )),
                }
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if !join_with_grace(worker, JOIN_GRACE) {
                warn!("Capture thread still busy after {:?}, detaching it", JOIN_GRACE);
            }
        }
        info!("Camera released");
    }
}

/// Joins `worker` if it finishes within `grace`. A thread still running
/// after that is left detached and `false` is returned.
fn join_with_grace(worker: JoinHandle<()>, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while !worker.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    if worker.join().is_err() {
        warn!("Capture thread panicked");
    }
    true
}
