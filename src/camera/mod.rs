//! Camera capture.
//!
//! Cross-platform capture via nokhwa. Frames are decoded to RGBA on a
//! background thread; the render thread takes the latest frame from a shared
//! slot. Device or stream failures land in the status, never panic.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("failed to start capture thread: {0}")]
    Thread(#[from] io::Error),
}

/// One decoded RGBA frame.
#[derive(Clone)]
pub struct CameraFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub frame_number: u64,
    pub timestamp: Instant,
}

impl CameraFrame {
    /// View the frame as an owned image for the vision pipeline.
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// An enumerated capture device.
#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: u32,
    pub name: String,
}

/// Where the capture thread currently stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraStatus {
    Connecting,
    Streaming { name: String, width: u32, height: u32 },
    Failed(String),
}

/// Live camera capture with a background decode thread.
pub struct CameraCapture {
    latest: Arc<Mutex<Option<CameraFrame>>>,
    status: Arc<Mutex<CameraStatus>>,
    frame_count: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CameraCapture {
    /// Enumerate available cameras.
    pub fn list_devices() -> Vec<CameraDevice> {
        match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(found) => found
                .iter()
                .enumerate()
                .map(|(index, info)| CameraDevice {
                    index: index as u32,
                    name: info.human_name().to_string(),
                })
                .collect(),
            Err(e) => {
                log::warn!("camera enumeration failed: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Open `camera_index` and start capturing, preferring a format close to
    /// `width`x`height`.
    pub fn start(camera_index: u32, width: u32, height: u32) -> Result<Self, CameraError> {
        let latest = Arc::new(Mutex::new(None));
        let status = Arc::new(Mutex::new(CameraStatus::Connecting));
        let frame_count = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let latest = Arc::clone(&latest);
            let status = Arc::clone(&status);
            let frame_count = Arc::clone(&frame_count);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("camera-capture".to_string())
                .spawn(move || {
                    capture_loop(camera_index, width, height, latest, status, frame_count, running)
                })?
        };

        Ok(Self {
            latest,
            status,
            frame_count,
            running,
            thread: Some(thread),
        })
    }

    /// Latest decoded frame, if any arrived yet.
    pub fn latest_frame(&self) -> Option<CameraFrame> {
        self.latest.lock().clone()
    }

    pub fn status(&self) -> CameraStatus {
        self.status.lock().clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("camera capture thread ended abnormally");
            }
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the device with fallback formats, then decode frames until stopped.
fn capture_loop(
    camera_index: u32,
    width: u32,
    height: u32,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    status: Arc<Mutex<CameraStatus>>,
    frame_count: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) {
    log::info!("camera {} capture thread starting", camera_index);
    let index = CameraIndex::Index(camera_index);

    let attempts = [
        RequestedFormatType::HighestResolution(Resolution::new(width, height)),
        RequestedFormatType::AbsoluteHighestResolution,
        RequestedFormatType::None,
    ];
    let mut camera = None;
    for format_type in attempts {
        let requested = RequestedFormat::new::<RgbAFormat>(format_type);
        match Camera::new(index.clone(), requested) {
            Ok(c) => {
                camera = Some(c);
                break;
            }
            Err(e) => log::warn!("camera {} format attempt failed: {:?}", camera_index, e),
        }
    }
    let Some(mut camera) = camera else {
        *status.lock() = CameraStatus::Failed(format!("camera {} would not open", camera_index));
        return;
    };

    if let Err(e) = camera.open_stream() {
        *status.lock() = CameraStatus::Failed(format!("stream failed: {}", e));
        return;
    }
    let resolution = camera.resolution();
    log::info!(
        "camera opened: {} ({}x{})",
        camera.info().human_name(),
        resolution.width(),
        resolution.height()
    );
    *status.lock() = CameraStatus::Streaming {
        name: camera.info().human_name().to_string(),
        width: resolution.width(),
        height: resolution.height(),
    };

    while running.load(Ordering::Acquire) {
        match camera.frame() {
            Ok(frame) => match frame.decode_image::<RgbAFormat>() {
                Ok(decoded) => {
                    let frame_number = frame_count.fetch_add(1, Ordering::Relaxed);
                    let (w, h) = (decoded.width(), decoded.height());
                    *latest.lock() = Some(CameraFrame {
                        data: decoded.into_raw(),
                        width: w,
                        height: h,
                        frame_number,
                        timestamp: Instant::now(),
                    });
                }
                Err(e) => log::warn!("frame decode failed: {:?}", e),
            },
            Err(e) => {
                log::warn!("frame capture failed: {:?}", e);
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }
    }

    let _ = camera.stop_stream();
    log::info!("camera {} capture thread stopped", camera_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_image_dimensions() {
        let frame = CameraFrame {
            data: vec![0; 8 * 4 * 4],
            width: 8,
            height: 4,
            frame_number: 0,
            timestamp: Instant::now(),
        };
        let image = frame.to_image().expect("byte count matches dimensions");
        assert_eq!(image.dimensions(), (8, 4));
    }

    #[test]
    fn test_frame_to_image_rejects_short_buffer() {
        let frame = CameraFrame {
            data: vec![0; 10],
            width: 8,
            height: 4,
            frame_number: 0,
            timestamp: Instant::now(),
        };
        assert!(frame.to_image().is_none());
    }
}
