//! Stand-in field sources.
//!
//! A real capture device is outside this crate; it only needs to call
//! [`FieldSlot::publish`] with each new frame. [`SyntheticSource`] does the
//! same from a background thread with a soft light circling the frame, which
//! is enough to watch the field respond without a camera.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::field::{FieldSlot, VideoFrame};

/// Render one frame of a gaussian light spot orbiting the frame centre.
pub fn moving_light(width: u32, height: u32, t: f32) -> VideoFrame {
    let (w, h) = (width.max(1), height.max(1));
    let cx = 0.5 + 0.3 * (t * 0.7).cos();
    let cy = 0.5 + 0.25 * (t * 0.9).sin();
    let radius = 0.12;

    let mut rgb = Vec::with_capacity(w as usize * h as usize * 3);
    for y in 0..h {
        for x in 0..w {
            let dx = (x as f32 + 0.5) / w as f32 - cx;
            let dy = (y as f32 + 0.5) / h as f32 - cy;
            let glow = (-(dx * dx + dy * dy) / (2.0 * radius * radius)).exp();
            let value = (glow * 255.0).round() as u8;
            rgb.extend_from_slice(&[value, value, value]);
        }
    }

    match VideoFrame::from_rgb(w, h, &rgb) {
        Ok(frame) => frame,
        Err(_) => VideoFrame::solid(w, h, [0, 0, 0]),
    }
}

/// Background thread publishing [`moving_light`] frames at a fixed rate.
///
/// Dropping the source stops the thread and detaches the field.
pub struct SyntheticSource {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    slot: FieldSlot,
}

impl SyntheticSource {
    /// Start publishing `width`×`height` frames `fps` times a second.
    pub fn spawn(slot: FieldSlot, width: u32, height: u32, fps: u32) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let interval = Duration::from_secs_f32(1.0 / fps.max(1) as f32);
        let handle = {
            let stop = stop.clone();
            let slot = slot.clone();
            thread::spawn(move || {
                let start = Instant::now();
                while !stop.load(Ordering::Relaxed) {
                    let t = start.elapsed().as_secs_f32();
                    slot.publish(moving_light(width, height, t));
                    thread::sleep(interval);
                }
            })
        };
        log::info!("Synthetic field source: {}x{} at {} fps", width, height, fps);

        Self {
            stop,
            handle: Some(handle),
            slot,
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            join_publisher(handle);
        }
        self.slot.detach();
    }
}

/// Wait for a publisher thread. Returns `false` if it panicked.
fn join_publisher(handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::warn!("Field source thread panicked: {}", reason);
            false
        }
    }
}
