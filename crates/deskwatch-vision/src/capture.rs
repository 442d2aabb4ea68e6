//! Continuous frame capture on a dedicated thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use tracing::{info, warn};

use crate::error::VisionResult;
use crate::frame::{mirror, Frame};
use crate::grabbers::FrameGrabber;

struct Shared {
    frame: Mutex<Option<Frame>>,
    generation: AtomicU64,
}

/// Owns the capture loop and the single freshest frame.
///
/// `start` performs one synchronous probe capture (so a dead device fails
/// fast), then hands the grabber to a dedicated OS thread that replaces the
/// shared frame once per interval. Readers never block on a capture:
/// `latest` copies out whatever snapshot is current, with staleness bounded
/// by one capture interval.
pub struct FrameSource {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FrameSource {
    /// Begin continuous capture.
    ///
    /// Fails with the grabber's error (typically `DeviceUnavailable`) if the
    /// probe capture fails; transient failures after that only skip a cycle.
    pub fn start(mut grabber: Box<dyn FrameGrabber>, interval: Duration) -> VisionResult<Self> {
        let shared = Arc::new(Shared {
            frame: Mutex::new(None),
            generation: AtomicU64::new(0),
        });

        info!(backend = %grabber.describe(), ?interval, "Starting frame capture");
        publish(&shared, grabber.grab()?);

        let running = Arc::new(AtomicBool::new(true));
        let thread_shared = Arc::clone(&shared);
        let thread_running = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || {
                while thread_running.load(Ordering::Relaxed) {
                    let cycle_start = Instant::now();
                    match grabber.grab() {
                        Ok(image) => publish(&thread_shared, image),
                        Err(e) => warn!("Capture cycle failed, retaining previous frame: {}", e),
                    }
                    if let Some(remaining) = interval.checked_sub(cycle_start.elapsed()) {
                        std::thread::sleep(remaining);
                    }
                }
            })
            .map_err(|e| crate::error::VisionError::capture(format!("capture thread: {e}")))?;

        Ok(Self {
            shared,
            running,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// The freshest captured frame, as an independent copy. Never blocks
    /// waiting for a new capture.
    pub fn latest(&self) -> Option<Frame> {
        self.shared
            .frame
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Generation counter of the newest capture.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Terminate capture and release the device. Idempotent.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            info!("Stopping frame capture");
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn publish(shared: &Shared, image: image::RgbImage) {
    let generation = shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
    let frame = Frame::new(mirror(&image), SystemTime::now(), generation);
    *shared.frame.lock().unwrap_or_else(|e| e.into_inner()) = Some(frame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisionError;
    use crate::grabbers::SyntheticGrabber;
    use image::RgbImage;

    #[test]
    fn test_probe_frame_is_available_immediately() {
        let source = FrameSource::start(
            Box::new(SyntheticGrabber::new(64, 48)),
            Duration::from_millis(10),
        )
        .unwrap();

        let frame = source.latest().expect("probe frame should be published");
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert!(frame.generation() >= 1);
        source.stop();
    }

    #[test]
    fn test_generation_advances_while_running() {
        let source = FrameSource::start(
            Box::new(SyntheticGrabber::new(32, 24)),
            Duration::from_millis(5),
        )
        .unwrap();

        let first = source.generation();
        std::thread::sleep(Duration::from_millis(50));
        assert!(source.generation() > first);
        source.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let source = FrameSource::start(
            Box::new(SyntheticGrabber::new(32, 24)),
            Duration::from_millis(5),
        )
        .unwrap();
        source.stop();
        source.stop();
        // A stale snapshot remains readable after stop.
        assert!(source.latest().is_some());
    }

    struct FailingGrabber;

    impl FrameGrabber for FailingGrabber {
        fn grab(&mut self) -> VisionResult<RgbImage> {
            Err(VisionError::device_unavailable("no such device"))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn test_start_fails_fast_on_dead_device() {
        let result = FrameSource::start(Box::new(FailingGrabber), Duration::from_millis(5));
        assert!(matches!(result, Err(VisionError::DeviceUnavailable(_))));
    }

    struct FlakyGrabber {
        calls: u32,
    }

    impl FrameGrabber for FlakyGrabber {
        fn grab(&mut self) -> VisionResult<RgbImage> {
            self.calls += 1;
            if self.calls == 1 || self.calls % 2 == 0 {
                Ok(RgbImage::new(16, 16))
            } else {
                Err(VisionError::capture("transient"))
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_transient_failures_retain_previous_frame() {
        let source = FrameSource::start(
            Box::new(FlakyGrabber { calls: 0 }),
            Duration::from_millis(5),
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(40));
        assert!(source.latest().is_some());
        source.stop();
    }
}
