//! OpenCV videoio capture backend.

use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};
use tracing::info;

use crate::error::{VisionError, VisionResult};
use crate::grabbers::FrameGrabber;

/// Camera capture through OpenCV videoio.
pub struct OpenCvGrabber {
    capture: videoio::VideoCapture,
    index: i32,
}

impl OpenCvGrabber {
    /// Open camera `index`, requesting the given capture resolution.
    ///
    /// The driver may pick the nearest supported mode; the actual frame size
    /// is whatever `grab` returns.
    pub fn open(index: i32, width: u32, height: u32) -> VisionResult<Self> {
        let mut capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| VisionError::device_unavailable(format!("camera {index}: {e}")))?;

        let opened = capture
            .is_opened()
            .map_err(|e| VisionError::device_unavailable(format!("camera {index}: {e}")))?;
        if !opened {
            return Err(VisionError::device_unavailable(format!(
                "camera {index} failed to open"
            )));
        }

        capture
            .set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)
            .map_err(|e| VisionError::device_unavailable(e.to_string()))?;
        capture
            .set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)
            .map_err(|e| VisionError::device_unavailable(e.to_string()))?;

        info!(index, width, height, "Camera opened");
        Ok(Self { capture, index })
    }
}

impl FrameGrabber for OpenCvGrabber {
    fn grab(&mut self) -> VisionResult<RgbImage> {
        let mut bgr = Mat::default();
        let read = self
            .capture
            .read(&mut bgr)
            .map_err(|e| VisionError::capture(e.to_string()))?;
        if !read || bgr.empty() {
            return Err(VisionError::capture("camera returned an empty frame"));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| VisionError::capture(e.to_string()))?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb
            .data_bytes()
            .map_err(|e| VisionError::capture(e.to_string()))?
            .to_vec();

        RgbImage::from_raw(width, height, data)
            .ok_or_else(|| VisionError::capture("camera frame had unexpected buffer size"))
    }

    fn describe(&self) -> String {
        format!("opencv camera {}", self.index)
    }
}

impl Drop for OpenCvGrabber {
    fn drop(&mut self) {
        // VideoCapture releases the device on drop; make it explicit so a
        // failed release is at least not silent.
        let _ = self.capture.release();
    }
}
