//! YOLOv8 object detection via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::detector::{Detection, DetectionBox, Detector};
use crate::error::{VisionError, VisionResult};

// YOLOv8 output layout: [1, 84, 8400] = 4 bbox coords + 80 COCO classes
// over 8400 candidate boxes.
const NUM_CLASSES: usize = 80;
const NUM_CANDIDATES: usize = 8400;
const NUM_FEATURES: usize = 84;

/// Configuration for the ONNX detector.
#[derive(Debug, Clone)]
pub struct OnnxDetectorConfig {
    /// Path to the YOLOv8 ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Model input size (square)
    pub input_size: u32,
    /// COCO class id counted as presence (0 = person)
    pub tracked_class: usize,
}

impl Default for OnnxDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
            tracked_class: 0,
        }
    }
}

/// YOLOv8 detector restricted to a single tracked class.
///
/// Region crops are resized to the model input, and only boxes of the
/// configured class survive postprocessing, reported back in crop pixel
/// coordinates.
pub struct OnnxDetector {
    session: Mutex<Session>,
    config: OnnxDetectorConfig,
}

impl OnnxDetector {
    /// Load the model from `config.model_path`.
    pub fn new(config: OnnxDetectorConfig) -> VisionResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(VisionError::ModelNotFound(config.model_path.clone()));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            tracked_class = config.tracked_class,
            input_size = config.input_size,
            "ONNX detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &OnnxDetectorConfig {
        &self.config
    }

    /// Resize to the model input, normalize to [0, 1], and lay out as NCHW.
    fn preprocess(&self, crop: &RgbImage) -> VisionResult<Value> {
        let input_size = self.config.input_size;
        let resized = image::imageops::resize(
            crop,
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let (w, h) = (input_size as usize, input_size as usize);
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = resized.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::detection(format!("Failed to create tensor: {e}")))
    }

    fn run_inference(&self, input: Value) -> VisionResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::detection("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::detection(format!("ONNX inference failed: {e}")))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| VisionError::detection("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::detection(format!("Failed to extract tensor: {e}")))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Parse candidates, keep the tracked class above threshold, apply NMS,
    /// and map boxes back to crop pixel coordinates.
    fn postprocess(
        &self,
        outputs: &[f32],
        crop_width: u32,
        crop_height: u32,
    ) -> VisionResult<Detection> {
        if outputs.len() != NUM_FEATURES * NUM_CANDIDATES {
            return Err(VisionError::detection(format!(
                "Unexpected output size: expected {}, got {}",
                NUM_FEATURES * NUM_CANDIDATES,
                outputs.len()
            )));
        }

        let output_array = Array::from_shape_vec((NUM_FEATURES, NUM_CANDIDATES), outputs.to_vec())
            .map_err(|e| VisionError::detection(format!("Failed to reshape output: {e}")))?;
        let transposed = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = crop_width as f32 / input_size;
        let scale_h = crop_height as f32 / input_size;

        let mut candidates: Vec<(f32, f32, f32, f32, f32)> = Vec::new();
        for i in 0..NUM_CANDIDATES {
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..NUM_CLASSES {
                let score = transposed[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_class != self.config.tracked_class
                || best_score < self.config.confidence_threshold
            {
                continue;
            }

            // Center format in model coordinates -> corners in crop pixels
            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            let x_min = ((cx - w / 2.0) * scale_w).max(0.0);
            let y_min = ((cy - h / 2.0) * scale_h).max(0.0);
            let x_max = ((cx + w / 2.0) * scale_w).min(crop_width as f32);
            let y_max = ((cy + h / 2.0) * scale_h).min(crop_height as f32);
            if x_max <= x_min || y_max <= y_min {
                continue;
            }

            candidates.push((x_min, y_min, x_max, y_max, best_score));
        }

        let kept = non_maximum_suppression(candidates, self.config.nms_threshold);
        let boxes = kept
            .into_iter()
            .map(|(x_min, y_min, x_max, y_max, confidence)| DetectionBox {
                x_min: x_min as u32,
                y_min: y_min as u32,
                x_max: x_max.ceil() as u32,
                y_max: y_max.ceil() as u32,
                confidence,
            })
            .collect();

        Ok(Detection { boxes })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, crop: &RgbImage) -> VisionResult<Detection> {
        let input = self.preprocess(crop)?;
        let outputs = self.run_inference(input)?;
        let detection = self.postprocess(&outputs, crop.width(), crop.height())?;

        debug!(count = detection.count(), "Detection completed");
        Ok(detection)
    }

    fn name(&self) -> &'static str {
        "yolov8-onnx"
    }
}

/// Single-class NMS over `(x_min, y_min, x_max, y_max, confidence)` tuples.
fn non_maximum_suppression(
    mut candidates: Vec<(f32, f32, f32, f32, f32)>,
    nms_threshold: f32,
) -> Vec<(f32, f32, f32, f32, f32)> {
    candidates.sort_by(|a, b| b.4.partial_cmp(&a.4).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i]);
        for j in (i + 1)..candidates.len() {
            if !suppressed[j] && iou(&candidates[i], &candidates[j]) > nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

fn iou(a: &(f32, f32, f32, f32, f32), b: &(f32, f32, f32, f32, f32)) -> f32 {
    let x1 = a.0.max(b.0);
    let y1 = a.1.max(b.1);
    let x2 = a.2.min(b.2);
    let y2 = a.3.min(b.3);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.2 - a.0) * (a.3 - a.1);
    let area_b = (b.2 - b.0) * (b.3 - b.1);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create an ONNX Runtime session on the CPU execution provider.
fn create_session(model_path: &Path) -> VisionResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| VisionError::detection(format!("Failed to read model file: {e}")))?;

    Session::builder()
        .map_err(|e| VisionError::detection(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::detection(format!("Failed to set optimization level: {e}")))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::detection(format!("Failed to load ONNX model: {e}")))
}
