//! SCRFD face detector running on ONNX Runtime.
//!
//! Only models with keypoint heads are accepted; the five SCRFD keypoints
//! are mapped onto the overlay features (mouth = midpoint of the corners).

use crate::compositor::Frame;
use crate::keypoints::{Feature, NormalizedBox, NormalizedDetection, Point};
use crate::pipeline::FaceDetector;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use ndarray::{Array4, CowArray};
use ort::{Environment, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_INPUT_SIZE: u32 = 640;
const KEYPOINT_COUNT: usize = 5;

/// Highest-scoring face of one inference, in detector input pixels
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    score: f32,
    /// x1, y1, x2, y2
    bbox: [f32; 4],
    keypoints: [(f32, f32); KEYPOINT_COUNT],
}

impl Candidate {
    /// Map back to the frame and express relative to its size
    fn into_detection(self, det_scale: f32, width: u32, height: u32) -> NormalizedDetection {
        let (w, h) = (f64::from(width), f64::from(height));
        let scale = f64::from(det_scale);
        let to_point = |(x, y): (f32, f32)| Point::new(f64::from(x) / scale / w, f64::from(y) / scale / h);

        let [x1, y1, x2, y2] = self.bbox.map(f64::from);
        let bbox = NormalizedBox {
            x: x1 / scale / w,
            y: y1 / scale / h,
            width: (x2 - x1) / scale / w,
            height: (y2 - y1) / scale / h,
        };

        let [right_eye, left_eye, nose, mouth_right, mouth_left] = self.keypoints.map(to_point);
        let keypoints = BTreeMap::from([
            (Feature::RightEye, right_eye),
            (Feature::LeftEye, left_eye),
            (Feature::Nose, nose),
            (Feature::Mouth, mouth_right.midpoint(mouth_left)),
        ]);

        NormalizedDetection {
            bbox,
            keypoints,
            score: self.score,
        }
    }
}

/// SCRFD Face Detector using ONNX Runtime
pub struct ScrfdDetector {
    session: Session,
    input_size: (u32, u32),
    confidence_threshold: f32,
    num_anchors: usize,
    strides: Vec<u32>,
    offset: usize,
}

impl ScrfdDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the file is missing or the model has no
    /// keypoint outputs, and `OnnxRuntime` if the session cannot be built
    pub fn new<P: AsRef<Path>>(model_path: P, confidence_threshold: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(Error::ModelError(format!(
                "Face detector model not found: {}",
                model_path.display()
            )));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Model has no inputs".to_string()))?;

        // [batch, channels, height, width]; dynamic axes fall back to 640
        let dimension = |axis: usize| {
            input_meta
                .dimensions
                .get(axis)
                .copied()
                .flatten()
                .unwrap_or(DEFAULT_INPUT_SIZE)
        };
        let input_size = (dimension(3), dimension(2));

        let (offset, strides, num_anchors) = match session.outputs.len() {
            9 => (3, vec![8, 16, 32], 2),
            15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                return Err(Error::ModelError(format!(
                    "SCRFD model with keypoint outputs expected (9 or 15 outputs), found {n}"
                )))
            }
        };

        log::info!(
            "Loaded face detector {} ({}x{} input, {} strides)",
            model_path.display(),
            input_size.0,
            input_size.1,
            strides.len()
        );

        Ok(Self {
            session,
            input_size,
            confidence_threshold,
            num_anchors,
            strides,
            offset,
        })
    }

    /// Letterbox the frame into the model input and normalize to NCHW
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // ratios of small positive sizes
    fn preprocess(&self, frame: &Frame) -> (Array4<f32>, f32) {
        let (input_width, input_height) = self.input_size;
        let ratio_img = f64::from(frame.height()) / f64::from(frame.width());
        let ratio_model = f64::from(input_height) / f64::from(input_width);

        let (new_width, new_height) = if ratio_img > ratio_model {
            ((f64::from(input_height) / ratio_img) as u32, input_height)
        } else {
            (input_width, (f64::from(input_width) * ratio_img) as u32)
        };
        let (new_width, new_height) = (new_width.max(1), new_height.max(1));
        let det_scale = new_height as f32 / frame.height() as f32;

        let resized = imageops::resize(frame, new_width, new_height, FilterType::Triangle);
        let shape = (1, 3, input_height as usize, input_width as usize);
        let input = Array4::from_shape_fn(shape, |(_, channel, y, x)| {
            let value = match (u32::try_from(x), u32::try_from(y)) {
                (Ok(x), Ok(y)) if x < new_width && y < new_height => resized.get_pixel(x, y)[channel],
                _ => 0,
            };
            (f32::from(value) - 127.5) / 128.0
        });

        (input, det_scale)
    }

    /// Run inference and keep the best candidate above the confidence threshold
    #[allow(clippy::cast_precision_loss)] // grid coordinates are small
    fn forward(&mut self, input: Array4<f32>) -> Result<Option<Candidate>> {
        let input = CowArray::from(input.into_dyn());
        let tensor = Value::from_array(self.session.allocator(), &input)?;
        let outputs = self.session.run(vec![tensor])?;

        let extract = |index: usize| -> Result<Vec<f32>> {
            let value = outputs
                .get(index)
                .ok_or_else(|| Error::ModelError(format!("Missing model output {index}")))?;
            let tensor = value.try_extract::<f32>()?;
            let data = tensor.view().iter().copied().collect();
            Ok(data)
        };

        let mut best: Option<Candidate> = None;
        for (idx, &stride) in self.strides.iter().enumerate() {
            let scores = extract(idx)?;
            let distances = extract(idx + self.offset)?;
            let keypoint_distances = extract(idx + self.offset * 2)?;

            let grid_width = (self.input_size.0 / stride) as usize;
            let step = stride as f32;

            for (i, &score) in scores.iter().enumerate() {
                if score < self.confidence_threshold || best.as_ref().is_some_and(|b| b.score >= score) {
                    continue;
                }
                let (Some(d), Some(k)) = (
                    distances.get(i * 4..i * 4 + 4),
                    keypoint_distances.get(i * 10..i * 10 + 10),
                ) else {
                    continue;
                };

                let cell = i / self.num_anchors;
                let cx = (cell % grid_width.max(1)) as f32 * step;
                let cy = (cell / grid_width.max(1)) as f32 * step;

                let mut keypoints = [(0.0, 0.0); KEYPOINT_COUNT];
                for (j, keypoint) in keypoints.iter_mut().enumerate() {
                    *keypoint = (cx + k[j * 2] * step, cy + k[j * 2 + 1] * step);
                }

                best = Some(Candidate {
                    score,
                    bbox: [cx - d[0] * step, cy - d[1] * step, cx + d[2] * step, cy + d[3] * step],
                    keypoints,
                });
            }
        }

        Ok(best)
    }
}

impl FaceDetector for ScrfdDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<NormalizedDetection>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(None);
        }
        let (input, det_scale) = self.preprocess(frame);
        let candidate = self.forward(input)?;
        Ok(candidate.map(|c| c.into_detection(det_scale, frame.width(), frame.height())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_normalization() {
        let candidate = Candidate {
            score: 0.9,
            bbox: [100.0, 50.0, 300.0, 350.0],
            keypoints: [
                (150.0, 150.0),
                (250.0, 150.0),
                (200.0, 220.0),
                (160.0, 280.0),
                (240.0, 300.0),
            ],
        };
        // Detector ran at half the frame resolution
        let detection = candidate.into_detection(0.5, 800, 800);

        assert!((detection.bbox.x - 0.25).abs() < 1e-9);
        assert!((detection.bbox.height - 0.75).abs() < 1e-9);
        assert_eq!(detection.keypoints[&Feature::RightEye], Point::new(0.375, 0.375));
        let mouth = detection.keypoints[&Feature::Mouth];
        assert!((mouth.x - 0.5).abs() < 1e-9);
        assert!((mouth.y - 0.725).abs() < 1e-9);
    }

    #[test]
    fn test_missing_model() {
        let err = ScrfdDetector::new("/nonexistent/scrfd.onnx", 0.2).err().unwrap();
        assert!(matches!(err, Error::ModelError(_)));
    }
}
