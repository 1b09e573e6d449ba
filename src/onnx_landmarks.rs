//! ONNX landmark source: SCRFD face boxes followed by a 68-point landmark model.
//!
//! Both models run on the RGB pixels carried by each [`VideoFrame`]. Landmarks
//! are returned normalized to the full frame, which is what the alignment
//! evaluator consumes.

use crate::capture::CropRegion;
use crate::config::DetectorConfig;
use crate::constants::{FACE_BOX_EXPANSION, IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE, NUM_FACIAL_LANDMARKS};
use crate::landmarks::{Detection, LandmarkSource};
use crate::types::{DetectionResult, LandmarkSet, NormalizedPoint};
use crate::utils::safe_cast::f64_to_u32;
use crate::video::VideoFrame;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::{debug, info, warn};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default SCRFD input size
const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 640;

/// Default landmark model input size
const DEFAULT_LANDMARK_INPUT_SIZE: u32 = 128;

/// Face box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl FaceBox {
    fn area(&self) -> f32 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    fn iou(&self, other: &FaceBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        let inter = w * h;
        inter / (self.area() + other.area() - inter)
    }
}

fn load_session(name: &str, model_path: &Path) -> Result<Session> {
    info!("Loading {name} model: {}", model_path.display());
    let environment = Arc::new(
        Environment::builder()
            .with_name(name)
            .with_log_level(ort::LoggingLevel::Warning)
            .build()?,
    );

    let session = ort::SessionBuilder::new(&environment)?
        .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
        .with_model_from_file(model_path)?;
    Ok(session)
}

/// SCRFD face detector
pub struct ScrfdDetector {
    session: Session,
    input_size: (u32, u32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<u32>,
    offset: usize,
}

impl ScrfdDetector {
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        let session = load_session("face_detector", model_path.as_ref())?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::DetectorInit("face model has no inputs".to_string()))?;
        let dims = &input_meta.dimensions;
        let dim = |i: usize| {
            dims.get(i)
                .copied()
                .flatten()
                .and_then(|d| u32::try_from(d).ok())
                .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE)
        };
        let input_size = (dim(3), dim(2));

        let (offset, strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                warn!("Unknown face model layout with {n} outputs, using defaults");
                (3, vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            offset,
        })
    }

    /// Detect faces, highest score first
    #[allow(clippy::cast_precision_loss)]
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        let (img_w, img_h) = image.dimensions();
        let (input_w, input_h) = self.input_size;

        // Letterbox into the model input, anchored top-left
        let ratio_img = img_h as f32 / img_w as f32;
        let ratio_model = input_h as f32 / input_w as f32;
        let (new_w, new_h) = if ratio_img > ratio_model {
            (f64_to_u32(f64::from(input_h as f32 / ratio_img))?.max(1), input_h)
        } else {
            (input_w, f64_to_u32(f64::from(input_w as f32 * ratio_img))?.max(1))
        };
        let det_scale = new_h as f32 / img_h as f32;
        let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

        let pad = (0.0 - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
        let mut input = Array4::from_elem((1, 3, input_h as usize, input_w as usize), pad);
        for (x, y, pixel) in resized.enumerate_pixels() {
            for ch in 0..3 {
                input[[0, ch, y as usize, x as usize]] =
                    (f32::from(pixel[ch]) - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
            }
        }

        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut faces = Vec::new();
        for (idx, &stride) in self.strides.iter().enumerate() {
            let scores = extract(&outputs, idx)?;
            let distances = extract(&outputs, idx + self.offset)?;
            let centers = anchor_centers(input_h / stride, input_w / stride, stride, self.num_anchors);
            let stride = stride as f32;

            for (i, (&(cx, cy), &score)) in centers.iter().zip(scores.iter()).enumerate() {
                if score < self.conf_threshold {
                    continue;
                }
                let Some(d) = distances.get(i * 4..i * 4 + 4) else {
                    break;
                };
                faces.push(FaceBox {
                    x1: (cx - d[0] * stride) / det_scale,
                    y1: (cy - d[1] * stride) / det_scale,
                    x2: (cx + d[2] * stride) / det_scale,
                    y2: (cy + d[3] * stride) / det_scale,
                    score,
                });
            }
        }

        Ok(nms(faces, self.nms_threshold))
    }
}

fn extract(outputs: &[Value], idx: usize) -> Result<Vec<f32>> {
    let value = outputs
        .get(idx)
        .ok_or_else(|| Error::Detection(format!("model output {idx} missing")))?;
    let tensor = value.try_extract::<f32>()?;
    let view = tensor.view();
    Ok(view.iter().copied().collect())
}

/// Anchor centers of one stride level, `num_anchors` per grid cell
#[allow(clippy::cast_precision_loss)]
pub fn anchor_centers(height: u32, width: u32, stride: u32, num_anchors: usize) -> Vec<(f32, f32)> {
    let mut centers = Vec::with_capacity((height * width) as usize * num_anchors);
    for y in 0..height {
        for x in 0..width {
            let center = ((x * stride) as f32, (y * stride) as f32);
            centers.extend(std::iter::repeat(center).take(num_anchors.max(1)));
        }
    }
    centers
}

/// Greedy non-maximum suppression; returns survivors by descending score
pub fn nms(mut faces: Vec<FaceBox>, threshold: f32) -> Vec<FaceBox> {
    faces.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut keep: Vec<FaceBox> = Vec::new();
    for face in faces {
        if keep.iter().all(|kept| kept.iou(&face) <= threshold) {
            keep.push(face);
        }
    }
    keep
}

/// Expand a face box by `shift` on each side and square it inside the image
#[allow(clippy::cast_precision_loss)]
pub fn refine_box(face: &FaceBox, image_width: u32, image_height: u32, shift: f32) -> Option<CropRegion> {
    let (max_w, max_h) = (image_width as f32, image_height as f32);
    let (width, height) = (face.x2 - face.x1, face.y2 - face.y1);
    if !(width > 0.0 && height > 0.0) {
        return None;
    }

    let x1 = (face.x1 - width * shift).max(0.0);
    let y1 = (face.y1 - height * shift).max(0.0);
    let x2 = (face.x2 + width * shift).min(max_w);
    let y2 = (face.y2 + height * shift).min(max_h);

    let side = (x2 - x1).max(y2 - y1).min(max_w).min(max_h);
    let x = x1.min(max_w - side).max(0.0);
    let y = y1.min(max_h - side).max(0.0);

    let side = f64_to_u32(f64::from(side.floor())).ok()?;
    if side == 0 {
        return None;
    }
    Some(CropRegion {
        x: f64_to_u32(f64::from(x.floor())).ok()?,
        y: f64_to_u32(f64::from(y.floor())).ok()?,
        side,
    })
}

/// 68-point facial landmark model
pub struct LandmarkModel {
    session: Session,
    input_size: u32,
}

impl LandmarkModel {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = load_session("mark_detector", model_path.as_ref())?;
        if session.outputs.is_empty() {
            return Err(Error::DetectorInit("landmark model has no outputs".to_string()));
        }
        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Landmarks of a square face crop, in crop pixels
    #[allow(clippy::cast_precision_loss)]
    pub fn detect(&self, face: &RgbImage) -> Result<Vec<(f32, f32)>> {
        let size = self.input_size;
        let resized = imageops::resize(face, size, size, FilterType::Triangle);

        // NHWC, scaled to [0, 1]
        let mut input = Array4::<f32>::zeros((1, size as usize, size as usize, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for ch in 0..3 {
                input[[0, y as usize, x as usize, ch]] = f32::from(pixel[ch]) / 255.0;
            }
        }

        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;
        let marks = extract(&outputs, 0)?;
        if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
            return Err(Error::Detection(format!(
                "landmark model returned {} values, expected {}",
                marks.len(),
                NUM_FACIAL_LANDMARKS * 2
            )));
        }

        let scale_x = face.width() as f32 / size as f32;
        let scale_y = face.height() as f32 / size as f32;
        Ok(marks
            .chunks_exact(2)
            .take(NUM_FACIAL_LANDMARKS)
            .map(|m| (m[0] * scale_x, m[1] * scale_y))
            .collect())
    }
}

/// Face detector and landmark model exposed as a [`LandmarkSource`]
pub struct OnnxLandmarkSource {
    faces: ScrfdDetector,
    marks: LandmarkModel,
}

impl OnnxLandmarkSource {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let faces = ScrfdDetector::new(&config.face_detector, config.confidence_threshold, config.iou_threshold)
            .map_err(|e| Error::DetectorInit(format!("face model: {e}")))?;
        let marks =
            LandmarkModel::new(&config.face_landmarks).map_err(|e| Error::DetectorInit(format!("landmark model: {e}")))?;
        Ok(Self { faces, marks })
    }
}

impl LandmarkSource for OnnxLandmarkSource {
    #[allow(clippy::cast_precision_loss)]
    fn detect(&mut self, frame: &VideoFrame, _timestamp_ms: f64) -> Result<Detection> {
        let Some(pixels) = &frame.pixels else {
            return Ok(Detection::NotReady);
        };
        let (width, height) = pixels.dimensions();

        let mut sets = Vec::new();
        for face in self.faces.detect(pixels)? {
            let Some(region) = refine_box(&face, width, height, FACE_BOX_EXPANSION) else {
                continue;
            };
            let crop = imageops::crop_imm(pixels, region.x, region.y, region.side, region.side).to_image();
            let marks = self.marks.detect(&crop)?;
            let set: LandmarkSet = marks
                .into_iter()
                .map(|(mx, my)| {
                    NormalizedPoint::new(
                        (f64::from(region.x) + f64::from(mx)) / f64::from(width),
                        (f64::from(region.y) + f64::from(my)) / f64::from(height),
                    )
                })
                .collect();
            sets.push(set);
        }

        debug!("Frame {}: {} faces", frame.sequence, sets.len());
        Ok(Detection::Ready(DetectionResult::new(sets)))
    }

    fn close(&mut self) {
        debug!("Releasing ONNX sessions");
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
