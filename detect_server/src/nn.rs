//! YOLOv5 object detection on top of tract.
//!
use std::path::Path;

use common::{Detection, DetectionConfig, LabelMap};
use image::{
    imageops::{self, FilterType},
    Rgb, RgbImage,
};
use itertools::Itertools;
use ndarray::{s, ArrayView2, Axis, Ix2};
use thiserror::Error;
use tract_onnx::prelude::*;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Positive additive constant to avoid divide-by-zero.
const EPS: f32 = 1.0e-7;

/// Grey used to fill the letterbox borders, as during training.
const PAD_VALUE: u8 = 114;

/// Upper bound of candidates entering non-maximum suppression.
const MAX_NMS_CANDIDATES: usize = 30_000;

/// Columns preceding the class scores in a raw output row: `cx, cy, w, h, objectness`.
const BOX_COLUMNS: usize = 5;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model from {path}: {reason:#}")]
    Load { path: String, reason: TractError },
    #[error("failed to run model: {0:#}")]
    Inference(TractError),
    #[error("unexpected model output shape {0:?}, expected [1, N, 5 + classes]")]
    OutputShape(Vec<usize>),
}

impl From<TractError> for ModelError {
    fn from(err: TractError) -> Self {
        Self::Inference(err)
    }
}

/// An object detector with a fixed label vocabulary.
pub trait Detector: Send + Sync {
    fn labels(&self) -> &LabelMap;

    fn detect(
        &self,
        image: &RgbImage,
        config: &DetectionConfig,
    ) -> Result<Vec<Detection>, ModelError>;
}

/// YOLOv5 network exported to ONNX with a static square input.
pub struct Yolov5Model {
    model: NnModel,
    input_size: u32,
    labels: LabelMap,
}

impl Yolov5Model {
    pub fn load(
        path: impl AsRef<Path>,
        input_size: u32,
        labels: LabelMap,
    ) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let size = input_size as usize;
        let input_fact = InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size));

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, input_fact))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|reason| ModelError::Load {
                path: path.display().to_string(),
                reason,
            })?;

        log::info!(
            "Loaded model {} with input size {} and {} labels",
            path.display(),
            input_size,
            labels.len()
        );

        Ok(Self {
            model,
            input_size,
            labels,
        })
    }

    fn preproc(&self, canvas: &RgbImage) -> Tensor {
        let size = self.input_size as usize;
        let tensor: Tensor =
            tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
                canvas[(x as _, y as _)][c] as f32 / 255.0
            })
            .into();

        tensor
    }

    fn postproc(
        &self,
        raw_nn_out: &Tensor,
        letterbox: &Letterbox,
        config: &DetectionConfig,
    ) -> Result<Vec<Detection>, ModelError> {
        let output = raw_nn_out.to_array_view::<f32>()?;
        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[2] <= BOX_COLUMNS {
            return Err(ModelError::OutputShape(shape));
        }

        let rows = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|_| ModelError::OutputShape(shape.clone()))?;

        let candidates = decode_candidates(rows, config)
            .into_iter()
            .map(|candidate| Detection {
                bbox: letterbox.restore(candidate.bbox),
                ..candidate
            })
            .collect();

        Ok(non_maximum_suppression(candidates, config))
    }
}

impl Detector for Yolov5Model {
    fn labels(&self) -> &LabelMap {
        &self.labels
    }

    fn detect(
        &self,
        image: &RgbImage,
        config: &DetectionConfig,
    ) -> Result<Vec<Detection>, ModelError> {
        let letterbox = Letterbox::new(image.width(), image.height(), self.input_size);
        let canvas = letterbox.apply(image);

        let raw_nn_out = self.model.run(tvec!(self.preproc(&canvas).into()))?;
        self.postproc(&raw_nn_out[0], &letterbox, config)
    }
}

/// Aspect-preserving resize of an image onto a padded square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    size: u32,
    scale: f32,
    width: u32,
    height: u32,
    resized_width: u32,
    resized_height: u32,
}

impl Letterbox {
    fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = f32::min(size as f32 / width as f32, size as f32 / height as f32);
        Self {
            size,
            scale,
            width,
            height,
            resized_width: ((width as f32 * scale).round() as u32).clamp(1, size),
            resized_height: ((height as f32 * scale).round() as u32).clamp(1, size),
        }
    }

    fn pad_x(&self) -> u32 {
        (self.size - self.resized_width) / 2
    }

    fn pad_y(&self) -> u32 {
        (self.size - self.resized_height) / 2
    }

    fn apply(&self, image: &RgbImage) -> RgbImage {
        let resized = imageops::resize(
            image,
            self.resized_width,
            self.resized_height,
            FilterType::Triangle,
        );

        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([PAD_VALUE; 3]));
        imageops::replace(
            &mut canvas,
            &resized,
            self.pad_x() as i64,
            self.pad_y() as i64,
        );

        canvas
    }

    /// Map a box from canvas coordinates back onto the original image.
    fn restore(&self, bbox: [f32; 4]) -> [f32; 4] {
        let x = |v: f32| ((v - self.pad_x() as f32) / self.scale).clamp(0.0, self.width as f32);
        let y = |v: f32| ((v - self.pad_y() as f32) / self.scale).clamp(0.0, self.height as f32);

        [x(bbox[0]), y(bbox[1]), x(bbox[2]), y(bbox[3])]
    }
}

/// Turn raw output rows into scored candidates above the confidence threshold.
///
/// Each row holds `cx, cy, w, h, objectness` followed by one score per class. The reported
/// score of a class is its class score times the objectness.
fn decode_candidates(rows: ArrayView2<f32>, config: &DetectionConfig) -> Vec<Detection> {
    let min_confidence = config.confidence_threshold;
    let mut candidates = vec![];

    for row in rows.outer_iter() {
        let objectness = row[4];
        if objectness <= min_confidence {
            continue;
        }

        let bbox = xywh_to_xyxy([row[0], row[1], row[2], row[3]]);
        let class_scores = row.slice(s![BOX_COLUMNS..]);

        if config.multi_label {
            for (category_id, class_score) in class_scores.iter().enumerate() {
                let score = class_score * objectness;
                if score > min_confidence {
                    candidates.push(Detection::new(bbox, score, category_id as u32));
                }
            }
        } else if let Some((category_id, class_score)) = class_scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        {
            let score = class_score * objectness;
            if score > min_confidence {
                candidates.push(Detection::new(bbox, score, category_id as u32));
            }
        }
    }

    candidates
}

/// Run non-maximum-suppression on candidate bounding boxes.
///
/// Candidates are visited in the order of sinking confidence. A candidate is kept only if it
/// does not overlap any already kept box of the same class (of any class in class-agnostic
/// mode) by more than the IoU threshold. At most `max_detections` boxes are kept.
pub fn non_maximum_suppression(
    candidates: Vec<Detection>,
    config: &DetectionConfig,
) -> Vec<Detection> {
    let sorted_candidates = candidates
        .into_iter()
        .sorted_by(|a, b| b.score.total_cmp(&a.score))
        .take(MAX_NMS_CANDIDATES);

    let mut selected: Vec<Detection> = vec![];
    'candidates: for candidate in sorted_candidates {
        if selected.len() >= config.max_detections {
            break;
        }

        for kept in selected.iter() {
            let competing = config.class_agnostic || kept.category_id == candidate.category_id;
            if competing && iou(&candidate.bbox, &kept.bbox) > config.iou_threshold {
                continue 'candidates;
            }
        }

        selected.push(candidate);
    }

    selected
}

fn xywh_to_xyxy([cx, cy, w, h]: [f32; 4]) -> [f32; 4] {
    [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
}

/// Calculate the intersection-over-union metric for two bounding boxes.
pub fn iou(bbox_a: &[f32; 4], bbox_b: &[f32; 4]) -> f32 {
    // If the boxes do not overlap, the overlap box is ill defined and its area is zero.
    let overlap_box: [f32; 4] = [
        f32::max(bbox_a[0], bbox_b[0]),
        f32::max(bbox_a[1], bbox_b[1]),
        f32::min(bbox_a[2], bbox_b[2]),
        f32::min(bbox_a[3], bbox_b[3]),
    ];

    let overlap_area = bbox_area(&overlap_box);

    // Avoid division-by-zero with `EPS`
    overlap_area / (bbox_area(bbox_a) + bbox_area(bbox_b) - overlap_area + EPS)
}

/// Calculate the area enclosed by a bounding box.
///
/// The bounding box is passed as four-element array defining two points:
/// `[x_top_left, y_top_left, x_bottom_right, y_bottom_right]`
/// If the bottom-right point lies above or to the left of the top-left point, the area is zero.
fn bbox_area(bbox: &[f32; 4]) -> f32 {
    let width = bbox[2] - bbox[0];
    let height = bbox[3] - bbox[1];
    if width < 0.0 || height < 0.0 {
        return 0.0;
    }

    width * height
}
