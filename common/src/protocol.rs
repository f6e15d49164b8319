//! Detections and the JSON body returned by the detection API.
//!
use serde::{Deserialize, Serialize};

use crate::{aggregate::CountTable, labels::LabelMap, LookupError};

/// One object found by the model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Detection {
    /// `[x_top_left, y_top_left, x_bottom_right, y_bottom_right]` in image pixels.
    pub bbox: [f32; 4],
    pub score: f32,
    pub category_id: u32,
}

impl Detection {
    pub fn new(bbox: [f32; 4], score: f32, category_id: u32) -> Self {
        Self {
            bbox,
            score,
            category_id,
        }
    }
}

/// Detection with its label resolved, as sent to clients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LabeledDetection {
    pub bbox: [f32; 4],
    pub score: f32,
    pub category_id: u32,
    pub label: String,
}

impl LabeledDetection {
    pub fn resolve(detection: &Detection, labels: &LabelMap) -> Result<Self, LookupError> {
        Ok(Self {
            bbox: detection.bbox,
            score: detection.score,
            category_id: detection.category_id,
            label: labels.get(detection.category_id)?.to_owned(),
        })
    }
}

/// Response of `POST /api/detect`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DetectResponse {
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub detections: Vec<LabeledDetection>,
    pub counts: CountTable,
    pub total: usize,
}
