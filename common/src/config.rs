//! Per-request detection settings.
//!
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.45;
pub const DEFAULT_MAX_DETECTIONS: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must lie within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },
    #[error("maximum number of detections must be positive")]
    ZeroMaxDetections,
    #[error("invalid value {value:?} for field {field}")]
    Parse { field: String, value: String },
}

/// Settings handed to the model on every inference call.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum class confidence for a box to be reported.
    pub confidence_threshold: f32,
    /// Overlap above which the less confident of two boxes is suppressed.
    pub iou_threshold: f32,
    /// Suppress overlapping boxes even when their classes differ.
    pub class_agnostic: bool,
    /// Report every class above the threshold per box, not only the best one.
    pub multi_label: bool,
    pub max_detections: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU,
            class_agnostic: false,
            multi_label: false,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

impl DetectionConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        check_unit_range("confidence threshold", self.confidence_threshold)?;
        check_unit_range("IoU threshold", self.iou_threshold)?;
        if self.max_detections == 0 {
            return Err(ConfigError::ZeroMaxDetections);
        }

        Ok(self)
    }

    /// Apply a single named form field, as submitted by the capture page.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let parse_error = || ConfigError::Parse {
            field: field.to_owned(),
            value: value.to_owned(),
        };

        match field {
            "confidence" => self.confidence_threshold = value.parse().map_err(|_| parse_error())?,
            "iou" => self.iou_threshold = value.parse().map_err(|_| parse_error())?,
            "agnostic" => self.class_agnostic = parse_flag(value).ok_or_else(parse_error)?,
            "multi_label" => self.multi_label = parse_flag(value).ok_or_else(parse_error)?,
            "max_det" => self.max_detections = value.parse().map_err(|_| parse_error())?,
            _ => return Err(parse_error()),
        }

        Ok(())
    }
}

fn check_unit_range(name: &'static str, value: f32) -> Result<(), ConfigError> {
    // NaN fails the range check as well
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

/// HTML checkboxes submit "on"; API clients send booleans.
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" | "" => Some(false),
        _ => None,
    }
}
