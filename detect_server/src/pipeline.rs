//! One capture, from encoded bytes to annotated image and count table.
//!
use std::time::Instant;

use axum::http::StatusCode;
use common::{count_detections, ConfigError, CountTable, Detection, DetectionConfig, LookupError};
use image::RgbImage;
use thiserror::Error;

use crate::{
    decode::{decode_image, DecodeError},
    nn::{Detector, ModelError},
    render::Annotator,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to encode annotated image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("invalid upload: {0}")]
    Upload(String),
    #[error("inference task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Problems with the submitted capture are the user's to fix, the rest are ours.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Config(_) | Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::Lookup(_) | Self::Model(_) | Self::Encode(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result of a single inference cycle.
#[derive(Debug)]
pub struct Outcome {
    pub detections: Vec<Detection>,
    pub counts: CountTable,
    pub annotated: RgbImage,
    pub infer_ms: f32,
}

/// Decode a capture, detect objects, count them per label and draw the boxes.
///
/// Any failure aborts the whole cycle; nothing partial is returned.
pub fn run_pipeline(
    detector: &dyn Detector,
    annotator: &Annotator,
    capture: &[u8],
    config: &DetectionConfig,
) -> Result<Outcome, PipelineError> {
    let config = config.validate()?;
    let mut frame = decode_image(capture)?;

    let start = Instant::now();
    let detections = detector.detect(&frame, &config)?;
    let infer_ms = start.elapsed().as_secs_f32() * 1000.0;
    log::debug!(
        "Inference on {}x{} image found {} objects in {:.1}ms",
        frame.width(),
        frame.height(),
        detections.len(),
        infer_ms
    );

    let counts = count_detections(&detections, detector.labels())?;

    annotator.draw(&mut frame, &detections, detector.labels());

    Ok(Outcome {
        detections,
        counts,
        annotated: frame,
        infer_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::LabelMap;
    use image::{ImageOutputFormat, Rgb};
    use std::io::Cursor;

    struct FixedDetector {
        labels: LabelMap,
        detections: Vec<Detection>,
    }

    impl Detector for FixedDetector {
        fn labels(&self) -> &LabelMap {
            &self.labels
        }

        fn detect(
            &self,
            _image: &RgbImage,
            _config: &DetectionConfig,
        ) -> Result<Vec<Detection>, ModelError> {
            Ok(self.detections.clone())
        }
    }

    fn png_capture() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]))
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn detector(category_ids: &[u32]) -> FixedDetector {
        FixedDetector {
            labels: [(0, "car"), (1, "bus"), (2, "person")].into_iter().collect(),
            detections: category_ids
                .iter()
                .map(|&id| Detection::new([4.0, 4.0, 20.0, 20.0], 0.8, id))
                .collect(),
        }
    }

    #[test]
    fn counts_and_annotates() {
        let outcome = run_pipeline(
            &detector(&[2, 0, 2, 1]),
            &Annotator::default(),
            &png_capture(),
            &DetectionConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome.detections.len(), 4);
        let rows: Vec<_> = outcome
            .counts
            .iter()
            .map(|row| (row.label.as_str(), row.count))
            .collect();
        assert_eq!(rows, vec![("bus", 1), ("car", 1), ("person", 2)]);
        assert_eq!(outcome.annotated.dimensions(), (64, 48));
        assert_ne!(outcome.annotated[(4, 4)], Rgb([90, 90, 90]));
    }

    #[test]
    fn empty_capture_is_rejected() {
        let err = run_pipeline(
            &detector(&[0]),
            &Annotator::default(),
            &[],
            &DetectionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(DecodeError::Empty)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_category_aborts_cycle() {
        let err = run_pipeline(
            &detector(&[0, 9]),
            &Annotator::default(),
            &png_capture(),
            &DetectionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Lookup(LookupError(9))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let config = DetectionConfig {
            iou_threshold: 2.0,
            ..Default::default()
        };
        let err = run_pipeline(&detector(&[]), &Annotator::default(), &[], &config).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
