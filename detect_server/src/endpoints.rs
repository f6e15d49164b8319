//! Endpoints of HTTP server.
//!
use std::sync::Arc;

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use common::{DetectResponse, DetectionConfig, LabeledDetection};
use serde::Serialize;

use crate::{
    meter::METER,
    nn::Detector,
    page,
    pipeline::{run_pipeline, Outcome, PipelineError},
    render::{encode_jpeg, Annotator},
};

const JPEG_QUALITY: u8 = 90;

/// Model and drawing resources shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn Detector>,
    pub annotator: Arc<Annotator>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>, annotator: Annotator) -> Self {
        Self {
            detector,
            annotator: Arc::new(annotator),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Health check endpoint.
pub async fn healthcheck() -> &'static str {
    "healthy"
}

/// Capture page.
pub async fn index() -> Html<String> {
    Html(page::index(&DetectionConfig::default()))
}

/// Detect objects on a photo submitted by the capture page and render the result page.
pub async fn detect_page(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Response {
    match detect(state, multipart).await {
        Ok((outcome, config)) => match encode_jpeg(&outcome.annotated, JPEG_QUALITY) {
            Ok(jpeg) => Html(page::result(&jpeg, &outcome.counts, &config)).into_response(),
            Err(err) => page_error(PipelineError::from(err)),
        },
        Err(err) => page_error(err),
    }
}

/// Same as [`detect_page`], answering with JSON instead of HTML.
pub async fn detect_api(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Response {
    let detector = Arc::clone(&state.detector);
    let outcome = match detect(state, multipart).await {
        Ok((outcome, _config)) => outcome,
        Err(err) => return api_error(err),
    };

    let detections: Result<Vec<_>, _> = outcome
        .detections
        .iter()
        .map(|detection| LabeledDetection::resolve(detection, detector.labels()))
        .collect();
    let detections = match detections {
        Ok(detections) => detections,
        Err(err) => return api_error(err.into()),
    };

    let response = DetectResponse {
        width: outcome.annotated.width(),
        height: outcome.annotated.height(),
        infer_ms: outcome.infer_ms,
        total: outcome.counts.total(),
        counts: outcome.counts,
        detections,
    };

    Json(response).into_response()
}

async fn detect(
    state: AppState,
    multipart: Multipart,
) -> Result<(Outcome, DetectionConfig), PipelineError> {
    let (capture, config) = read_capture(multipart).await?;
    log::info!(
        "Received capture of {} bytes (confidence {}, IoU {})",
        capture.len(),
        config.confidence_threshold,
        config.iou_threshold
    );

    // Inference is CPU bound, keep it off the async workers
    let outcome = tokio::task::spawn_blocking(move || {
        run_pipeline(
            state.detector.as_ref(),
            &state.annotator,
            &capture,
            &config,
        )
    })
    .await
    .map_err(|err| PipelineError::Task(err.to_string()))??;

    METER.tick_capture(outcome.detections.len());
    log::info!(
        "Detected {} objects in {} categories",
        outcome.counts.total(),
        outcome.counts.len()
    );

    Ok((outcome, config))
}

/// Collect the photo and the threshold fields of a capture form.
async fn read_capture(
    mut multipart: Multipart,
) -> Result<(Bytes, DetectionConfig), PipelineError> {
    let mut capture = None;
    let mut config = DetectionConfig::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| PipelineError::Upload(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| PipelineError::Upload(err.to_string()))?;
                capture = Some(data);
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| PipelineError::Upload(err.to_string()))?;
                config.set_field(&name, &value)?;
            }
        }
    }

    let capture = capture.ok_or_else(|| PipelineError::Upload("missing image field".into()))?;

    Ok((capture, config))
}

fn page_error(err: PipelineError) -> Response {
    log::warn!("Capture rejected: {}", err);
    (err.status(), Html(page::error(&err.to_string()))).into_response()
}

fn api_error(err: PipelineError) -> Response {
    log::warn!("Capture rejected: {}", err);
    let status: StatusCode = err.status();
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}
