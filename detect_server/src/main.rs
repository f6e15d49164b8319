//! Detection server binary.
//!
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use common::LabelMap;
use detect_server::{
    endpoints::AppState,
    meter::spawn_meter_logger,
    nn::Yolov5Model,
    render::Annotator,
    router,
    utils::ensure_model,
};
use env_logger::TimestampPrecision;

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Address to serve the web page on
    #[clap(long, default_value = "127.0.0.1:3000")]
    server_address: String,

    /// Path of the YOLOv5 ONNX weights
    #[clap(long, default_value = "yolov5s.onnx")]
    model: PathBuf,

    /// URL to download the weights from when the model file is missing
    #[clap(long)]
    model_url: Option<String>,

    /// Label file with one category name per line, COCO names if omitted
    #[clap(long)]
    labels: Option<PathBuf>,

    /// Side length of the square model input
    #[clap(long, default_value_t = 640)]
    input_size: u32,

    /// TrueType font for the box captions, boxes are drawn without captions if omitted
    #[clap(long)]
    font: Option<PathBuf>,

    /// Largest accepted photo upload in megabytes
    #[clap(long, default_value_t = 16)]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let labels = match &args.labels {
        Some(path) => LabelMap::from_file(path)
            .with_context(|| format!("failed to load labels from {}", path.display()))?,
        None => LabelMap::coco(),
    };

    // Failing to load the model is fatal
    let model_path = ensure_model(&args.model, args.model_url.as_deref()).await?;
    let input_size = args.input_size;
    let model = tokio::task::spawn_blocking(move || {
        Yolov5Model::load(model_path, input_size, labels)
    })
    .await??;

    let annotator = match &args.font {
        Some(path) => Annotator::with_font_file(path)?,
        None => Annotator::default(),
    };

    spawn_meter_logger();

    let state = AppState::new(Arc::new(model), annotator);
    let app = router(state, args.max_upload_mb * 1024 * 1024);

    // Serve HTTP server
    let addr: SocketAddr = args.server_address.parse()?;
    log::info!("Serving on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
