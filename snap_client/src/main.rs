//! Upload a photo to the detection server and print what was found.
//!
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use common::DetectionConfig;
use env_logger::TimestampPrecision;
use snap_client::upload::{format_table, upload_capture};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Photo to run the detection on
    image: PathBuf,

    /// Address of the detection server
    #[clap(long, default_value = "127.0.0.1:3000")]
    server_address: String,

    /// Confidence threshold (0.0 - 1.0)
    #[clap(long, default_value_t = common::config::DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// IoU threshold of the non-maximum suppression (0.0 - 1.0)
    #[clap(long, default_value_t = common::config::DEFAULT_IOU)]
    iou: f32,

    /// Suppress overlapping boxes across classes
    #[clap(long)]
    agnostic: bool,

    /// Allow several labels per box
    #[clap(long)]
    multi_label: bool,

    /// Maximum number of detections
    #[clap(long, default_value_t = common::config::DEFAULT_MAX_DETECTIONS)]
    max_det: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let config = DetectionConfig {
        confidence_threshold: args.confidence,
        iou_threshold: args.iou,
        class_agnostic: args.agnostic,
        multi_label: args.multi_label,
        max_detections: args.max_det,
    }
    .validate()?;

    let client = reqwest::Client::new();
    let response = upload_capture(&client, &args.server_address, &args.image, &config).await?;

    log::info!(
        "{}x{} image, inference took {:.1}ms",
        response.width,
        response.height,
        response.infer_ms
    );
    print!("{}", format_table(&response.counts));

    Ok(())
}
