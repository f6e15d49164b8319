//! Upload of a photo to the detection API.
//!
use std::path::Path;

use anyhow::{bail, Context, Result};
use common::{CountTable, DetectResponse, DetectionConfig};
use reqwest::{
    multipart::{Form, Part},
    Client,
};

/// Send one photo with the given settings and return the server's detections.
pub async fn upload_capture(
    client: &Client,
    server_address: &str,
    path: &Path,
    config: &DetectionConfig,
) -> Result<DetectResponse> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".into());
    log::info!("Uploading {} ({} bytes)", file_name, data.len());

    let form = settings_form(config).part("image", Part::bytes(data).file_name(file_name));
    let resp = client
        .post(format!("http://{server_address}/api/detect"))
        .multipart(form)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        bail!("server answered {}: {}", status, resp.text().await?);
    }

    Ok(resp.json().await?)
}

fn settings_form(config: &DetectionConfig) -> Form {
    Form::new()
        .text("confidence", config.confidence_threshold.to_string())
        .text("iou", config.iou_threshold.to_string())
        .text("agnostic", config.class_agnostic.to_string())
        .text("multi_label", config.multi_label.to_string())
        .text("max_det", config.max_detections.to_string())
}

/// Render the count table as aligned plain text.
pub fn format_table(counts: &CountTable) -> String {
    const HEADER: (&str, &str) = ("Category", "Count");

    let width = counts
        .iter()
        .map(|row| row.label.chars().count())
        .chain([HEADER.0.len()])
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<width$}  {}\n", HEADER.0, HEADER.1);
    for row in counts {
        out.push_str(&format!("{:<width$}  {}\n", row.label, row.count));
    }
    out.push_str(&format!("{:<width$}  {}\n", "Total", counts.total()));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{count_by_label, LabelMap};

    #[test]
    fn table_is_aligned() {
        let labels: LabelMap = [(0, "traffic light"), (1, "cat")].into_iter().collect();
        let counts = count_by_label([1, 0, 1], &labels).unwrap();

        assert_eq!(
            format_table(&counts),
            "Category       Count\n\
             cat            2\n\
             traffic light  1\n\
             Total          3\n"
        );
    }

    #[test]
    fn empty_table() {
        assert_eq!(
            format_table(&CountTable::default()),
            "Category  Count\nTotal     0\n"
        );
    }

    #[tokio::test]
    async fn missing_file_fails_before_sending() {
        let err = upload_capture(
            &Client::new(),
            "127.0.0.1:9",
            Path::new("no/such/photo.jpg"),
            &DetectionConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
