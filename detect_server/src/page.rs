//! HTML of the capture and result pages.
//!
use std::fmt::Write;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{CountTable, DetectionConfig};

const TITLE: &str = "🔍 Object Detection in Images";

const STYLE: &str = r#"
    body { font-family: sans-serif; margin: 0; display: flex; }
    form { display: flex; width: 100%; }
    aside { width: 18rem; padding: 1.5rem; background: #f0f2f6; min-height: 100vh; }
    main { flex: 1; padding: 1.5rem 2.5rem; }
    .columns { display: flex; gap: 2rem; }
    .columns > div { flex: 1; }
    img { max-width: 100%; }
    table { border-collapse: collapse; }
    td, th { border: 1px solid #ccc; padding: 0.3rem 0.8rem; text-align: left; }
    .error { color: #b00020; }
"#;

/// Capture page with the threshold sliders in the sidebar.
pub fn index(config: &DetectionConfig) -> String {
    let mut body = String::new();
    write!(
        body,
        r#"<form action="/detect" method="post" enctype="multipart/form-data">
  <aside>
    <h3>⚙️ Settings</h3>
    <label for="iou">IoU threshold</label>
    <input type="range" id="iou" name="iou" min="0" max="1" step="0.01" value="{iou}"
      oninput="document.getElementById('iou_value').textContent = this.value">
    <p><b>Selected IoU:</b> <span id="iou_value">{iou}</span></p>
    <label for="confidence">Confidence threshold</label>
    <input type="range" id="confidence" name="confidence" min="0" max="1" step="0.01" value="{conf}"
      oninput="document.getElementById('confidence_value').textContent = this.value">
    <p><b>Selected confidence:</b> <span id="confidence_value">{conf}</span></p>
  </aside>
  <main>
    <h1>{title}</h1>
    <p><label for="image">📸 Take a picture</label></p>
    <input type="file" id="image" name="image" accept="image/*" capture="environment" required>
    <button type="submit">Detect</button>
  </main>
</form>"#,
        iou = config.iou_threshold,
        conf = config.confidence_threshold,
        title = TITLE,
    )
    .ok();

    layout(&body)
}

/// Two-column result: annotated photo next to the count table.
pub fn result(annotated_jpeg: &[u8], counts: &CountTable, config: &DetectionConfig) -> String {
    let mut rows = String::new();
    for row in counts {
        write!(
            rows,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&row.label),
            row.count
        )
        .ok();
    }
    if counts.is_empty() {
        rows.push_str(r#"<tr><td colspan="2">No objects detected</td></tr>"#);
    }

    let mut body = String::new();
    write!(
        body,
        r#"<main>
  <h1>{title}</h1>
  <p>Confidence {conf}, IoU {iou}. <a href="/">Capture another picture</a></p>
  <div class="columns">
    <div>
      <h3>📷 Image with detections</h3>
      <img alt="annotated capture" src="data:image/jpeg;base64,{image}">
    </div>
    <div>
      <h3>📊 Detection results</h3>
      <table>
        <tr><th>Category</th><th>Count</th></tr>
        {rows}
      </table>
      <p>Total: {total}</p>
    </div>
  </div>
</main>"#,
        title = TITLE,
        conf = config.confidence_threshold,
        iou = config.iou_threshold,
        image = STANDARD.encode(annotated_jpeg),
        rows = rows,
        total = counts.total(),
    )
    .ok();

    layout(&body)
}

pub fn error(message: &str) -> String {
    layout(&format!(
        r#"<main>
  <h1>{}</h1>
  <p class="error">{}</p>
  <p><a href="/">Try again</a></p>
</main>"#,
        TITLE,
        escape(message)
    ))
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Object Detection</title>
  <style>{STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{count_by_label, LabelMap};

    #[test]
    fn index_shows_default_thresholds() {
        let page = index(&DetectionConfig::default());
        assert!(page.contains(r#"name="confidence" min="0" max="1" step="0.01" value="0.25""#));
        assert!(page.contains(r#"name="iou" min="0" max="1" step="0.01" value="0.45""#));
        assert!(page.contains(r#"capture="environment""#));
    }

    #[test]
    fn result_lists_counts() {
        let labels: LabelMap = [(0, "car"), (1, "<bus>")].into_iter().collect();
        let counts = count_by_label([0, 1, 0], &labels).unwrap();
        let page = result(&[0xff, 0xd8], &counts, &DetectionConfig::default());

        assert!(page.contains("<tr><td>&lt;bus&gt;</td><td>1</td></tr>"));
        assert!(page.contains("<tr><td>car</td><td>2</td></tr>"));
        assert!(page.contains("data:image/jpeg;base64,/9g="));
        assert!(page.contains("Total: 3"));
    }

    #[test]
    fn result_without_detections() {
        let page = result(&[], &CountTable::default(), &DetectionConfig::default());
        assert!(page.contains("No objects detected"));
    }

    #[test]
    fn error_message_is_escaped() {
        assert!(error("bad <input>").contains("bad &lt;input&gt;"));
    }
}
