//! Utility functions
//!
use std::{
    fs::{self, File},
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use reqwest::Client;

/// Download a file from a URL to a given filepath.
pub async fn download_file(client: &Client, url: &str, filepath: impl AsRef<Path>) -> Result<()> {
    let resp = client.get(url).send().await?.error_for_status()?;

    let mut file = File::create(filepath)?;
    let mut content = Cursor::new(resp.bytes().await?);
    std::io::copy(&mut content, &mut file)?;

    Ok(())
}

/// Locate the model weights, downloading them into the cache directory if needed.
///
/// An existing `model_path` always wins. Otherwise the file name of `model_path` is looked up
/// in the cache directory and fetched from `model_url` when absent.
pub async fn ensure_model(model_path: &Path, model_url: Option<&str>) -> Result<PathBuf> {
    if model_path.exists() {
        return Ok(model_path.to_owned());
    }

    let file_name = model_path
        .file_name()
        .with_context(|| format!("model path {} has no file name", model_path.display()))?;
    let cache_dir = dirs::cache_dir()
        .context("no cache directory available")?
        .join(env!("CARGO_PKG_NAME"));
    let cached = cache_dir.join(file_name);
    if cached.exists() {
        log::info!("Using cached model {}", cached.display());
        return Ok(cached);
    }

    let Some(url) = model_url else {
        bail!(
            "model {} not found and no download URL given",
            model_path.display()
        );
    };

    fs::create_dir_all(&cache_dir)?;
    log::info!("Downloading model from {} to {}", url, cached.display());
    let partial = cached.with_extension("part");
    download_file(&Client::new(), url, &partial).await?;
    fs::rename(&partial, &cached)?;

    Ok(cached)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_model_path_is_used() -> Result<()> {
        let path = std::env::temp_dir().join("detect_server_existing_model.onnx");
        fs::write(&path, b"weights")?;

        assert_eq!(ensure_model(&path, None).await?, path);

        fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn missing_model_without_url_fails() {
        let path = Path::new("definitely-missing-7f3a/weights-7f3a.onnx");
        assert!(ensure_model(path, None).await.is_err());
    }
}
