//! Static resource serving.
//!
//! Paths are mapped component by component under the root; anything other
//! than plain names (`..`, absolute roots, prefixes) is rejected.

use std::io;
use std::path::{Component, Path, PathBuf};

use axum::http::StatusCode;

use crate::http::response::Reply;

#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html;charset=UTF-8",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain;charset=UTF-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }

    /// Existing regular file for `url_path`, if any.
    pub async fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let path = self.map_path(url_path)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    pub async fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .resolve(url_path)
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))?;
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, Self::content_type(&path)))
    }

    /// A `200` reply for an existing file, `None` when there is nothing to serve.
    pub async fn serve(&self, url_path: &str) -> Option<Reply> {
        match self.load(url_path).await {
            Ok((bytes, content_type)) => Some(Reply::bytes(StatusCode::OK, content_type, bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %url_path, error = %err, "Failed to read static file");
                None
            }
        }
    }
}
