use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use shared::domain::MediaKind;
use tracing::warn;
use uuid::Uuid;

pub const UPLOAD_URL_PREFIX: &str = "/uploads/";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];

/// Classifies an upload by its file extension, case-insensitively.
pub fn media_kind_for_filename(filename: &str) -> Option<(MediaKind, String)> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some((MediaKind::Image, ext))
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some((MediaKind::Video, ext))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh `<timestamp>_<id>.<ext>` name and returns
    /// the public URL for it.
    pub async fn save(&self, ext: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create upload dir '{}'", self.root.display()))?;

        let unique = Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}_{}.{ext}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            &unique[..8]
        );
        let path = self.root.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload '{}'", path.display()))?;
        Ok(format!("{UPLOAD_URL_PREFIX}{filename}"))
    }

    /// Best-effort removal of the file behind an upload URL.
    pub async fn remove(&self, url: &str) {
        let Some(filename) = url.rsplit('/').next().filter(|name| !name.is_empty()) else {
            return;
        };
        let path = self.root.join(filename);
        if let Err(error) = tokio::fs::remove_file(&path).await {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to delete upload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions_case_insensitively() {
        assert_eq!(
            media_kind_for_filename("Portrait.JPG"),
            Some((MediaKind::Image, "jpg".to_string()))
        );
        assert_eq!(
            media_kind_for_filename("clip.webm"),
            Some((MediaKind::Video, "webm".to_string()))
        );
        assert_eq!(media_kind_for_filename("notes.txt"), None);
        assert_eq!(media_kind_for_filename("no_extension"), None);
    }

    #[tokio::test]
    async fn saves_and_removes_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path().join("uploads"));
        let url = store.save("png", b"pixels").await.expect("save");
        assert!(url.starts_with(UPLOAD_URL_PREFIX));
        assert!(url.ends_with(".png"));

        let path = store.root().join(url.trim_start_matches(UPLOAD_URL_PREFIX));
        assert_eq!(std::fs::read(&path).expect("read"), b"pixels");

        store.remove(&url).await;
        assert!(!path.exists());
        store.remove(&url).await;
    }
}
