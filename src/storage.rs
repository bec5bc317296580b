use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A stored upload: final location plus the generated filename.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub filename: String,
    pub filepath: String,
}

/// Persist uploaded bytes under the configured upload directory.
///
/// Files are namespaced per user and renamed to a uuid to avoid collisions;
/// the original name survives only in the photo record.
pub async fn save_uploaded_file(
    upload_dir: &str,
    user_id: i64,
    original_name: &str,
    data: &[u8],
) -> Result<SavedFile> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");

    let dir = PathBuf::from(upload_dir).join("photos").join(user_id.to_string());
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension);
    let filepath = dir.join(&filename);

    tokio::fs::write(&filepath, data)
        .await
        .with_context(|| format!("Failed to write uploaded file {}", filepath.display()))?;

    tracing::info!("Saved upload {} ({} bytes)", filepath.display(), data.len());

    Ok(SavedFile {
        filename,
        filepath: filepath.to_string_lossy().into_owned(),
    })
}

/// Remove a stored file. Missing files are logged, not fatal: the photo record
/// is the source of truth and deleting it must not fail on a lost artifact.
pub async fn delete_file(filepath: &str) {
    if let Err(e) = tokio::fs::remove_file(filepath).await {
        tracing::warn!("Could not delete stored file {}: {}", filepath, e);
    }
}

/// Scoped temporary image written during base64 resolution.
///
/// The file is removed when the guard drops, on every exit path including
/// adapter failure.
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    pub fn create(data: &[u8]) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("plantid_{}.jpg", Uuid::new_v4()));
        std::fs::write(&path, data)
            .with_context(|| format!("Failed to write temporary image {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Could not remove temporary image {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_image_removed_on_drop() {
        let temp = TempImage::create(b"not really a jpeg").unwrap();
        let path = temp.path().to_path_buf();
        assert!(path.exists());
        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_image_names_are_unique() {
        let a = TempImage::create(b"a").unwrap();
        let b = TempImage::create(b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_save_and_delete_file() {
        let dir = std::env::temp_dir().join(format!("uploads_{}", Uuid::new_v4()));
        let upload_dir = dir.to_string_lossy().into_owned();

        let saved = save_uploaded_file(&upload_dir, 1, "leaf.png", b"png bytes")
            .await
            .unwrap();
        assert!(saved.filename.ends_with(".png"));
        assert_eq!(tokio::fs::read(&saved.filepath).await.unwrap(), b"png bytes");

        delete_file(&saved.filepath).await;
        assert!(!Path::new(&saved.filepath).exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
