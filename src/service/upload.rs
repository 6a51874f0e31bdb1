use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::{errors::ApiError, service::crypto};

pub const PUBLIC_PREFIX: &str = "/static/uploads/";
const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Result of [`UploadStore::save`]. `is_new` is false when identical bytes
/// were already stored, in which case the file may be shared with another event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub is_new: bool,
}

/// Event images on local disk, named by the SHA3-256 of their bytes.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stores the image and returns its public URL.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<StoredImage, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::validation("Uploaded image is empty"));
        }
        let ext = image_extension(original_name)
            .ok_or_else(|| ApiError::validation("Image must be png, jpg, jpeg, gif or webp"))?;
        let name = format!("{}.{}", crypto::get_sha3_256_hash(bytes), ext);

        let io_err = |err: std::io::Error| {
            error!("failed to store upload in {}: {}", self.dir.display(), err);
            ApiError::Persistence
        };
        let path = self.dir.join(&name);
        let is_new = !tokio::fs::try_exists(&path).await.map_err(io_err)?;
        if is_new {
            tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
            tokio::fs::write(&path, bytes).await.map_err(io_err)?;
        }
        Ok(StoredImage {
            url: format!("{PUBLIC_PREFIX}{name}"),
            is_new,
        })
    }

    /// Deletes a file previously returned by [`UploadStore::save`]. Failures
    /// are logged only.
    pub async fn remove(&self, url: &str) {
        let Some(name) = stored_name(url) else {
            return;
        };
        if let Err(err) = tokio::fs::remove_file(self.dir.join(name)).await {
            warn!("could not remove upload {}: {}", name, err);
        }
    }
}

/// Lower-cased extension of `name` if it is an accepted image type.
pub fn image_extension(name: Option<&str>) -> Option<String> {
    let ext = Path::new(name?).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// The bare file name behind one of our upload URLs. Anything that could
/// escape the upload directory yields `None`.
pub fn stored_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix(PUBLIC_PREFIX)?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.')
        && !name.starts_with('.');
    valid.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(image_extension(Some("Poster.PNG")).as_deref(), Some("png"));
        assert_eq!(image_extension(Some("photo.jpeg")).as_deref(), Some("jpeg"));
        assert_eq!(image_extension(Some("script.sh")), None);
        assert_eq!(image_extension(Some("noext")), None);
        assert_eq!(image_extension(None), None);
    }

    #[test]
    fn stored_name_refuses_traversal() {
        assert_eq!(stored_name("/static/uploads/abc123.png"), Some("abc123.png"));
        assert_eq!(stored_name("/static/uploads/../secret"), None);
        assert_eq!(stored_name("/static/uploads/a/b.png"), None);
        assert_eq!(stored_name("/elsewhere/abc.png"), None);
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", uuid::Uuid::new_v4()));
        let store = UploadStore::new(&dir);
        let stored = store.save(Some("poster.png"), b"\x89PNG fake").await.unwrap();
        assert!(stored.is_new);
        let url = stored.url;
        assert!(url.starts_with(PUBLIC_PREFIX) && url.ends_with(".png"));

        let again = store.save(Some("copy.PNG"), b"\x89PNG fake").await.unwrap();
        assert_eq!(again.url, url);
        assert!(!again.is_new);

        let path = dir.join(stored_name(&url).unwrap());
        assert!(path.exists());
        store.remove(&url).await;
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn empty_or_unknown_uploads_are_rejected() {
        let store = UploadStore::new(std::env::temp_dir());
        assert!(store.save(Some("a.png"), b"").await.is_err());
        assert!(store.save(Some("a.exe"), b"MZ").await.is_err());
    }
}
