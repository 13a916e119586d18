//! Uploaded file storage.
//!
//! # Purpose
//! Author pictures are stored through the [`FileStore`] trait, which hands
//! back a public URL the author record keeps. The local backend writes under
//! a root directory served by the router at `/files`.
use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const FILES_ROUTE: &str = "/files";

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("invalid container name: {0}")]
    InvalidContainer(String),
    #[error("file io failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `upload` inside `container` and return its public URL.
    async fn store(&self, container: &str, upload: Upload) -> Result<String, FileStoreError>;

    /// Remove the file behind `url`. Missing URLs and files are ignored.
    async fn delete(&self, url: Option<&str>, container: &str) -> Result<(), FileStoreError>;

    /// Replace the file behind `current` with `upload`.
    ///
    /// The new file is written first; `current` is only removed once that
    /// succeeded. A failed removal leaves an orphan file and is logged.
    async fn edit(
        &self,
        current: Option<&str>,
        container: &str,
        upload: Upload,
    ) -> Result<String, FileStoreError> {
        let url = self.store(container, upload).await?;
        if let Err(err) = self.delete(current, container).await {
            tracing::warn!(error = %err, container, "failed to remove replaced file");
        }
        Ok(url)
    }
}

/// Stores files on the local filesystem under `root/<container>/`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf, FileStoreError> {
        let valid = !container.is_empty()
            && container
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(FileStoreError::InvalidContainer(container.to_string()));
        }
        Ok(self.root.join(container))
    }

    fn url_for(&self, container: &str, name: &str) -> String {
        format!("{}{FILES_ROUTE}/{container}/{name}", self.public_base_url)
    }
}

/// Extension of the client's file name, limited to a safe character set.
fn extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty() || !ext.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// File name at the end of a URL this store handed out. Only the final
/// segment is trusted; the rest of the URL is ignored.
fn stored_name(url: &str) -> Option<&str> {
    let name = url.rsplit('/').next()?;
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.');
    valid.then_some(name)
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, container: &str, upload: Upload) -> Result<String, FileStoreError> {
        let dir = self.container_dir(container)?;
        tokio::fs::create_dir_all(&dir).await?;
        let name = match extension(&upload.file_name) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        tokio::fs::write(dir.join(&name), &upload.bytes).await?;
        tracing::debug!(container, file = %name, bytes = upload.bytes.len() as u64, "stored upload");
        Ok(self.url_for(container, &name))
    }

    async fn delete(&self, url: Option<&str>, container: &str) -> Result<(), FileStoreError> {
        let Some(url) = url.filter(|url| !url.is_empty()) else {
            return Ok(());
        };
        let Some(name) = stored_name(url) else {
            return Ok(());
        };
        let path = self.container_dir(container)?.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records deletions and fails whichever operation it is told to.
    #[derive(Default)]
    struct FlakyStore {
        fail_store: bool,
        fail_delete: bool,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileStore for FlakyStore {
        async fn store(&self, container: &str, upload: Upload) -> Result<String, FileStoreError> {
            if self.fail_store {
                return Err(std::io::Error::other("disk full").into());
            }
            Ok(format!("http://files.test/{container}/{}", upload.file_name))
        }

        async fn delete(&self, url: Option<&str>, _container: &str) -> Result<(), FileStoreError> {
            if let Some(url) = url {
                self.deleted.lock().expect("lock").push(url.to_string());
            }
            if self.fail_delete {
                return Err(std::io::Error::other("read-only").into());
            }
            Ok(())
        }
    }

    fn upload(name: &str, bytes: &'static [u8]) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(bytes),
        }
    }

    fn stored_path(store: &LocalFileStore, url: &str) -> PathBuf {
        let name = url.rsplit('/').next().expect("file name");
        store.root.join("authors").join(name)
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new(dir.path(), "http://localhost:8080/");
        let url = store
            .store("authors", upload("portrait.PNG", b"png-bytes"))
            .await
            .expect("store");
        assert!(url.starts_with("http://localhost:8080/files/authors/"));
        assert!(url.ends_with(".png"));
        let contents = tokio::fs::read(stored_path(&store, &url))
            .await
            .expect("read");
        assert_eq!(contents, b"png-bytes");
    }

    #[tokio::test]
    async fn edit_replaces_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new(dir.path(), "http://localhost:8080");
        let first = store
            .store("authors", upload("a.png", b"first"))
            .await
            .expect("store");
        let second = store
            .edit(Some(&first), "authors", upload("b.jpg", b"second"))
            .await
            .expect("edit");
        assert_ne!(first, second);
        assert!(!stored_path(&store, &first).exists());
        assert!(stored_path(&store, &second).exists());
    }

    #[tokio::test]
    async fn delete_ignores_missing_targets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new(dir.path(), "http://localhost:8080");
        store.delete(None, "authors").await.expect("none");
        store
            .delete(Some("http://localhost:8080/files/authors/missing.png"), "authors")
            .await
            .expect("missing");
        store
            .delete(Some("http://localhost:8080/files/authors/.."), "authors")
            .await
            .expect("traversal ignored");
    }

    #[tokio::test]
    async fn rejects_container_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new(dir.path(), "http://localhost:8080");
        let err = store
            .store("../etc", upload("a.png", b"x"))
            .await
            .expect_err("invalid container");
        assert!(matches!(err, FileStoreError::InvalidContainer(_)));
    }

    #[tokio::test]
    async fn failed_edit_keeps_the_current_file() {
        let store = FlakyStore {
            fail_store: true,
            ..FlakyStore::default()
        };
        let err = store
            .edit(Some("http://files.test/authors/old.png"), "authors", upload("new.png", b"x"))
            .await
            .expect_err("store fails");
        assert!(matches!(err, FileStoreError::Io(_)));
        assert!(store.deleted.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn edit_survives_a_failed_cleanup() {
        let store = FlakyStore {
            fail_delete: true,
            ..FlakyStore::default()
        };
        let url = store
            .edit(Some("http://files.test/authors/old.png"), "authors", upload("new.png", b"x"))
            .await
            .expect("edit");
        assert_eq!(url, "http://files.test/authors/new.png");
        assert_eq!(
            *store.deleted.lock().expect("lock"),
            vec!["http://files.test/authors/old.png".to_string()]
        );
    }
}
