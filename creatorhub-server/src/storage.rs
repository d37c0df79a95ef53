//! File storage buckets
//!
//! Buckets are folders under `<root>/storage/`. Object keys are generated
//! by [`Storage::object_key`] and always have the form
//! `<owner>/<uuid>-<sanitised name>`; keys containing `..`, absolute paths
//! or backslashes are rejected.

use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use creatorhub_common::{Error, Result};

/// Known buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Contract PDFs
    Contracts,
    /// Creator content uploads
    Content,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Contracts => "contracts",
            Bucket::Content => "content",
        }
    }
}

/// Filesystem-backed bucket storage
#[derive(Debug, Clone)]
pub struct Storage {
    base: PathBuf,
}

impl Storage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Build a fresh object key for `owner` and a client-supplied file name
    pub fn object_key(owner: &str, file_name: &str) -> String {
        format!(
            "{}/{}-{}",
            sanitize_file_name(owner),
            Uuid::new_v4(),
            sanitize_file_name(file_name)
        )
    }

    fn resolve(&self, bucket: Bucket, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('\\') {
            return Err(Error::InvalidInput(format!("Invalid storage key '{}'", key)));
        }
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::InvalidInput(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.base.join(bucket.as_str()).join(relative))
    }

    /// Write an object, replacing any previous content
    pub async fn put(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(bucket = bucket.as_str(), key, size = bytes.len(), "Stored object");
        Ok(())
    }

    /// Read an object
    pub async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(format!(
                "{}/{}",
                bucket.as_str(),
                key
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an object; missing objects are ignored
    pub async fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        let path = self.resolve(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write and remove a probe file (smoke test)
    pub async fn check_writable(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base).await?;
        let probe = self.base.join(format!(".probe-{}", Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`
///
/// Leading dots are stripped so names can never be `.` or `..`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(120).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_object_key_shape() {
        let key = Storage::object_key("user-1", "Contract v2.pdf");
        let (owner, rest) = key.split_once('/').unwrap();
        assert_eq!(owner, "user-1");
        assert!(rest.ends_with("-Contract_v2.pdf"));
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());

        storage.put(Bucket::Content, "u1/a.txt", b"hello").await.unwrap();
        assert_eq!(storage.get(Bucket::Content, "u1/a.txt").await.unwrap(), b"hello");
        assert!(dir.path().join("content/u1/a.txt").exists());

        storage.delete(Bucket::Content, "u1/a.txt").await.unwrap();
        assert!(matches!(
            storage.get(Bucket::Content, "u1/a.txt").await,
            Err(Error::NotFound(_))
        ));
        storage.delete(Bucket::Content, "u1/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());

        for key in ["../x", "/etc/passwd", "a/../../b", "a\\b", ""] {
            assert!(
                matches!(
                    storage.put(Bucket::Contracts, key, b"x").await,
                    Err(Error::InvalidInput(_))
                ),
                "{} should be rejected",
                key
            );
        }
    }

    #[tokio::test]
    async fn test_check_writable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("storage"));
        storage.check_writable().await.unwrap();
    }
}
