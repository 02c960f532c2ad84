use chrono::{DateTime, Utc};
use std::io;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

use super::validation::UploadedImage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// Where an accepted upload ended up.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_name: String,
    pub storage_name: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Flat directory of uploads. Files are written once and never cleaned up.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// `<YYYYMMDD-HHMMSS>_<name>` passed through [`secure_filename`].
    ///
    /// Two uploads with the same name in the same second map to the same file;
    /// the later one overwrites the earlier.
    pub fn storage_name(original_name: &str, now: DateTime<Utc>) -> String {
        secure_filename(&format!(
            "{}_{}",
            now.format("%Y%m%d-%H%M%S"),
            original_name
        ))
    }

    pub async fn save(
        &self,
        upload: &UploadedImage,
        now: DateTime<Utc>,
    ) -> Result<StoredUpload, StorageError> {
        let storage_name = Self::storage_name(&upload.original_name, now);
        let path = self.root.join(&storage_name);

        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(StoredUpload {
            original_name: upload.original_name.clone(),
            storage_name,
            path,
            size: upload.bytes.len(),
        })
    }

    /// Maps a requested name to a path under the upload directory.
    ///
    /// Returns `None` for anything that could escape it: parent or root components,
    /// empty segments, backslashes.
    pub fn resolve(&self, requested: &str) -> Option<PathBuf> {
        if requested.is_empty() || requested.contains('\\') || requested.contains('\0') {
            return None;
        }
        let relative = Path::new(requested);
        let mut components = 0;
        for component in relative.components() {
            match component {
                Component::Normal(_) => components += 1,
                _ => return None,
            }
        }
        if components == 0 || requested.split('/').any(str::is_empty) {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Locates a stored file; `Ok(None)` when it does not exist or is not a regular file.
    pub async fn locate(&self, requested: &str) -> Result<Option<PathBuf>, StorageError> {
        let Some(path) = self.resolve(requested) else {
            return Ok(None);
        };
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }
}

/// Reduces an untrusted filename to `[A-Za-z0-9_.-]`.
///
/// Compatibility decomposition runs first so accented letters keep their base
/// letter (`café` becomes `cafe`) and any remaining non-ASCII is dropped. Path
/// separators and whitespace runs become a single `_`, and leading/trailing `.` and `_` are stripped, so `../../etc/passwd`
/// becomes `etc_passwd`. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    cleaned.trim_matches(|c: char| c == '.' || c == '_').to_string()
}
