use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::RockhoundError;

/// On-disk cache holding verified archives and their download records.
#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new(cache_dir: Option<Utf8PathBuf>) -> Result<Self, RockhoundError> {
        if let Some(cache_root) = cache_dir {
            return Ok(Self { cache_root });
        }

        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("rockhound")).ok()
            })
            .ok_or_else(|| {
                RockhoundError::Filesystem("unable to resolve cache directory".to_string())
            })?;

        Ok(Self { cache_root })
    }

    pub fn new_with_root(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn archive_path(&self, archive: &str) -> Utf8PathBuf {
        self.cache_root.join(archive)
    }

    pub fn archive_metadata_path(&self, archive: &str) -> Utf8PathBuf {
        self.cache_root
            .join("metadata")
            .join("archives")
            .join(format!("{archive}.json"))
    }

    pub fn ensure_cache_root(&self) -> Result<(), RockhoundError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))
    }

    /// Creates an empty temp file next to the cache so the finished download
    /// can be renamed into place without crossing filesystems.
    pub fn download_tempfile(&self, archive: &str) -> Result<NamedTempFile, RockhoundError> {
        self.ensure_cache_root()?;
        tempfile::Builder::new()
            .prefix(&format!(".{archive}"))
            .suffix(".part")
            .tempfile_in(self.cache_root.as_std_path())
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))
    }

    pub fn persist_archive(
        &self,
        temp: NamedTempFile,
        archive: &str,
    ) -> Result<Utf8PathBuf, RockhoundError> {
        let dest = self.archive_path(archive);
        if dest.as_std_path().exists() {
            fs::remove_file(dest.as_std_path())
                .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        }
        temp.persist(dest.as_std_path())
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        Ok(dest)
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &ArchiveMetadata) -> Result<(), RockhoundError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn read_metadata(path: &Utf8Path) -> Result<Option<ArchiveMetadata>, RockhoundError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        let metadata = serde_json::from_str(&content)
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        Ok(Some(metadata))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub archive: String,
    pub url: String,
    pub sha256: String,
    pub downloaded_at: String,
    pub tool: String,
    pub resolved_path: String,
}
