use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::catalog::BEDMAP2_ARCHIVE;
use crate::config::ResolvedConfig;
use crate::error::RockhoundError;
use crate::store::{ArchiveMetadata, Store};

const BEDMAP2_URL: &str = "https://secure.antarctica.ac.uk/data/bedmap2/bedmap2_tiff.zip";
const BEDMAP2_SHA256: &str = "f4bb27ce05197e9d29e4249d64a947b93aab264c3b4e6cbf49d6b339fb6c67fe";

/// Resolves an archive name to a checksum-verified local file.
pub trait ArchiveFetcher {
    fn fetch(&self, archive: &str) -> Result<Utf8PathBuf, RockhoundError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub url: String,
    pub sha256: String,
}

/// Known remote archives and their expected SHA-256 digests.
#[derive(Debug, Clone)]
pub struct ArchiveRegistry {
    entries: BTreeMap<String, ArchiveEntry>,
}

impl ArchiveRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(ArchiveEntry {
            name: BEDMAP2_ARCHIVE.to_string(),
            url: BEDMAP2_URL.to_string(),
            sha256: BEDMAP2_SHA256.to_string(),
        });
        registry
    }

    /// Built-in entries with the config's url/checksum overrides applied.
    /// Overrides naming an unknown archive register it when both fields are set.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let mut registry = Self::builtin();
        for (name, overrides) in &config.archives {
            match registry.entries.get_mut(name) {
                Some(entry) => {
                    if let Some(url) = &overrides.url {
                        entry.url = url.clone();
                    }
                    if let Some(sha256) = &overrides.sha256 {
                        entry.sha256 = sha256.clone();
                    }
                }
                None => match (&overrides.url, &overrides.sha256) {
                    (Some(url), Some(sha256)) => registry.insert(ArchiveEntry {
                        name: name.clone(),
                        url: url.clone(),
                        sha256: sha256.clone(),
                    }),
                    _ => warn!(archive = %name, "ignoring incomplete registry override"),
                },
            }
        }
        registry
    }

    pub fn insert(&mut self, entry: ArchiveEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, archive: &str) -> Result<&ArchiveEntry, RockhoundError> {
        self.entries
            .get(archive)
            .ok_or_else(|| RockhoundError::UnknownArchive(archive.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.values()
    }
}

/// Downloads registered archives over HTTP into the [`Store`], reusing the
/// cached copy whenever its checksum still matches.
#[derive(Clone)]
pub struct HttpArchiveFetcher {
    client: Client,
    registry: ArchiveRegistry,
    store: Store,
}

impl HttpArchiveFetcher {
    pub fn new(
        registry: ArchiveRegistry,
        store: Store,
        timeout: Duration,
    ) -> Result<Self, RockhoundError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rockhound/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| RockhoundError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| RockhoundError::Http(err.to_string()))?;
        Ok(Self {
            client,
            registry,
            store,
        })
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, RockhoundError> {
        let store = Store::new(config.cache_dir.clone())?;
        Self::new(ArchiveRegistry::from_config(config), store, config.timeout)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &ArchiveRegistry {
        &self.registry
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, RockhoundError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 500;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        warn!(status, attempt, "retrying archive download");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        warn!(error = %err, attempt, "retrying archive download");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(RockhoundError::Http(err.to_string()));
                }
            }
        }
    }

    fn download(&self, entry: &ArchiveEntry) -> Result<Utf8PathBuf, RockhoundError> {
        info!(archive = %entry.name, url = %entry.url, "downloading archive");
        let start = Instant::now();
        let mut response = self.send_with_retries(&entry.url)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(RockhoundError::HttpStatus { status, message });
        }

        // The temp file is removed on drop unless it is persisted below.
        let mut temp = self.store.download_tempfile(&entry.name)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| RockhoundError::Http(err.to_string()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            temp.write_all(&buffer[..read])
                .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
        }
        temp.flush()
            .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;

        let actual = format!("{:x}", hasher.finalize());
        if actual != entry.sha256 {
            return Err(RockhoundError::ChecksumMismatch {
                archive: entry.name.clone(),
                expected: entry.sha256.clone(),
                actual,
            });
        }

        let path = self.store.persist_archive(temp, &entry.name)?;
        let metadata = ArchiveMetadata {
            archive: entry.name.clone(),
            url: entry.url.clone(),
            sha256: actual,
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("rockhound/{}", env!("CARGO_PKG_VERSION")),
            resolved_path: path.to_string(),
        };
        Store::write_metadata(&self.store.archive_metadata_path(&entry.name), &metadata)?;
        info!(
            archive = %entry.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "archive downloaded and verified"
        );
        Ok(path)
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch(&self, archive: &str) -> Result<Utf8PathBuf, RockhoundError> {
        let entry = self.registry.get(archive)?;
        let path = self.store.archive_path(&entry.name);
        if path.as_std_path().exists() {
            let actual = sha256_file(&path)?;
            if actual == entry.sha256 {
                debug!(archive = %entry.name, path = %path, "using cached archive");
                return Ok(path);
            }
            warn!(
                archive = %entry.name,
                expected = %entry.sha256,
                actual = %actual,
                "cached archive failed verification, downloading again"
            );
        }
        self.download(entry)
    }
}

/// SHA-256 of a file as a lowercase hex string.
pub fn sha256_file(path: &Utf8Path) -> Result<String, RockhoundError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| RockhoundError::Filesystem(format!("open {path}: {err}")))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|err| RockhoundError::Filesystem(format!("read {path}: {err}")))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
