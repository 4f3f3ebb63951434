use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RockhoundError {
    #[error("dataset {name} not found in {archive}")]
    #[diagnostic(help("run `rockhound list` to see the available datasets"))]
    InvalidDataset { name: String, archive: String },

    #[error("archive {0} is not in the registry")]
    UnknownArchive(String),

    #[error("download request failed: {0}")]
    Http(String),

    #[error("download returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("checksum mismatch for {archive}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        archive: String,
        expected: String,
        actual: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("zip error: {0}")]
    Zip(String),

    #[error("member {member} not found in {archive}")]
    MemberNotFound { archive: String, member: String },

    #[error("failed to decode raster {path}: {message}")]
    RasterDecode { path: PathBuf, message: String },

    #[error("unsupported raster: {0}")]
    UnsupportedRaster(String),

    #[error("cannot merge arrays: {0}")]
    MergeConflict(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}
