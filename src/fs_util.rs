use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::RockhoundError;

/// Extracts a single member of `zip_path` below `target_dir`, keeping the
/// member's directory structure, and returns the extracted file path.
pub fn extract_member(
    zip_path: &Path,
    member: &str,
    target_dir: &Path,
) -> Result<PathBuf, RockhoundError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        RockhoundError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|err| RockhoundError::Zip(err.to_string()))?;

    let mut entry = archive.by_name(member).map_err(|err| match err {
        ZipError::FileNotFound => RockhoundError::MemberNotFound {
            archive: archive_name(zip_path),
            member: member.to_string(),
        },
        other => RockhoundError::Zip(other.to_string()),
    })?;
    let entry_path = match entry.enclosed_name() {
        Some(path) => target_dir.join(path),
        None => {
            return Err(RockhoundError::Zip(
                "zip entry path traversal detected".to_string(),
            ));
        }
    };
    if entry.is_dir() {
        return Err(RockhoundError::Zip(format!("{member} is a directory")));
    }

    if let Some(parent) = entry_path.parent() {
        fs::create_dir_all(parent).map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
    }
    let mut outfile =
        fs::File::create(&entry_path).map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
    io::copy(&mut entry, &mut outfile).map_err(|err| RockhoundError::Zip(err.to_string()))?;
    Ok(entry_path)
}

/// Names of the file members in the archive, directories skipped.
pub fn list_members(zip_path: &Path) -> Result<Vec<String>, RockhoundError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        RockhoundError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|err| RockhoundError::Zip(err.to_string()))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|err| RockhoundError::Zip(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        names.push(entry.name().to_string());
    }
    Ok(names)
}

fn archive_name(zip_path: &Path) -> String {
    zip_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| zip_path.display().to_string())
}
