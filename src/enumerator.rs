use log::info;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// File name suffix of the slices picked up from a directory (case-sensitive).
pub const DICOM_SUFFIX: &str = ".dcm";

#[derive(Debug, Error)]
#[error("Could not list slices in {}: {source}", .path.display())]
pub struct EnumerationError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// List the `.dcm` entries of a directory, sorted by file name
///
/// The file name is the only ordering signal, no header is read here.
/// A directory without any matching entry yields an empty list.
///
/// # Errors
///
/// Returns [`EnumerationError`] if the directory does not exist or cannot be
/// read.
pub fn list_slices(directory: impl AsRef<Path>) -> Result<Vec<PathBuf>, EnumerationError> {
    let directory = directory.as_ref();
    let to_error = |source| EnumerationError {
        path: directory.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(directory).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        if has_dicom_suffix(&entry.file_name()) {
            paths.push(entry.path());
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!("Found {} slices in {}", paths.len(), directory.display());
    Ok(paths)
}

fn has_dicom_suffix(file_name: &std::ffi::OsStr) -> bool {
    file_name
        .as_encoded_bytes()
        .ends_with(DICOM_SUFFIX.as_bytes())
}
