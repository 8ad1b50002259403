//! Writes CSV exports to disk.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use thiserror::Error;
use tracing::info;

use crate::domain::{ExportError, ExportSerializer, FeatureCollection};

/// Errors raised while writing an export file.
#[derive(Debug, Error)]
pub enum ExportFileError {
    /// There was nothing to write; no file is created.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// The file could not be written.
    #[error("failed to write export to {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ExportFileError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialise `features` and write them to `path`, returning the number of
/// data rows written.
///
/// # Errors
///
/// Returns [`ExportFileError::Export`] without touching the filesystem when
/// `features` is empty, or [`ExportFileError::Io`] when the write fails.
pub fn write_export(path: &Path, features: &FeatureCollection) -> Result<usize, ExportFileError> {
    let csv = ExportSerializer::serialize(features)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        ExportFileError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "export path must name a file"),
        )
    })?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|error| ExportFileError::io(path, error))?;
    directory
        .write(Path::new(file_name), csv.as_bytes())
        .map_err(|error| ExportFileError::io(path, error))?;

    info!(path = %path.display(), rows = features.len(), "wrote parcel export");
    Ok(features.len())
}
