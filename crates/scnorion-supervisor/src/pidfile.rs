use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("cannot write pidfile {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Writes the current process id to `path`. Every role writes its pidfile
/// before subscribing to anything on the bus, so a supervising process
/// manager can tell "process is up" apart from "process is ready to
/// receive work" only by also checking the bus side — harmonized across
/// all three roles rather than left role-specific as in the original.
pub fn write(path: &Path) -> Result<(), PidFileError> {
    std::fs::write(path, std::process::id().to_string()).map_err(|source| PidFileError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn remove(path: &Path) {
    let _ = std::fs::remove_file(path);
}
