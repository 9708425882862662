use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to load file: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported file type: {0:?}")]
    UnsupportedFileType(PathBuf),

    #[error("Cannot map zero sized device: {0:?}")]
    EmptyDevice(PathBuf),

    #[error("File of {0} bytes does not fit in memory")]
    TooLarge(u64),
}

/// Errors from saving a blob. Everything except `Io` is something the user
/// can act on, for example by retrying with another path.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("can't save: no filename.")]
    NoFilename,

    #[error("can't save: nonexistent path.")]
    NonexistentPath,

    #[error("can't save: insufficient permissions.")]
    InsufficientPermissions,

    #[error("can't save: file is busy.")]
    FileBusy,

    #[error("can't save: {0}")]
    Io(#[from] io::Error),
}

impl SaveError {
    /// Classify an error from opening the save target
    pub(crate) fn from_open(err: io::Error) -> SaveError {
        match err.kind() {
            io::ErrorKind::NotFound => SaveError::NonexistentPath,
            io::ErrorKind::PermissionDenied => SaveError::InsufficientPermissions,
            _ if is_busy(&err) => SaveError::FileBusy,
            _ => SaveError::Io(err),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SaveError::Io(_))
    }
}

#[cfg(unix)]
fn is_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
fn is_busy(_err: &io::Error) -> bool {
    false
}
