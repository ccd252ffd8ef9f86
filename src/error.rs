use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirItemError {
    // Config
    #[error("no icon cache configured")]
    MissingIconCache,

    #[error("invalid override table")]
    Overrides {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // Listing
    #[error("not a directory")]
    NotADirectory(PathBuf),

    #[error("permission denied")]
    PermissionDenied(PathBuf),

    #[error("path not found")]
    NotFound(PathBuf),

    #[error("symlink loop")]
    SymlinkLoop(PathBuf),

    #[error("IO error")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("listing error")]
    Listing(String),
}

impl DirItemError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotADirectory(p)
            | Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::SymlinkLoop(p)
            | Self::Io { path: p, .. }
            | Self::Overrides { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether a listing can continue after this error.
    ///
    /// Per-child failures (permission denied, symlink loops, IO) are collected
    /// into [`Listing::errors`](crate::Listing) and the listing keeps going.
    /// Configuration errors and a bad listing root are fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::SymlinkLoop(_) | Self::Io { .. } | Self::Listing(_)
        )
    }

    pub(crate) fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source: err },
        }
    }
}

/// A failed metadata probe.
///
/// This is the only failure classification ever records: it lands in
/// [`Entry::stat_error`](crate::Entry) and turns the entry into
/// [`BaseType::Error`](crate::BaseType). Kept `Clone` so entries can carry it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("metadata probe failed: {kind}{}", .code.map(|c| format!(" (os error {c})")).unwrap_or_default())]
pub struct ProbeError {
    /// Raw OS error code (`errno`), when the failure came from the OS.
    pub code: Option<i32>,
    pub kind: io::ErrorKind,
}

impl ProbeError {
    /// Build a probe error from a raw `errno` value.
    pub fn from_code(code: i32) -> Self {
        io::Error::from_raw_os_error(code).into()
    }

    pub fn to_io_error(&self) -> io::Error {
        match self.code {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::from(self.kind),
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        Self {
            code: err.raw_os_error(),
            kind: err.kind(),
        }
    }
}
