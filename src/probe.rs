use std::fs::{self, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::entry::BaseType;
use crate::error::ProbeError;

// ---------------------------------------------------------------------------
// Mode bits
// ---------------------------------------------------------------------------

const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;
// Solaris doors. Never produced on Linux, but the bits are reserved.
const S_IFDOOR: u32 = 0o150000;

const S_IXUGO: u32 = 0o111;

impl BaseType {
    /// Derive the coarse entry kind from raw `st_mode` bits.
    ///
    /// Symlinks are not a base type: callers resolve them through
    /// [`Filesystem::stat`] first. A link mode that reaches here maps to
    /// `UnknownSpecial`.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::File,
            S_IFDIR => Self::Directory,
            S_IFCHR => Self::CharDevice,
            S_IFBLK => Self::BlockDevice,
            S_IFIFO => Self::Pipe,
            S_IFSOCK => Self::Socket,
            S_IFDOOR => Self::Door,
            _ => Self::UnknownSpecial,
        }
    }
}

/// Any of the user, group or other execute bits.
pub fn mode_is_executable(mode: u32) -> bool {
    mode & S_IXUGO != 0
}

// ---------------------------------------------------------------------------
// Stat
// ---------------------------------------------------------------------------

/// The subset of `struct stat` that classification consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub size: u64,
    pub mode: u32,
    pub mtime: i64,
    pub ctime: i64,
    pub atime: i64,
    pub uid: u32,
    pub gid: u32,
}

impl Stat {
    pub fn from_metadata(md: &Metadata) -> Self {
        Self {
            size: md.size(),
            mode: md.mode(),
            mtime: md.mtime(),
            ctime: md.ctime(),
            atime: md.atime(),
            uid: md.uid(),
            gid: md.gid(),
        }
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    pub fn is_regular(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_executable(&self) -> bool {
        mode_is_executable(self.mode)
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Metadata probes used by the classifier.
///
/// Only metadata is ever requested; file contents are never read through
/// this seam. Swap in a fake to exercise ownership or device scenarios that
/// an unprivileged test cannot create on disk.
pub trait Filesystem: Send + Sync {
    /// Non-following probe (`lstat`).
    fn lstat(&self, path: &Path) -> Result<Stat, ProbeError>;

    /// Following probe (`stat`), resolving symlinks.
    fn stat(&self, path: &Path) -> Result<Stat, ProbeError>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl Filesystem for RealFs {
    fn lstat(&self, path: &Path) -> Result<Stat, ProbeError> {
        let md = fs::symlink_metadata(path)?;
        Ok(Stat::from_metadata(&md))
    }

    fn stat(&self, path: &Path) -> Result<Stat, ProbeError> {
        let md = fs::metadata(path)?;
        Ok(Stat::from_metadata(&md))
    }
}
