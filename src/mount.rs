use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::DirItemError;

/// Live mount table on Linux.
pub const LIVE_MOUNTS: &str = "/proc/self/mounts";
/// Statically configured mounts.
pub const FSTAB: &str = "/etc/fstab";

/// Tells the classifier which directories are mount points.
///
/// Directories that are mount points, live or only configured, skip the
/// branding-file probes entirely so an unmounted device is never touched.
pub trait MountRegistry: Send + Sync {
    /// `path` is currently mounted.
    fn is_live_mount(&self, path: &Path) -> bool;

    /// `path` is listed as a mount point in the static configuration.
    fn is_configured_mount(&self, path: &Path) -> bool;
}

/// Nothing is ever a mount point.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMounts;

impl MountRegistry for NoMounts {
    fn is_live_mount(&self, _path: &Path) -> bool {
        false
    }

    fn is_configured_mount(&self, _path: &Path) -> bool {
        false
    }
}

/// A snapshot of the live and configured mount tables.
///
/// Taken once at construction. Build a new table to pick up later mounts.
#[derive(Debug, Default, Clone)]
pub struct MountTable {
    live: HashSet<PathBuf>,
    configured: HashSet<PathBuf>,
}

impl MountTable {
    /// Read [`LIVE_MOUNTS`] and [`FSTAB`].
    ///
    /// A missing fstab just means nothing is configured. Failing to read the
    /// live table is an error.
    pub fn load() -> Result<Self, DirItemError> {
        let live = fs::read_to_string(LIVE_MOUNTS)
            .map_err(|e| DirItemError::from_io(PathBuf::from(LIVE_MOUNTS), e))?;

        let fstab = match fs::read_to_string(FSTAB) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = FSTAB, "no fstab");
                String::new()
            }
            Err(e) => return Err(DirItemError::from_io(PathBuf::from(FSTAB), e)),
        };

        let table = Self::from_tables(&live, &fstab);
        debug!(
            live = table.live.len(),
            configured = table.configured.len(),
            "loaded mount tables"
        );
        Ok(table)
    }

    /// Build from the text of a mounts file and an fstab file.
    pub fn from_tables(live: &str, fstab: &str) -> Self {
        Self {
            live: mount_points(live).collect(),
            configured: mount_points(fstab).collect(),
        }
    }
}

impl MountRegistry for MountTable {
    fn is_live_mount(&self, path: &Path) -> bool {
        self.live.contains(path)
    }

    fn is_configured_mount(&self, path: &Path) -> bool {
        self.configured.contains(path)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Second field of every non-comment line, unescaped.
fn mount_points(table: &str) -> impl Iterator<Item = PathBuf> + '_ {
    table
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter(|dir| *dir != "none" && *dir != "swap")
        .map(|dir| PathBuf::from(unescape(dir)))
}

/// Decode the `\ooo` octal escapes used for spaces, tabs and backslashes.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal(&bytes[i + 1..i + 4]) {
            let v = (bytes[i + 1] - b'0') as u32 * 64
                + (bytes[i + 2] - b'0') as u32 * 8
                + (bytes[i + 3] - b'0') as u32;
            if let Ok(b) = u8::try_from(v) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal(digits: &[u8]) -> bool {
    digits.iter().all(|d| (b'0'..=b'7').contains(d))
}
