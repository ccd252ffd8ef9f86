use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ignore::{DirEntry, WalkBuilder};
use tracing::debug;

use crate::classify::Classifier;
use crate::entry::{BaseType, Entry};
use crate::error::DirItemError;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// The classified contents of one directory.
pub struct Listing {
    /// One entry per child, sorted by file name, `leaf_name` filled in.
    pub entries: Vec<Entry>,

    /// Children that could not be enumerated (permission denied, loops).
    /// Children that were enumerated but failed to probe are regular entries
    /// with [`BaseType::Error`].
    pub errors: Vec<DirItemError>,

    pub stats: ListingStats,
}

/// Counts and timing for a completed listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingStats {
    pub files: usize,
    pub dirs: usize,
    /// Devices, pipes, sockets and the like.
    pub other: usize,
    /// Entries classified as [`BaseType::Error`].
    pub errors: usize,
    pub duration: Duration,
    /// `entries / duration`, 0 on zero-duration runs.
    pub entries_per_sec: usize,
}

impl ListingStats {
    fn compute(entries: &[Entry], duration: Duration) -> Self {
        let mut stats = Self {
            files: 0,
            dirs: 0,
            other: 0,
            errors: 0,
            duration,
            entries_per_sec: 0,
        };
        for entry in entries {
            match entry.base_type {
                BaseType::File => stats.files += 1,
                BaseType::Directory => stats.dirs += 1,
                BaseType::Error => stats.errors += 1,
                _ => stats.other += 1,
            }
        }
        if duration.as_secs_f64() > 0.0 {
            stats.entries_per_sec = (entries.len() as f64 / duration.as_secs_f64()) as usize;
        }
        stats
    }
}

impl fmt::Display for ListingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, {} dirs, {} other, {} errors in {:.2?} ({} entries/s)",
            self.files, self.dirs, self.other, self.errors, self.duration, self.entries_per_sec
        )
    }
}

// ---------------------------------------------------------------------------
// list_dir()
// ---------------------------------------------------------------------------

impl Classifier {
    /// Classify every direct child of `dir`.
    ///
    /// Hidden files are included and links are not followed while
    /// enumerating (each link is still classified through its target).
    /// Thumbnails follow the builder's `thumbnails` setting.
    ///
    /// # Errors
    ///
    /// Fails when `dir` cannot be probed or is not a directory. Problems with
    /// individual children end up in [`Listing::errors`].
    pub fn list_dir(&self, dir: &Path) -> Result<Listing, DirItemError> {
        let st = self
            .fs
            .stat(dir)
            .map_err(|e| DirItemError::from_io(dir.to_path_buf(), e.to_io_error()))?;
        if BaseType::from_mode(st.mode) != BaseType::Directory {
            return Err(DirItemError::NotADirectory(dir.to_path_buf()));
        }

        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let start = Instant::now();
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for res in walker {
            let child: DirEntry = match res {
                Ok(e) => e,
                Err(e) => {
                    errors.push(map_ignore_error(e));
                    continue;
                }
            };

            // Skip the root itself
            if child.depth() == 0 {
                continue;
            }

            let mut entry = self.create(child.path());
            entry.leaf_name = Some(child.file_name().to_string_lossy().into_owned());
            entries.push(entry);
        }

        let stats = ListingStats::compute(&entries, start.elapsed());
        debug!(
            dir = %dir.display(),
            entries = entries.len(),
            errors = errors.len(),
            "listed directory"
        );

        Ok(Listing {
            entries,
            errors,
            stats,
        })
    }
}

// ---------------------------------------------------------------------------
// Map ignore::Error to DirItemError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> DirItemError {
    match e {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_err) => DirItemError::from_io(path, io_err),
            other => DirItemError::Listing(format!("{}: {}", path.display(), other)),
        },
        ignore::Error::WithDepth { err, .. } => map_ignore_error(*err),
        ignore::Error::Loop { child, .. } => DirItemError::SymlinkLoop(child),
        ignore::Error::Io(io_err) => DirItemError::Io {
            path: PathBuf::new(),
            source: io_err,
        },
        other => DirItemError::Listing(other.to_string()),
    }
}
