use std::fmt;
use std::path::Path;

use bitflags::bitflags;

use crate::classify::Classifier;
use crate::error::ProbeError;
use crate::icon::IconHandle;
use crate::mime::MimeType;

/// Owner recorded when the metadata probe failed (`(uid_t) -1`).
pub const UNKNOWN_OWNER: u32 = u32::MAX;

/// The coarse kind of a filesystem entry, independent of its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseType {
    File,
    Directory,
    CharDevice,
    BlockDevice,
    Pipe,
    Socket,
    /// Solaris door.
    Door,
    UnknownSpecial,
    /// The metadata probe failed, or a symlink's target could not be reached.
    #[default]
    Error,
}

impl BaseType {
    pub fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::CharDevice => "char-device",
            Self::BlockDevice => "block-device",
            Self::Pipe => "pipe",
            Self::Socket => "socket",
            Self::Door => "door",
            Self::UnknownSpecial => "special",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ItemFlags
// ---------------------------------------------------------------------------

bitflags! {
    /// Per-entry flags, recomputed from scratch on every classification.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u8 {
        const SYMLINK = 1 << 0;
        /// Listed as a mount point, live or configured.
        const MOUNT_POINT = 1 << 1;
        /// Currently mounted.
        const MOUNTED = 1 << 2;
        /// Directory with an owner-trusted `AppRun`.
        const APP_DIR = 1 << 3;
        /// Regular file with any execute bit set.
        const EXECUTABLE = 1 << 4;
    }
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Everything one classification pass computes for a path.
///
/// Produced fresh by [`Classifier::classify`]; [`Entry`] adds the
/// caller-owned fields on top. Override stores write into this directly.
#[derive(Debug, Default)]
pub struct Classification {
    pub base_type: BaseType,
    pub flags: ItemFlags,
    pub size: u64,
    /// Raw `st_mode` of the entry itself (the link, for symlinks).
    pub mode: u32,
    pub mtime: i64,
    pub ctime: i64,
    pub atime: i64,
    pub owner_uid: u32,
    pub owner_gid: u32,
    /// Set exactly when the non-following probe failed.
    pub stat_error: Option<ProbeError>,
    pub mime_type: Option<MimeType>,
    pub icon: Option<IconHandle>,
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Cached metadata for one filesystem object, typically one row of a listing.
///
/// The struct may live inside a larger caller-owned record; nothing here
/// boxes it. Create with [`Classifier::create`], update in place with
/// [`Classifier::refresh`], and tear down with [`Entry::destroy`] (or just
/// drop it).
#[derive(Debug, Default)]
pub struct Entry {
    /// Display name. Left empty by classification; filled in by the caller.
    pub leaf_name: Option<String>,
    pub base_type: BaseType,
    pub flags: ItemFlags,
    pub size: u64,
    pub mode: u32,
    pub mtime: i64,
    pub ctime: i64,
    pub atime: i64,
    pub owner_uid: u32,
    pub owner_gid: u32,
    pub stat_error: Option<ProbeError>,
    pub mime_type: Option<MimeType>,
    pub icon: Option<IconHandle>,
    /// Advisory, managed by the caller.
    pub may_delete: bool,
}

impl Entry {
    fn assign(&mut self, c: Classification) {
        let Classification {
            base_type,
            flags,
            size,
            mode,
            mtime,
            ctime,
            atime,
            owner_uid,
            owner_gid,
            stat_error,
            mime_type,
            icon,
        } = c;

        self.base_type = base_type;
        self.flags = flags;
        self.size = size;
        self.mode = mode;
        self.mtime = mtime;
        self.ctime = ctime;
        self.atime = atime;
        self.owner_uid = owner_uid;
        self.owner_gid = owner_gid;
        self.stat_error = stat_error;
        self.mime_type = mime_type;
        self.icon = icon;
    }

    /// Release the icon reference and the leaf name.
    ///
    /// The struct stays usable as an empty entry. Calling this on an entry
    /// that never resolved an icon makes no call into the cache.
    pub fn destroy(&mut self) {
        self.icon = None;
        self.leaf_name = None;
    }

    pub fn is_symlink(&self) -> bool {
        self.flags.contains(ItemFlags::SYMLINK)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl Classifier {
    /// Build a new entry for `path` and classify it.
    ///
    /// Never fails: a failed probe is recorded in [`Entry::stat_error`].
    /// Uses the builder's `thumbnails` setting.
    pub fn create(&self, path: &Path) -> Entry {
        let mut entry = Entry::default();
        self.refresh(path, &mut entry, self.thumbnails());
        entry
    }

    /// Re-classify `entry` in place.
    ///
    /// The previous icon reference is released before any new one is taken.
    /// `leaf_name` and `may_delete` are left alone.
    pub fn refresh(&self, path: &Path, entry: &mut Entry, want_thumbnail: bool) {
        let c = self.classify(path, want_thumbnail, entry.icon.take());
        entry.assign(c);
    }
}
