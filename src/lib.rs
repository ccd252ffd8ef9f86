//! # diritem
//!
//! Filesystem entry classification for file browsers.
//!
//! Given a path, diritem works out what kind of object it is, which flags
//! apply (symlink, mount point, application directory, executable), its MIME
//! type, and which icon to show. The decision procedure is fixed and
//! priority-ordered; the services it consults are not. Icon storage
//! ([`IconCache`]), MIME lookup by stored type or name ([`MimeRegistry`]), mount
//! information ([`MountRegistry`]), manual overrides ([`OverrideIconStore`])
//! and even the metadata probes ([`Filesystem`]) are injected through the
//! builder.
//!
//! Classification never fails. A path that cannot be probed becomes an entry
//! of type [`BaseType::Error`] with the OS error recorded in
//! [`Entry::stat_error`], a dedicated MIME type and the shared error icon.
//!
//! # Quick Start
//!
//! ```rust
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use diritem::{BaseType, MemoryIconCache, MimeType};
//!
//! let cache = Arc::new(MemoryIconCache::new());
//! let classifier = diritem::classifier()
//!     .icon_cache(cache.clone())
//!     .build()
//!     .unwrap();
//!
//! let entry = classifier.create(Path::new("/no/such/path/anywhere"));
//! assert_eq!(entry.base_type, BaseType::Error);
//! assert!(entry.stat_error.is_some());
//! assert_eq!(entry.mime_type, Some(MimeType::INODE_ERROR));
//! assert!(entry.icon.is_some());
//! ```
//!
//! # Icons and reference counts
//!
//! Every icon an [`Entry`] holds is an [`IconHandle`], which owns exactly one
//! reference into the cache and gives it back when dropped. Refreshing an
//! entry releases the old icon before the new one is looked up, so an entry
//! never holds more than one reference:
//!
//! ```rust
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use diritem::MemoryIconCache;
//!
//! let cache = Arc::new(MemoryIconCache::new());
//! let classifier = diritem::classifier().icon_cache(cache.clone()).build().unwrap();
//!
//! let path = Path::new("/no/such/path/anywhere");
//! let mut entry = classifier.create(path);
//! let id = entry.icon.as_ref().unwrap().id();
//! classifier.refresh(path, &mut entry, false);
//! assert_eq!(cache.ref_count(id), Some(1));
//!
//! entry.destroy();
//! assert_eq!(cache.ref_count(id), Some(0));
//! ```

#![forbid(unsafe_code)]

mod builder;
mod classify;
mod entry;
mod error;
mod icon;
mod listing;
mod mime;
mod mount;
mod overrides;
mod probe;
mod xtype;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::ClassifierBuilder;
pub use classify::{is_trusted_branding, Classifier, APP_ICON, APP_RUN, DIR_ICON, MAX_ICON_SIZE};
pub use entry::{BaseType, Classification, Entry, ItemFlags, UNKNOWN_OWNER};
pub use error::{DirItemError, ProbeError};
pub use icon::{BuiltinIcon, IconCache, IconHandle, IconId, MemoryIconCache};
pub use listing::{Listing, ListingStats};
pub use mime::{ExtensionTable, MimeRegistry, MimeType};
pub use mount::{MountRegistry, MountTable, NoMounts};
pub use overrides::{GlobIcons, NoOverrides, OverrideIconStore, OverrideRule};
pub use probe::{mode_is_executable, Filesystem, RealFs, Stat};
pub use xtype::{store_type, stored_type, XattrMime, MIME_XATTR};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`ClassifierBuilder`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use diritem::{MemoryIconCache, NoMounts};
///
/// let classifier = diritem::classifier()
///     .icon_cache(Arc::new(MemoryIconCache::new()))
///     .mount_registry(NoMounts)
///     .thumbnails(true)
///     .build()
///     .unwrap();
///
/// assert!(classifier.thumbnails());
/// ```
pub fn classifier() -> ClassifierBuilder {
    ClassifierBuilder::default()
}
