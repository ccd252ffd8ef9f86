use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::mime::MimeType;

/// Opaque identifier of one cached icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IconId(pub u64);

/// The shared icons every cache must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinIcon {
    /// Application directories without a usable icon of their own.
    AppDir,
    /// Entries whose metadata probe failed.
    Error,
}

// ---------------------------------------------------------------------------
// IconCache
// ---------------------------------------------------------------------------

/// A reference-counted icon store.
///
/// Every method that returns an [`IconId`] hands over one strong reference
/// that the caller must eventually give back with [`release`](Self::release).
/// Inside this crate that pairing is enforced by [`IconHandle`]; the raw
/// methods exist for implementors.
///
/// # Thread Safety
///
/// `Send + Sync` are required. Implementations guard their own counts; the
/// classifier never locks around calls into the cache.
pub trait IconCache: Send + Sync {
    /// Look up the icon stored in the image file at `path`.
    ///
    /// With `full_decode == false` this must stay cheap: return an icon only
    /// if one is already loaded, never start decoding.
    fn lookup(&self, path: &Path, full_decode: bool) -> Option<IconId>;

    /// One of the shared singleton icons.
    fn builtin(&self, icon: BuiltinIcon) -> IconId;

    /// The generic icon for a MIME type.
    fn for_type(&self, mime: &MimeType) -> IconId;

    /// Take one more strong reference to `id`.
    fn retain(&self, id: IconId);

    /// Give back one strong reference to `id`.
    fn release(&self, id: IconId);
}

// ---------------------------------------------------------------------------
// IconHandle
// ---------------------------------------------------------------------------

/// Owns exactly one strong reference into an [`IconCache`].
///
/// Cloning retains, dropping releases. Overwriting an `Option<IconHandle>`
/// therefore releases the old icon before the slot holds the new one, and an
/// empty slot never talks to the cache.
pub struct IconHandle {
    id: IconId,
    cache: Arc<dyn IconCache>,
}

impl IconHandle {
    /// Take ownership of a reference the cache already counted for us.
    pub fn adopt(cache: &Arc<dyn IconCache>, id: IconId) -> Self {
        Self {
            id,
            cache: Arc::clone(cache),
        }
    }

    pub fn id(&self) -> IconId {
        self.id
    }
}

impl Clone for IconHandle {
    fn clone(&self) -> Self {
        self.cache.retain(self.id);
        Self {
            id: self.id,
            cache: Arc::clone(&self.cache),
        }
    }
}

impl Drop for IconHandle {
    fn drop(&mut self) {
        self.cache.release(self.id);
    }
}

impl PartialEq for IconHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for IconHandle {}

impl fmt::Debug for IconHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IconHandle").field(&self.id.0).finish()
    }
}

// ---------------------------------------------------------------------------
// MemoryIconCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IconKey {
    File(PathBuf),
    Builtin(BuiltinIcon),
    Type(MimeType),
}

#[derive(Debug)]
struct Slot {
    key: IconKey,
    refs: usize,
    pinned: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    next: u64,
    by_key: HashMap<IconKey, IconId>,
    slots: HashMap<IconId, Slot>,
}

impl CacheState {
    fn insert(&mut self, key: IconKey, pinned: bool) -> IconId {
        let id = IconId(self.next);
        self.next += 1;
        self.by_key.insert(key.clone(), id);
        self.slots.insert(
            id,
            Slot {
                key,
                refs: 1,
                pinned,
            },
        );
        id
    }

    /// Retain an existing key, or create a pinned slot for it.
    fn pinned(&mut self, key: IconKey) -> IconId {
        if let Some(&id) = self.by_key.get(&key) {
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.refs += 1;
                return id;
            }
        }
        self.insert(key, true)
    }
}

/// An in-process [`IconCache`] that tracks icons by key and reference count.
///
/// It does not rasterize anything: a loaded file icon is one whose path was
/// confirmed to be a regular file. A file icon whose last reference goes
/// stays loaded, so the next lookup of the same path (placeholder or full)
/// hands back the same [`IconId`]. Call [`purge`](Self::purge) to drop idle
/// file icons. Builtin and per-type icons live as long as the cache.
#[derive(Debug, Default)]
pub struct MemoryIconCache {
    state: Mutex<CacheState>,
}

impl MemoryIconCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current strong count of `id`, or `None` once it has been purged.
    /// Idle file icons report `Some(0)`. Pinned icons report only the
    /// references handed out.
    pub fn ref_count(&self, id: IconId) -> Option<usize> {
        self.state().slots.get(&id).map(|s| s.refs)
    }

    /// Human-readable key of a live icon.
    pub fn describe(&self, id: IconId) -> Option<String> {
        self.state().slots.get(&id).map(|s| match &s.key {
            IconKey::File(p) => p.display().to_string(),
            IconKey::Builtin(BuiltinIcon::AppDir) => "builtin:appdir".to_string(),
            IconKey::Builtin(BuiltinIcon::Error) => "builtin:error".to_string(),
            IconKey::Type(m) => format!("type:{m}"),
        })
    }

    /// Drop every unpinned icon nobody holds a reference to. Returns how
    /// many were dropped.
    pub fn purge(&self) -> usize {
        let mut state = self.state();
        let idle: Vec<IconId> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.refs == 0 && !slot.pinned)
            .map(|(&id, _)| id)
            .collect();
        for id in &idle {
            if let Some(slot) = state.slots.remove(id) {
                state.by_key.remove(&slot.key);
            }
        }
        debug!(purged = idle.len(), "purged idle icons");
        idle.len()
    }

    /// Number of loaded icons, idle and pinned ones included.
    pub fn len(&self) -> usize {
        self.state().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IconCache for MemoryIconCache {
    fn lookup(&self, path: &Path, full_decode: bool) -> Option<IconId> {
        let key = IconKey::File(path.to_path_buf());
        let mut state = self.state();

        if let Some(&id) = state.by_key.get(&key) {
            if let Some(slot) = state.slots.get_mut(&id) {
                slot.refs += 1;
                return Some(id);
            }
        }

        // Placeholder lookups never load anything new.
        if !full_decode {
            return None;
        }

        match fs::metadata(path) {
            Ok(md) if md.is_file() => Some(state.insert(key, false)),
            Ok(_) => None,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "icon file unavailable");
                None
            }
        }
    }

    fn builtin(&self, icon: BuiltinIcon) -> IconId {
        self.state().pinned(IconKey::Builtin(icon))
    }

    fn for_type(&self, mime: &MimeType) -> IconId {
        self.state().pinned(IconKey::Type(mime.clone()))
    }

    fn retain(&self, id: IconId) {
        match self.state().slots.get_mut(&id) {
            Some(slot) => slot.refs += 1,
            None => warn!(id = id.0, "retain of unknown icon"),
        }
    }

    fn release(&self, id: IconId) {
        match self.state().slots.get_mut(&id) {
            Some(slot) if slot.refs == 0 => warn!(id = id.0, "release of icon with no references"),
            Some(slot) => slot.refs -= 1,
            None => warn!(id = id.0, "release of unknown icon"),
        }
    }
}
