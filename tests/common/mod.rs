#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use diritem::{BuiltinIcon, Filesystem, IconCache, IconId, MimeType, ProbeError, Stat};

// ---------------------------------------------------------------------------
// Fake filesystem
// ---------------------------------------------------------------------------

pub const ENOENT: i32 = 2;
pub const EACCES: i32 = 13;

pub const ALICE: u32 = 1000;
pub const MALLORY: u32 = 1001;

pub fn dir(uid: u32) -> Stat {
    Stat { mode: 0o040755, uid, gid: uid, mtime: 1_700_000_000, ..Stat::default() }
}

pub fn file(uid: u32, size: u64, perm: u32) -> Stat {
    Stat { mode: 0o100000 | perm, size, uid, gid: uid, mtime: 1_700_000_000, ..Stat::default() }
}

pub fn link(uid: u32) -> Stat {
    Stat { mode: 0o120777, size: 12, uid, gid: uid, ..Stat::default() }
}

pub fn special(mode: u32, uid: u32) -> Stat {
    Stat { mode, uid, gid: uid, ..Stat::default() }
}

#[derive(Clone)]
struct Node {
    lstat: Result<Stat, ProbeError>,
    target: Option<Result<Stat, ProbeError>>,
}

/// An in-memory tree of stat results that records every probed path.
#[derive(Clone, Default)]
pub struct FakeFs {
    nodes: Arc<Mutex<HashMap<PathBuf, Node>>>,
    probes: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: impl Into<PathBuf>, st: Stat) -> &Self {
        self.nodes.lock().unwrap().insert(path.into(), Node { lstat: Ok(st), target: None });
        self
    }

    pub fn add_link(&self, path: impl Into<PathBuf>, link: Stat, target: Result<Stat, ProbeError>) -> &Self {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.into(), Node { lstat: Ok(link), target: Some(target) });
        self
    }

    pub fn add_error(&self, path: impl Into<PathBuf>, code: i32) -> &Self {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.into(), Node { lstat: Err(ProbeError::from_code(code)), target: None });
        self
    }

    pub fn probed(&self) -> Vec<PathBuf> {
        self.probes.lock().unwrap().clone()
    }

    pub fn was_probed(&self, path: impl AsRef<Path>) -> bool {
        self.probes.lock().unwrap().iter().any(|p| p == path.as_ref())
    }

    pub fn clear_probes(&self) {
        self.probes.lock().unwrap().clear();
    }
}

impl Filesystem for FakeFs {
    fn lstat(&self, path: &Path) -> Result<Stat, ProbeError> {
        self.probes.lock().unwrap().push(path.to_path_buf());
        match self.nodes.lock().unwrap().get(path) {
            Some(node) => node.lstat.clone(),
            None => Err(ProbeError::from_code(ENOENT)),
        }
    }

    fn stat(&self, path: &Path) -> Result<Stat, ProbeError> {
        self.probes.lock().unwrap().push(path.to_path_buf());
        match self.nodes.lock().unwrap().get(path) {
            Some(Node { target: Some(t), .. }) => t.clone(),
            Some(node) => node.lstat.clone(),
            None => Err(ProbeError::from_code(ENOENT)),
        }
    }
}

// ---------------------------------------------------------------------------
// Counting icon cache
// ---------------------------------------------------------------------------

pub const APPDIR_ICON: IconId = IconId(1);
pub const ERROR_ICON: IconId = IconId(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Lookup(PathBuf, bool),
    Retain(IconId),
    Release(IconId),
}

#[derive(Default)]
struct CountingState {
    files: HashMap<PathBuf, (IconId, bool)>,
    types: HashMap<MimeType, IconId>,
    refs: HashMap<IconId, i64>,
    events: Vec<Event>,
    next: u64,
}

/// An icon cache that counts references and logs every call.
///
/// Only paths registered with [`CountingCache::add_icon`] resolve. An icon
/// registered as not preloaded resolves only on full-decode lookups.
#[derive(Default)]
pub struct CountingCache {
    state: Mutex<CountingState>,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        let cache = Self::default();
        cache.state.lock().unwrap().next = 100;
        Arc::new(cache)
    }

    pub fn add_icon(&self, path: impl Into<PathBuf>, preloaded: bool) -> IconId {
        let mut s = self.state.lock().unwrap();
        let id = IconId(s.next);
        s.next += 1;
        s.files.insert(path.into(), (id, preloaded));
        id
    }

    pub fn type_icon(&self, mime: &MimeType) -> Option<IconId> {
        self.state.lock().unwrap().types.get(mime).copied()
    }

    pub fn refs(&self, id: IconId) -> i64 {
        self.state.lock().unwrap().refs.get(&id).copied().unwrap_or(0)
    }

    /// Sum of all outstanding references.
    pub fn outstanding(&self) -> i64 {
        self.state.lock().unwrap().refs.values().sum()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn releases(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, Event::Release(_))).count()
    }

    pub fn lookups(&self) -> Vec<(PathBuf, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Lookup(p, full) => Some((p, full)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }
}

impl IconCache for CountingCache {
    fn lookup(&self, path: &Path, full_decode: bool) -> Option<IconId> {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Lookup(path.to_path_buf(), full_decode));
        let (id, preloaded) = *s.files.get(path)?;
        if !preloaded && !full_decode {
            return None;
        }
        *s.refs.entry(id).or_insert(0) += 1;
        Some(id)
    }

    fn builtin(&self, icon: BuiltinIcon) -> IconId {
        let id = match icon {
            BuiltinIcon::AppDir => APPDIR_ICON,
            BuiltinIcon::Error => ERROR_ICON,
        };
        *self.state.lock().unwrap().refs.entry(id).or_insert(0) += 1;
        id
    }

    fn for_type(&self, mime: &MimeType) -> IconId {
        let mut s = self.state.lock().unwrap();
        let existing = s.types.get(mime).copied();
        let id = match existing {
            Some(id) => id,
            None => {
                let id = IconId(s.next);
                s.next += 1;
                s.types.insert(mime.clone(), id);
                id
            }
        };
        *s.refs.entry(id).or_insert(0) += 1;
        id
    }

    fn retain(&self, id: IconId) {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Retain(id));
        *s.refs.entry(id).or_insert(0) += 1;
    }

    fn release(&self, id: IconId) {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Release(id));
        *s.refs.entry(id).or_insert(0) -= 1;
    }
}
