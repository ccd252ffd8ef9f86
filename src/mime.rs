use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use phf::phf_map;
use tracing::trace;

use crate::entry::BaseType;

// ---------------------------------------------------------------------------
// MimeType
// ---------------------------------------------------------------------------

/// A `media/subtype` MIME type.
///
/// Descriptors are owned by whichever registry handed them out; entries only
/// hold cheap clones. The well-known types are `const` and never allocate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MimeType(Cow<'static, str>);

impl MimeType {
    pub const TEXT_PLAIN: Self = Self::from_static("text/plain");
    pub const EXECUTABLE: Self = Self::from_static("application/x-executable");
    pub const INODE_DIRECTORY: Self = Self::from_static("inode/directory");
    pub const INODE_CHARDEVICE: Self = Self::from_static("inode/chardevice");
    pub const INODE_BLOCKDEVICE: Self = Self::from_static("inode/blockdevice");
    pub const INODE_FIFO: Self = Self::from_static("inode/fifo");
    pub const INODE_SOCKET: Self = Self::from_static("inode/socket");
    pub const INODE_DOOR: Self = Self::from_static("inode/door");
    pub const INODE_UNKNOWN: Self = Self::from_static("inode/unknown");
    /// Pseudo-type for entries whose metadata probe failed.
    pub const INODE_ERROR: Self = Self::from_static("inode/x-error");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn media(&self) -> &str {
        self.as_str().split_once('/').map_or(self.as_str(), |(media, _)| media)
    }

    pub fn subtype(&self) -> &str {
        self.as_str().split_once('/').map_or("", |(_, sub)| sub)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MimeRegistry
// ---------------------------------------------------------------------------

/// Name-based MIME lookup.
///
/// # Thread Safety
///
/// `Send + Sync` so a classifier can be shared behind an `Arc`.
pub trait MimeRegistry: Send + Sync {
    /// Guess a type from the path's leaf name. `None` when nothing matches.
    fn by_extension(&self, path: &Path) -> Option<MimeType>;

    /// The generic type for entries nothing more specific is known about.
    fn generic_for(&self, base_type: BaseType) -> MimeType {
        match base_type {
            BaseType::File => MimeType::TEXT_PLAIN,
            BaseType::Directory => MimeType::INODE_DIRECTORY,
            BaseType::CharDevice => MimeType::INODE_CHARDEVICE,
            BaseType::BlockDevice => MimeType::INODE_BLOCKDEVICE,
            BaseType::Pipe => MimeType::INODE_FIFO,
            BaseType::Socket => MimeType::INODE_SOCKET,
            BaseType::Door => MimeType::INODE_DOOR,
            BaseType::UnknownSpecial => MimeType::INODE_UNKNOWN,
            BaseType::Error => MimeType::INODE_ERROR,
        }
    }
}

/// Multi-part suffixes that a single-extension guess would get wrong.
/// Keys are lowercase.
static COMPOUND_EXTENSIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "tar.gz" => "application/x-compressed-tar",
    "tar.bz2" => "application/x-bzip-compressed-tar",
    "tar.xz" => "application/x-xz-compressed-tar",
    "tar.zst" => "application/x-zstd-compressed-tar",
    "tar.lzma" => "application/x-lzma-compressed-tar",
    "tar.z" => "application/x-tarz",
    "ps.gz" => "application/x-gzpostscript",
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Extension-based registry: caller insertions, then compound suffixes, then
/// `mime_guess2` for single extensions.
///
/// Every dotted suffix of the leaf name is tried from longest to shortest,
/// so `backup.tar.gz` resolves through `tar.gz` before `gz`. Each suffix is
/// matched case-sensitively first, then lowercased. A single leading dot
/// marks a hidden file and does not start an extension.
#[derive(Debug, Default, Clone)]
pub struct ExtensionTable {
    extra: HashMap<String, MimeType>,
    builtins: bool,
}

impl ExtensionTable {
    /// An empty table that matches nothing until rules are inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table backed by the built-in guesses.
    pub fn with_defaults() -> Self {
        Self {
            extra: HashMap::new(),
            builtins: true,
        }
    }

    /// Add or replace a mapping. Inserted mappings win over built-ins.
    pub fn insert(&mut self, extension: impl Into<String>, mime: MimeType) {
        self.extra.insert(extension.into(), mime);
    }

    fn get(&self, suffix: &str) -> Option<MimeType> {
        if let Some(m) = self.extra.get(suffix) {
            return Some(m.clone());
        }
        if !self.builtins {
            return None;
        }
        if let Some(m) = COMPOUND_EXTENSIONS.get(suffix) {
            return Some(MimeType::from_static(*m));
        }
        if suffix.contains('.') {
            return None;
        }
        let guess = mime_guess2::from_ext(suffix).first_or_octet_stream().to_string();
        if guess == OCTET_STREAM {
            trace!(suffix, "no type guessed for extension");
            return None;
        }
        Some(MimeType::new(guess))
    }
}

impl MimeRegistry for ExtensionTable {
    fn by_extension(&self, path: &Path) -> Option<MimeType> {
        let name = path.file_name()?.to_string_lossy();

        for (i, _) in name.match_indices('.') {
            if i == 0 {
                continue;
            }
            let suffix = &name[i + 1..];
            if suffix.is_empty() {
                continue;
            }
            if let Some(m) = self.get(suffix) {
                return Some(m);
            }
            let lower = suffix.to_lowercase();
            if lower != suffix {
                if let Some(m) = self.get(&lower) {
                    return Some(m);
                }
            }
        }
        None
    }
}
