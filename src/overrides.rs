//! User-assigned icons and types for specific paths.
//!
//! The table is read once at start-up and consulted on every
//! classification, so it is injected into the classifier as a service rather
//! than kept in a global.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::entry::Classification;
use crate::error::DirItemError;
use crate::icon::{IconCache, IconHandle};
use crate::mime::MimeType;

/// Per-path manual overrides.
pub trait OverrideIconStore: Send + Sync {
    /// Apply any override for `path`.
    ///
    /// May set `item.icon` and/or `item.mime_type`. Must leave every field it
    /// does not set untouched.
    fn apply(&self, path: &Path, item: &mut Classification);
}

/// No overrides at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverrides;

impl OverrideIconStore for NoOverrides {
    fn apply(&self, _path: &Path, _item: &mut Classification) {}
}

// ---------------------------------------------------------------------------
// GlobIcons
// ---------------------------------------------------------------------------

/// One override: an icon file, a MIME type, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideRule {
    pub icon: Option<PathBuf>,
    pub mime_type: Option<MimeType>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawTable {
    #[serde(rename = "rule")]
    rules: Vec<RawRule>,
}

#[derive(Deserialize, Debug)]
struct RawRule {
    path: PathBuf,
    icon: Option<PathBuf>,
    mime_type: Option<String>,
}

/// Exact-path override table, loaded from TOML.
///
/// ```toml
/// [[rule]]
/// path = "/home/alice/Music"
/// icon = "/home/alice/.icons/music.png"
///
/// [[rule]]
/// path = "/home/alice/bin/tool"
/// mime_type = "application/x-executable"
/// ```
pub struct GlobIcons {
    rules: HashMap<PathBuf, OverrideRule>,
    icons: Arc<dyn IconCache>,
}

impl GlobIcons {
    /// An empty table resolving icons through `icons`.
    pub fn new(icons: Arc<dyn IconCache>) -> Self {
        Self {
            rules: HashMap::new(),
            icons,
        }
    }

    /// `<config dir>/diritem/globicons.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("diritem").join("globicons.toml"))
    }

    /// Read the table at `path`. A missing file gives an empty table.
    pub fn load(path: &Path, icons: Arc<dyn IconCache>) -> Result<Self, DirItemError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no override table");
                return Ok(Self::new(icons));
            }
            Err(e) => return Err(DirItemError::from_io(path.to_path_buf(), e)),
        };

        let table = Self::parse(&text, icons).map_err(|source| DirItemError::Overrides {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), rules = table.len(), "loaded override table");
        Ok(table)
    }

    /// Parse a table from TOML text.
    pub fn parse(text: &str, icons: Arc<dyn IconCache>) -> Result<Self, toml::de::Error> {
        let raw: RawTable = toml::from_str(text)?;
        let mut table = Self::new(icons);
        for rule in raw.rules {
            table.insert(
                rule.path,
                OverrideRule {
                    icon: rule.icon,
                    mime_type: rule.mime_type.map(MimeType::new),
                },
            );
        }
        Ok(table)
    }

    /// Add or replace the rule for `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, rule: OverrideRule) {
        self.rules.insert(path.into(), rule);
    }

    pub fn get(&self, path: &Path) -> Option<&OverrideRule> {
        self.rules.get(path)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl OverrideIconStore for GlobIcons {
    fn apply(&self, path: &Path, item: &mut Classification) {
        let Some(rule) = self.rules.get(path) else {
            return;
        };

        if let Some(mime) = &rule.mime_type {
            item.mime_type = Some(mime.clone());
        }

        if let Some(icon) = &rule.icon {
            match self.icons.lookup(icon, true) {
                Some(id) => item.icon = Some(IconHandle::adopt(&self.icons, id)),
                None => warn!(path = %path.display(), icon = %icon.display(), "override icon could not be loaded"),
            }
        }
    }
}
