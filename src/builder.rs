use std::sync::Arc;

use crate::classify::{Classifier, MAX_ICON_SIZE};
use crate::error::DirItemError;
use crate::icon::IconCache;
use crate::mime::{ExtensionTable, MimeRegistry};
use crate::mount::{MountRegistry, NoMounts};
use crate::overrides::{NoOverrides, OverrideIconStore};
use crate::probe::{Filesystem, RealFs};
use crate::xtype::XattrMime;

// ---------------------------------------------------------------------------
// ClassifierBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring a [`Classifier`].
///
/// Created via [`diritem::classifier()`](crate::classifier). Only the icon
/// cache is required; every other collaborator has a working default.
///
/// # Example
///
/// ```rust,ignore
/// let classifier = diritem::classifier()
///     .icon_cache(cache)
///     .mount_registry(MountTable::load()?)
///     .overrides(GlobIcons::load(&path, cache.clone())?)
///     .thumbnails(true)
///     .build()?;
/// ```
pub struct ClassifierBuilder {
    icons:         Option<Arc<dyn IconCache>>,
    mime:          Option<Box<dyn MimeRegistry>>,
    mounts:        Option<Box<dyn MountRegistry>>,
    overrides:     Option<Box<dyn OverrideIconStore>>,
    filesystem:    Option<Box<dyn Filesystem>>,
    thumbnails:    bool,
    max_icon_size: u64,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self {
            icons:         None,
            mime:          None,
            mounts:        None,
            overrides:     None,
            filesystem:    None,
            thumbnails:    false,
            max_icon_size: MAX_ICON_SIZE,
        }
    }
}

impl ClassifierBuilder {
    // ── Collaborators ─────────────────────────────────────────────────────

    /// The icon cache all resolved icons come from. Required.
    ///
    /// Shared by reference count so override stores and callers can hold
    /// the same cache.
    pub fn icon_cache(mut self, cache: Arc<dyn IconCache>) -> Self {
        self.icons = Some(cache);
        self
    }

    /// MIME lookup for plain files. Defaults to the stored `user.mime_type`
    /// attribute, then [`ExtensionTable::with_defaults`].
    pub fn mime_registry(mut self, registry: impl MimeRegistry + 'static) -> Self {
        self.mime = Some(Box::new(registry));
        self
    }

    /// Mount point information. Defaults to [`NoMounts`].
    pub fn mount_registry(mut self, registry: impl MountRegistry + 'static) -> Self {
        self.mounts = Some(Box::new(registry));
        self
    }

    /// Per-path manual overrides. Defaults to [`NoOverrides`].
    pub fn overrides(mut self, store: impl OverrideIconStore + 'static) -> Self {
        self.overrides = Some(Box::new(store));
        self
    }

    /// Metadata probes. Defaults to [`RealFs`].
    pub fn filesystem(mut self, fs: impl Filesystem + 'static) -> Self {
        self.filesystem = Some(Box::new(fs));
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Ask for full thumbnails in [`Classifier::create`] and
    /// [`Classifier::list_dir`]. Off by default: only icons the cache has
    /// already loaded are used.
    pub fn thumbnails(mut self, yes: bool) -> Self {
        self.thumbnails = yes;
        self
    }

    /// Size ceiling for `.DirIcon.png` and `AppIcon.xpm`.
    ///
    /// Larger files are never handed to the icon cache. Defaults to
    /// [`MAX_ICON_SIZE`] (400 KiB).
    pub fn max_icon_size(mut self, bytes: u64) -> Self {
        self.max_icon_size = bytes;
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Assemble the classifier.
    ///
    /// # Errors
    ///
    /// Returns [`DirItemError::MissingIconCache`] when no icon cache was set.
    pub fn build(self) -> Result<Classifier, DirItemError> {
        let icons = self.icons.ok_or(DirItemError::MissingIconCache)?;

        Ok(Classifier {
            icons,
            mime:          self.mime.unwrap_or_else(|| Box::new(XattrMime::new(ExtensionTable::with_defaults()))),
            mounts:        self.mounts.unwrap_or_else(|| Box::new(NoMounts)),
            overrides:     self.overrides.unwrap_or_else(|| Box::new(NoOverrides)),
            fs:            self.filesystem.unwrap_or_else(|| Box::new(RealFs)),
            thumbnails:    self.thumbnails,
            max_icon_size: self.max_icon_size,
        })
    }
}
