use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::entry::{BaseType, Classification, ItemFlags, UNKNOWN_OWNER};
use crate::icon::{BuiltinIcon, IconCache, IconHandle};
use crate::mime::{MimeRegistry, MimeType};
use crate::mount::MountRegistry;
use crate::overrides::OverrideIconStore;
use crate::probe::{mode_is_executable, Filesystem, Stat};

/// Icon files above this size are never handed to the icon cache.
pub const MAX_ICON_SIZE: u64 = 400 * 1024;

/// Directory icon, trusted only when owned by the directory's owner.
pub const DIR_ICON: &str = ".DirIcon.png";
/// Marks an application directory, same trust rule.
pub const APP_RUN: &str = "AppRun";
/// Fallback icon for application directories without a `.DirIcon.png`.
pub const APP_ICON: &str = "AppIcon.xpm";

/// Same-owner trust check for directory branding files.
///
/// A branding file is only honoured when it belongs to the same user as the
/// directory entry. Anyone can drop a `.DirIcon.png` or `AppRun` into a
/// world-writable directory such as `/tmp`; this keeps them from changing
/// how someone else's directory looks.
pub fn is_trusted_branding(anchor_uid: u32, candidate: &Stat) -> bool {
    candidate.uid == anchor_uid
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Turns a path into a [`Classification`]: base type, flags, MIME type and
/// icon.
///
/// Built with [`crate::classifier()`]. All collaborators are injected once
/// and shared by every call; classification itself never fails.
pub struct Classifier {
    pub(crate) icons: Arc<dyn IconCache>,
    pub(crate) mime: Box<dyn MimeRegistry>,
    pub(crate) mounts: Box<dyn MountRegistry>,
    pub(crate) overrides: Box<dyn OverrideIconStore>,
    pub(crate) fs: Box<dyn Filesystem>,
    pub(crate) thumbnails: bool,
    pub(crate) max_icon_size: u64,
}

impl Classifier {
    /// The icon cache every handle produced by this classifier points into.
    pub fn icon_cache(&self) -> &Arc<dyn IconCache> {
        &self.icons
    }

    /// Whether [`create`](Self::create) asks for full thumbnails.
    pub fn thumbnails(&self) -> bool {
        self.thumbnails
    }

    /// Classify `path` from scratch.
    ///
    /// `prior_icon` is the icon the caller held for this path before; it is
    /// released before any new icon reference is taken, so re-resolving to
    /// the same icon nets out to one reference.
    ///
    /// `want_thumbnail` selects a full decode for plain files; otherwise only
    /// an already-loaded icon is used.
    pub fn classify(
        &self,
        path: &Path,
        want_thumbnail: bool,
        prior_icon: Option<IconHandle>,
    ) -> Classification {
        drop(prior_icon);

        let mut item = Classification::default();
        let mut exec_mode = 0;

        match self.fs.lstat(path) {
            Err(err) => {
                trace!(path = %path.display(), error = %err, "lstat failed");
                item.stat_error = Some(err);
                item.base_type = BaseType::Error;
                item.owner_uid = UNKNOWN_OWNER;
                item.owner_gid = UNKNOWN_OWNER;
            }
            Ok(st) => {
                item.size = st.size;
                item.mode = st.mode;
                item.mtime = st.mtime;
                item.ctime = st.ctime;
                item.atime = st.atime;
                item.owner_uid = st.uid;
                item.owner_gid = st.gid;
                exec_mode = st.mode;

                if st.is_symlink() {
                    item.flags.insert(ItemFlags::SYMLINK);
                    item.base_type = match self.fs.stat(path) {
                        Ok(target) => {
                            exec_mode = target.mode;
                            BaseType::from_mode(target.mode)
                        }
                        Err(err) => {
                            trace!(path = %path.display(), error = %err, "dangling symlink");
                            BaseType::Error
                        }
                    };
                } else {
                    item.base_type = BaseType::from_mode(st.mode);
                }

                if item.base_type == BaseType::Directory {
                    if self.mounts.is_live_mount(path) {
                        item.flags.insert(ItemFlags::MOUNT_POINT | ItemFlags::MOUNTED);
                    } else if self.mounts.is_configured_mount(path) {
                        item.flags.insert(ItemFlags::MOUNT_POINT);
                    }
                }
            }
        }

        match item.base_type {
            // A failed first probe goes straight to the generic fallbacks.
            _ if item.stat_error.is_some() => {}
            BaseType::Directory if !item.flags.contains(ItemFlags::MOUNT_POINT) => {
                self.brand_directory(path, &mut item);
            }
            BaseType::File => self.resolve_file(path, exec_mode, want_thumbnail, &mut item),
            _ => self.overrides.apply(path, &mut item),
        }

        let mime = match item.mime_type.take() {
            Some(m) => m,
            None => self.mime.generic_for(item.base_type),
        };

        if item.icon.is_none() {
            let id = if item.base_type == BaseType::Error {
                self.icons.builtin(BuiltinIcon::Error)
            } else {
                self.icons.for_type(&mime)
            };
            item.icon = Some(IconHandle::adopt(&self.icons, id));
        }
        item.mime_type = Some(mime);

        item
    }

    /// Overrides first, then `.DirIcon.png`, `AppRun` and `AppIcon.xpm`.
    /// Later steps only fill in what is still missing.
    fn brand_directory(&self, path: &Path, item: &mut Classification) {
        self.overrides.apply(path, item);

        // Anchor to the owner captured by the first probe: for a symlink that
        // is the link's own owner.
        let owner = item.owner_uid;

        if item.icon.is_none() {
            let dir_icon = path.join(DIR_ICON);
            if let Some(st) = self.trusted_probe(&dir_icon, owner) {
                if st.size > self.max_icon_size || !st.is_regular() {
                    debug!(path = %dir_icon.display(), size = st.size, "unusable directory icon");
                    item.icon = Some(self.builtin(BuiltinIcon::AppDir));
                } else {
                    item.icon = self.lookup(&dir_icon, true);
                }
            }
        }

        if self.trusted_probe(&path.join(APP_RUN), owner).is_some() {
            item.flags.insert(ItemFlags::APP_DIR);
        }

        if item.flags.contains(ItemFlags::APP_DIR) && item.icon.is_none() {
            let app_icon = path.join(APP_ICON);
            item.icon = self
                .trusted_probe(&app_icon, owner)
                .filter(|st| st.is_regular() && st.size <= self.max_icon_size)
                .and_then(|_| self.lookup(&app_icon, true));

            if item.icon.is_none() {
                item.icon = Some(self.builtin(BuiltinIcon::AppDir));
            }
        }
    }

    fn resolve_file(
        &self,
        path: &Path,
        exec_mode: u32,
        want_thumbnail: bool,
        item: &mut Classification,
    ) {
        // Name first: some mounts mark everything executable, and a known
        // extension should still decide the type.
        item.mime_type = self.mime.by_extension(path);

        if mode_is_executable(exec_mode) {
            item.flags.insert(ItemFlags::EXECUTABLE);
        }

        if item.mime_type.is_none() {
            item.mime_type = Some(if item.flags.contains(ItemFlags::EXECUTABLE) {
                MimeType::EXECUTABLE
            } else {
                MimeType::TEXT_PLAIN
            });
        }

        item.icon = self.lookup(path, want_thumbnail);
        if item.icon.is_none() {
            self.overrides.apply(path, item);
        }
    }

    /// `lstat` a branding file and keep it only if it passes the trust check.
    fn trusted_probe(&self, path: &Path, owner: u32) -> Option<Stat> {
        let st = self.fs.lstat(path).ok()?;
        if is_trusted_branding(owner, &st) {
            Some(st)
        } else {
            debug!(path = %path.display(), owner, file_owner = st.uid, "ignoring untrusted branding file");
            None
        }
    }

    fn lookup(&self, path: &Path, full_decode: bool) -> Option<IconHandle> {
        self.icons
            .lookup(path, full_decode)
            .map(|id| IconHandle::adopt(&self.icons, id))
    }

    fn builtin(&self, icon: BuiltinIcon) -> IconHandle {
        IconHandle::adopt(&self.icons, self.icons.builtin(icon))
    }
}
