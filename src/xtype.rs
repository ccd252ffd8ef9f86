//! Types stored on the file itself.
//!
//! A file can carry its own MIME type in the `user.mime_type` extended
//! attribute. When present and well formed it beats any guess from the name.

use std::path::Path;

use tracing::trace;

use crate::entry::BaseType;
use crate::error::DirItemError;
use crate::mime::{ExtensionTable, MimeRegistry, MimeType};

/// Extended attribute holding a file's stored MIME type.
pub const MIME_XATTR: &str = "user.mime_type";

/// A [`MimeRegistry`] that reads the stored type attribute first and falls
/// back to the wrapped registry.
///
/// A missing attribute, a filesystem without extended attributes, or a value
/// that is not `media/subtype` all fall through silently.
#[derive(Debug, Clone)]
pub struct XattrMime<R = ExtensionTable> {
    inner: R,
}

impl<R: MimeRegistry> XattrMime<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: MimeRegistry> MimeRegistry for XattrMime<R> {
    fn by_extension(&self, path: &Path) -> Option<MimeType> {
        stored_type(path).or_else(|| self.inner.by_extension(path))
    }

    fn generic_for(&self, base_type: BaseType) -> MimeType {
        self.inner.generic_for(base_type)
    }
}

/// Read the stored type of `path`, if it has a usable one.
pub fn stored_type(path: &Path) -> Option<MimeType> {
    match xattr::get(path, MIME_XATTR) {
        Ok(Some(raw)) => {
            let parsed = parse_stored(&raw);
            if parsed.is_none() {
                trace!(path = %path.display(), "ignoring malformed stored type");
            }
            parsed
        }
        Ok(None) => None,
        Err(err) => {
            trace!(path = %path.display(), error = %err, "stored type unavailable");
            None
        }
    }
}

/// Record `mime` as the stored type of `path`.
///
/// # Errors
///
/// Fails when the file is missing, not writable, or its filesystem has no
/// user extended attributes.
pub fn store_type(path: &Path, mime: &MimeType) -> Result<(), DirItemError> {
    xattr::set(path, MIME_XATTR, mime.as_str().as_bytes())
        .map_err(|e| DirItemError::from_io(path.to_path_buf(), e))
}

fn parse_stored(raw: &[u8]) -> Option<MimeType> {
    let text = std::str::from_utf8(raw).ok()?.trim_end_matches('\0').trim();
    let (media, subtype) = text.split_once('/')?;
    let valid = |part: &str| {
        !part.is_empty() && !part.contains('/') && !part.chars().any(|c| c.is_whitespace() || c.is_control())
    };
    (valid(media) && valid(subtype)).then(|| MimeType::new(text.to_ascii_lowercase()))
}
