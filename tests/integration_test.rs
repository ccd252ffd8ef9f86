use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;
use std::sync::Arc;

use diritem::{
    store_type, stored_type, BaseType, Classifier, DirItemError, ExtensionTable, ItemFlags,
    MemoryIconCache, MimeType, MIME_XATTR,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory tree for testing.
///
/// Structure:
/// ```text
/// tmp/
///   report.txt
///   script          (0755, no extension)
///   notes           (0644, no extension)
///   photo.png
///   link.txt -> report.txt
///   dangling -> missing
///   Themed/
///     .DirIcon.png
///   Huge/
///     .DirIcon.png  (over 400 KiB)
///   Editor/
///     AppRun        (0755)
///     AppIcon.xpm
/// ```
fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("report.txt"), "quarterly report").unwrap();
    fs::write(root.join("script"), "#!/bin/sh\necho hi\n").unwrap();
    set_mode(&root.join("script"), 0o755);
    fs::write(root.join("notes"), "some notes").unwrap();
    set_mode(&root.join("notes"), 0o644);
    fs::write(root.join("photo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    symlink(root.join("report.txt"), root.join("link.txt")).unwrap();
    symlink(root.join("missing"), root.join("dangling")).unwrap();

    let themed = root.join("Themed");
    fs::create_dir(&themed).unwrap();
    fs::write(themed.join(".DirIcon.png"), [0u8; 64]).unwrap();

    let huge = root.join("Huge");
    fs::create_dir(&huge).unwrap();
    fs::write(huge.join(".DirIcon.png"), vec![0u8; 400 * 1024 + 1]).unwrap();

    let editor = root.join("Editor");
    fs::create_dir(&editor).unwrap();
    fs::write(editor.join("AppRun"), "#!/bin/sh\n").unwrap();
    set_mode(&editor.join("AppRun"), 0o755);
    fs::write(editor.join("AppIcon.xpm"), "/* XPM */").unwrap();

    dir
}

fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

fn setup_classifier(thumbnails: bool) -> (Classifier, Arc<MemoryIconCache>) {
    let cache = Arc::new(MemoryIconCache::new());
    let classifier = diritem::classifier()
        .icon_cache(cache.clone())
        .thumbnails(thumbnails)
        .build()
        .unwrap();
    (classifier, cache)
}

fn icon_name(entry: &diritem::Entry, cache: &MemoryIconCache) -> Option<String> {
    entry.icon.as_ref().and_then(|h| cache.describe(h.id()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn text_file_keeps_extension_type() {
    let dir = setup_test_dir();
    let (c, _cache) = setup_classifier(false);
    let path = dir.path().join("report.txt");

    let mut entry = c.create(&path);
    assert_eq!(entry.base_type, BaseType::File);
    assert_eq!(entry.mime_type, Some(MimeType::TEXT_PLAIN));
    assert!(!entry.flags.contains(ItemFlags::EXECUTABLE));
    assert_eq!(entry.size, "quarterly report".len() as u64);

    set_mode(&path, 0o755);
    c.refresh(&path, &mut entry, false);
    assert_eq!(entry.mime_type, Some(MimeType::TEXT_PLAIN));
    assert!(entry.flags.contains(ItemFlags::EXECUTABLE));
}

#[test]
fn unknown_extension_uses_exec_bit() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);

    let script = c.create(&dir.path().join("script"));
    assert!(script.flags.contains(ItemFlags::EXECUTABLE));
    assert_eq!(script.mime_type, Some(MimeType::EXECUTABLE));
    assert_eq!(
        icon_name(&script, &cache).as_deref(),
        Some("type:application/x-executable")
    );

    let notes = c.create(&dir.path().join("notes"));
    assert!(!notes.flags.contains(ItemFlags::EXECUTABLE));
    assert_eq!(notes.mime_type, Some(MimeType::TEXT_PLAIN));
}

#[test]
fn missing_path_is_error_entry() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);

    let entry = c.create(&dir.path().join("nope"));
    assert_eq!(entry.base_type, BaseType::Error);
    assert_eq!(
        entry.stat_error.as_ref().map(|e| e.kind),
        Some(std::io::ErrorKind::NotFound)
    );
    assert!(entry.flags.is_empty());
    assert_eq!(entry.mime_type, Some(MimeType::INODE_ERROR));
    assert_eq!(icon_name(&entry, &cache).as_deref(), Some("builtin:error"));
}

#[test]
fn symlinks_classified_through_target() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);

    let link = c.create(&dir.path().join("link.txt"));
    assert!(link.flags.contains(ItemFlags::SYMLINK));
    assert_eq!(link.base_type, BaseType::File);
    assert_eq!(link.mime_type, Some(MimeType::TEXT_PLAIN));

    let dangling = c.create(&dir.path().join("dangling"));
    assert!(dangling.flags.contains(ItemFlags::SYMLINK));
    assert_eq!(dangling.base_type, BaseType::Error);
    assert!(dangling.stat_error.is_none());
    assert_eq!(icon_name(&dangling, &cache).as_deref(), Some("builtin:error"));
}

#[test]
fn dir_icon_loaded_from_directory() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);
    let themed = dir.path().join("Themed");

    let entry = c.create(&themed);
    assert_eq!(entry.base_type, BaseType::Directory);
    assert_eq!(entry.mime_type, Some(MimeType::INODE_DIRECTORY));
    assert_eq!(
        icon_name(&entry, &cache),
        Some(themed.join(".DirIcon.png").display().to_string())
    );
}

#[test]
fn huge_dir_icon_uses_appdir_icon() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);

    let entry = c.create(&dir.path().join("Huge"));
    assert_eq!(entry.base_type, BaseType::Directory);
    assert!(entry.stat_error.is_none());
    assert_eq!(icon_name(&entry, &cache).as_deref(), Some("builtin:appdir"));
}

#[test]
fn app_dir_uses_app_icon() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);
    let editor = dir.path().join("Editor");

    let entry = c.create(&editor);
    assert!(entry.flags.contains(ItemFlags::APP_DIR));
    assert_eq!(
        icon_name(&entry, &cache),
        Some(editor.join("AppIcon.xpm").display().to_string())
    );
}

#[test]
fn placeholder_lookup_never_loads() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);
    let photo = dir.path().join("photo.png");

    let cheap = c.create(&photo);
    assert_eq!(icon_name(&cheap, &cache).as_deref(), Some("type:image/png"));

    let mut full = c.create(&photo);
    c.refresh(&photo, &mut full, true);
    assert_eq!(icon_name(&full, &cache), Some(photo.display().to_string()));

    // Now loaded, a cheap lookup can share it.
    let shared = c.create(&photo);
    assert_eq!(icon_name(&shared, &cache), Some(photo.display().to_string()));
}

#[test]
fn refresh_keeps_single_reference() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(true);
    let photo = dir.path().join("photo.png");

    let mut entry = c.create(&photo);
    let id = entry.icon.as_ref().unwrap().id();
    assert_eq!(cache.ref_count(id), Some(1));

    c.refresh(&photo, &mut entry, true);
    assert_eq!(entry.icon.as_ref().map(|h| h.id()), Some(id), "same icon after full refresh");
    assert_eq!(cache.ref_count(id), Some(1));

    c.refresh(&photo, &mut entry, false);
    assert_eq!(entry.icon.as_ref().map(|h| h.id()), Some(id), "placeholder keeps loaded icon");
    assert_eq!(cache.ref_count(id), Some(1));

    for _ in 0..2 {
        c.refresh(&photo, &mut entry, true);
    }
    assert_eq!(entry.icon.as_ref().map(|h| h.id()), Some(id));
    assert_eq!(cache.ref_count(id), Some(1));
}

#[test]
fn idle_file_icons_stay_until_purged() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(true);
    let photo = dir.path().join("photo.png");

    let mut entry = c.create(&photo);
    let id = entry.icon.as_ref().unwrap().id();
    entry.destroy();
    assert_eq!(cache.ref_count(id), Some(0));

    let again = c.create(&photo);
    assert_eq!(again.icon.as_ref().map(|h| h.id()), Some(id));
    assert_eq!(cache.purge(), 0, "icon in use is kept");
    drop(again);

    assert_eq!(cache.purge(), 1);
    assert_eq!(cache.ref_count(id), None);

    let fresh = c.create(&photo);
    assert_ne!(fresh.icon.as_ref().map(|h| h.id()), Some(id));
}

#[test]
fn pinned_icons_survive_purge() {
    let dir = setup_test_dir();
    let (c, cache) = setup_classifier(false);

    let mut missing = c.create(&dir.path().join("nope"));
    let id = missing.icon.as_ref().unwrap().id();
    missing.destroy();

    cache.purge();
    assert_eq!(cache.ref_count(id), Some(0));
    assert_eq!(cache.describe(id).as_deref(), Some("builtin:error"));
}

#[test]
fn stored_type_wins_over_extension() {
    let dir = setup_test_dir();
    let (c, _cache) = setup_classifier(false);
    let report = dir.path().join("report.txt");

    if let Err(e) = store_type(&report, &MimeType::new("text/x-minutes")) {
        eprintln!("skipping: no user xattrs here ({e})");
        return;
    }

    let entry = c.create(&report);
    assert_eq!(entry.mime_type, Some(MimeType::new("text/x-minutes")));
    assert_eq!(stored_type(&report), Some(MimeType::new("text/x-minutes")));

    // A name-only registry ignores the attribute.
    let names_only = diritem::classifier()
        .icon_cache(Arc::new(MemoryIconCache::new()))
        .mime_registry(ExtensionTable::with_defaults())
        .build()
        .unwrap();
    assert_eq!(names_only.create(&report).mime_type, Some(MimeType::TEXT_PLAIN));
}

#[test]
fn malformed_stored_type_falls_back_to_name() {
    let dir = setup_test_dir();
    let (c, _cache) = setup_classifier(false);
    let script = dir.path().join("script");

    if let Err(e) = xattr::set(&script, MIME_XATTR, b"not a type") {
        eprintln!("skipping: no user xattrs here ({e})");
        return;
    }

    let entry = c.create(&script);
    assert_eq!(stored_type(&script), None);
    assert_eq!(entry.mime_type, Some(MimeType::EXECUTABLE));
}

#[test]
fn list_dir_classifies_children() {
    let dir = setup_test_dir();
    let (c, _cache) = setup_classifier(false);

    let listing = c.list_dir(dir.path()).unwrap();

    let names: Vec<_> = listing
        .entries
        .iter()
        .map(|e| e.leaf_name.clone().unwrap())
        .collect();
    let mut expected: Vec<_> = walkdir::WalkDir::new(dir.path())
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    expected.sort();
    assert_eq!(names, expected);

    assert!(listing.errors.is_empty());
    assert_eq!(listing.stats.dirs, 3);
    assert_eq!(listing.stats.files, 5, "report.txt, script, notes, photo.png, link.txt");
    assert_eq!(listing.stats.errors, 1, "dangling link");
    assert_eq!(listing.stats.other, 0);

    let editor = listing
        .entries
        .iter()
        .find(|e| e.leaf_name.as_deref() == Some("Editor"))
        .unwrap();
    assert!(editor.flags.contains(ItemFlags::APP_DIR));
}

#[test]
fn list_dir_rejects_bad_roots() {
    let dir = setup_test_dir();
    let (c, _cache) = setup_classifier(false);

    let file = c.list_dir(&dir.path().join("report.txt"));
    assert!(matches!(file, Err(DirItemError::NotADirectory(_))));

    let missing = c.list_dir(&dir.path().join("nope"));
    assert!(matches!(missing, Err(DirItemError::NotFound(_))));
}
