use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use diritem::{
    Classifier, ClassifierBuilder, DirItemError, Entry, GlobIcons, MemoryIconCache, MountTable,
};

/// Classify filesystem entries and show the MIME type and icon a file
/// browser would use for them.
#[derive(Parser, Debug)]
#[command(name = "diritem", version)]
struct Args {
    /// Paths to classify
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// List directories instead of classifying them as a single entry
    #[arg(long)]
    list: bool,

    /// Request full thumbnails for plain files
    #[arg(long)]
    thumbnails: bool,

    /// Override table (defaults to <config dir>/diritem/globicons.toml)
    #[arg(long, value_name = "FILE")]
    globicons: Option<PathBuf>,

    /// Do not read the system mount tables
    #[arg(long)]
    no_mounts: bool,

    /// Print one JSON object per entry
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    path: String,
    name: Option<&'a str>,
    base_type: &'static str,
    flags: Vec<String>,
    mime_type: Option<&'a str>,
    size: u64,
    uid: u32,
    gid: u32,
    icon: Option<String>,
    error: Option<String>,
}

impl<'a> Report<'a> {
    fn new(path: String, entry: &'a Entry, cache: &MemoryIconCache) -> Self {
        Self {
            path,
            name: entry.leaf_name.as_deref(),
            base_type: entry.base_type.name(),
            flags: entry
                .flags
                .iter_names()
                .map(|(name, _)| name.to_ascii_lowercase())
                .collect(),
            mime_type: entry.mime_type.as_ref().map(|m| m.as_str()),
            size: entry.size,
            uid: entry.owner_uid,
            gid: entry.owner_gid,
            icon: entry.icon.as_ref().and_then(|h| cache.describe(h.id())),
            error: entry.stat_error.as_ref().map(|e| e.to_string()),
        }
    }

    fn print(&self, json: bool) {
        if json {
            match serde_json::to_string(self) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "could not serialize entry"),
            }
            return;
        }
        println!(
            "{}\t{}\t{}\t{}\t{}",
            self.path,
            self.base_type,
            self.mime_type.unwrap_or("-"),
            if self.flags.is_empty() { "-".to_string() } else { self.flags.join(",") },
            self.icon.as_deref().unwrap_or("-"),
        );
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(env_filter).with_writer(std::io::stderr).try_init();
}

fn build(args: &Args, cache: &Arc<MemoryIconCache>) -> Result<Classifier, DirItemError> {
    let icons: Arc<dyn diritem::IconCache> = cache.clone();
    let mut builder: ClassifierBuilder = diritem::classifier()
        .icon_cache(icons.clone())
        .thumbnails(args.thumbnails);

    if !args.no_mounts {
        match MountTable::load() {
            Ok(table) => builder = builder.mount_registry(table),
            Err(e) => warn!(error = %e, "mount tables unavailable"),
        }
    }

    if let Some(path) = args.globicons.clone().or_else(GlobIcons::default_path) {
        builder = builder.overrides(GlobIcons::load(&path, icons)?);
    }

    builder.build()
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let cache = Arc::new(MemoryIconCache::new());
    let classifier = match build(&args, &cache) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("diritem: {e}{}", e.path().map(|p| format!(": {}", p.display())).unwrap_or_default());
            return ExitCode::FAILURE;
        }
    };

    let mut status = ExitCode::SUCCESS;

    for path in &args.paths {
        if args.list && path.is_dir() {
            match classifier.list_dir(path) {
                Ok(listing) => {
                    for entry in &listing.entries {
                        let child = path.join(entry.leaf_name.as_deref().unwrap_or_default());
                        Report::new(child.display().to_string(), entry, &cache).print(args.json);
                    }
                    for err in &listing.errors {
                        warn!(error = %err, path = ?err.path(), "skipped");
                    }
                    eprintln!("{}: {}", path.display(), listing.stats);
                }
                Err(e) => {
                    eprintln!("diritem: {}: {e}", path.display());
                    status = ExitCode::FAILURE;
                }
            }
            continue;
        }

        let entry = classifier.create(path);
        Report::new(path.display().to_string(), &entry, &cache).print(args.json);
    }

    status
}
