use super::graph::{walk, Unresolved};
use super::{absolutize, engine_config};
use miette::{miette, IntoDiagnostic, Result};
use sassbase_core::paths::file_url;
use sassbase_core::{Config, DirEntryCache, Engine, SharedDirCache};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Output of `sassbase check --json`.
#[derive(Debug, Serialize)]
struct CheckReport {
    root: String,
    ok: bool,
    entries: Vec<EntryCheck>,
    /// Directories listed across all entries.
    cached_directories: usize,
}

#[derive(Debug, Serialize)]
struct EntryCheck {
    entry: String,
    stylesheets: usize,
    unresolved: Vec<Unresolved>,
    error: Option<String>,
}

/// Run the check command.
///
/// Every non-partial stylesheet under the directory is treated as an entry.
/// All entries share one directory cache. Exits with status 1 if any entry
/// fails, e.g. on an ambiguous import.
pub fn run(config: &Config, dir: Option<&Path>, json: bool) -> Result<()> {
    let root = absolutize(&config.cwd, dir.unwrap_or(Path::new(".")));
    let engine_config = engine_config(config)?;
    let cache = Arc::new(SharedDirCache::new());

    let mut entries = Vec::new();
    for entry in find_entries(&root) {
        let url =
            file_url(&entry).ok_or_else(|| miette!("not an absolute path: {}", entry.display()))?;
        let engine = Engine::builder(engine_config.clone().with_entry(&entry))
            .cache(Arc::clone(&cache) as Arc<dyn DirEntryCache>)
            .build()
            .into_diagnostic()?;

        let check = match walk(&engine.importers(), &url) {
            Ok(report) => EntryCheck {
                entry: entry.display().to_string(),
                stylesheets: report.stylesheets.len(),
                unresolved: report.unresolved,
                error: None,
            },
            Err(e) => EntryCheck {
                entry: entry.display().to_string(),
                stylesheets: 0,
                unresolved: Vec::new(),
                error: Some(e.to_string()),
            },
        };
        entries.push(check);
    }

    let report = CheckReport {
        root: root.display().to_string(),
        ok: entries.iter().all(|e| e.error.is_none()),
        entries,
        cached_directories: cache.len(),
    };
    debug!(
        entries = report.entries.len(),
        cached = report.cached_directories,
        "check finished"
    );

    if json {
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{json}");
    } else {
        print_human(&report);
    }

    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn print_human(report: &CheckReport) {
    for entry in &report.entries {
        match &entry.error {
            Some(error) => println!("error {}: {error}", entry.entry),
            None => println!("ok    {} ({} stylesheets)", entry.entry, entry.stylesheets),
        }
        for missing in &entry.unresolved {
            println!("      unresolved '{}'", missing.specifier);
        }
    }
    let failed = report.entries.iter().filter(|e| e.error.is_some()).count();
    println!(
        "\n{} entries checked, {failed} failed",
        report.entries.len()
    );
}

/// Non-partial `.scss` and `.sass` files, skipping `node_modules` and
/// hidden directories.
fn find_entries(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored_dir(e))
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|p| is_entry_stylesheet(p))
        .collect()
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == "node_modules" || name.starts_with('.'))
}

fn is_entry_stylesheet(path: &Path) -> bool {
    let is_stylesheet = path
        .extension()
        .is_some_and(|ext| ext == "scss" || ext == "sass");
    let is_partial = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'));
    is_stylesheet && !is_partial
}
