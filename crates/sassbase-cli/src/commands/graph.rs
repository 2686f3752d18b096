use super::{
    absolutize, build_engine, canonicalize_from, display_specifier, display_url, engine_config,
};
use miette::{miette, IntoDiagnostic, Result};
use sassbase_core::paths::file_url;
use sassbase_core::scan::scan;
use sassbase_core::{CanonicalizeOptions, Config, Dialect, Error, Importer};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::debug;
use url::Url;

/// The import graph reachable from one entry stylesheet.
#[derive(Debug, Serialize)]
pub struct GraphReport {
    pub entry: String,
    /// Stylesheets in the order they were first reached.
    pub stylesheets: Vec<StylesheetNode>,
    pub unresolved: Vec<Unresolved>,
}

#[derive(Debug, Serialize)]
pub struct StylesheetNode {
    pub url: String,
    pub path: String,
    pub dialect: Dialect,
    pub rewrites: usize,
    /// Canonical locations of the stylesheets this one loads.
    pub imports: Vec<String>,
}

/// A specifier no importer could resolve.
#[derive(Debug, Clone, Serialize)]
pub struct Unresolved {
    pub from: String,
    pub specifier: String,
}

/// Walk the graph the way a host compiler would: load, find the
/// specifiers, canonicalize each relative to its stylesheet, and recurse.
///
/// Each canonical location is loaded once, so cycles terminate.
pub fn walk(importer: &dyn Importer, entry: &Url) -> Result<GraphReport, Error> {
    let mut report = GraphReport {
        entry: entry.to_string(),
        stylesheets: Vec::new(),
        unresolved: Vec::new(),
    };
    let mut visited: HashSet<Url> = HashSet::from([entry.clone()]);
    let mut queue: VecDeque<Url> = VecDeque::from([entry.clone()]);

    while let Some(current) = queue.pop_front() {
        let Some(loaded) = importer.load(&current)? else {
            if &current == entry {
                return Err(Error::other(format!("cannot read {}", display_url(entry))));
            }
            debug!(url = %current, "resolved stylesheet vanished before load");
            continue;
        };

        let mut imports = Vec::new();
        for span in scan(&loaded.content).specifiers {
            if is_builtin_or_remote(&span.specifier) {
                continue;
            }
            let options = CanonicalizeOptions {
                from_import: span.from_import,
            };
            match canonicalize_from(importer, &span.specifier, &current, options)? {
                Some(url) => {
                    imports.push(url.to_string());
                    if visited.insert(url.clone()) {
                        queue.push_back(url);
                    }
                }
                // `@import "x.css"` that matches nothing stays a plain CSS import.
                None if span.from_import
                    && Path::new(&span.specifier)
                        .extension()
                        .is_some_and(|e| e == "css") => {}
                None => report.unresolved.push(Unresolved {
                    from: current.to_string(),
                    specifier: display_specifier(&span.specifier),
                }),
            }
        }

        report.stylesheets.push(StylesheetNode {
            url: current.to_string(),
            path: display_url(&current),
            dialect: loaded.dialect,
            rewrites: loaded.rewrites,
            imports,
        });
    }

    Ok(report)
}

/// Built-in modules and remote stylesheets are the host's business.
fn is_builtin_or_remote(specifier: &str) -> bool {
    ["sass:", "http://", "https://", "//"]
        .iter()
        .any(|p| specifier.starts_with(p))
}

/// Run the graph command.
pub fn run(config: &Config, entry: &Path, json: bool) -> Result<()> {
    let entry = absolutize(&config.cwd, entry);
    let url =
        file_url(&entry).ok_or_else(|| miette!("not an absolute path: {}", entry.display()))?;

    let mut engine_config = engine_config(config)?;
    engine_config.entry = Some(entry.clone());
    let engine = build_engine(engine_config, &config.cwd)?;

    let report = walk(&engine.importers(), &url).into_diagnostic()?;

    if json {
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    for node in &report.stylesheets {
        println!("{}", node.path);
        for import in &node.imports {
            let shown = Url::parse(import).map_or_else(|_| import.clone(), |u| display_url(&u));
            println!("  -> {shown}");
        }
    }
    for missing in &report.unresolved {
        let from = Url::parse(&missing.from).map_or_else(|_| missing.from.clone(), |u| display_url(&u));
        println!("unresolved: '{}' in {from}", missing.specifier);
    }

    Ok(())
}
