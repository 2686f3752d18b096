use super::{absolutize, build_engine, display_url, engine_config};
use miette::{bail, miette, IntoDiagnostic, Result};
use sassbase_core::paths::file_url;
use sassbase_core::{Config, Dialect, Error};
use sassbase_util::fs::atomic_write;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Output of `sassbase load --json`.
#[derive(Debug, Serialize)]
struct LoadOutput {
    canonical: String,
    path: String,
    dialect: Dialect,
    rewrites: usize,
    content: String,
    output: Option<String>,
}

/// Run the load command.
///
/// Rebasing is anchored at `--entry`, the configured entry, or the file
/// itself, in that order.
pub fn run(
    config: &Config,
    file: &Path,
    entry: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let path = absolutize(&config.cwd, file);
    let url =
        file_url(&path).ok_or_else(|| miette!("not an absolute path: {}", path.display()))?;

    let mut engine_config = engine_config(config)?;
    if let Some(entry) = entry {
        engine_config.entry = Some(absolutize(&config.cwd, entry));
    }
    let fallback_dir = path.parent().unwrap_or(config.cwd.as_path()).to_path_buf();
    let engine = build_engine(engine_config, &fallback_dir)?;

    let Some(loaded) = engine.rebaser().load(&url) else {
        bail!("cannot read {}", path.display());
    };

    let output = output.map(|out| absolutize(&config.cwd, out));
    if let Some(out) = &output {
        write_output(out, &loaded.content).into_diagnostic()?;
        info!(path = %out.display(), rewrites = loaded.rewrites, "wrote rebased stylesheet");
    }

    if json {
        let report = LoadOutput {
            canonical: loaded.canonical.to_string(),
            path: display_url(&loaded.canonical),
            dialect: loaded.dialect,
            rewrites: loaded.rewrites,
            content: loaded.content,
            output: output.map(|p| p.display().to_string()),
        };
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{json}");
    } else if output.is_none() {
        print!("{}", loaded.content);
    }

    Ok(())
}

/// Write rebased content, creating parent directories as needed.
fn write_output(path: &Path, content: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    atomic_write(path, content.as_bytes())?;
    Ok(())
}
