use super::{absolutize, build_engine, canonicalize_from, display_url, engine_config};
use miette::{miette, IntoDiagnostic, Result};
use sassbase_core::paths::file_url;
use sassbase_core::{CanonicalizeOptions, Config, PackedSpecifier};
use serde::Serialize;
use std::path::Path;
use url::Url;

/// Output of `sassbase resolve --json`.
#[derive(Debug, Serialize)]
struct ResolveOutput<'a> {
    specifier: &'a str,
    from: String,
    from_import: bool,
    canonical: Option<String>,
    path: Option<String>,
}

/// Run the resolve command.
///
/// Exits with status 1 when nothing matches. Ambiguous specifiers are
/// reported as errors.
pub fn run(
    config: &Config,
    specifier: &str,
    from: Option<&Path>,
    from_import: bool,
    json: bool,
) -> Result<()> {
    let (containing, fallback_dir) = match from {
        Some(file) => {
            let file = absolutize(&config.cwd, file);
            let url = file_url(&file)
                .ok_or_else(|| miette!("not an absolute path: {}", file.display()))?;
            let dir = file.parent().unwrap_or(config.cwd.as_path()).to_path_buf();
            (url, dir)
        }
        None => {
            let dir = absolutize(&config.cwd, Path::new("."));
            let url = Url::from_directory_path(&dir)
                .map_err(|()| miette!("not an absolute path: {}", dir.display()))?;
            (url, dir)
        }
    };

    let engine = build_engine(engine_config(config)?, &fallback_dir)?;
    let chain = engine.importers();
    let options = CanonicalizeOptions { from_import };

    // Package specifiers reach the module resolver packed, as they would
    // after a load.
    let raw = if engine.rebaser().is_package_specifier(specifier) {
        PackedSpecifier::new(&fallback_dir, specifier).encode()
    } else {
        specifier.to_string()
    };
    let resolved = canonicalize_from(&chain, &raw, &containing, options).into_diagnostic()?;

    if json {
        let output = ResolveOutput {
            specifier,
            from: display_url(&containing),
            from_import,
            canonical: resolved.as_ref().map(ToString::to_string),
            path: resolved.as_ref().map(display_url),
        };
        let json = serde_json::to_string_pretty(&output).into_diagnostic()?;
        println!("{json}");
    } else if let Some(url) = &resolved {
        println!("{}", display_url(url));
    }

    if resolved.is_none() {
        if !json {
            eprintln!("error: cannot resolve '{specifier}'");
        }
        std::process::exit(1);
    }
    Ok(())
}
