//! Lower command - run every backend pass over one or more modules

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tern_diagnostics::Diagnostics;
use tern_transform::{load_module, Backend, LoweredModule};
use walkdir::WalkDir;

use super::{
    emit_diagnostics, load_config, method_header, print_bodies, print_status, source_cache_for,
};
use crate::{GlobalOptions, OutputFormat};

/// Suffix of files written by `--out-dir`; skipped when collecting inputs.
const LOWERED_SUFFIX: &str = ".lowered.json";

#[derive(Args, Debug)]
pub struct LowerArgs {
    /// Module file (JSON) or a directory of module files
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Write `<module>.lowered.json` files into this directory
    #[arg(long, short = 'o')]
    pub out_dir: Option<PathBuf>,

    /// Print the lowered method bodies
    #[arg(long)]
    pub emit: bool,

    /// Show rewrite notes as well as errors
    #[arg(long)]
    pub all: bool,
}

fn is_module_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
        && !path.to_string_lossy().ends_with(LOWERED_SUFFIX)
}

/// Collect all module files under a directory
fn collect_module_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_module_file(p))
        .collect();
    files.sort();
    files
}

fn print_module(module: &LoweredModule, args: &LowerArgs, options: &GlobalOptions) -> Result<()> {
    if !options.quiet {
        if options.use_color {
            println!("{}", console::style(&module.name).bold());
        } else {
            println!("{}", module.name);
        }
        for method in &module.methods {
            let mut line = method_header(&method.decls[0]);
            if method.regions_split > 0 {
                line.push_str(&format!(" [{} region(s) split]", method.regions_split));
            }
            if let Some(primary) = method.decls.get(1) {
                line.push_str(&format!(" [bridged to {}]", primary.name));
            }
            if method.calls_adapted > 0 {
                line.push_str(&format!(" [{} call(s) adapted]", method.calls_adapted));
            }
            print_status(true, &line, options.use_color);
        }
    }
    if args.emit {
        let mut stdout = std::io::stdout().lock();
        for method in &module.methods {
            print_bodies(&mut stdout, &method.decls)?;
        }
    }
    Ok(())
}

fn write_lowered(module: &LoweredModule, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(format!("{}{}", module.name, LOWERED_SUFFIX));
    fs::write(&path, serde_json::to_string_pretty(module)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn run(args: LowerArgs, options: &GlobalOptions) -> Result<()> {
    let config = load_config(options, &args.input)?;
    let backend = Backend::new(config);

    let files = collect_module_files(&args.input);
    if files.is_empty() {
        match options.format {
            OutputFormat::Text => println!("No module files found."),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({ "type": "summary", "modules": 0, "errors": 0 })
                );
            }
        }
        return Ok(());
    }

    let mut totals = Diagnostics::new();
    let mut lowered_methods = 0;

    for file in &files {
        log::debug!("lowering {}", file.display());
        let unit = load_module(file)?;
        let module = backend.lower_module(&unit);

        emit_diagnostics(&module.diagnostics, &source_cache_for(file), options, args.all)?;
        lowered_methods += module.methods.len();

        if let Some(out_dir) = &args.out_dir {
            let written = write_lowered(&module, out_dir)?;
            log::info!("wrote {}", written.display());
        }

        match options.format {
            OutputFormat::Text => print_module(&module, &args, options)?,
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "type": "module",
                    "file": file.display().to_string(),
                    "module": module,
                });
                println!("{}", serde_json::to_string(&output)?);
            }
        }

        totals.extend(module.diagnostics.iter().cloned());
    }

    let errors = totals.error_count();
    match options.format {
        OutputFormat::Text => {
            if !options.quiet || errors > 0 {
                println!();
                let verdict = if errors > 0 { "Lowering failed" } else { "Lowering finished" };
                let styled = match (options.use_color, errors > 0) {
                    (true, true) => console::style(verdict).red().bold().to_string(),
                    (true, false) => console::style(verdict).green().bold().to_string(),
                    (false, _) => verdict.to_string(),
                };
                println!(
                    "{}: {} module(s), {} method(s), {} error(s)",
                    styled,
                    files.len(),
                    lowered_methods,
                    errors
                );
            }
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "type": "summary",
                "success": errors == 0,
                "modules": files.len(),
                "methods": lowered_methods,
                "errors": errors,
                "hints": totals.hint_count(),
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    if errors > 0 {
        Err(anyhow!("Lowering failed with errors"))
    } else {
        Ok(())
    }
}
