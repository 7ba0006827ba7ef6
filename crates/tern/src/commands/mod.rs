//! CLI subcommands

pub mod bridge;
pub mod explain;
pub mod hoist;
pub mod lower;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tern_ast::{MethodDecl, Visibility};
use tern_diagnostics::{
    DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache, TerminalEmitter,
};
use tern_transform::config::CONFIG_FILE;
use tern_transform::BackendConfig;

use crate::{GlobalOptions, OutputFormat};

/// Resolve the backend configuration for an input path. An explicit
/// `--config` must exist; otherwise `tern.toml` next to the input is used
/// when present.
pub fn load_config(options: &GlobalOptions, input: &Path) -> Result<BackendConfig> {
    if let Some(path) = &options.config {
        if !path.exists() {
            return Err(anyhow!("config file not found: {}", path.display()));
        }
        return BackendConfig::load(path);
    }
    BackendConfig::load(&config_path_for(input))
}

fn config_path_for(input: &Path) -> PathBuf {
    let dir = if input.is_dir() {
        input
    } else {
        input.parent().unwrap_or_else(|| Path::new("."))
    };
    dir.join(CONFIG_FILE)
}

/// Register an input file so diagnostic spans can be resolved against it.
pub fn source_cache_for(path: &Path) -> SourceCache {
    let mut cache = SourceCache::new();
    let text = std::fs::read_to_string(path).unwrap_or_default();
    cache.add_file(path, text);
    cache
}

/// Write diagnostics in the selected format. Text goes to stderr, JSON to
/// stdout so it can be piped. Hints are dropped unless `show_hints`.
pub fn emit_diagnostics(
    diagnostics: &Diagnostics,
    cache: &SourceCache,
    options: &GlobalOptions,
    show_hints: bool,
) -> Result<()> {
    let mut shown = Diagnostics::new();
    shown.extend(
        diagnostics
            .iter()
            .filter(|d| show_hints || !d.is_hint())
            .cloned(),
    );

    match options.format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            let mut emitter = TerminalEmitter::new(stderr.lock(), options.use_color);
            emitter.emit_all(&shown, cache)?;
            emitter.emit_summary(&shown)?;
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(std::io::stdout().lock());
            emitter.emit_all(&shown, cache)?;
        }
    }
    Ok(())
}

fn visibility_keyword(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Protected => "protected",
        Visibility::Private => "private",
    }
}

/// `public static int f(Optional<int> x)`
pub fn method_header(method: &MethodDecl) -> String {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect();
    format!(
        "{}{} {} {}({})",
        visibility_keyword(method.visibility),
        if method.is_static { " static" } else { "" },
        method.ret,
        method.name,
        params.join(", ")
    )
}

/// Print method bodies as pretty JSON, one declaration after another.
pub fn print_bodies(out: &mut impl Write, decls: &[MethodDecl]) -> Result<()> {
    for decl in decls {
        writeln!(out, "// {}", method_header(decl))?;
        writeln!(out, "{}", serde_json::to_string_pretty(&decl.body)?)?;
    }
    Ok(())
}

/// A green check or red cross followed by a message.
pub fn print_status(ok: bool, message: &str, use_color: bool) {
    let mark = if ok { "✓" } else { "✗" };
    if use_color {
        let styled = if ok {
            console::style(mark).green().bold()
        } else {
            console::style(mark).red().bold()
        };
        println!("{} {}", styled, message);
    } else {
        println!("{} {}", mark, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::{Block, Ident, ParamDecl, TargetType};
    use tern_diagnostics::Span;

    #[test]
    fn test_method_header() {
        let method = MethodDecl {
            name: Ident::from("f_"),
            visibility: Visibility::Private,
            is_static: true,
            params: vec![
                ParamDecl::new("x", TargetType::optional(TargetType::Int)),
                ParamDecl::new("y", TargetType::String),
            ],
            ret: TargetType::Bool,
            body: Block::new(Vec::new()),
            span: Span::DUMMY,
        };
        assert_eq!(
            method_header(&method),
            "private static bool f_(Optional<int> x, string y)"
        );
    }

    #[test]
    fn test_config_path_next_to_input() {
        assert_eq!(
            config_path_for(Path::new("units/gen.json")),
            PathBuf::from("units").join(CONFIG_FILE)
        );
    }
}
