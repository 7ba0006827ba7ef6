//! Hoist command - rewrite one method so no suspension sits in a catch region

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use tern_ast::{MethodDecl, UniqueNames};
use tern_diagnostics::Diagnostics;
use tern_transform::{hoist_suspensions, load_method};

use super::{
    emit_diagnostics, load_config, method_header, print_bodies, print_status, source_cache_for,
};
use crate::{GlobalOptions, OutputFormat};

#[derive(Args, Debug)]
pub struct HoistArgs {
    /// Method unit to rewrite (JSON)
    pub input: PathBuf,

    /// Print the rewritten body
    #[arg(long)]
    pub emit: bool,
}

pub fn run(args: HoistArgs, options: &GlobalOptions) -> Result<()> {
    let config = load_config(options, &args.input)?;
    let unit = load_method(&args.input)?;
    let method = &unit.method;
    log::info!("hoisting suspensions in `{}`", method.name);

    let mut names = UniqueNames::new();
    names.reserve_method(method);

    let outcome = match hoist_suspensions(&method.body, &mut names, &config.suspend) {
        Ok(outcome) => outcome,
        Err(err) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(err.to_diagnostic());
            emit_diagnostics(&diagnostics, &source_cache_for(&args.input), options, false)?;
            return Err(anyhow!("Hoisting failed for `{}`", method.name));
        }
    };

    let rewritten = MethodDecl {
        body: outcome.body,
        ..method.clone()
    };

    match options.format {
        OutputFormat::Text => {
            if !options.quiet {
                print_status(
                    true,
                    &format!(
                        "{}: {} try region(s) split",
                        method_header(&rewritten),
                        outcome.regions_split
                    ),
                    options.use_color,
                );
            }
            if args.emit {
                print_bodies(&mut std::io::stdout().lock(), std::slice::from_ref(&rewritten))?;
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "type": "hoist",
                "method": rewritten,
                "regions_split": outcome.regions_split,
            });
            println!("{}", serde_json::to_string(&output)?);
        }
    }

    Ok(())
}
