//! Bridge command - analyze one override and print its bridge pair

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use tern_ast::{TargetType, UniqueNames};
use tern_diagnostics::Diagnostics;
use tern_transform::{
    load_method, BridgeSynthesizer, CovarianceAnalyzer, DefaultTypeTranslator, ParamAdjustment,
    SignatureAdjustment, TypeTranslator,
};

use super::{emit_diagnostics, load_config, method_header, print_bodies, source_cache_for};
use crate::{GlobalOptions, OutputFormat};

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Method unit with its signature and overridden members (JSON)
    pub input: PathBuf,

    /// Print the bridge and primary bodies
    #[arg(long)]
    pub emit: bool,
}

fn describe_adjustment(
    adjustment: &SignatureAdjustment,
    types: &dyn TypeTranslator,
) -> Vec<String> {
    let exposed = |adj: &ParamAdjustment| TargetType::optional(types.translate(adj.native()));
    let mut lines: Vec<String> = adjustment
        .params
        .iter()
        .enumerate()
        .filter_map(|(i, adj)| {
            adj.as_ref().map(|adj| {
                format!(
                    "param {} ({}) exposed as {}",
                    i,
                    adj.native(),
                    exposed(adj)
                )
            })
        })
        .collect();
    if let Some(adj) = &adjustment.ret {
        lines.push(format!("return ({}) exposed as {}", adj.native(), exposed(adj)));
    }
    lines
}

pub fn run(args: BridgeArgs, options: &GlobalOptions) -> Result<()> {
    let config = load_config(options, &args.input)?;
    let unit = load_method(&args.input)?;
    let method = &unit.method;

    let signature = unit
        .signature
        .as_ref()
        .ok_or_else(|| anyhow!("`{}` has no signature to analyze", method.name))?;

    let types = DefaultTypeTranslator;
    let adjustment =
        CovarianceAnalyzer::new(&types, &config.covariance).analyze(signature, &unit.overrides);

    let Some(adjustment) = adjustment else {
        log::info!("`{}` needs no bridge", method.name);
        match options.format {
            OutputFormat::Text => {
                if !options.quiet {
                    println!("{}: no bridge needed", method_header(method));
                }
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "type": "bridge",
                    "name": method.name,
                    "adjustment": null,
                });
                println!("{}", serde_json::to_string(&output)?);
            }
        }
        return Ok(());
    };

    let mut names = UniqueNames::new();
    names.reserve_method(method);
    let pair = match BridgeSynthesizer::new(&types, &config.bridge).synthesize(
        method,
        &adjustment,
        &mut names,
    ) {
        Ok(pair) => pair,
        Err(err) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(err.to_diagnostic());
            emit_diagnostics(&diagnostics, &source_cache_for(&args.input), options, false)?;
            return Err(anyhow!("Bridge synthesis failed for `{}`", method.name));
        }
    };

    match options.format {
        OutputFormat::Text => {
            if !options.quiet {
                for line in describe_adjustment(&adjustment, &types) {
                    println!("{}", line);
                }
                let arrow = if options.use_color {
                    console::style("->").cyan().to_string()
                } else {
                    "->".to_string()
                };
                println!("bridge  {}", method_header(&pair.bridge));
                println!("   {}   {}", arrow, method_header(&pair.primary));
            }
            if args.emit {
                print_bodies(
                    &mut std::io::stdout().lock(),
                    &[pair.bridge.clone(), pair.primary.clone()],
                )?;
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "type": "bridge",
                "name": method.name,
                "adjustment": adjustment,
                "bridge": pair.bridge,
                "primary": pair.primary,
            });
            println!("{}", serde_json::to_string(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_types::{PassType, Signature, Type};

    #[test]
    fn test_describe_adjustment_lists_wrapped_positions() {
        let unadjusted = Signature::new(
            vec![
                PassType::of(&Type::Named("I".to_string())),
                PassType::new(Type::Int, true),
            ],
            PassType::of(&Type::Void),
        );
        let adjustment = SignatureAdjustment {
            unadjusted,
            params: vec![
                None,
                Some(ParamAdjustment::Wrapped {
                    native: PassType::of(&Type::Int),
                }),
            ],
            ret: None,
        };
        let lines = describe_adjustment(&adjustment, &DefaultTypeTranslator);
        assert_eq!(lines, vec!["param 1 (Int) exposed as Optional<int>".to_string()]);
    }
}
