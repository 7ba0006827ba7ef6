//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use tern_diagnostics::DiagnosticCode;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., U001, H002)
    pub code: String,
}

struct CodeExplanation {
    code: DiagnosticCode,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const EXPLANATIONS: &[CodeExplanation] = &[
    // Unsupported input shapes
    CodeExplanation {
        code: DiagnosticCode::SuspensionInFinally,
        title: "Suspension Inside Finally",
        description: "A yield or await appears inside a finally block. The target cannot resume a \
                      method inside a finally block, and moving the suspension out would change \
                      when the cleanup runs.",
        example: Some("try { work(); } finally { yield return 1; }"),
        suggestion: Some("Move the suspension after the try statement, or compute the value in \
                          the finally block and yield it afterwards."),
        related: &["U002", "H001"],
    },
    CodeExplanation {
        code: DiagnosticCode::UnsupportedSuspensionSite,
        title: "Unsupported Suspension Site",
        description: "A suspension point sits in a construct the hoisting pass cannot restructure \
                      while it is inside a try statement with a catch clause, such as a switch \
                      section.",
        example: Some("try { switch (k) { case 1: yield return 1; break; } } catch { }"),
        suggestion: Some("Replace the switch with if/else statements, or move the suspension out \
                          of the try statement."),
        related: &["U001", "H001"],
    },
    // Rewrite notes
    CodeExplanation {
        code: DiagnosticCode::TryRegionSplit,
        title: "Try Region Split",
        description: "A try statement with a catch clause contained suspension points. Its body \
                      was split into protected runs between the suspensions; faults in any run \
                      jump to a shared handler label, and locals were hoisted so they stay in \
                      scope across the split.",
        example: Some("try { a(); yield return 1; b(); } catch { handle(); }\n\
                       // becomes: try { a(); } catch { goto __catch; } yield return 1;\n\
                       //          try { b(); } catch { goto __catch; } goto __ok;\n\
                       //          __catch: { handle(); } __ok: ;"),
        suggestion: None,
        related: &["U001"],
    },
    CodeExplanation {
        code: DiagnosticCode::BridgeSynthesized,
        title: "Bridge Method Synthesized",
        description: "An override uses a native representation for a position that the \
                      overridden member exposes through the Optional<T> wrapper. A public bridge \
                      with the wrapped signature now forwards to a private primary method that \
                      keeps the native types.",
        example: Some("interface I<T> { void f(T? x); }\n\
                       class C : I<int> { void f(int x) { ... } }\n\
                       // C.f(Optional<int> x) => this.f_(x.Value)"),
        suggestion: Some("Call sites that know the receiver is C may call the primary directly."),
        related: &["I002"],
    },
    // Internal errors
    CodeExplanation {
        code: DiagnosticCode::InternalError,
        title: "Internal Error",
        description: "A backend pass found its input in a shape it should never see, for example \
                      a child statement that normalization should have wrapped in a block.",
        example: None,
        suggestion: Some("Report this with the input unit attached."),
        related: &[],
    },
    CodeExplanation {
        code: DiagnosticCode::SignatureMismatch,
        title: "Signature Mismatch",
        description: "The method declaration and the signature handed to override analysis \
                      disagree on the number of parameters, so no bridge can be built.",
        example: Some("method f(x) with signature (C, Int, Int) -> Void"),
        suggestion: Some("Regenerate the method unit so the signature lists the receiver \
                          followed by exactly the declared parameters."),
        related: &["H002"],
    },
];

fn lookup(code: &str) -> Option<&'static CodeExplanation> {
    let code = DiagnosticCode::parse(code)?;
    EXPLANATIONS.iter().find(|e| e.code == code)
}

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let explanation = lookup(&args.code)
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", args.code.to_uppercase()))?;
    let code = explanation.code.as_str();

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            } else {
                println!(
                    "\n{}: {}\n{}",
                    code,
                    explanation.title,
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            }

            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                println!("  {}\n", suggestion);
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": code,
                "severity": explanation.code.default_severity().as_str(),
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_an_explanation() {
        for code in DiagnosticCode::all() {
            assert!(lookup(code.as_str()).is_some(), "{} is not explained", code);
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(lookup("h002").map(|e| e.title), Some("Bridge Method Synthesized"));
        assert!(lookup("X999").is_none());
    }

    #[test]
    fn test_related_codes_exist() {
        for explanation in EXPLANATIONS {
            for related in explanation.related {
                assert!(DiagnosticCode::parse(related).is_some(), "{}", related);
            }
        }
    }
}
