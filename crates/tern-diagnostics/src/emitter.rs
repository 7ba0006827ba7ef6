//! Diagnostic emitters for the CLI output formats.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use std::io::Write;

/// Writes diagnostics in one output format.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// Terminal output with colors and a source snippet.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.colored {
            code
        } else {
            ""
        }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Error => self.paint("\x1b[31m"),
            Severity::Hint => self.paint("\x1b[34m"),
        }
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.severity_color(diagnostic.severity);
        let reset = self.paint("\x1b[0m");
        let bold = self.paint("\x1b[1m");
        let cyan = self.paint("\x1b[36m");

        // error[U001]: message
        writeln!(
            self.writer,
            "{}{}{}[{}]{}: {}",
            bold,
            color,
            diagnostic.severity.as_str(),
            diagnostic.code.as_str(),
            reset,
            diagnostic.message
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {}-->{} {}", cyan, reset, loc)?;

            if let Some(line_text) = cache.line_text(diagnostic.span) {
                let gutter = loc.line.to_string();
                let padding = " ".repeat(gutter.len());
                let indent = " ".repeat((loc.column - 1) as usize);
                let room = line_text.len().saturating_sub((loc.column - 1) as usize);
                let width = (diagnostic.span.len() as usize).min(room).max(1);

                writeln!(self.writer, "{} {}|{}", padding, cyan, reset)?;
                writeln!(self.writer, "{}{} |{} {}", cyan, gutter, reset, line_text)?;
                writeln!(
                    self.writer,
                    "{} {}|{} {}{}{}{}",
                    padding,
                    cyan,
                    reset,
                    indent,
                    color,
                    "^".repeat(width),
                    reset
                )?;
            }
        }

        for label in &diagnostic.labels {
            match cache.location(label.span) {
                Some(loc) => writeln!(
                    self.writer,
                    "  {}note{}: {} ({})",
                    cyan, reset, label.message, loc
                )?,
                None => writeln!(self.writer, "  {}note{}: {}", cyan, reset, label.message)?,
            }
        }

        if let Some(ref explanation) = diagnostic.explanation {
            writeln!(self.writer, "  {}= help:{} {}", cyan, reset, explanation)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let (errors, hints) = (diagnostics.error_count(), diagnostics.hint_count());
        let color = self.severity_color(if errors > 0 { Severity::Error } else { Severity::Hint });
        let reset = self.paint("\x1b[0m");
        let plural = |n: usize| if n == 1 { "" } else { "s" };

        match (errors, hints) {
            (0, 0) => Ok(()),
            (0, h) => writeln!(self.writer, "{}{} rewrite{} noted{}", color, h, plural(h), reset),
            (e, _) => writeln!(
                self.writer,
                "{}{} error{} emitted{}",
                color,
                e,
                plural(e),
                reset
            ),
        }
    }
}

/// One JSON object per line, for tooling.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let loc = cache.location(diagnostic.span);

        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": loc.map(|l| serde_json::json!({
                "file": l.file,
                "line": l.line,
                "column": l.column,
            })),
            "span": if diagnostic.span.is_dummy() {
                serde_json::Value::Null
            } else {
                serde_json::json!({
                    "start": diagnostic.span.start,
                    "end": diagnostic.span.end,
                })
            },
            "help": diagnostic.explanation,
            "notes": diagnostic.labels.iter().map(|l| l.message.clone()).collect::<Vec<_>>(),
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// `file:line:col: severity: message [code]`, no colors.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        match cache.location(diagnostic.span) {
            Some(loc) => writeln!(
                self.writer,
                "{}: {}: {} [{}]",
                loc,
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            ),
            None => writeln!(
                self.writer,
                "{}: {} [{}]",
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            ),
        }
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} hint(s)",
            diagnostics.error_count(),
            diagnostics.hint_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::span::Span;

    fn render<E: DiagnosticEmitter>(mut emitter: E, diag: &Diagnostic, cache: &SourceCache) {
        emitter.emit(diag, cache).unwrap();
    }

    #[test]
    fn test_terminal_snippet_underlines_span() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("gen.tern", "do();\ntry { yield; } catch { }".to_string());
        let diag = Diagnostic::new(DiagnosticCode::UnsupportedSuspensionSite, "cannot hoist")
            .with_span(Span::new(id, 12, 18))
            .with_label(Span::new(id, 6, 9), "enclosing try")
            .build();

        let mut out = Vec::new();
        render(TerminalEmitter::new(&mut out, false), &diag, &cache);
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("error[U002]: cannot hoist"));
        assert!(text.contains("--> gen.tern:2:7"));
        assert!(text.contains("      ^^^^^^"));
        assert!(text.contains("note: enclosing try (gen.tern:2:1)"));
    }

    #[test]
    fn test_terminal_summary() {
        let mut diags = Diagnostics::new();
        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false).emit_summary(&diags).unwrap();
        assert!(out.is_empty());

        diags.push(Diagnostic::new(DiagnosticCode::BridgeSynthesized, "bridged").build());
        TerminalEmitter::new(&mut out, false).emit_summary(&diags).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 rewrite noted\n");

        diags.push(Diagnostic::new(DiagnosticCode::SuspensionInFinally, "finally").build());
        diags.push(Diagnostic::new(DiagnosticCode::InternalError, "broken").build());
        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false).emit_summary(&diags).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2 errors emitted\n");
    }

    #[test]
    fn test_json_without_location() {
        let cache = SourceCache::new();
        let diag = Diagnostic::new(DiagnosticCode::InternalError, "broken tree").build();

        let mut out = Vec::new();
        render(JsonEmitter::new(&mut out), &diag, &cache);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["code"], "I001");
        assert_eq!(value["severity"], "error");
        assert!(value["location"].is_null());
        assert!(value["span"].is_null());
    }
}
