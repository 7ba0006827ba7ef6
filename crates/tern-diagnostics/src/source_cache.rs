//! Source text behind diagnostic spans.
//!
//! Backend inputs arrive as serialized units; their spans still point into
//! the files the front end read. The CLI registers whatever text it has for
//! those files here so emitters can print a location and the offending line.

use std::path::{Path, PathBuf};

use crate::span::{FileId, Location, Span};

/// One registered file, indexed by line.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: String,
    /// Byte offset at which each line begins; always starts with 0
    lines: Vec<u32>,
}

impl SourceFile {
    fn index(id: FileId, path: PathBuf, source: String) -> Self {
        let mut lines = vec![0];
        lines.extend(source.match_indices('\n').map(|(at, _)| at as u32 + 1));
        Self {
            id,
            path,
            source,
            lines,
        }
    }

    /// 1-indexed `(line, column)` of a byte offset, clamped to the file.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        // Lines starting at or before `offset`; at least the first one
        let line = self.lines.partition_point(|&start| start <= offset).max(1);
        let column = offset - self.lines[line - 1] + 1;
        (line as u32, column)
    }

    /// Text of a 1-indexed line, without `\n` or `\r\n`.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let line = usize::try_from(line).ok()?.checked_sub(1)?;
        let start = *self.lines.get(line)? as usize;
        let end = self
            .lines
            .get(line + 1)
            .map_or(self.source.len(), |&next| next as usize);
        let text = &self.source[start..end];
        Some(text.strip_suffix('\n').map_or(text, |t| t.trim_end_matches('\r')))
    }
}

/// Registered files; `FileId(n)` is the n-th file added.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file. Adding a path twice keeps the first text and returns
    /// its id.
    pub fn add_file(&mut self, path: impl AsRef<Path>, source: String) -> FileId {
        let path = path.as_ref();
        if let Some(existing) = self.files.iter().find(|f| f.path == path) {
            return existing.id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::index(id, path.to_path_buf(), source));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    fn file_of(&self, span: Span) -> Option<&SourceFile> {
        if span.is_dummy() {
            None
        } else {
            self.get_file(span.file_id)
        }
    }

    /// Where a span starts. `None` for synthesized nodes and unknown files.
    pub fn location(&self, span: Span) -> Option<Location> {
        let file = self.file_of(span)?;
        let (line, column) = file.line_column(span.start);
        Some(Location {
            file: file.path.display().to_string(),
            line,
            column,
        })
    }

    /// Text of the line a span starts on.
    pub fn line_text(&self, span: Span) -> Option<&str> {
        let file = self.file_of(span)?;
        file.line_text(file.line_column(span.start).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR: &str = "try {\n  yield 1;\r\n} catch {}";

    #[test]
    fn test_offsets_map_to_lines() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("gen.tern", GENERATOR.to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_column(0), (1, 1));
        assert_eq!(file.line_column(8), (2, 3));
        assert_eq!(file.line_column(18), (3, 1));
        // Past the end clamps to the last character position
        assert_eq!(file.line_column(1000), (3, 11));
    }

    #[test]
    fn test_line_text_strips_terminators() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("gen.tern", GENERATOR.to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_text(1), Some("try {"));
        assert_eq!(file.line_text(2), Some("  yield 1;"));
        assert_eq!(file.line_text(3), Some("} catch {}"));
        assert_eq!(file.line_text(0), None);
        assert_eq!(file.line_text(4), None);
    }

    #[test]
    fn test_span_lookup() {
        let mut cache = SourceCache::new();
        cache.add_file("other.tern", String::new());
        let id = cache.add_file("gen.tern", GENERATOR.to_string());
        assert_eq!(id, FileId(1));

        let span = Span::new(id, 8, 16);
        assert_eq!(cache.location(span).unwrap().to_string(), "gen.tern:2:3");
        assert_eq!(cache.line_text(span), Some("  yield 1;"));

        assert!(cache.location(Span::DUMMY).is_none());
        assert!(cache.location(Span::new(FileId(7), 0, 1)).is_none());
    }

    #[test]
    fn test_same_path_keeps_first_text() {
        let mut cache = SourceCache::new();
        let a = cache.add_file("a.tern", "x".to_string());
        let b = cache.add_file("a.tern", "ignored".to_string());
        assert_eq!(a, b);
        assert_eq!(cache.get_file(a).unwrap().source, "x");
    }
}
