//! Byte ranges into front-end source files.
//!
//! Every statement of a lowered method carries one. Nodes the backend
//! synthesizes use [`Span::DUMMY`] and print without a location.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a file in the [`SourceCache`](crate::SourceCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub const DUMMY: FileId = FileId(u32::MAX);
}

/// Half-open byte range `start..end` in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file_id: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const DUMMY: Span = Span::new(FileId::DUMMY, 0, 0);

    pub const fn new(file_id: FileId, start: u32, end: u32) -> Self {
        Self { file_id, start, end }
    }

    pub fn is_dummy(&self) -> bool {
        self.file_id == FileId::DUMMY
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both. Spans from different files can't be
    /// joined, so `self` is kept.
    pub fn to(self, other: Span) -> Span {
        if self.file_id != other.file_id {
            return self;
        }
        Span::new(self.file_id, self.start.min(other.start), self.end.max(other.end))
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::DUMMY
    }
}

/// A span resolved to `file:line:column`, 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Related position printed as a note, e.g. the enclosing `try`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_within_file() {
        let file = FileId(0);
        let joined = Span::new(file, 12, 20).to(Span::new(file, 4, 9));
        assert_eq!(joined, Span::new(file, 4, 20));
        assert_eq!(joined.len(), 16);
    }

    #[test]
    fn test_join_across_files_keeps_left() {
        let left = Span::new(FileId(0), 1, 2);
        assert_eq!(left.to(Span::new(FileId(1), 0, 50)), left);
        assert_eq!(Span::DUMMY.to(Span::DUMMY), Span::DUMMY);
        assert!(Span::DUMMY.is_empty());
    }
}
