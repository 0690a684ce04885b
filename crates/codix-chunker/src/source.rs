//! Line index over decoded file content.

use std::ops::Range;

/// Byte ranges of each line in a file. A line's range excludes its `\n`.
pub(crate) struct SourceLines<'a> {
    content: &'a str,
    lines: Vec<Range<usize>>,
}

impl<'a> SourceLines<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                lines.push(start..i);
                start = i + 1;
            }
        }
        // A final '\n' terminates the last line rather than opening an empty one.
        if start < content.len() {
            lines.push(start..content.len());
        }
        Self { content, lines }
    }

    pub(crate) fn content(&self) -> &'a str {
        self.content
    }

    pub(crate) fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// Text of line `n` (1-indexed) without its terminator.
    pub(crate) fn line(&self, n: usize) -> &'a str {
        let r = &self.lines[n - 1];
        &self.content[r.clone()]
    }

    /// Verbatim text of lines `start..=end` (1-indexed), including the inner terminators
    /// but not the terminator of the last line.
    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a str {
        let from = self.lines[start - 1].start;
        let to = self.lines[end - 1].end;
        &self.content[from..to]
    }

    /// 1-indexed line holding byte `offset`. Offsets on a terminator belong to the line
    /// it ends.
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        let idx = self.lines.partition_point(|r| r.end < offset);
        (idx + 1).min(self.total_lines().max(1))
    }

    /// 1-indexed line span of a node given its tree-sitter positions.
    ///
    /// A node that ends at column 0 stops before that row, so that row is not counted.
    /// Returns `None` for a span outside the file.
    pub(crate) fn node_lines(
        &self,
        start_row: usize,
        end_row: usize,
        end_column: usize,
    ) -> Option<(usize, usize)> {
        let end_row = if end_column == 0 && end_row > start_row {
            end_row - 1
        } else {
            end_row
        };
        let start = start_row + 1;
        let end = (end_row + 1).min(self.total_lines());
        (start <= end).then_some((start, end))
    }
}
