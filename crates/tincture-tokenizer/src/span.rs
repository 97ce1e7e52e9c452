//! Span tracking for source locations.

/// A span representing a range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the start (inclusive)
    pub start: u32,
    /// Byte offset of the end (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span from start and end byte offsets.
    #[inline]
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Create an empty span at a position.
    #[inline]
    pub fn empty(pos: u32) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether this span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[inline]
    pub fn extend(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Get the source text for this span.
    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start as usize..self.end as usize]
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start as usize..span.end as usize
    }
}

/// A zero-based line/column position in the source text.
///
/// Columns count UTF-16 code units, which is what source map consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Location {
    /// Zero-based line number.
    pub line: u32,
    /// Zero-based column, in UTF-16 code units.
    pub column: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Maps byte offsets to line/column locations.
///
/// Built once per source text; lookups are a binary search over line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Index the line starts of `source`.
    ///
    /// `\n`, `\r\n`, `\r` and form feed all end a line, as in CSS.
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    i += 2;
                    line_starts.push(i as u32);
                    continue;
                }
                b'\n' | b'\r' | b'\x0C' => line_starts.push(i as u32 + 1),
                _ => {}
            }
            i += 1;
        }
        Self { line_starts }
    }

    /// Number of lines in the indexed source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Location of the byte `offset` within `source`.
    ///
    /// `source` must be the same text the index was built from.
    pub fn location(&self, source: &str, offset: u32) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line] as usize;
        let end = (offset as usize).min(source.len());
        let column = source
            .get(start..end)
            .map(|prefix| prefix.encode_utf16().count())
            .unwrap_or(end - start);
        Location {
            line: line as u32,
            column: column as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_lf() {
        let source = "a{\n  color: red;\n}";
        let index = LineIndex::new(source);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.location(source, 0), Location::new(0, 0));
        assert_eq!(index.location(source, 5), Location::new(1, 2));
        assert_eq!(index.location(source, 17), Location::new(2, 0));
    }

    #[test]
    fn test_line_index_crlf() {
        let source = "a\r\nb";
        let index = LineIndex::new(source);
        assert_eq!(index.location(source, 3), Location::new(1, 0));
    }

    #[test]
    fn test_line_index_utf16_columns() {
        // U+1F600 is four bytes in UTF-8 and two UTF-16 units.
        let source = "/*😀*/a";
        let index = LineIndex::new(source);
        assert_eq!(index.location(source, 8), Location::new(0, 6));
    }
}
