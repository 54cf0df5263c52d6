//! Line/character positions over byte offsets.

use std::fmt;

pub use text_size::{TextRange, TextSize};

/// Zero-based line and character of a token start.
///
/// `character` counts UTF-8 bytes from the start of the line. Formatting
/// shows the one-based form editors display.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// Line start offsets of one source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIndex {
    /// Always starts with offset 0, so never empty.
    line_starts: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(offset, _)| offset + 1))
            .map(|offset| TextSize::from(offset as u32))
            .collect();
        Self {
            line_starts,
            text_len: TextSize::of(text),
        }
    }

    pub fn position(&self, offset: TextSize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line as u32, u32::from(offset - self.line_starts[line]))
    }

    /// Byte offset of `position`, clamped to the end of its line. `None`
    /// past the last line.
    pub fn offset(&self, position: Position) -> Option<TextSize> {
        let line = position.line as usize;
        let start = *self.line_starts.get(line)?;
        let end = self.line_starts.get(line + 1).copied().unwrap_or(self.text_len);
        Some((start + TextSize::from(position.character)).min(end))
    }

    /// Zero-based index of the last line. Text ending in a newline has an
    /// empty last line after it.
    pub fn last_line(&self) -> u32 {
        (self.line_starts.len() - 1) as u32
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display_is_one_based() {
        assert_eq!(Position::new(0, 0).to_string(), "1:1");
        assert_eq!(Position::new(5, 10).to_string(), "6:11");
    }

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 0) > Position::new(0, 40));
        assert!(Position::new(2, 3) < Position::new(2, 4));
    }

    #[test]
    fn test_positions() {
        let index = LineIndex::new("foo\n\tset x=1\n");
        assert_eq!(index.position(TextSize::from(0)), Position::new(0, 0));
        assert_eq!(index.position(TextSize::from(3)), Position::new(0, 3));
        assert_eq!(index.position(TextSize::from(4)), Position::new(1, 0));
        assert_eq!(index.position(TextSize::from(5)), Position::new(1, 1));
        assert_eq!(index.position(TextSize::from(13)), Position::new(2, 0));
        assert_eq!(index.last_line(), 2);
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_offsets() {
        let index = LineIndex::new("foo\nbar");
        assert_eq!(index.offset(Position::new(0, 0)), Some(TextSize::from(0)));
        assert_eq!(index.offset(Position::new(1, 2)), Some(TextSize::from(6)));
        assert_eq!(index.offset(Position::new(1, 99)), Some(TextSize::from(7)));
        assert_eq!(index.offset(Position::new(4, 0)), None);
    }

    #[test]
    fn test_empty_text() {
        let index = LineIndex::new("");
        assert_eq!(index.last_line(), 0);
        assert_eq!(index.position(TextSize::from(0)), Position::new(0, 0));
    }
}
