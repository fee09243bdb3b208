//!
//! Line source and tab accounting. Splits the normalized
//! source into logical lines, hands them out one at a time, and supports
//! `requeue` so a pass can push lines back for re-reading (used by the
//! link-reference-definition checkpoint/restore in `crate::leaf`).

use crate::config::ParserConfig;

/// One logical line of input. Tabs are never expanded in place — `raw` is
/// the original text, and `index_indent` tracks how many *effective*
/// columns of container prefix earlier passes have already consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub raw: String,
    pub line_number: usize,
    pub index_indent: usize,
}

/// The line-terminator style a source document used, for callers that want
/// the round-trip writer to reproduce it instead of normalizing to `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Cr,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Scans `source` for its first line terminator and reports that style.
/// Documents that mix terminators are rendered back out uniformly in that
/// first-seen style when normalization is turned off; genuinely mixed
/// line endings within one document are a known round-trip limitation.
pub fn detect_line_ending(source: &str) -> LineEnding {
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                return if chars.peek() == Some(&'\n') { LineEnding::CrLf } else { LineEnding::Cr };
            }
            '\n' => return LineEnding::Lf,
            _ => {}
        }
    }
    LineEnding::Lf
}

impl Line {
    pub fn new(raw: impl Into<String>, line_number: usize) -> Self {
        Self { raw: raw.into(), line_number, index_indent: 0 }
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Step through `s`, returning the effective column (0-based) after
/// consuming all of it, given a starting column and tab width. Spaces
/// advance one column; tabs advance to the next multiple of `tab_width`.
pub fn effective_column(s: &str, start_column: usize, tab_width: usize) -> usize {
    let mut col = start_column;
    for ch in s.chars() {
        match ch {
            '\t' => col = (col / tab_width + 1) * tab_width,
            _ => col += 1,
        }
    }
    col
}

/// Splits `prefix` consumption into `(consumed_raw, effective_width,
/// remainder_raw)` where `remainder_raw` restarts at a fresh effective
/// column boundary. Used when a container prefix needs to slice into the
/// middle of a tab: the tab is notionally replaced by spaces to finish the
/// prefix, and the leftover spaces become the residual line's leading
/// whitespace.
pub fn consume_effective_columns(s: &str, start_column: usize, columns: usize, tab_width: usize) -> (String, String) {
    let mut col = start_column;
    let mut consumed = String::new();
    let mut rest_chars = s.chars();
    let mut remainder = String::new();
    for ch in s.chars() {
        if col - start_column >= columns {
            break;
        }
        rest_chars.next();
        match ch {
            '\t' => {
                let next_stop = (col / tab_width + 1) * tab_width;
                let advance = next_stop - col;
                if col + advance > start_column + columns {
                    // Tab overshoots the boundary: consume to the boundary
                    // with spaces and leave the rest as leading spaces on
                    // the residual line.
                    let needed = start_column + columns - col;
                    consumed.push_str(&" ".repeat(needed));
                    remainder.push_str(&" ".repeat(advance - needed));
                    col = next_stop;
                } else {
                    consumed.push_str(&" ".repeat(advance));
                    col = next_stop;
                }
            }
            _ => {
                consumed.push(ch);
                col += 1;
            }
        }
    }
    remainder.push_str(rest_chars.as_str());
    (consumed, remainder)
}

/// A cursor/checkpoint into the line source, for the LRD
/// backtrack-on-failure pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    position: usize,
}

/// Finite lazy sequence of logical lines with requeue support
/// (`next_line()` / `requeue(lines)`).
#[derive(Debug, Clone)]
pub struct LineSource {
    lines: Vec<Line>,
    position: usize,
}

impl LineSource {
    /// Splits `source` on `\n`, `\r\n`, and `\r`, normalizing all three to
    /// logical line boundaries. No trailing empty line is
    /// produced unless the source ends with a blank line before EOF.
    pub fn new(source: &str, _config: &ParserConfig) -> Self {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut chars = source.chars().peekable();
        let mut line_number = 1;
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    lines.push(Line::new(std::mem::take(&mut current), line_number));
                    line_number += 1;
                }
                '\n' => {
                    lines.push(Line::new(std::mem::take(&mut current), line_number));
                    line_number += 1;
                }
                _ => current.push(ch),
            }
        }
        if !current.is_empty() || lines.is_empty() && !source.is_empty() {
            lines.push(Line::new(current, line_number));
        } else if source.is_empty() {
            // An empty document has zero lines, not one blank line.
        }
        Self { lines, position: 0 }
    }

    pub fn next_line(&mut self) -> Option<Line> {
        let line = self.lines.get(self.position).cloned();
        if line.is_some() {
            self.position += 1;
        }
        line
    }

    pub fn peek_line(&self) -> Option<&Line> {
        self.lines.get(self.position)
    }

    /// Pushes `lines` back so they are the next ones read, in order. Used
    /// both for single-line lazy-continuation lookahead and for
    /// multi-line LRD-attempt failure recovery.
    pub fn requeue(&mut self, lines: Vec<Line>) {
        if self.position >= lines.len() {
            self.position -= lines.len();
        } else {
            // Requeuing more than was consumed: splice them in directly.
            for (offset, line) in lines.into_iter().enumerate() {
                self.lines.insert(self.position + offset, line);
            }
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { position: self.position }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.lines.len()
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn source_ended_with_newline(&self, original: &str) -> bool {
        original.ends_with('\n') || original.ends_with('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mixed_line_endings() {
        let cfg = ParserConfig::default();
        let src = LineSource::new("a\nb\r\nc\rd", &cfg);
        let raws: Vec<_> = src.lines.iter().map(|l| l.raw.clone()).collect();
        assert_eq!(raws, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn requeue_rewinds_cursor() {
        let cfg = ParserConfig::default();
        let mut src = LineSource::new("a\nb\nc", &cfg);
        let first = src.next_line().unwrap();
        let second = src.next_line().unwrap();
        src.requeue(vec![first.clone(), second.clone()]);
        assert_eq!(src.next_line().unwrap(), first);
        assert_eq!(src.next_line().unwrap(), second);
    }

    #[test]
    fn effective_column_expands_tabs_to_next_stop() {
        assert_eq!(effective_column("\t", 0, 4), 4);
        assert_eq!(effective_column("a\t", 0, 4), 4);
        assert_eq!(effective_column("ab\t", 0, 4), 4);
        assert_eq!(effective_column("abc\t", 0, 4), 4);
        assert_eq!(effective_column("abcd\t", 0, 4), 8);
    }

    #[test]
    fn detect_line_ending_recognizes_each_style() {
        assert_eq!(detect_line_ending("a\nb"), LineEnding::Lf);
        assert_eq!(detect_line_ending("a\r\nb"), LineEnding::CrLf);
        assert_eq!(detect_line_ending("a\rb"), LineEnding::Cr);
        assert_eq!(detect_line_ending("no newline here"), LineEnding::Lf);
    }

    #[test]
    fn checkpoint_restore_roundtrips() {
        let cfg = ParserConfig::default();
        let mut src = LineSource::new("a\nb\nc", &cfg);
        let cp = src.checkpoint();
        src.next_line();
        src.next_line();
        src.restore(cp);
        assert_eq!(src.next_line().unwrap().raw, "a");
    }
}
