//!
//! Byte-for-byte reconstruction of source text from a token stream. Every
//! open/close pair and every leaf token carries the provenance fields the
//! scanner stripped off during recognition (leading spaces, extracted
//! whitespace, the exact rest-of-line text); `write` walks the stream and
//! glues those fields back together rather than re-deriving formatting
//! from the semantic payload.
//!
//! Container nesting is tracked with a plain stack of prefix generators,
//! mirroring `crate::block_stack::BlockStack` on the read side: each open
//! container token pushes a frame that knows how to render the prefix for
//! every subsequent line until its matching close.

use crate::config::ParserConfig;
use crate::line_source::{detect_line_ending, LineEnding};
use crate::token::{LinkKind, Token, TokenKind};

#[derive(Debug, Clone)]
enum ContainerFrame {
    BlockQuote { leading_spaces_per_line: Vec<String>, line_index: usize },
    List { indent_level: usize, marker_prefix: String, first_line_pending: bool },
}

impl ContainerFrame {
    fn next_prefix(&mut self) -> String {
        match self {
            ContainerFrame::BlockQuote { leading_spaces_per_line, line_index } => {
                // A line without an entry here was a lazy continuation: the
                // `>` marker was absent on that source line entirely.
                let prefix = leading_spaces_per_line.get(*line_index).cloned().unwrap_or_default();
                *line_index += 1;
                prefix
            }
            ContainerFrame::List { indent_level, marker_prefix, first_line_pending } => {
                if *first_line_pending {
                    *first_line_pending = false;
                    marker_prefix.clone()
                } else {
                    " ".repeat(*indent_level)
                }
            }
        }
    }
}

/// Reconstructs source text from a finalized token stream. Best-effort for
/// deeply nested containers (see module docs); exact for the flat leaf
/// blocks that make up the bulk of real documents.
/// Whether the leaf block currently open treats its `Text` tokens as raw,
/// multi-line, verbatim content (code/HTML blocks) or as one segment of an
/// inline run that already had its line breaks pulled out into explicit
/// `SoftBreak`/`HardBreak` tokens during inline scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafContext {
    Inline,
    RawBlock,
}

pub struct Writer {
    containers: Vec<ContainerFrame>,
    link_opens: Vec<TokenKind>,
    leaf_context: Option<LeafContext>,
    pending_setext: Option<(char, usize)>,
    open_fence_char: Option<char>,
    out: String,
    at_line_start: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            containers: Vec::new(),
            link_opens: Vec::new(),
            leaf_context: None,
            pending_setext: None,
            open_fence_char: None,
            out: String::new(),
            at_line_start: true,
        }
    }

    pub fn write(tokens: &[Token]) -> String {
        let mut writer = Writer::new();
        writer.run(tokens);
        writer.out
    }

    /// Like `write`, but honors `config.normalize_line_endings`: when it is
    /// `false`, the original document's line-ending style (detected from
    /// `source`) is reproduced instead of the writer's internal `\n`.
    pub fn write_for(tokens: &[Token], source: &str, config: &ParserConfig) -> String {
        let rendered = Self::write(tokens);
        if config.normalize_line_endings {
            return rendered;
        }
        match detect_line_ending(source) {
            LineEnding::Lf => rendered,
            other => rendered.replace('\n', other.as_str()),
        }
    }

    fn prefix(&mut self) -> String {
        let mut s = String::new();
        for frame in &mut self.containers {
            s.push_str(&frame.next_prefix());
        }
        s
    }

    fn push_line(&mut self, content: &str) {
        if self.at_line_start {
            let prefix = self.prefix();
            self.out.push_str(&prefix);
        }
        self.out.push_str(content);
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn push_blank(&mut self) {
        self.push_line("");
    }

    fn run(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            self.emit(&tokens[i].kind);
            i += 1;
        }
    }

    fn emit(&mut self, kind: &TokenKind) {
        match kind {
            TokenKind::BlockQuoteOpen { leading_spaces_per_line } => {
                self.containers.push(ContainerFrame::BlockQuote {
                    leading_spaces_per_line: leading_spaces_per_line.clone(),
                    line_index: 0,
                });
            }
            TokenKind::BlockQuoteClose => {
                self.containers.pop();
            }
            TokenKind::UnorderedListOpen { marker_char, indent_level, ws_before_marker, ws_after_marker, .. } => {
                let marker = format!("{}{marker_char}{}", " ".repeat(*ws_before_marker), " ".repeat(*ws_after_marker));
                self.containers.push(ContainerFrame::List {
                    indent_level: *indent_level,
                    marker_prefix: marker,
                    first_line_pending: true,
                });
            }
            TokenKind::OrderedListOpen { list_start_digits, marker_char, indent_level, ws_before_marker, ws_after_marker, .. } => {
                let marker = format!(
                    "{}{list_start_digits}{}{}",
                    " ".repeat(*ws_before_marker),
                    marker_char.as_char(),
                    " ".repeat(*ws_after_marker)
                );
                self.containers.push(ContainerFrame::List {
                    indent_level: *indent_level,
                    marker_prefix: marker,
                    first_line_pending: true,
                });
            }
            TokenKind::ListItemContinuation { list_start_content, .. } => {
                if let Some(ContainerFrame::List { marker_prefix, first_line_pending, .. }) = self.containers.last_mut() {
                    *marker_prefix = list_start_content.clone();
                    *first_line_pending = true;
                }
            }
            TokenKind::ListClose => {
                self.containers.pop();
            }
            TokenKind::ParagraphOpen { .. } => self.leaf_context = Some(LeafContext::Inline),
            TokenKind::ParagraphClose { .. } => {
                self.out.push('\n');
                self.at_line_start = true;
                self.leaf_context = None;
            }
            TokenKind::AtxHeadingOpen { hash_count, extracted_whitespace, .. } => {
                let prefix = self.prefix();
                self.out.push_str(&prefix);
                self.out.push_str(&"#".repeat(*hash_count as usize));
                self.out.push_str(extracted_whitespace);
                self.at_line_start = false;
                self.leaf_context = Some(LeafContext::Inline);
            }
            TokenKind::AtxHeadingClose => {
                self.out.push('\n');
                self.at_line_start = true;
                self.leaf_context = None;
            }
            TokenKind::SetextHeadingOpen { underline_char, underline_count, .. } => {
                self.pending_setext = Some((*underline_char, *underline_count));
                self.leaf_context = Some(LeafContext::Inline);
            }
            TokenKind::SetextHeadingClose { .. } => {
                self.out.push('\n');
                self.at_line_start = true;
                if let Some((ch, count)) = self.pending_setext.take() {
                    let line = ch.to_string().repeat(count);
                    self.push_line(&line);
                }
                self.leaf_context = None;
            }
            TokenKind::ThematicBreak { extracted_whitespace, rest_of_line, .. } => {
                let line = format!("{extracted_whitespace}{rest_of_line}");
                self.push_line(&line);
            }
            TokenKind::IndentedCodeBlockOpen { .. } => self.leaf_context = Some(LeafContext::RawBlock),
            TokenKind::IndentedCodeBlockClose => self.leaf_context = None,
            TokenKind::FencedCodeBlockOpen { fence_char, fence_count, info_string, extracted_whitespace, whitespace_before_info } => {
                let fence = fence_char.to_string().repeat(*fence_count);
                let line = format!("{extracted_whitespace}{fence}{whitespace_before_info}{info_string}");
                self.push_line(&line);
                self.leaf_context = Some(LeafContext::RawBlock);
                self.open_fence_char = Some(*fence_char);
            }
            TokenKind::FencedCodeBlockClose { was_forced, extracted_whitespace, .. } => {
                if !was_forced {
                    let fence_char = self.open_fence_char.unwrap_or('`');
                    let fence_line = format!("{extracted_whitespace}{}", fence_char.to_string().repeat(3));
                    self.push_line(&fence_line);
                }
                self.leaf_context = None;
            }
            TokenKind::HtmlBlockOpen { .. } => self.leaf_context = Some(LeafContext::RawBlock),
            TokenKind::HtmlBlockClose => self.leaf_context = None,
            TokenKind::LinkReferenceDefinition { label, destination, title, .. } => {
                let mut line = format!("[{label}]: {destination}");
                if let Some(t) = title {
                    line.push_str(&format!(" \"{t}\""));
                }
                self.push_line(&line);
            }
            TokenKind::BlankLine { extracted_whitespace } => {
                self.push_blank();
                let _ = extracted_whitespace;
            }
            TokenKind::Text { payload, tabified_text, .. } => {
                let text = tabified_text.as_deref().unwrap_or(payload);
                if self.leaf_context == Some(LeafContext::RawBlock) {
                    for (idx, line) in text.split('\n').enumerate() {
                        if idx > 0 {
                            self.out.push('\n');
                            self.at_line_start = true;
                        }
                        if self.at_line_start {
                            let prefix = self.prefix();
                            self.out.push_str(&prefix);
                            self.at_line_start = false;
                        }
                        self.out.push_str(line);
                    }
                    self.out.push('\n');
                    self.at_line_start = true;
                } else {
                    // Inline-scanned text never contains an embedded
                    // newline; line breaks within the block arrive as
                    // separate SoftBreak/HardBreak tokens.
                    self.raw(text);
                }
            }
            TokenKind::InlineCodeSpan { run_count, before_ws, after_ws, payload } => {
                let backticks = "`".repeat(*run_count);
                self.raw(&format!("{backticks}{before_ws}{payload}{after_ws}{backticks}"));
            }
            TokenKind::EmphasisOpen { delimiter, count } | TokenKind::EmphasisClose { delimiter, count } => {
                self.raw(&delimiter.as_char().to_string().repeat(*count));
            }
            TokenKind::StrongOpen { delimiter, count } | TokenKind::StrongClose { delimiter, count } => {
                self.raw(&delimiter.as_char().to_string().repeat(*count));
            }
            TokenKind::LinkOpen { .. } => {
                self.link_opens.push(kind.clone());
                self.raw("[");
            }
            TokenKind::LinkClose => {
                if let Some(TokenKind::LinkOpen { kind: link_kind, label, destination, title, .. }) = self.link_opens.pop() {
                    let tail = render_link_tail(link_kind, &destination, &title, &label);
                    self.raw(&tail);
                }
            }
            TokenKind::ImageOpen { kind: link_kind, label, destination, title, alt_text, .. } => {
                let tail = render_link_tail(*link_kind, destination, title, label);
                self.raw(&format!("![{alt_text}{tail}"));
            }
            TokenKind::RawHtml { payload } => self.raw(payload),
            TokenKind::Autolink { payload, .. } => self.raw(&format!("<{payload}>")),
            TokenKind::HardBreak { kind } => {
                match kind {
                    crate::token::HardBreakKind::Backslash => self.raw("\\\n"),
                    crate::token::HardBreakKind::Spaces => self.raw("  \n"),
                }
                self.at_line_start = true;
            }
            TokenKind::SoftBreak => {
                self.raw("\n");
                self.at_line_start = true;
            }
            TokenKind::CharacterReference { raw, .. } => self.raw(raw),
            TokenKind::BackslashEscape { escaped_char } => self.raw(&format!("\\{escaped_char}")),
        }
    }

    fn raw(&mut self, s: &str) {
        if self.at_line_start {
            let prefix = self.prefix();
            self.out.push_str(&prefix);
            self.at_line_start = false;
        }
        self.out.push_str(s);
    }
}

fn render_link_tail(kind: LinkKind, destination: &str, title: &Option<String>, label: &Option<String>) -> String {
    match kind {
        LinkKind::Inline => {
            let mut s = format!("]({destination}");
            if let Some(t) = title {
                s.push_str(&format!(" \"{t}\""));
            }
            s.push(')');
            s
        }
        LinkKind::Full => format!("][{}]", label.as_deref().unwrap_or("")),
        LinkKind::Collapsed => "][]".to_string(),
        LinkKind::Shortcut => "]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn roundtrip(src: &str) -> String {
        let parser = Parser::new(Default::default()).unwrap();
        let tokens = parser.parse(src);
        Writer::write(&tokens)
    }

    #[test]
    fn roundtrips_simple_paragraph() {
        let src = "hello world\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn roundtrips_atx_heading() {
        let src = "## hi\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn roundtrips_thematic_break() {
        let src = "---\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn roundtrips_fenced_code_block() {
        let src = "```rust\nfn x() {}\n```\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn roundtrips_multi_item_unordered_list() {
        let src = "- one\n- two\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn roundtrips_tab_indented_code_block() {
        let src = "\tcode\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn write_for_normalizes_by_default() {
        let src = "one\r\ntwo\r\n";
        let parser = Parser::new(Default::default()).unwrap();
        let tokens = parser.parse(src);
        assert_eq!(Writer::write_for(&tokens, src, &ParserConfig::default()), "one\ntwo\n");
    }

    #[test]
    fn write_for_preserves_crlf_when_normalization_is_off() {
        let src = "one\r\ntwo\r\n";
        let config = ParserConfig::default().with_normalize_line_endings(false);
        let parser = Parser::new(config).unwrap();
        let tokens = parser.parse(src);
        assert_eq!(Writer::write_for(&tokens, src, &config), src);
    }

    #[test]
    fn write_for_preserves_bare_cr_when_normalization_is_off() {
        let src = "one\rtwo\r";
        let config = ParserConfig::default().with_normalize_line_endings(false);
        let parser = Parser::new(config).unwrap();
        let tokens = parser.parse(src);
        assert_eq!(Writer::write_for(&tokens, src, &config), src);
    }
}
