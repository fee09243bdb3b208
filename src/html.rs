//!
//! Reference HTML rendering. Unlike `crate::writer`, which reconstructs the
//! original bytes, this throws away provenance and renders the semantic
//! tree the way a CommonMark processor's HTML backend would: block tags
//! wrap block content, inline tags wrap inline content, and any text that
//! isn't already known-safe (code spans, raw HTML) gets entity-escaped.

use crate::token::{AutolinkKind, Token, TokenKind};

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    escape_text(s, out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

/// Walks a finalized token stream and produces the HTML5 fragment a reader
/// would expect; one call renders a whole document (no `<html>`/`<body>`
/// wrapper is added — callers compose that themselves).
pub struct HtmlRenderer {
    out: String,
    list_kinds: Vec<ListKind>,
    in_raw_block: bool,
    open_heading_level: Option<u8>,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            list_kinds: Vec::new(),
            in_raw_block: false,
            open_heading_level: None,
        }
    }

    pub fn render(tokens: &[Token]) -> String {
        let mut renderer = HtmlRenderer::new();
        for token in tokens {
            renderer.emit(&token.kind);
        }
        renderer.out
    }

    fn text(&mut self, s: &str) {
        escape_text(s, &mut self.out);
    }

    fn emit(&mut self, kind: &TokenKind) {
        match kind {
            TokenKind::BlockQuoteOpen { .. } => self.out.push_str("<blockquote>\n"),
            TokenKind::BlockQuoteClose => self.out.push_str("</blockquote>\n"),
            TokenKind::UnorderedListOpen { .. } => {
                self.list_kinds.push(ListKind::Unordered);
                self.out.push_str("<ul>\n");
            }
            TokenKind::OrderedListOpen { list_start_digits, .. } => {
                self.list_kinds.push(ListKind::Ordered);
                let start: usize = list_start_digits.parse().unwrap_or(1);
                if start == 1 {
                    self.out.push_str("<ol>\n");
                } else {
                    self.out.push_str(&format!("<ol start=\"{start}\">\n"));
                }
            }
            TokenKind::ListItemContinuation { .. } => {}
            TokenKind::ListClose => {
                match self.list_kinds.pop() {
                    Some(ListKind::Ordered) => self.out.push_str("</ol>\n"),
                    Some(ListKind::Unordered) => self.out.push_str("</ul>\n"),
                    None => {}
                }
            }
            TokenKind::ParagraphOpen { .. } => self.out.push_str("<p>"),
            TokenKind::ParagraphClose { .. } => self.out.push_str("</p>\n"),
            TokenKind::AtxHeadingOpen { level, .. } | TokenKind::SetextHeadingOpen { level, .. } => {
                self.open_heading_level = Some(*level);
                self.out.push_str(&format!("<h{level}>"));
            }
            TokenKind::AtxHeadingClose | TokenKind::SetextHeadingClose { .. } => {
                let level = self.open_heading_level.take().unwrap_or(1);
                self.out.push_str(heading_close(level));
                self.out.push('\n');
            }
            TokenKind::ThematicBreak { .. } => self.out.push_str("<hr />\n"),
            TokenKind::IndentedCodeBlockOpen { .. } => {
                self.in_raw_block = true;
                self.out.push_str("<pre><code>");
            }
            TokenKind::IndentedCodeBlockClose => {
                self.in_raw_block = false;
                self.out.push_str("</code></pre>\n");
            }
            TokenKind::FencedCodeBlockOpen { info_string, .. } => {
                self.in_raw_block = true;
                let lang = info_string.split_whitespace().next();
                match lang {
                    Some(lang) if !lang.is_empty() => {
                        self.out.push_str("<pre><code class=\"language-");
                        escape_attr(lang, &mut self.out);
                        self.out.push_str("\">");
                    }
                    _ => self.out.push_str("<pre><code>"),
                }
            }
            TokenKind::FencedCodeBlockClose { .. } => {
                self.in_raw_block = false;
                self.out.push_str("</code></pre>\n");
            }
            TokenKind::HtmlBlockOpen { .. } => self.in_raw_block = true,
            TokenKind::HtmlBlockClose => self.in_raw_block = false,
            TokenKind::LinkReferenceDefinition { .. } | TokenKind::BlankLine { .. } => {}
            TokenKind::Text { payload, .. } => {
                if self.in_raw_block {
                    self.out.push_str(payload);
                    self.out.push('\n');
                } else {
                    self.text(payload);
                }
            }
            TokenKind::InlineCodeSpan { payload, .. } => {
                self.out.push_str("<code>");
                self.text(payload);
                self.out.push_str("</code>");
            }
            TokenKind::EmphasisOpen { .. } => self.out.push_str("<em>"),
            TokenKind::EmphasisClose { .. } => self.out.push_str("</em>"),
            TokenKind::StrongOpen { .. } => self.out.push_str("<strong>"),
            TokenKind::StrongClose { .. } => self.out.push_str("</strong>"),
            TokenKind::LinkOpen { destination, title, .. } => {
                self.out.push_str("<a href=\"");
                escape_attr(destination, &mut self.out);
                self.out.push('"');
                if let Some(t) = title {
                    self.out.push_str(" title=\"");
                    escape_attr(t, &mut self.out);
                    self.out.push('"');
                }
                self.out.push('>');
            }
            TokenKind::LinkClose => self.out.push_str("</a>"),
            TokenKind::ImageOpen { destination, title, alt_text, .. } => {
                self.out.push_str("<img src=\"");
                escape_attr(destination, &mut self.out);
                self.out.push_str("\" alt=\"");
                escape_attr(alt_text, &mut self.out);
                self.out.push('"');
                if let Some(t) = title {
                    self.out.push_str(" title=\"");
                    escape_attr(t, &mut self.out);
                    self.out.push('"');
                }
                self.out.push_str(" />");
            }
            TokenKind::RawHtml { payload } => self.out.push_str(payload),
            TokenKind::Autolink { kind, payload } => {
                let href = match kind {
                    AutolinkKind::Uri => payload.clone(),
                    AutolinkKind::Email => format!("mailto:{payload}"),
                };
                self.out.push_str("<a href=\"");
                escape_attr(&href, &mut self.out);
                self.out.push_str("\">");
                self.text(payload);
                self.out.push_str("</a>");
            }
            TokenKind::HardBreak { .. } => self.out.push_str("<br />\n"),
            TokenKind::SoftBreak => self.out.push('\n'),
            TokenKind::CharacterReference { resolved, .. } => self.text(resolved),
            TokenKind::BackslashEscape { escaped_char } => self.text(&escaped_char.to_string()),
        }
    }
}

fn heading_close(level: u8) -> &'static str {
    match level {
        1 => "</h1>",
        2 => "</h2>",
        3 => "</h3>",
        4 => "</h4>",
        5 => "</h5>",
        6 => "</h6>",
        _ => "</h6>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn render(src: &str) -> String {
        let parser = Parser::new(Default::default()).unwrap();
        let tokens = parser.parse(src);
        HtmlRenderer::render(&tokens)
    }

    #[test]
    fn renders_paragraph() {
        assert_eq!(render("hi\n"), "<p>hi</p>\n");
    }

    #[test]
    fn renders_heading() {
        assert_eq!(render("# Title\n"), "<h1>Title</h1>\n");
    }

    #[test]
    fn renders_emphasis_and_strong() {
        assert_eq!(render("a *b* **c**\n"), "<p>a <em>b</em> <strong>c</strong></p>\n");
    }

    #[test]
    fn escapes_angle_brackets_in_text() {
        assert_eq!(render("a < b\n"), "<p>a &lt; b</p>\n");
    }

    #[test]
    fn renders_fenced_code_with_language_class() {
        assert_eq!(render("```rust\nfn x() {}\n```\n"), "<pre><code class=\"language-rust\">fn x() {}\n</code></pre>\n");
    }
}
