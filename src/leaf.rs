//!
//! Leaf block recognizer. Given the residual line text left
//! over after the container scanner, decides whether to continue the
//! currently open leaf, close it and open a new one, or force-close at
//! end of input. One leaf is open at a time;
//! opening a new one always closes the old one first.

use crate::block_stack::{BlockStack, BlockStackEntry};
use crate::config::ParserConfig;
use crate::container::{is_fence_start_candidate, is_thematic_break_candidate};
use crate::line_source::Line;
use crate::token::{Token, TokenKind};

const HTML_BLOCK_START_TAGS: &[&str] = &[
    "script", "pre", "style", "textarea",
];

const HTML_BLOCK_6_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center", "col",
    "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr",
    "html", "iframe", "legend", "li", "link", "main", "menu", "menuitem", "nav", "noframes", "ol",
    "optgroup", "option", "p", "param", "section", "summary", "table", "tbody", "td", "tfoot", "th",
    "thead", "title", "tr", "track", "ul",
];

/// Determines which of the seven CommonMark HTML-block modes (if any)
/// `text` opens. `allow_mode_7` gates mode 7 (arbitrary tag), which
/// cannot interrupt a paragraph.
pub fn html_block_mode(text: &str, allow_mode_7: bool) -> Option<u8> {
    let t = text.trim_start();
    if !t.starts_with('<') {
        return None;
    }
    let lower = t.to_ascii_lowercase();
    if HTML_BLOCK_START_TAGS.iter().any(|tag| {
        lower[1..].starts_with(tag)
            && lower[1 + tag.len()..].chars().next().is_none_or(|c| c == ' ' || c == '\t' || c == '>' || c == '\n')
    }) {
        return Some(1);
    }
    if t.starts_with("<!--") {
        return Some(2);
    }
    if t.starts_with("<?") {
        return Some(3);
    }
    if t.starts_with("<!") && t[2..].chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Some(4);
    }
    if t.starts_with("<![CDATA[") {
        return Some(5);
    }
    let (is_close, rest) = if let Some(r) = t.strip_prefix("</") { (true, r) } else { (false, &t[1..]) };
    let tag_name: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric() || *c == '-').collect();
    if !tag_name.is_empty() && HTML_BLOCK_6_TAGS.contains(&tag_name.to_ascii_lowercase().as_str()) {
        let after = &rest[tag_name.len()..];
        let after = after.trim_start();
        if after.is_empty() || after.starts_with('>') || after.starts_with("/>") || is_close {
            return Some(6);
        }
    }
    if allow_mode_7 && is_complete_tag_line(t) {
        return Some(7);
    }
    None
}

fn is_complete_tag_line(t: &str) -> bool {
    let t = t.trim_end();
    (t.starts_with('<') && t.ends_with('>')) && t.len() > 2
}

fn html_block_closes(mode: u8, text: &str) -> bool {
    match mode {
        1 => {
            let lower = text.to_ascii_lowercase();
            lower.contains("</script>") || lower.contains("</pre>") || lower.contains("</style>") || lower.contains("</textarea>")
        }
        2 => text.contains("-->"),
        3 => text.contains("?>"),
        4 => text.contains('>'),
        5 => text.contains("]]>"),
        6 | 7 => text.trim().is_empty(),
        _ => false,
    }
}

/// ATX heading parse result: level, hash count, trailing-hash count
/// removed, leading whitespace, and the inner text.
pub struct AtxParts {
    pub level: u8,
    pub hash_count: u8,
    pub removed_trailing_count: usize,
    pub extracted_whitespace: String,
    pub text: String,
}

pub fn parse_atx_heading(residual: &str) -> Option<AtxParts> {
    let leading_ws: String = residual.chars().take_while(|&c| c == ' ').collect();
    if leading_ws.len() > 3 {
        return None;
    }
    let rest = &residual[leading_ws.len()..];
    let hashes = rest.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let after_hashes = &rest[hashes..];
    if !after_hashes.is_empty() && !after_hashes.starts_with(' ') && !after_hashes.starts_with('\t') {
        return None;
    }
    let mut text = after_hashes.trim_start_matches([' ', '\t']).trim_end().to_string();
    let mut removed_trailing_count = 0;
    if !text.is_empty() {
        let trailing_hashes = text.chars().rev().take_while(|&c| c == '#').count();
        if trailing_hashes > 0 {
            let before_hashes = &text[..text.len() - trailing_hashes];
            if before_hashes.is_empty() || before_hashes.ends_with(' ') || before_hashes.ends_with('\t') {
                removed_trailing_count = trailing_hashes;
                text = before_hashes.trim_end().to_string();
            }
        }
    }
    Some(AtxParts { level: hashes as u8, hash_count: hashes as u8, removed_trailing_count, extracted_whitespace: leading_ws, text })
}

pub fn parse_thematic_break(residual: &str) -> Option<(char, String, String)> {
    let leading_ws: String = residual.chars().take_while(|&c| c == ' ').collect();
    if leading_ws.len() > 3 {
        return None;
    }
    let rest = &residual[leading_ws.len()..];
    if !is_thematic_break_candidate(rest) {
        return None;
    }
    let marker = rest.chars().find(|c| matches!(c, '-' | '_' | '*'))?;
    Some((marker, rest.trim_end().to_string(), leading_ws))
}

pub fn parse_fence_start(residual: &str) -> Option<(char, usize, String, String, String)> {
    let leading_ws: String = residual.chars().take_while(|&c| c == ' ').collect();
    if leading_ws.len() > 3 {
        return None;
    }
    let rest = &residual[leading_ws.len()..];
    if !is_fence_start_candidate(rest) {
        return None;
    }
    let fence_char = rest.chars().next().unwrap();
    let fence_count = rest.chars().take_while(|&c| c == fence_char).count();
    let after_fence = &rest[fence_count..];
    if fence_char == '`' && after_fence.contains('`') {
        return None;
    }
    let ws_before_info: String = after_fence.chars().take_while(|&c| c == ' ' || c == '\t').count().pipe(|n| after_fence[..n].to_string());
    let info = after_fence.trim().to_string();
    Some((fence_char, fence_count, info, leading_ws, ws_before_info))
}

trait Pipe: Sized {
    fn pipe<R>(self, f: impl FnOnce(Self) -> R) -> R {
        f(self)
    }
}
impl<T> Pipe for T {}

pub fn parse_fence_close(residual: &str, fence_char: char, fence_count: usize) -> bool {
    let leading_ws = residual.chars().take_while(|&c| c == ' ').count();
    if leading_ws > 3 {
        return false;
    }
    let rest = &residual[leading_ws..];
    let count = rest.chars().take_while(|&c| c == fence_char).count();
    count >= fence_count && rest[count..].trim().is_empty()
}

/// An indented code block requires four effective columns of leading
/// whitespace from the container edge, same as a list-item content
/// column; a tab counts by how far it actually advances from
/// `start_column`, not as four literal space characters.
pub fn indented_code_strip(residual: &str, start_column: usize, config: &ParserConfig) -> Option<(String, String)> {
    let leading_ws: String = residual.chars().take_while(|&c| c == ' ' || c == '\t').collect();
    let leading_width = crate::line_source::effective_column(&leading_ws, start_column, config.tab_width) - start_column;
    if leading_width < config.tab_width {
        return None;
    }
    Some(crate::line_source::consume_effective_columns(residual, start_column, config.tab_width, config.tab_width))
}

pub fn try_parse_lrd_start(residual: &str) -> Option<(String, &str)> {
    let ws: String = residual.chars().take_while(|&c| c == ' ').collect();
    if ws.len() > 3 {
        return None;
    }
    let rest = &residual[ws.len()..];
    if !rest.starts_with('[') {
        return None;
    }
    let close = rest.find("]:")?;
    let label = &rest[1..close];
    if label.trim().is_empty() {
        return None;
    }
    Some((label.to_string(), &rest[close + 2..]))
}

pub fn normalize_label(label: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.nfc().collect::<String>().to_lowercase()
}

/// The outcome of recognizing one residual line against the current leaf
/// state.
pub struct LeafScanResult {
    pub tokens: Vec<Token>,
}

/// Emits a blank-line token, closing a paragraph if one is open but
/// leaving code/HTML/LRD blocks interior.
pub fn handle_blank_line(stack: &mut BlockStack, tokens: &mut Vec<Token>, line: &Line, column: usize, indent: usize, ws: &str) -> Vec<Token> {
    let mut emitted = Vec::new();
    if matches!(stack.top().entry, BlockStackEntry::Paragraph) {
        stack.pop();
        emitted.push(Token::new(line.line_number, column, indent, TokenKind::ParagraphClose { was_forced: false }));
    }
    let _ = tokens;
    emitted.push(Token::new(line.line_number, column, indent, TokenKind::BlankLine { extracted_whitespace: ws.to_string() }));
    emitted
}

pub fn force_close_all(stack: &mut BlockStack, line_number: usize, column: usize, indent: usize) -> Vec<Token> {
    let mut emitted = Vec::new();
    let removed = stack.truncate_to(1);
    for frame in removed.into_iter().rev() {
        let tok = match frame.entry {
            BlockStackEntry::BlockQuote => TokenKind::BlockQuoteClose,
            BlockStackEntry::List(_) => TokenKind::ListClose,
            BlockStackEntry::Paragraph => TokenKind::ParagraphClose { was_forced: true },
            BlockStackEntry::IndentedCodeBlock => TokenKind::IndentedCodeBlockClose,
            BlockStackEntry::FencedCodeBlock(_) => TokenKind::FencedCodeBlockClose { was_forced: true, extracted_whitespace: String::new() },
            BlockStackEntry::HtmlBlock(_) => TokenKind::HtmlBlockClose,
            BlockStackEntry::LinkDefinitionInProgress => continue,
            BlockStackEntry::SetextCandidate => TokenKind::ParagraphClose { was_forced: true },
            BlockStackEntry::Document => unreachable!("truncate_to(1) never removes the root Document frame"),
        };
        emitted.push(Token::new(line_number, column, indent, tok));
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx_strips_trailing_hashes() {
        let parts = parse_atx_heading("## Foo ##").unwrap();
        assert_eq!(parts.level, 2);
        assert_eq!(parts.text, "Foo");
        assert_eq!(parts.removed_trailing_count, 2);
    }

    #[test]
    fn atx_requires_space_after_hash() {
        assert!(parse_atx_heading("#foo").is_none());
    }

    #[test]
    fn thematic_break_detects_three_or_more() {
        assert!(parse_thematic_break("---").is_some());
        assert!(parse_thematic_break("- - -").is_some());
        assert!(parse_thematic_break("--").is_none());
    }

    #[test]
    fn fence_open_rejects_backtick_in_info_for_backtick_fence() {
        assert!(parse_fence_start("```ru`st").is_none());
        assert!(parse_fence_start("```rust").is_some());
    }

    #[test]
    fn html_block_mode_detects_script_as_mode_1() {
        assert_eq!(html_block_mode("<script>", true), Some(1));
    }

    #[test]
    fn html_block_mode_mode_7_requires_paragraph_allowance() {
        assert_eq!(html_block_mode("<span>", false), None);
    }

    #[test]
    fn lrd_start_requires_closing_bracket_colon() {
        assert!(try_parse_lrd_start("[foo]: /url").is_some());
        assert!(try_parse_lrd_start("[foo] /url").is_none());
    }

    #[test]
    fn normalize_label_folds_case_and_collapses_whitespace() {
        assert_eq!(normalize_label("  Foo   Bar  "), "foo bar");
    }

    #[test]
    fn indented_code_strip_treats_one_tab_as_four_columns() {
        let config = ParserConfig::default();
        let (ws, text) = indented_code_strip("\tcode", 0, &config).unwrap();
        assert_eq!(ws, "    ");
        assert_eq!(text, "code");
    }

    #[test]
    fn indented_code_strip_rejects_three_literal_spaces() {
        let config = ParserConfig::default();
        assert!(indented_code_strip("   code", 0, &config).is_none());
    }

    #[test]
    fn indented_code_strip_accounts_for_the_starting_column() {
        let config = ParserConfig::default();
        // Already two columns in (e.g. inside a two-space list prefix),
        // a two-space indent is enough to reach four effective columns.
        assert!(indented_code_strip("  code", 2, &config).is_some());
    }
}
