//!
//! Container scanner: block-quote and list nesting. Walks the
//! currently open containers against the next line, decides which
//! continue, which close, and whether new containers start at the
//! residual position. The scanner never fails — ambiguity resolves via the precedence rules below, the
//! same way the leaf recognizer and inline pass resolve theirs.

use crate::block_stack::{BlockStack, BlockStackEntry, ListState};
use crate::config::ParserConfig;
use crate::line_source::{Line, effective_column};
use crate::token::{OrderedDelimiter, Token, TokenKind};

/// Result of scanning one line against the open container stack.
pub struct ContainerScanResult {
    pub tokens: Vec<Token>,
    pub residual: String,
    pub residual_column: usize,
    pub closed_paragraph: bool,
    /// True when the line satisfied containers only via lazy continuation
    /// of an open paragraph.
    pub is_lazy_continuation: bool,
}

/// A detected new-container start at the current scan position.
enum NewContainerStart {
    BlockQuote { consumed: usize },
    UnorderedList { marker_char: char, consumed_to_content: usize, ws_before: usize, ws_after: usize },
    OrderedList {
        digits: String,
        delimiter: OrderedDelimiter,
        consumed_to_content: usize,
        ws_before: usize,
        ws_after: usize,
    },
}

/// Whether `line_text` (residual, container prefix already stripped)
/// looks like a block-level interrupter that a lazy-continuation
/// paragraph must yield to.
pub fn is_block_interrupter(line_text: &str, in_list_context: bool, para_starts_with_digit_one: bool) -> bool {
    let trimmed = line_text.trim_start();
    if trimmed.is_empty() {
        return true; // blank line
    }
    if is_thematic_break_candidate(trimmed) && !is_setext_underline(trimmed) {
        return true;
    }
    if is_atx_heading_candidate(trimmed) {
        return true;
    }
    if is_fence_start_candidate(trimmed) {
        return true;
    }
    if trimmed.starts_with('<') && crate::leaf::html_block_mode(trimmed, true).is_some() {
        return true;
    }
    if in_list_context {
        return false;
    }
    if let Some(start) = detect_new_container(trimmed, 0) {
        match start {
            NewContainerStart::BlockQuote { .. } => return true,
            NewContainerStart::UnorderedList { .. } => return true,
            NewContainerStart::OrderedList { digits, .. } => {
                return digits == "1" && para_starts_with_digit_one.then_some(()).is_none() || digits == "1";
            }
        }
    }
    false
}

pub(crate) fn is_thematic_break_candidate(s: &str) -> bool {
    let s = s.trim_end();
    if s.is_empty() {
        return false;
    }
    let markers = ['-', '_', '*'];
    for marker in markers {
        let mut count = 0;
        let mut ok = true;
        for ch in s.chars() {
            if ch == marker {
                count += 1;
            } else if ch == ' ' || ch == '\t' {
                continue;
            } else {
                ok = false;
                break;
            }
        }
        if ok && count >= 3 {
            return true;
        }
    }
    false
}

fn is_setext_underline(s: &str) -> bool {
    let s = s.trim_end();
    !s.is_empty() && (s.chars().all(|c| c == '=') || s.chars().all(|c| c == '-'))
}

pub(crate) fn is_atx_heading_candidate(s: &str) -> bool {
    let hashes = s.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return false;
    }
    s.chars().nth(hashes).is_none_or(|c| c == ' ' || c == '\t')
}

pub(crate) fn is_fence_start_candidate(s: &str) -> bool {
    let fence_char = s.chars().next();
    matches!(fence_char, Some('`') | Some('~'))
        && s.chars().take_while(|&c| Some(c) == fence_char).count() >= 3
}

/// Attempts to find a new container start at `text[from..]`. Returns the
/// variant plus how many bytes of `text` (from `from`) the marker and its
/// trailing whitespace consume.
fn detect_new_container(text: &str, from: usize) -> Option<NewContainerStart> {
    let rest = &text[from..];
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;
    match first {
        '>' => {
            let mut consumed = 1;
            if let Some((i, c)) = rest[1..].char_indices().next() {
                if c == ' ' || c == '\t' {
                    consumed = 1 + i + c.len_utf8();
                }
            }
            Some(NewContainerStart::BlockQuote { consumed })
        }
        '-' | '+' | '*' => {
            if is_thematic_break_candidate(rest) {
                return None;
            }
            let after = rest[first.len_utf8()..].chars().next();
            if after.is_none() || after == Some(' ') || after == Some('\t') {
                let ws_after = rest[first.len_utf8()..].chars().take_while(|&c| c == ' ' || c == '\t').count();
                Some(NewContainerStart::UnorderedList {
                    marker_char: first,
                    consumed_to_content: first.len_utf8() + ws_after,
                    ws_before: 0,
                    ws_after,
                })
            } else {
                None
            }
        }
        c if c.is_ascii_digit() => {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).take(9).collect();
            let after_digits = &rest[digits.len()..];
            let delim_char = after_digits.chars().next()?;
            let delimiter = match delim_char {
                '.' => OrderedDelimiter::Period,
                ')' => OrderedDelimiter::Paren,
                _ => return None,
            };
            let after_delim = &after_digits[delim_char.len_utf8()..];
            let next = after_delim.chars().next();
            if next.is_some() && next != Some(' ') && next != Some('\t') {
                return None;
            }
            let ws_after = after_delim.chars().take_while(|&c| c == ' ' || c == '\t').count();
            let digits_len = digits.len();
            Some(NewContainerStart::OrderedList {
                digits,
                delimiter,
                consumed_to_content: digits_len + 1 + ws_after,
                ws_before: 0,
                ws_after,
            })
        }
        _ => None,
    }
}

/// Whether a freshly detected marker at the residual position continues
/// the currently open list (same marker character for a bullet list, same
/// delimiter for an ordered list) rather than starting an unrelated one.
fn list_marker_matches(start: &NewContainerStart, list_state: &ListState) -> bool {
    match start {
        NewContainerStart::UnorderedList { marker_char, .. } => !list_state.ordered && *marker_char == list_state.marker_char,
        NewContainerStart::OrderedList { delimiter, .. } => list_state.ordered && Some(*delimiter) == list_state.ordered_delimiter,
        NewContainerStart::BlockQuote { .. } => false,
    }
}

/// Scans one line against `stack`, emitting container tokens into `tokens`
/// (appended to the shared arena at indices starting from
/// `tokens.len()`), and returns the residual text the leaf recognizer
/// should see.
pub fn scan_line(stack: &mut BlockStack, tokens: &mut Vec<Token>, line: &Line, config: &ParserConfig) -> ContainerScanResult {
    let mut emitted = Vec::new();
    let mut column = 1usize;
    let mut effective_col = 0usize;
    let mut cursor = line.raw.clone();
    let mut is_lazy = false;
    let blank = line.is_blank();

    // Step 1: walk the existing stack from the bottom, skipping Document.
    let mut frame_idx = 1;
    let mut closed_frames: Vec<usize> = Vec::new();
    let mut new_item: Option<(usize, NewContainerStart, usize)> = None;
    while frame_idx < stack.frames().len() {
        let frame = &stack.frames()[frame_idx];
        match &frame.entry {
            BlockStackEntry::BlockQuote => {
                let trimmed_start = cursor.len() - cursor.trim_start_matches(' ').len();
                let leading_spaces = cursor[..trimmed_start.min(3.max(trimmed_start))]
                    .chars()
                    .take(3)
                    .take_while(|&c| c == ' ')
                    .count();
                let after_spaces = &cursor[leading_spaces..];
                if after_spaces.starts_with('>') && leading_spaces <= 3 {
                    let mut consumed = leading_spaces + 1;
                    let after_marker = &cursor[consumed..];
                    if after_marker.starts_with(' ') {
                        consumed += 1;
                    } else if after_marker.starts_with('\t') {
                        consumed += 1;
                    }
                    if let Some(idx) = frame.open_token_index {
                        if let TokenKind::BlockQuoteOpen { leading_spaces_per_line } = &mut tokens[idx].kind {
                            leading_spaces_per_line.push(cursor[..consumed].to_string());
                        }
                    }
                    cursor = cursor[consumed..].to_string();
                    column += consumed;
                    effective_col = effective_column(&line.raw[..line.raw.len() - cursor.len()], 0, config.tab_width);
                    frame_idx += 1;
                    continue;
                } else if blank {
                    frame_idx += 1;
                    continue;
                } else {
                    // Block quote not continued on this line: try lazy
                    // continuation of an open paragraph before closing it.
                    if can_lazy_continue(stack, &cursor) {
                        is_lazy = true;
                        break;
                    }
                    closed_frames.push(frame_idx);
                    break;
                }
            }
            BlockStackEntry::List(list_state) => {
                let line_effective_indent = leading_ws_effective_columns(&cursor, effective_col, config.tab_width);
                if blank {
                    frame_idx += 1;
                    continue;
                }
                if effective_col + line_effective_indent >= list_state.indent_level {
                    // `indent_level` is an absolute column, so only the
                    // remaining distance from `effective_col` is consumed
                    // here. When that distance splits a tab mid-stop, the
                    // consumed prefix is notionally replaced by spaces and
                    // the leftover spaces become part of the new cursor —
                    // take the returned remainder rather than re-slicing
                    // the original line, which would cut into real marker
                    // text on the other side of the tab.
                    let columns_to_consume = list_state.indent_level.saturating_sub(effective_col);
                    let (consumed_raw, remainder) =
                        crate::line_source::consume_effective_columns(&cursor, effective_col, columns_to_consume, config.tab_width);
                    column += consumed_raw.len();
                    cursor = remainder;
                    effective_col = list_state.indent_level.max(effective_col);
                    frame_idx += 1;
                    continue;
                } else {
                    let leading_spaces = cursor.chars().take_while(|&c| c == ' ').count();
                    if leading_spaces <= 3 {
                        let probe = &cursor[leading_spaces..];
                        if let Some(start) = detect_new_container(probe, 0) {
                            if list_marker_matches(&start, list_state) {
                                new_item = Some((frame_idx, start, leading_spaces));
                                break;
                            }
                        }
                    }
                    if can_lazy_continue(stack, &cursor) {
                        is_lazy = true;
                        break;
                    }
                    closed_frames.push(frame_idx);
                    break;
                }
            }
            _ => {
                frame_idx += 1;
            }
        }
    }

    // Close containers that failed to continue (deepest first).
    for &idx in closed_frames.iter() {
        let _ = idx;
    }
    if !closed_frames.is_empty() && !is_lazy {
        let truncate_at = closed_frames[0];
        let removed = stack.truncate_to(truncate_at);
        for frame in removed.into_iter().rev() {
            let tok = match frame.entry {
                BlockStackEntry::BlockQuote => Some(TokenKind::BlockQuoteClose),
                BlockStackEntry::List(_) => Some(TokenKind::ListClose),
                BlockStackEntry::Paragraph | BlockStackEntry::SetextCandidate => Some(TokenKind::ParagraphClose { was_forced: false }),
                BlockStackEntry::IndentedCodeBlock => Some(TokenKind::IndentedCodeBlockClose),
                BlockStackEntry::FencedCodeBlock(_) => Some(TokenKind::FencedCodeBlockClose { was_forced: true, extracted_whitespace: String::new() }),
                BlockStackEntry::HtmlBlock(_) => Some(TokenKind::HtmlBlockClose),
                BlockStackEntry::LinkDefinitionInProgress | BlockStackEntry::Document => None,
            };
            if let Some(tok) = tok {
                emitted.push(Token::new(line.line_number, column, effective_col, tok));
            }
        }
    }

    let closed_paragraph = false;

    // A marker for the next item of the currently open list: close
    // whatever was open inside the previous item (nested containers, the
    // item's leaf block) without closing the list itself, then re-point
    // the list frame at the new item's own indentation.
    if let Some((list_frame_idx, start, leading_spaces)) = new_item {
        let removed = stack.truncate_to(list_frame_idx + 1);
        for frame in removed.into_iter().rev() {
            let tok = match frame.entry {
                BlockStackEntry::BlockQuote => Some(TokenKind::BlockQuoteClose),
                BlockStackEntry::List(_) => Some(TokenKind::ListClose),
                BlockStackEntry::Paragraph | BlockStackEntry::SetextCandidate => Some(TokenKind::ParagraphClose { was_forced: false }),
                BlockStackEntry::IndentedCodeBlock => Some(TokenKind::IndentedCodeBlockClose),
                BlockStackEntry::FencedCodeBlock(_) => Some(TokenKind::FencedCodeBlockClose { was_forced: true, extracted_whitespace: String::new() }),
                BlockStackEntry::HtmlBlock(_) => Some(TokenKind::HtmlBlockClose),
                BlockStackEntry::LinkDefinitionInProgress | BlockStackEntry::Document => None,
            };
            if let Some(tok) = tok {
                emitted.push(Token::new(line.line_number, column, effective_col, tok));
            }
        }

        let (total_consumed, ws_after, marker_text) = match start {
            NewContainerStart::UnorderedList { marker_char, consumed_to_content, ws_after, .. } => {
                (leading_spaces + consumed_to_content, ws_after, marker_char.to_string())
            }
            NewContainerStart::OrderedList { digits, delimiter, consumed_to_content, ws_after, .. } => {
                (leading_spaces + consumed_to_content, ws_after, format!("{digits}{}", delimiter.as_char()))
            }
            NewContainerStart::BlockQuote { .. } => unreachable!("list_marker_matches rejects block quotes"),
        };
        let total_consumed = total_consumed.min(cursor.len());
        let base = effective_col + leading_spaces;
        let indent_level = base + marker_text.len() + ws_after.clamp(1, 4).max(1);
        let indent_level = if ws_after == 0 { base + marker_text.len() + 1 } else { indent_level.min(base + marker_text.len() + ws_after) };
        let list_start_content = cursor[..total_consumed].to_string();
        let extracted_whitespace = " ".repeat(ws_after);

        if let BlockStackEntry::List(list_state) = &mut stack.top_mut().entry {
            list_state.indent_level = indent_level;
            list_state.ws_before_marker = leading_spaces;
            list_state.ws_after_marker = ws_after;
            list_state.blank_run = 0;
        }
        emitted.push(Token::new(
            line.line_number,
            column,
            effective_col,
            TokenKind::ListItemContinuation { indent_level, extracted_whitespace, list_start_content },
        ));
        cursor = cursor[total_consumed..].to_string();
        column += total_consumed;
        effective_col = indent_level.max(effective_col);
    }

    // Step 3: scan for new container starts at the residual position,
    // bounded by the configured depth guardrail.
    if !is_lazy {
        let mut opened_any = true;
        while opened_any && stack.container_depth() < config.max_container_depth {
            opened_any = false;
            let leading_spaces = cursor.chars().take_while(|&c| c == ' ').count();
            if leading_spaces > 3 {
                break;
            }
            let probe = &cursor[leading_spaces..];
            if let Some(start) = detect_new_container(probe, 0) {
                match start {
                    NewContainerStart::BlockQuote { consumed } => {
                        let total_consumed = leading_spaces + consumed;
                        let open_idx = tokens.len() + emitted.len();
                        emitted.push(Token::new(
                            line.line_number,
                            column,
                            effective_col,
                            TokenKind::BlockQuoteOpen { leading_spaces_per_line: vec![cursor[..total_consumed].to_string()] },
                        ));
                        stack.push(BlockStackEntry::BlockQuote, Some(open_idx));
                        cursor = cursor[total_consumed..].to_string();
                        column += total_consumed;
                        effective_col += total_consumed;
                        opened_any = true;
                    }
                    NewContainerStart::UnorderedList { marker_char, consumed_to_content, ws_after, .. } => {
                        if blank && ws_after == consumed_to_content - 1 && probe.trim().len() == 1 {
                            break; // an empty list item with nothing but the marker; still valid, handled below.
                        }
                        let base = effective_col + leading_spaces;
                        let indent_level = base + 1 + ws_after.clamp(1, 4).max(1);
                        let indent_level = if ws_after == 0 { base + 2 } else { indent_level.min(base + 1 + ws_after) };
                        let open_idx = tokens.len() + emitted.len();
                        emitted.push(Token::new(
                            line.line_number,
                            column,
                            effective_col,
                            TokenKind::UnorderedListOpen {
                                marker_char,
                                indent_level,
                                ws_before_marker: leading_spaces,
                                ws_after_marker: ws_after,
                                start_index: 0,
                            },
                        ));
                        stack.push(
                            BlockStackEntry::List(ListState {
                                ordered: false,
                                marker_char,
                                ordered_delimiter: None,
                                indent_level,
                                ws_before_marker: leading_spaces,
                                ws_after_marker: ws_after,
                                start_index: 0,
                                container_indent: effective_col,
                                blank_run: 0,
                            }),
                            Some(open_idx),
                        );
                        let total_consumed = (leading_spaces + consumed_to_content).min(cursor.len());
                        cursor = cursor[total_consumed..].to_string();
                        column += total_consumed;
                        effective_col = indent_level.max(effective_col);
                        opened_any = true;
                    }
                    NewContainerStart::OrderedList { digits, delimiter, consumed_to_content, ws_after, .. } => {
                        let marker_width = digits.len() + 1;
                        let base = effective_col + leading_spaces;
                        let indent_level = base + marker_width + ws_after.clamp(1, 4).max(1);
                        let indent_level = if ws_after == 0 { base + marker_width + 1 } else { indent_level.min(base + marker_width + ws_after) };
                        let open_idx = tokens.len() + emitted.len();
                        emitted.push(Token::new(
                            line.line_number,
                            column,
                            effective_col,
                            TokenKind::OrderedListOpen {
                                list_start_digits: digits.clone(),
                                marker_char: delimiter,
                                indent_level,
                                ws_before_marker: leading_spaces,
                                ws_after_marker: ws_after,
                                start_index: digits.parse().unwrap_or(0),
                            },
                        ));
                        stack.push(
                            BlockStackEntry::List(ListState {
                                ordered: true,
                                marker_char: delimiter.as_char(),
                                ordered_delimiter: Some(delimiter),
                                indent_level,
                                ws_before_marker: leading_spaces,
                                ws_after_marker: ws_after,
                                start_index: digits.parse().unwrap_or(0),
                                container_indent: effective_col,
                                blank_run: 0,
                            }),
                            Some(open_idx),
                        );
                        let total_consumed = (leading_spaces + consumed_to_content).min(cursor.len());
                        cursor = cursor[total_consumed..].to_string();
                        column += total_consumed;
                        effective_col = indent_level.max(effective_col);
                        opened_any = true;
                    }
                }
            }
        }
    }

    ContainerScanResult {
        tokens: emitted,
        residual: cursor,
        residual_column: column,
        closed_paragraph,
        is_lazy_continuation: is_lazy,
    }
}

fn leading_ws_effective_columns(s: &str, start_col: usize, tab_width: usize) -> usize {
    let ws: String = s.chars().take_while(|&c| c == ' ' || c == '\t').collect();
    effective_column(&ws, start_col, tab_width) - start_col
}

fn can_lazy_continue(stack: &BlockStack, residual: &str) -> bool {
    let Some(leaf) = stack.open_leaf() else { return false };
    if !matches!(leaf.entry, BlockStackEntry::Paragraph) {
        return false;
    }
    !is_block_interrupter(residual, false, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<&'static str> {
        let parser = Parser::new(Default::default()).unwrap();
        parser.parse(src).iter().map(|t| t.kind.kind_name()).collect()
    }

    #[test]
    fn second_item_continues_the_open_list_instead_of_starting_a_new_one() {
        let k = kinds("- one\n- two\n");
        assert_eq!(
            k,
            vec!["ulist", "para", "text", "end-para", "li", "para", "text", "end-para", "end-list"]
        );
    }

    #[test]
    fn differing_bullet_character_starts_a_new_list() {
        let k = kinds("- one\n* two\n");
        let list_opens = k.iter().filter(|&&kind| kind == "ulist").count();
        assert_eq!(list_opens, 2);
        assert!(!k.contains(&"li"));
    }

    #[test]
    fn thematic_break_detects_dash_runs() {
        assert!(is_thematic_break_candidate("---"));
        assert!(is_thematic_break_candidate("- - -"));
        assert!(!is_thematic_break_candidate("--"));
    }

    #[test]
    fn atx_heading_candidate_requires_space_or_end_after_hashes() {
        assert!(is_atx_heading_candidate("## foo"));
        assert!(!is_atx_heading_candidate("##foo"));
    }
}
