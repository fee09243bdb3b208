//!
//! The parser façade: wires the line source, container scanner,
//! leaf recognizer, coalescer, and inline pass into the single pipeline
//! `parse(source) -> Vec<Token>`. This is the `LintContext`-equivalent
//! entry point — everything downstream (a rule engine, an HTML renderer)
//! consumes its output, never the intermediate passes directly.

use crate::block_stack::{BlockStack, BlockStackEntry, FencedState};
use crate::coalescer::coalesce;
use crate::config::ParserConfig;
use crate::container::{is_block_interrupter, scan_line};
use crate::entities::EntityTable;
use crate::error::ParserInitError;
use crate::extensions::ExtensionRegistry;
use crate::inline::run_inline_pass;
use crate::leaf;
use crate::line_source::{Line, LineSource};
use crate::token::{Token, TokenKind};

/// A constructed parser instance. The only process-wide shared state is
/// the entity table; everything else here is owned by this instance and
/// touched only during `parse`.
pub struct Parser {
    config: ParserConfig,
    entities: EntityTable,
    extensions: ExtensionRegistry,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Result<Self, ParserInitError> {
        Ok(Self { config, entities: EntityTable::load()?, extensions: ExtensionRegistry::new() })
    }

    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    /// Parses `source` into an ordered token stream. Pure function: same
    /// input always produces the same output.
    pub fn parse(&self, source: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut stack = BlockStack::new();
        let mut line_source = LineSource::new(source, &self.config);
        // `IndexMap` so a future "list unresolved definitions in source
        // order" diagnostic doesn't need a second pass to recover order.
        let mut label_defs: indexmap::IndexMap<String, (String, Option<String>)> = indexmap::IndexMap::new();

        while let Some(line) = line_source.next_line() {
            log::trace!("processing line {}", line.line_number);
            if let Some((ext_tokens, _consumed)) = self.extensions.try_block_start(&stack, &line) {
                tokens.extend(ext_tokens);
                continue;
            }

            let scan = scan_line(&mut stack, &mut tokens, &line, &self.config);
            let residual = scan.residual;
            let residual_column = scan.residual_column;
            tokens.extend(scan.tokens);

            self.process_residual(&mut stack, &mut tokens, &mut line_source, &line, &residual, residual_column, &mut label_defs);
        }

        let last_line = line_source.total_lines().max(1);
        let closing = leaf::force_close_all(&mut stack, last_line, 1, 0);
        tokens.extend(closing);

        let coalesced = coalesce(tokens);
        self.run_inline_on_text_blocks(coalesced)
    }

    fn process_residual(
        &self,
        stack: &mut BlockStack,
        tokens: &mut Vec<Token>,
        line_source: &mut LineSource,
        line: &Line,
        residual: &str,
        column: usize,
        label_defs: &mut indexmap::IndexMap<String, (String, Option<String>)>,
    ) {
        let indent = column.saturating_sub(1);
        let blank = residual.trim().is_empty();

        // Continue an already-open non-paragraph leaf first.
        match &stack.top().entry {
            BlockStackEntry::FencedCodeBlock(fence) => {
                let fence = fence.clone();
                if leaf::parse_fence_close(residual, fence.fence_char, fence.fence_count) {
                    stack.pop();
                    tokens.push(Token::new(line.line_number, column, indent, TokenKind::FencedCodeBlockClose { was_forced: false, extracted_whitespace: String::new() }));
                } else {
                    let stripped = strip_n_spaces(residual, fence.leading_spaces);
                    tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: stripped, extracted_whitespace: String::new(), tabified_text: None }));
                }
                return;
            }
            BlockStackEntry::IndentedCodeBlock => {
                if blank {
                    tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: String::new(), extracted_whitespace: String::new(), tabified_text: None }));
                    return;
                }
                if let Some((ws, text)) = leaf::indented_code_strip(residual, indent, &self.config) {
                    // `tabified_text` keeps the original indentation (tab or
                    // space) for round-tripping; `payload`/`extracted_whitespace`
                    // carry the dedented, tab-expanded view for consumers that
                    // don't care about the original byte form.
                    tokens.push(Token::new(
                        line.line_number,
                        column,
                        indent,
                        TokenKind::Text { payload: text, extracted_whitespace: ws, tabified_text: Some(residual.to_string()) },
                    ));
                    return;
                } else {
                    stack.pop();
                    tokens.push(Token::new(line.line_number, column, indent, TokenKind::IndentedCodeBlockClose));
                    // fall through to re-evaluate residual as a new block below.
                }
            }
            BlockStackEntry::HtmlBlock(mode) => {
                let mode = *mode;
                let closes = leaf::html_block_mode(residual, mode == 7).is_none() && leaf_html_block_closes(mode, residual);
                tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: residual.to_string(), extracted_whitespace: String::new(), tabified_text: None }));
                if closes {
                    stack.pop();
                    tokens.push(Token::new(line.line_number, column, indent, TokenKind::HtmlBlockClose));
                }
                return;
            }
            _ => {}
        }

        if blank {
            let ws = residual.to_string();
            let emitted = leaf::handle_blank_line(stack, tokens, line, column, indent, &ws);
            tokens.extend(emitted);
            return;
        }

        // Setext conversion: an open paragraph followed by a `=`/`-`
        // underline (≤3 leading spaces, nothing else) becomes a setext
        // heading. The paragraph never closes on its own in this case —
        // its `ParagraphOpen` token is rewritten in place into the
        // heading's open so every open still has exactly one close.
        if matches!(stack.top().entry, BlockStackEntry::Paragraph) {
            if let Some((marker, _rest, _ws)) = try_setext_underline(residual) {
                let count = residual.trim().len();
                let level = if marker == '=' { 1 } else { 2 };
                let open_idx = stack.top().open_token_index;
                stack.pop();
                let original_para_ws = open_idx
                    .and_then(|idx| match &tokens[idx].kind {
                        TokenKind::ParagraphOpen { extracted_whitespace_per_line } => Some(extracted_whitespace_per_line.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                let heading_open = TokenKind::SetextHeadingOpen { level, underline_char: marker, underline_count: count, original_para_ws };
                match open_idx {
                    Some(idx) => tokens[idx].kind = heading_open,
                    None => tokens.push(Token::new(line.line_number, column, indent, heading_open)),
                }
                tokens.push(Token::new(line.line_number, column, indent, TokenKind::SetextHeadingClose { was_forced: false }));
                return;
            }
        }

        // Block-level interrupters close an open paragraph before being
        // considered as new leaves.
        if matches!(stack.top().entry, BlockStackEntry::Paragraph)
            && is_block_interrupter(residual, stack.container_depth() > 0 && matches!(stack.top().entry, BlockStackEntry::List(_)), false)
        {
            stack.pop();
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::ParagraphClose { was_forced: false }));
        } else if matches!(stack.top().entry, BlockStackEntry::Paragraph) {
            // Plain continuation line: append text and return.
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: residual.to_string(), extracted_whitespace: String::new(), tabified_text: None }));
            return;
        }

        if let Some(parts) = leaf::parse_atx_heading(residual) {
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::AtxHeadingOpen { level: parts.level, hash_count: parts.hash_count, removed_trailing_count: parts.removed_trailing_count, extracted_whitespace: parts.extracted_whitespace }));
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: parts.text, extracted_whitespace: String::new(), tabified_text: None }));
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::AtxHeadingClose));
            return;
        }

        if let Some((marker, rest, ws)) = leaf::parse_thematic_break(residual) {
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::ThematicBreak { marker_char: marker, rest_of_line: rest, extracted_whitespace: ws }));
            return;
        }

        if let Some((fence_char, fence_count, info, ws, ws_before_info)) = leaf::parse_fence_start(residual) {
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::FencedCodeBlockOpen { fence_char, fence_count, info_string: info, extracted_whitespace: ws.clone(), whitespace_before_info: ws_before_info }));
            stack.push(BlockStackEntry::FencedCodeBlock(FencedState { fence_char, fence_count, leading_spaces: ws.len() }), Some(tokens.len() - 1));
            return;
        }

        if let Some(mode) = leaf::html_block_mode(residual, true) {
            let open_idx = tokens.len();
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::HtmlBlockOpen { mode }));
            if leaf_html_block_closes(mode, residual) {
                tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: residual.to_string(), extracted_whitespace: String::new(), tabified_text: None }));
                tokens.push(Token::new(line.line_number, column, indent, TokenKind::HtmlBlockClose));
            } else {
                stack.push(BlockStackEntry::HtmlBlock(mode), Some(open_idx));
                tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: residual.to_string(), extracted_whitespace: String::new(), tabified_text: None }));
            }
            return;
        }

        if !matches!(stack.top().entry, BlockStackEntry::Paragraph) {
            if let Some((ws, text)) = leaf::indented_code_strip(residual, indent, &self.config) {
                tokens.push(Token::new(line.line_number, column, indent, TokenKind::IndentedCodeBlockOpen { extracted_whitespace: ws.clone(), first_line_indent: ws.len() }));
                stack.push(BlockStackEntry::IndentedCodeBlock, Some(tokens.len() - 1));
                tokens.push(Token::new(
                    line.line_number,
                    column,
                    indent,
                    TokenKind::Text { payload: text, extracted_whitespace: ws, tabified_text: Some(residual.to_string()) },
                ));
                return;
            }
        }

        if let Some((label, after)) = leaf::try_parse_lrd_start(residual) {
            let checkpoint = line_source.checkpoint();
            if let Some((destination, title, consumed_extra_lines)) = try_complete_lrd(after, line_source) {
                let normalized = leaf::normalize_label(&label);
                if !label_defs.contains_key(&normalized) {
                    label_defs.insert(normalized.clone(), (destination.clone(), title.clone()));
                    tokens.push(Token::new(
                        line.line_number,
                        column,
                        indent,
                        TokenKind::LinkReferenceDefinition {
                            label: label.clone(),
                            destination,
                            title,
                            normalized_label: normalized,
                            extracted_whitespace_segments: vec![],
                        },
                    ));
                    let _ = consumed_extra_lines;
                    return;
                }
            }
            log::debug!("LRD attempt at line {} failed; restoring checkpoint and treating as paragraph", line.line_number);
            line_source.restore(checkpoint);
        }

        // Default: open (or continue) a paragraph.
        if !matches!(stack.top().entry, BlockStackEntry::Paragraph) {
            tokens.push(Token::new(line.line_number, column, indent, TokenKind::ParagraphOpen { extracted_whitespace_per_line: vec![] }));
            stack.push(BlockStackEntry::Paragraph, Some(tokens.len() - 1));
        }
        tokens.push(Token::new(line.line_number, column, indent, TokenKind::Text { payload: residual.to_string(), extracted_whitespace: String::new(), tabified_text: None }));
    }

    fn run_inline_on_text_blocks(&self, tokens: Vec<Token>) -> Vec<Token> {
        run_inline_pass(tokens, &self.entities, &self.extensions)
    }
}

fn strip_n_spaces(s: &str, n: usize) -> String {
    let leading = s.chars().take_while(|&c| c == ' ').count().min(n);
    s[leading..].to_string()
}

fn leaf_html_block_closes(mode: u8, text: &str) -> bool {
    match mode {
        1 => {
            let lower = text.to_ascii_lowercase();
            lower.contains("</script>") || lower.contains("</pre>") || lower.contains("</style>") || lower.contains("</textarea>")
        }
        2 => text.contains("-->"),
        3 => text.contains("?>"),
        4 => text.contains('>'),
        5 => text.contains("]]>"),
        6 | 7 => false,
        _ => false,
    }
}

fn try_setext_underline(residual: &str) -> Option<(char, String, String)> {
    let ws: String = residual.chars().take_while(|&c| c == ' ').collect();
    if ws.len() > 3 {
        return None;
    }
    let rest = residual[ws.len()..].trim_end();
    if rest.is_empty() {
        return None;
    }
    if rest.chars().all(|c| c == '=') {
        return Some(('=', rest.to_string(), ws));
    }
    if rest.chars().all(|c| c == '-') {
        return Some(('-', rest.to_string(), ws));
    }
    None
}

/// Attempts to complete a multi-line link reference definition starting
/// right after `[label]:`. Returns `(destination, title, extra_lines)` on
/// success. On failure the caller restores its checkpoint and reparses
/// the lines as a paragraph.
fn try_complete_lrd(after: &str, line_source: &mut LineSource) -> Option<(String, Option<String>, usize)> {
    let mut text = after.trim_start().to_string();
    let mut extra = 0;
    if text.is_empty() {
        let next = line_source.next_line()?;
        if next.is_blank() {
            return None;
        }
        text = next.raw.trim_start().to_string();
        extra += 1;
    }
    let (destination, rest) = parse_link_destination(&text)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Some((destination, None, extra));
    }
    let title = parse_link_title(rest)?;
    Some((destination, Some(title), extra))
}

fn parse_link_destination(text: &str) -> Option<(String, &str)> {
    if let Some(rest) = text.strip_prefix('<') {
        let end = rest.find('>')?;
        Some((rest[..end].to_string(), &rest[end + 1..]))
    } else {
        let end = text.find(char::is_whitespace).unwrap_or(text.len());
        if end == 0 {
            return None;
        }
        Some((text[..end].to_string(), &text[end..]))
    }
}

fn parse_link_title(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let quote = text.chars().next()?;
    let closing = match quote {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };
    let end = text[1..].find(closing)?;
    Some(text[1..1 + end].to_string())
}
