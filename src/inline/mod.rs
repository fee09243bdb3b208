//!
//! Inline pass. Runs over the coalesced text payload of each
//! paragraph, ATX heading, and setext heading, in phase order: code
//! spans, autolinks/raw HTML, backslash escapes, character references,
//! then emphasis/links via the delimiter stack, with soft/hard breaks
//! resolved as a final step. Code and HTML blocks are left untouched.

mod delimiters;

use crate::entities::EntityTable;
use crate::extensions::ExtensionRegistry;
use crate::token::{AutolinkKind, DelimiterChar, HardBreakKind, LinkKind, Token, TokenKind};
use delimiters::{DelimiterRun, DelimiterStack, RunKind, flanking, rule_of_three_allows};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    CodeSpan { run_count: usize, before_ws: String, after_ws: String, payload: String },
    RawHtml(String),
    Autolink { kind: AutolinkKind, payload: String },
    HardBreak(HardBreakKind),
    SoftBreak,
    CharRef { raw: String, resolved: String },
    Escape(char),
    /// Placeholder for a `*`/`_` run; resolved into Emphasis/Strong
    /// open/close pairs (or demoted to plain text) in `resolve_emphasis`.
    Run { ch: DelimiterChar, count: usize },
    /// Placeholder for `[`/`![`; resolved into Link/Image or demoted to
    /// plain text `[`/`![` in `resolve_links`.
    BracketOpen { is_image: bool },
    /// Already resolved during the scan (e.g. a completed link/image).
    Resolved(TokenKind),
    /// Marks the boundary consumed by a resolved link/image so its
    /// interior nodes are re-emitted as children rather than re-scanned.
    LinkInteriorStart,
    LinkInteriorEnd,
    /// A single source node that resolved into several output nodes
    /// (e.g. a `***` run that resolves to one strong-open plus one
    /// leftover literal `*`). `flatten` expands these in order.
    Multi(Vec<Node>),
}

struct Scanner<'a> {
    chars: Vec<char>,
    text: &'a str,
    /// Byte offset of each char in `text`, plus a trailing sentinel equal
    /// to `text.len()`; lets extension probes at a char position report
    /// consumption in bytes without re-deriving it every call.
    byte_offsets: Vec<usize>,
    pos: usize,
    entities: &'a EntityTable,
    label_defs: &'a IndexMap<String, (String, Option<String>)>,
    extensions: &'a ExtensionRegistry,
}

pub fn run_inline_pass(tokens: Vec<Token>, entities: &EntityTable, extensions: &ExtensionRegistry) -> Vec<Token> {
    let label_defs = collect_label_defs(&tokens);
    let mut out = Vec::with_capacity(tokens.len());
    let mut depth_of_inlineable: Vec<bool> = Vec::new();

    for token in tokens {
        match &token.kind {
            TokenKind::ParagraphOpen { .. } | TokenKind::AtxHeadingOpen { .. } | TokenKind::SetextHeadingOpen { .. } => {
                depth_of_inlineable.push(true);
                out.push(token);
            }
            TokenKind::IndentedCodeBlockOpen { .. } | TokenKind::FencedCodeBlockOpen { .. } | TokenKind::HtmlBlockOpen { .. } => {
                depth_of_inlineable.push(false);
                out.push(token);
            }
            TokenKind::ParagraphClose { .. }
            | TokenKind::AtxHeadingClose
            | TokenKind::SetextHeadingClose { .. }
            | TokenKind::IndentedCodeBlockClose
            | TokenKind::FencedCodeBlockClose { .. }
            | TokenKind::HtmlBlockClose => {
                depth_of_inlineable.pop();
                out.push(token);
            }
            TokenKind::Text { payload, .. } if depth_of_inlineable.last().copied().unwrap_or(false) => {
                let mut scanner = Scanner::new(payload, entities, &label_defs, extensions);
                let nodes = scanner.scan();
                let resolved = resolve_links_and_emphasis(nodes, &label_defs);
                for kind in resolved {
                    out.push(Token::new(token.line_number, token.column_number, token.index_indent, kind));
                }
            }
            _ => out.push(token),
        }
    }
    extensions.on_finalize(out)
}

fn collect_label_defs(tokens: &[Token]) -> IndexMap<String, (String, Option<String>)> {
    let mut map = IndexMap::new();
    for t in tokens {
        if let TokenKind::LinkReferenceDefinition { normalized_label, destination, title, .. } = &t.kind {
            map.entry(normalized_label.clone()).or_insert_with(|| (destination.clone(), title.clone()));
        }
    }
    map
}

impl<'a> Scanner<'a> {
    fn new(
        text: &'a str,
        entities: &'a EntityTable,
        label_defs: &'a IndexMap<String, (String, Option<String>)>,
        extensions: &'a ExtensionRegistry,
    ) -> Self {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        byte_offsets.push(text.len());
        Scanner { chars: text.chars().collect(), text, byte_offsets, pos: 0, entities, label_defs, extensions }
    }

    fn scan(&mut self) -> Vec<Node> {
        let mut nodes = Vec::new();
        while self.pos < self.chars.len() {
            if let Some((ext_tokens, consumed_bytes)) = self.extensions.try_inline(self.text, self.byte_offsets[self.pos]) {
                if consumed_bytes > 0 {
                    nodes.push(Node::Multi(ext_tokens.into_iter().map(|t| Node::Resolved(t.kind)).collect()));
                    let target = self.byte_offsets[self.pos] + consumed_bytes;
                    while self.pos < self.chars.len() && self.byte_offsets[self.pos] < target {
                        self.pos += 1;
                    }
                    continue;
                }
            }
            let ch = self.chars[self.pos];
            match ch {
                '`' => self.scan_code_span(&mut nodes),
                '\\' => self.scan_backslash(&mut nodes),
                '&' => self.scan_entity(&mut nodes),
                '<' => {
                    if !self.scan_autolink_or_html(&mut nodes) {
                        nodes.push(Node::Text("<".to_string()));
                        self.pos += 1;
                    }
                }
                '\n' => self.scan_break(&mut nodes),
                '*' | '_' => self.scan_delimiter_run(&mut nodes, ch),
                '[' => {
                    nodes.push(Node::BracketOpen { is_image: false });
                    self.pos += 1;
                }
                '!' if self.peek(1) == Some('[') => {
                    nodes.push(Node::BracketOpen { is_image: true });
                    self.pos += 2;
                }
                ']' => {
                    nodes.push(Node::Text("]".to_string())); // tentative; resolved below.
                    self.pos += 1;
                }
                _ => self.scan_plain_text(&mut nodes),
            }
        }
        nodes
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn scan_plain_text(&mut self, nodes: &mut Vec<Node>) {
        let start = self.pos;
        while self.pos < self.chars.len() && !matches!(self.chars[self.pos], '`' | '\\' | '&' | '<' | '\n' | '*' | '_' | '[' | ']')
            && !(self.chars[self.pos] == '!' && self.peek(1) == Some('['))
        {
            self.pos += 1;
        }
        if self.pos > start {
            nodes.push(Node::Text(self.chars[start..self.pos].iter().collect()));
        } else {
            nodes.push(Node::Text(self.chars[self.pos].to_string()));
            self.pos += 1;
        }
    }

    fn scan_code_span(&mut self, nodes: &mut Vec<Node>) {
        let start = self.pos;
        let open_count = self.run_length('`');
        let open_end = start + open_count;
        let mut search = open_end;
        loop {
            if search >= self.chars.len() {
                // No matching closer: the backtick run is literal text.
                nodes.push(Node::Text(self.chars[start..open_end].iter().collect()));
                self.pos = open_end;
                return;
            }
            if self.chars[search] == '`' {
                let run_start = search;
                let mut run_len = 0;
                while search < self.chars.len() && self.chars[search] == '`' {
                    search += 1;
                    run_len += 1;
                }
                if run_len == open_count {
                    let interior: String = self.chars[open_end..run_start].iter().collect();
                    let (before_ws, after_ws, payload) = normalize_code_span_interior(&interior);
                    nodes.push(Node::CodeSpan { run_count: open_count, before_ws, after_ws, payload });
                    self.pos = search;
                    return;
                }
                continue;
            }
            search += 1;
        }
    }

    fn run_length(&self, ch: char) -> usize {
        let mut n = 0;
        while self.chars.get(self.pos + n) == Some(&ch) {
            n += 1;
        }
        n
    }

    fn scan_backslash(&mut self, nodes: &mut Vec<Node>) {
        if let Some(next) = self.peek(1) {
            if next == '\n' {
                nodes.push(Node::HardBreak(HardBreakKind::Backslash));
                self.pos += 2;
                return;
            }
            if next.is_ascii_punctuation() {
                nodes.push(Node::Escape(next));
                self.pos += 2;
                return;
            }
        }
        nodes.push(Node::Text("\\".to_string()));
        self.pos += 1;
    }

    fn scan_entity(&mut self, nodes: &mut Vec<Node>) {
        let start = self.pos;
        let rest: String = self.chars[start..].iter().collect();
        if let Some(stripped) = rest.strip_prefix("&#x").or_else(|| rest.strip_prefix("&#X")) {
            if let Some((hex, len)) = take_while_len(stripped, |c| c.is_ascii_hexdigit(), 6) {
                if stripped[len..].starts_with(';') {
                    let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
                    let raw: String = self.chars[start..start + 3 + len + 1].iter().collect();
                    nodes.push(Node::CharRef { raw, resolved: EntityTable::resolve_numeric(code) });
                    self.pos += 3 + len + 1;
                    return;
                }
            }
        } else if let Some(stripped) = rest.strip_prefix("&#") {
            if let Some((digits, len)) = take_while_len(stripped, |c| c.is_ascii_digit(), 7) {
                if stripped[len..].starts_with(';') && len > 0 {
                    let code = digits.parse().unwrap_or(0);
                    let raw: String = self.chars[start..start + 2 + len + 1].iter().collect();
                    nodes.push(Node::CharRef { raw, resolved: EntityTable::resolve_numeric(code) });
                    self.pos += 2 + len + 1;
                    return;
                }
            }
        } else if let Some(stripped) = rest.strip_prefix('&') {
            if let Some((name, len)) = take_while_len(stripped, |c| c.is_ascii_alphanumeric(), 32) {
                if stripped[len..].starts_with(';') {
                    if let Some(resolved) = self.entities.resolve_named(&name) {
                        let raw: String = self.chars[start..start + 1 + len + 1].iter().collect();
                        nodes.push(Node::CharRef { raw, resolved: resolved.to_string() });
                        self.pos += 1 + len + 1;
                        return;
                    }
                }
            }
        }
        nodes.push(Node::Text("&".to_string()));
        self.pos += 1;
    }

    fn scan_autolink_or_html(&mut self, nodes: &mut Vec<Node>) -> bool {
        let rest: String = self.chars[self.pos..].iter().collect();
        let Some(end) = rest.find('>') else { return false };
        let inner = &rest[1..end];
        if is_uri_autolink(inner) {
            nodes.push(Node::Autolink { kind: AutolinkKind::Uri, payload: inner.to_string() });
            self.pos += end + 1;
            return true;
        }
        if is_email_autolink(inner) {
            nodes.push(Node::Autolink { kind: AutolinkKind::Email, payload: inner.to_string() });
            self.pos += end + 1;
            return true;
        }
        if is_raw_html_tag(inner) {
            nodes.push(Node::RawHtml(rest[..=end].to_string()));
            self.pos += end + 1;
            return true;
        }
        false
    }

    fn scan_break(&mut self, nodes: &mut Vec<Node>) {
        // Trailing spaces on the *previous* text node determine hard vs
        // soft break.
        if let Some(Node::Text(t)) = nodes.last_mut() {
            let trailing_spaces = t.chars().rev().take_while(|&c| c == ' ').count();
            if trailing_spaces >= 2 {
                let new_len = t.trim_end_matches(' ').len();
                t.truncate(new_len);
                nodes.push(Node::HardBreak(HardBreakKind::Spaces));
                self.pos += 1;
                return;
            }
        }
        nodes.push(Node::SoftBreak);
        self.pos += 1;
    }

    fn scan_delimiter_run(&mut self, nodes: &mut Vec<Node>, ch: char) {
        let count = self.run_length(ch);
        let delim = if ch == '*' { DelimiterChar::Star } else { DelimiterChar::Underscore };
        nodes.push(Node::Run { ch: delim, count });
        self.pos += count;
    }
}

fn take_while_len(s: &str, pred: impl Fn(char) -> bool, max: usize) -> Option<(String, usize)> {
    let taken: String = s.chars().take_while(|&c| pred(c)).take(max).collect();
    if taken.is_empty() { None } else { let len = taken.len(); Some((taken, len)) }
}

fn normalize_code_span_interior(interior: &str) -> (String, String, String) {
    let all_spaces = !interior.is_empty() && interior.chars().all(|c| c == ' ');
    let collapsed: String = interior.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if !all_spaces && collapsed.starts_with(' ') && collapsed.ends_with(' ') && collapsed.len() > 1 {
        (" ".to_string(), " ".to_string(), collapsed[1..collapsed.len() - 1].to_string())
    } else {
        (String::new(), String::new(), collapsed)
    }
}

fn is_uri_autolink(s: &str) -> bool {
    let Some(colon) = s.find(':') else { return false };
    let scheme = &s[..colon];
    let scheme_ok = scheme.len() >= 2
        && scheme.len() <= 32
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    scheme_ok && s[colon + 1..].chars().all(|c| !c.is_whitespace() && c != '<' && c != '>')
}

fn is_email_autolink(s: &str) -> bool {
    // A conservative subset of CommonMark's autolink email grammar.
    let Some(at) = s.find('@') else { return false };
    let (local, domain) = (&s[..at], &s[at + 1..]);
    !local.is_empty()
        && !domain.is_empty()
        && local.chars().all(|c| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c))
        && domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && domain.contains('.')
}

fn is_raw_html_tag(inner: &str) -> bool {
    let inner = inner.trim_end_matches('/');
    let inner = inner.strip_prefix('/').unwrap_or(inner);
    inner.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Resolves `[...]`/`![...]` brackets into links and images, then
/// resolves remaining `*`/`_` runs into emphasis/strong via the
/// delimiter stack. Both passes happen over the same flat node list so
/// link interiors are available to the emphasis pass (images may
/// contain links; links do not nest).
fn resolve_links_and_emphasis(nodes: Vec<Node>, label_defs: &IndexMap<String, (String, Option<String>)>) -> Vec<TokenKind> {
    let nodes = resolve_brackets(nodes, label_defs);
    let nodes = resolve_emphasis(nodes);
    flatten(nodes)
}

struct LinkResolution {
    is_image: bool,
    open: TokenKind,
    /// Characters consumed from the start of the `Text` node immediately
    /// following the closing `]` (the `(dest "title")` or `[ref]` syntax).
    trailing_chars_consumed: usize,
}

fn resolve_brackets(mut nodes: Vec<Node>, label_defs: &IndexMap<String, (String, Option<String>)>) -> Vec<Node> {
    let mut stack: Vec<usize> = Vec::new(); // indices of unresolved BracketOpen nodes.
    let mut i = 0;
    while i < nodes.len() {
        match &nodes[i] {
            Node::BracketOpen { .. } => stack.push(i),
            Node::Text(t) if t == "]" => {
                if let Some(open_idx) = stack.pop() {
                    if let Some(resolution) = try_resolve_link_at(&nodes, open_idx, i, label_defs) {
                        let is_image = resolution.is_image;
                        nodes[open_idx] = Node::Resolved(resolution.open);
                        if is_image {
                            // The alt text is already captured in the open
                            // token; the interior nodes become invisible.
                            for node in nodes.iter_mut().take(i + 1).skip(open_idx + 1) {
                                *node = Node::LinkInteriorEnd;
                            }
                        } else {
                            // Keep the interior as visible child content;
                            // the "]" becomes the matching close tag.
                            nodes[i] = Node::Resolved(TokenKind::LinkClose);
                        }
                        if resolution.trailing_chars_consumed > 0 {
                            if let Some(Node::Text(t)) = nodes.get_mut(i + 1) {
                                *t = t.chars().skip(resolution.trailing_chars_consumed).collect();
                            }
                        }
                        // Links do not nest: any enclosing `[` openers are
                        // demoted to literal text now that this pair
                        // resolved (images may still contain links).
                        if !is_image {
                            for node in nodes.iter_mut().take(open_idx) {
                                if let Node::BracketOpen { is_image: false } = node {
                                    *node = Node::Text("[".to_string());
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    // Any bracket openers that never resolved are literal text.
    for node in nodes.iter_mut() {
        if let Node::BracketOpen { is_image } = node {
            *node = Node::Text(if *is_image { "![".to_string() } else { "[".to_string() });
        }
    }
    nodes
}

/// Attempts to resolve the bracket pair `nodes[open_idx]..=nodes[close_idx]`
/// as an inline, full-reference, collapsed-reference, or
/// shortcut-reference link or image.
fn try_resolve_link_at(nodes: &[Node], open_idx: usize, close_idx: usize, label_defs: &IndexMap<String, (String, Option<String>)>) -> Option<LinkResolution> {
    let is_image = matches!(nodes[open_idx], Node::BracketOpen { is_image: true });
    let label_text = render_plain(&nodes[open_idx + 1..close_idx]);
    let trailing = match nodes.get(close_idx + 1) {
        Some(Node::Text(t)) => t.clone(),
        _ => String::new(),
    };
    if let Some(rest) = trailing.strip_prefix('(') {
        if let Some(end) = rest.find(')') {
            let inside = &rest[..end];
            let (dest, title) = split_destination_title(inside);
            let open = build_link_kind(is_image, LinkKind::Inline, None, dest, title, &label_text);
            return Some(LinkResolution { is_image, open, trailing_chars_consumed: 1 + end + 1 });
        }
    }
    if let Some(rest) = trailing.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let ref_label = &rest[..end];
            let normalized = crate::leaf::normalize_label(if ref_label.is_empty() { &label_text } else { ref_label });
            if let Some((dest, title)) = label_defs.get(&normalized) {
                let kind = if ref_label.is_empty() { LinkKind::Collapsed } else { LinkKind::Full };
                let open = build_link_kind(is_image, kind, Some(normalized), dest.clone(), title.clone(), &label_text);
                return Some(LinkResolution { is_image, open, trailing_chars_consumed: 1 + end + 1 });
            }
            return None;
        }
    }
    let normalized = crate::leaf::normalize_label(&label_text);
    let (dest, title) = label_defs.get(&normalized)?;
    let open = build_link_kind(is_image, LinkKind::Shortcut, Some(normalized), dest.clone(), title.clone(), &label_text);
    Some(LinkResolution { is_image, open, trailing_chars_consumed: 0 })
}

fn build_link_kind(is_image: bool, kind: LinkKind, label: Option<String>, destination: String, title: Option<String>, alt_text: &str) -> TokenKind {
    if is_image {
        TokenKind::ImageOpen { kind, label, destination, title, normalization: None, alt_text: alt_text.to_string() }
    } else {
        TokenKind::LinkOpen { kind, label, destination, title, normalization: None }
    }
}

fn split_destination_title(s: &str) -> (String, Option<String>) {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('<') {
        if let Some(end) = rest.find('>') {
            let dest = rest[..end].to_string();
            let title = parse_title(rest[end + 1..].trim());
            return (dest, title);
        }
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    let dest = s[..end].to_string();
    let title = parse_title(s[end..].trim());
    (dest, title)
}

fn parse_title(s: &str) -> Option<String> {
    if s.len() < 2 {
        return None;
    }
    let quote = s.chars().next()?;
    let closing = match quote {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };
    s.strip_prefix(quote)?.strip_suffix(closing).map(|t| t.to_string())
}

fn render_plain(nodes: &[Node]) -> String {
    let mut s = String::new();
    for n in nodes {
        match n {
            Node::Text(t) => s.push_str(t),
            Node::Escape(c) => s.push(*c),
            Node::CharRef { resolved, .. } => s.push_str(resolved),
            _ => {}
        }
    }
    s
}

/// Resolves `*`/`_` runs into Emphasis/Strong using the CommonMark
/// delimiter-stack algorithm.
fn resolve_emphasis(mut nodes: Vec<Node>) -> Vec<Node> {
    let mut stack = DelimiterStack::new();
    for (i, node) in nodes.iter().enumerate() {
        if let Node::Run { ch, count } = node {
            let prev_char = prev_text_char(&nodes, i);
            let next_char = next_text_char(&nodes, i);
            let (can_open, can_close) = flanking(prev_char, next_char, ch.as_char());
            stack.push(DelimiterRun { kind: RunKind::Emphasis(*ch), event_index: i, count: *count, can_open, can_close, active: true });
        }
    }

    let mut resolutions: Vec<(usize, usize, usize)> = Vec::new(); // (opener_event_index, closer_event_index, use_count)
    for closer_pos in 0..stack.runs.len() {
        if !stack.runs[closer_pos].can_close || !stack.runs[closer_pos].active {
            continue;
        }
        let ch = match stack.runs[closer_pos].kind {
            RunKind::Emphasis(c) => c,
            _ => continue,
        };
        let mut search = closer_pos;
        while search > 0 {
            search -= 1;
            let opener = &stack.runs[search];
            if !opener.active || !opener.can_open {
                continue;
            }
            if !matches!(opener.kind, RunKind::Emphasis(c) if c == ch) {
                continue;
            }
            let both_closer_flanking = opener.can_open && opener.can_close;
            let both_opener_flanking = stack.runs[closer_pos].can_open && stack.runs[closer_pos].can_close;
            if !rule_of_three_allows(both_closer_flanking, both_opener_flanking, opener.count, stack.runs[closer_pos].count) {
                continue;
            }
            let use_count = if opener.count >= 2 && stack.runs[closer_pos].count >= 2 { 2 } else { 1 };
            resolutions.push((search, closer_pos, use_count));
            stack.runs[search].count -= use_count;
            stack.runs[closer_pos].count -= use_count;
            if stack.runs[search].count == 0 {
                stack.runs[search].active = false;
            }
            if stack.runs[closer_pos].count == 0 {
                stack.runs[closer_pos].active = false;
                break;
            }
        }
    }

    let mut opens: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut closes: HashMap<usize, Vec<usize>> = HashMap::new();
    for (opener, closer, count) in resolutions {
        opens.entry(stack.runs[opener].event_index).or_default().push(count);
        closes.entry(stack.runs[closer].event_index).or_default().push(count);
    }

    for (i, node) in nodes.iter_mut().enumerate() {
        if let Node::Run { ch, count } = *node {
            let open_counts = opens.get(&i).cloned().unwrap_or_default();
            let close_counts = closes.get(&i).cloned().unwrap_or_default();
            if open_counts.is_empty() && close_counts.is_empty() {
                continue;
            }
            let mut replacement = Vec::new();
            let mut remaining = count;
            for c in open_counts {
                let tag = if c == 2 { TokenKind::StrongOpen { delimiter: ch, count: 2 } } else { TokenKind::EmphasisOpen { delimiter: ch, count: 1 } };
                replacement.push(Node::Resolved(tag));
                remaining = remaining.saturating_sub(c);
            }
            for c in close_counts {
                let tag = if c == 2 { TokenKind::StrongClose { delimiter: ch, count: 2 } } else { TokenKind::EmphasisClose { delimiter: ch, count: 1 } };
                replacement.push(Node::Resolved(tag));
                remaining = remaining.saturating_sub(c);
            }
            if remaining > 0 {
                replacement.insert(0, Node::Text(ch.as_char().to_string().repeat(remaining)));
            }
            *node = Node::Multi(replacement);
        }
    }
    nodes
}

fn prev_text_char(nodes: &[Node], i: usize) -> Option<char> {
    for n in nodes[..i].iter().rev() {
        match n {
            Node::Text(t) => return t.chars().last(),
            Node::Run { ch, .. } => return Some(ch.as_char()),
            _ => return None,
        }
    }
    None
}

fn next_text_char(nodes: &[Node], i: usize) -> Option<char> {
    for n in nodes[i + 1..].iter() {
        match n {
            Node::Text(t) => return t.chars().next(),
            Node::Run { ch, .. } => return Some(ch.as_char()),
            _ => return None,
        }
    }
    None
}

fn flatten(nodes: Vec<Node>) -> Vec<TokenKind> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) => {
                if !t.is_empty() {
                    out.push(TokenKind::Text { payload: t, extracted_whitespace: String::new(), tabified_text: None });
                }
            }
            Node::CodeSpan { run_count, before_ws, after_ws, payload } => {
                out.push(TokenKind::InlineCodeSpan { run_count, before_ws, after_ws, payload });
            }
            Node::RawHtml(payload) => out.push(TokenKind::RawHtml { payload }),
            Node::Autolink { kind, payload } => out.push(TokenKind::Autolink { kind, payload }),
            Node::HardBreak(kind) => out.push(TokenKind::HardBreak { kind }),
            Node::SoftBreak => out.push(TokenKind::SoftBreak),
            Node::CharRef { raw, resolved } => out.push(TokenKind::CharacterReference { raw, resolved }),
            Node::Escape(c) => out.push(TokenKind::BackslashEscape { escaped_char: c }),
            Node::Run { ch, count } => {
                if count > 0 {
                    out.push(TokenKind::Text { payload: ch.as_char().to_string().repeat(count), extracted_whitespace: String::new(), tabified_text: None });
                }
            }
            Node::BracketOpen { is_image } => {
                out.push(TokenKind::Text { payload: if is_image { "![".to_string() } else { "[".to_string() }, extracted_whitespace: String::new(), tabified_text: None });
            }
            Node::Resolved(kind) => match &kind {
                TokenKind::Text { payload, .. } if payload.is_empty() => {}
                _ => out.push(kind),
            },
            Node::Multi(inner) => out.extend(flatten(inner)),
            Node::LinkInteriorStart | Node::LinkInteriorEnd => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityTable;

    fn scan(text: &str) -> Vec<Node> {
        let entities = EntityTable::load().unwrap();
        let label_defs = IndexMap::new();
        let extensions = ExtensionRegistry::new();
        let mut scanner = Scanner::new(text, &entities, &label_defs, &extensions);
        scanner.scan()
    }

    #[test]
    fn code_span_matches_equal_length_backtick_runs() {
        let nodes = scan("`` ` ``");
        assert!(matches!(nodes[0], Node::CodeSpan { ref payload, .. } if payload == "`"));
    }

    #[test]
    fn backslash_escapes_ascii_punctuation() {
        let nodes = scan(r"\*");
        assert!(matches!(nodes[0], Node::Escape('*')));
    }

    #[test]
    fn entity_resolves_named_reference() {
        let nodes = scan("&amp;");
        assert!(matches!(&nodes[0], Node::CharRef { resolved, .. } if resolved == "&"));
    }

    #[test]
    fn unterminated_code_fence_is_literal_backticks() {
        let nodes = scan("`foo");
        assert!(matches!(&nodes[0], Node::Text(t) if t == "`"));
    }

    #[test]
    fn extension_inline_hook_fires_at_its_actual_scan_position() {
        struct MarksAtSign;
        impl crate::extensions::Extension for MarksAtSign {
            fn name(&self) -> &'static str {
                "marks-at-sign"
            }
            fn try_inline(&self, text: &str, pos: usize) -> Result<Option<(Vec<Token>, usize)>, crate::error::ExtensionError> {
                if text[pos..].starts_with('@') {
                    Ok(Some((vec![Token::new(1, 1, 0, TokenKind::RawHtml { payload: "@".to_string() })], 1)))
                } else {
                    Ok(None)
                }
            }
        }

        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(MarksAtSign));
        let entities = EntityTable::load().unwrap();
        let tokens = vec![
            Token::new(1, 1, 0, TokenKind::ParagraphOpen { extracted_whitespace_per_line: vec![] }),
            Token::new(1, 1, 0, TokenKind::Text { payload: "foo @ bar".to_string(), extracted_whitespace: String::new(), tabified_text: None }),
            Token::new(1, 10, 0, TokenKind::ParagraphClose { was_forced: false }),
        ];
        let result = run_inline_pass(tokens, &entities, &registry);
        let raw_html_count = result.iter().filter(|t| matches!(t.kind, TokenKind::RawHtml { .. })).count();
        assert_eq!(raw_html_count, 1, "the hook should fire exactly once, where the '@' actually is");
        let texts: Vec<String> = result
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Text { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["foo ".to_string(), " bar".to_string()]);
    }

    #[test]
    fn emphasis_resolves_simple_star_pair() {
        let entities = EntityTable::load().unwrap();
        let extensions = ExtensionRegistry::new();
        let tokens = vec![
            Token::new(1, 1, 0, TokenKind::ParagraphOpen { extracted_whitespace_per_line: vec![] }),
            Token::new(1, 1, 0, TokenKind::Text { payload: "*foo*".to_string(), extracted_whitespace: String::new(), tabified_text: None }),
            Token::new(1, 6, 0, TokenKind::ParagraphClose { was_forced: false }),
        ];
        let result = run_inline_pass(tokens, &entities, &extensions);
        let has_open = result.iter().any(|t| matches!(t.kind, TokenKind::EmphasisOpen { .. }));
        let has_close = result.iter().any(|t| matches!(t.kind, TokenKind::EmphasisClose { .. }));
        assert!(has_open && has_close);
    }
}
