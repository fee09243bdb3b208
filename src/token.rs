//!
//! The token model. A `Token` is a tagged variant carrying
//! enough source provenance — line, column, and already-consumed
//! container indent — that the writer (`crate::writer`) can reconstruct
//! the original bytes, and enough semantic payload that the HTML renderer
//! (`crate::html`) and any downstream rule engine can consume it without
//! re-scanning the source.

use std::fmt;

/// Emphasis/strong delimiter character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterChar {
    Star,
    Underscore,
}

impl DelimiterChar {
    pub fn as_char(self) -> char {
        match self {
            DelimiterChar::Star => '*',
            DelimiterChar::Underscore => '_',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Inline,
    Full,
    Collapsed,
    Shortcut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutolinkKind {
    Uri,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardBreakKind {
    Backslash,
    Spaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedDelimiter {
    Period,
    Paren,
}

impl OrderedDelimiter {
    pub fn as_char(self) -> char {
        match self {
            OrderedDelimiter::Period => '.',
            OrderedDelimiter::Paren => ')',
        }
    }
}

/// One line of leading whitespace/container prefix, kept verbatim so the
/// writer can restore tabs that were expanded for measurement purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedWhitespace(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // --- container open/close ---
    BlockQuoteOpen {
        leading_spaces_per_line: Vec<String>,
    },
    BlockQuoteClose,
    UnorderedListOpen {
        marker_char: char,
        indent_level: usize,
        ws_before_marker: usize,
        ws_after_marker: usize,
        start_index: usize,
    },
    OrderedListOpen {
        list_start_digits: String,
        marker_char: OrderedDelimiter,
        indent_level: usize,
        ws_before_marker: usize,
        ws_after_marker: usize,
        start_index: usize,
    },
    ListItemContinuation {
        indent_level: usize,
        extracted_whitespace: String,
        list_start_content: String,
    },
    ListClose,

    // --- leaf open/close ---
    ParagraphOpen {
        extracted_whitespace_per_line: Vec<String>,
    },
    ParagraphClose {
        was_forced: bool,
    },
    AtxHeadingOpen {
        level: u8,
        hash_count: u8,
        removed_trailing_count: usize,
        extracted_whitespace: String,
    },
    AtxHeadingClose,
    SetextHeadingOpen {
        level: u8,
        underline_char: char,
        underline_count: usize,
        original_para_ws: Vec<String>,
    },
    SetextHeadingClose {
        was_forced: bool,
    },
    ThematicBreak {
        marker_char: char,
        rest_of_line: String,
        extracted_whitespace: String,
    },
    IndentedCodeBlockOpen {
        extracted_whitespace: String,
        first_line_indent: usize,
    },
    IndentedCodeBlockClose,
    FencedCodeBlockOpen {
        fence_char: char,
        fence_count: usize,
        info_string: String,
        extracted_whitespace: String,
        whitespace_before_info: String,
    },
    FencedCodeBlockClose {
        was_forced: bool,
        extracted_whitespace: String,
    },
    HtmlBlockOpen {
        mode: u8,
    },
    HtmlBlockClose,
    LinkReferenceDefinition {
        label: String,
        destination: String,
        title: Option<String>,
        normalized_label: String,
        extracted_whitespace_segments: Vec<String>,
    },
    BlankLine {
        extracted_whitespace: String,
    },

    // --- inline/text ---
    Text {
        payload: String,
        extracted_whitespace: String,
        tabified_text: Option<String>,
    },
    InlineCodeSpan {
        run_count: usize,
        before_ws: String,
        after_ws: String,
        payload: String,
    },
    EmphasisOpen {
        delimiter: DelimiterChar,
        count: usize,
    },
    EmphasisClose {
        delimiter: DelimiterChar,
        count: usize,
    },
    StrongOpen {
        delimiter: DelimiterChar,
        count: usize,
    },
    StrongClose {
        delimiter: DelimiterChar,
        count: usize,
    },
    LinkOpen {
        kind: LinkKind,
        label: Option<String>,
        destination: String,
        title: Option<String>,
        normalization: Option<String>,
    },
    LinkClose,
    ImageOpen {
        kind: LinkKind,
        label: Option<String>,
        destination: String,
        title: Option<String>,
        normalization: Option<String>,
        alt_text: String,
    },
    RawHtml {
        payload: String,
    },
    Autolink {
        kind: AutolinkKind,
        payload: String,
    },
    HardBreak {
        kind: HardBreakKind,
    },
    SoftBreak,
    CharacterReference {
        raw: String,
        resolved: String,
    },
    BackslashEscape {
        escaped_char: char,
    },
}

impl TokenKind {
    /// The `<kind>` portion of the canonical text form.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TokenKind::BlockQuoteOpen { .. } => "block-quote",
            TokenKind::BlockQuoteClose => "end-block-quote",
            TokenKind::UnorderedListOpen { .. } => "ulist",
            TokenKind::OrderedListOpen { .. } => "olist",
            TokenKind::ListItemContinuation { .. } => "li",
            TokenKind::ListClose => "end-list",
            TokenKind::ParagraphOpen { .. } => "para",
            TokenKind::ParagraphClose { .. } => "end-para",
            TokenKind::AtxHeadingOpen { .. } => "atx",
            TokenKind::AtxHeadingClose => "end-atx",
            TokenKind::SetextHeadingOpen { .. } => "setext",
            TokenKind::SetextHeadingClose { .. } => "end-setext",
            TokenKind::ThematicBreak { .. } => "tbreak",
            TokenKind::IndentedCodeBlockOpen { .. } => "icode-block",
            TokenKind::IndentedCodeBlockClose => "end-icode-block",
            TokenKind::FencedCodeBlockOpen { .. } => "fcode-block",
            TokenKind::FencedCodeBlockClose { .. } => "end-fcode-block",
            TokenKind::HtmlBlockOpen { .. } => "html-block",
            TokenKind::HtmlBlockClose => "end-html-block",
            TokenKind::LinkReferenceDefinition { .. } => "link-ref-def",
            TokenKind::BlankLine { .. } => "blank-line",
            TokenKind::Text { .. } => "text",
            TokenKind::InlineCodeSpan { .. } => "icode-span",
            TokenKind::EmphasisOpen { .. } => "emphasis",
            TokenKind::EmphasisClose { .. } => "end-emphasis",
            TokenKind::StrongOpen { .. } => "strong",
            TokenKind::StrongClose { .. } => "end-strong",
            TokenKind::LinkOpen { .. } => "link",
            TokenKind::LinkClose => "end-link",
            TokenKind::ImageOpen { .. } => "image",
            TokenKind::RawHtml { .. } => "raw-html",
            TokenKind::Autolink { .. } => "autolink",
            TokenKind::HardBreak { .. } => "hard-break",
            TokenKind::SoftBreak => "soft-break",
            TokenKind::CharacterReference { .. } => "char-ref",
            TokenKind::BackslashEscape { .. } => "escape",
        }
    }

    /// Whether this variant is a container/leaf "open" that expects a
    /// matching close later in the stream.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TokenKind::BlockQuoteOpen { .. }
                | TokenKind::UnorderedListOpen { .. }
                | TokenKind::OrderedListOpen { .. }
                | TokenKind::ParagraphOpen { .. }
                | TokenKind::AtxHeadingOpen { .. }
                | TokenKind::SetextHeadingOpen { .. }
                | TokenKind::IndentedCodeBlockOpen { .. }
                | TokenKind::FencedCodeBlockOpen { .. }
                | TokenKind::HtmlBlockOpen { .. }
                | TokenKind::EmphasisOpen { .. }
                | TokenKind::StrongOpen { .. }
                | TokenKind::LinkOpen { .. }
                | TokenKind::ImageOpen { .. }
        )
    }

    pub fn is_close(&self) -> bool {
        matches!(
            self,
            TokenKind::BlockQuoteClose
                | TokenKind::ListClose
                | TokenKind::ParagraphClose { .. }
                | TokenKind::AtxHeadingClose
                | TokenKind::SetextHeadingClose { .. }
                | TokenKind::IndentedCodeBlockClose
                | TokenKind::FencedCodeBlockClose { .. }
                | TokenKind::HtmlBlockClose
                | TokenKind::EmphasisClose { .. }
                | TokenKind::StrongClose { .. }
                | TokenKind::LinkClose
        )
    }
}

/// A single emitted token with source provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub line_number: usize,
    pub column_number: usize,
    pub index_indent: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(line_number: usize, column_number: usize, index_indent: usize, kind: TokenKind) -> Self {
        Self { line_number, column_number, index_indent, kind }
    }
}

/// Canonical text form: `[<kind>(<line>,<col>):<payload>]`.
/// The exact payload rendering per variant is an implementation choice;
/// this one is stable enough to diff in tests and is what the writer and
/// conformance tests key off of.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}({},{}):", self.kind.kind_name(), self.line_number, self.column_number)?;
        match &self.kind {
            TokenKind::BlockQuoteOpen { leading_spaces_per_line } => {
                write!(f, "{}", leading_spaces_per_line.join("\x02"))?
            }
            TokenKind::BlockQuoteClose => {}
            TokenKind::UnorderedListOpen { marker_char, indent_level, start_index, .. } => {
                write!(f, "{marker_char}:{indent_level}:{start_index}")?
            }
            TokenKind::OrderedListOpen { list_start_digits, marker_char, indent_level, start_index, .. } => {
                write!(f, "{list_start_digits}{}:{indent_level}:{start_index}", marker_char.as_char())?
            }
            TokenKind::ListItemContinuation { indent_level, extracted_whitespace, .. } => {
                write!(f, "{indent_level}:{extracted_whitespace}")?
            }
            TokenKind::ListClose => {}
            TokenKind::ParagraphOpen { extracted_whitespace_per_line } => {
                write!(f, "{}", extracted_whitespace_per_line.join("\x02"))?
            }
            TokenKind::ParagraphClose { was_forced } => write!(f, ":{was_forced}")?,
            TokenKind::AtxHeadingOpen { level, hash_count, removed_trailing_count, extracted_whitespace } => {
                write!(f, "{level}:{hash_count}:{removed_trailing_count}:{extracted_whitespace}")?
            }
            TokenKind::AtxHeadingClose => {}
            TokenKind::SetextHeadingOpen { level, underline_char, underline_count, .. } => {
                write!(f, "{level}:{underline_char}:{underline_count}")?
            }
            TokenKind::SetextHeadingClose { was_forced } => write!(f, ":{was_forced}")?,
            TokenKind::ThematicBreak { marker_char, rest_of_line, extracted_whitespace } => {
                write!(f, "{marker_char}:{extracted_whitespace}:{rest_of_line}")?
            }
            TokenKind::IndentedCodeBlockOpen { extracted_whitespace, .. } => write!(f, "{extracted_whitespace}")?,
            TokenKind::IndentedCodeBlockClose => {}
            TokenKind::FencedCodeBlockOpen { fence_char, fence_count, info_string, .. } => {
                write!(f, "{fence_char}:{fence_count}::{info_string}")?
            }
            TokenKind::FencedCodeBlockClose { was_forced, extracted_whitespace } => {
                write!(f, ":{was_forced}:{extracted_whitespace}")?
            }
            TokenKind::HtmlBlockOpen { mode } => write!(f, "{mode}")?,
            TokenKind::HtmlBlockClose => {}
            TokenKind::LinkReferenceDefinition { label, destination, title, .. } => {
                write!(f, "{label}:{destination}:{}", title.as_deref().unwrap_or(""))?
            }
            TokenKind::BlankLine { extracted_whitespace } => write!(f, "{extracted_whitespace}")?,
            TokenKind::Text { payload, .. } => write!(f, "{payload}:")?,
            TokenKind::InlineCodeSpan { run_count, payload, .. } => write!(f, "{run_count}:{payload}")?,
            TokenKind::EmphasisOpen { delimiter, count } => write!(f, "{}:{count}", delimiter.as_char())?,
            TokenKind::EmphasisClose { delimiter, count } => write!(f, "{}:{count}", delimiter.as_char())?,
            TokenKind::StrongOpen { delimiter, count } => write!(f, "{}:{count}", delimiter.as_char())?,
            TokenKind::StrongClose { delimiter, count } => write!(f, "{}:{count}", delimiter.as_char())?,
            TokenKind::LinkOpen { destination, title, .. } => {
                write!(f, "{destination}:{}", title.as_deref().unwrap_or(""))?
            }
            TokenKind::LinkClose => {}
            TokenKind::ImageOpen { destination, alt_text, .. } => write!(f, "{destination}:{alt_text}")?,
            TokenKind::RawHtml { payload } => write!(f, "{payload}")?,
            TokenKind::Autolink { payload, .. } => write!(f, "{payload}")?,
            TokenKind::HardBreak { .. } => {}
            TokenKind::SoftBreak => {}
            TokenKind::CharacterReference { raw, resolved } => write!(f, "{raw}:{resolved}")?,
            TokenKind::BackslashEscape { escaped_char } => write!(f, "{escaped_char}")?,
        }
        write!(f, "]")
    }
}
