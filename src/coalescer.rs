//!
//! Coalescer. After block-level tokenization, consecutive
//! `Text` tokens within the same paragraph/heading/code block are merged
//! into a single text token per block, newline-joined, so the inline pass
//! (for paragraphs/headings) and the writer (for everything) operate on
//! one payload instead of re-walking line by line.

use crate::token::{Token, TokenKind};

fn is_text_bearing_open(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::ParagraphOpen { .. }
            | TokenKind::AtxHeadingOpen { .. }
            | TokenKind::IndentedCodeBlockOpen { .. }
            | TokenKind::FencedCodeBlockOpen { .. }
            | TokenKind::HtmlBlockOpen { .. }
    )
}

fn matching_close(open: &TokenKind) -> fn(&TokenKind) -> bool {
    match open {
        TokenKind::ParagraphOpen { .. } => |k| matches!(k, TokenKind::ParagraphClose { .. }),
        TokenKind::AtxHeadingOpen { .. } => |k| matches!(k, TokenKind::AtxHeadingClose),
        TokenKind::IndentedCodeBlockOpen { .. } => |k| matches!(k, TokenKind::IndentedCodeBlockClose),
        TokenKind::FencedCodeBlockOpen { .. } => |k| matches!(k, TokenKind::FencedCodeBlockClose { .. }),
        TokenKind::HtmlBlockOpen { .. } => |k| matches!(k, TokenKind::HtmlBlockClose),
        _ => |_| false,
    }
}

/// Merges runs of `Text` tokens that sit directly between a text-bearing
/// open and its matching close into a single `Text` token. Code blocks'
/// raw content is preserved verbatim apart from the indentation strip
/// already applied by `crate::leaf`.
pub fn coalesce(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        if is_text_bearing_open(&tok.kind) {
            let is_close = matching_close(&tok.kind);
            out.push(tokens[i].clone());
            i += 1;
            let mut lines = Vec::new();
            let mut ws_per_line = Vec::new();
            let (first_line, first_col, first_indent) = if i < tokens.len() {
                (tokens[i].line_number, tokens[i].column_number, tokens[i].index_indent)
            } else {
                (out.last().unwrap().line_number, out.last().unwrap().column_number, out.last().unwrap().index_indent)
            };
            while i < tokens.len() {
                match &tokens[i].kind {
                    TokenKind::Text { payload, extracted_whitespace, .. } => {
                        lines.push(payload.clone());
                        ws_per_line.push(extracted_whitespace.clone());
                        i += 1;
                    }
                    k if is_close(k) => break,
                    _ => break,
                }
            }
            if !lines.is_empty() {
                out.push(Token::new(
                    first_line,
                    first_col,
                    first_indent,
                    TokenKind::Text { payload: lines.join("\n"), extracted_whitespace: ws_per_line.join("\x02"), tabified_text: None },
                ));
            }
            continue;
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(payload: &str) -> Token {
        Token::new(1, 1, 0, TokenKind::Text { payload: payload.to_string(), extracted_whitespace: String::new(), tabified_text: None })
    }

    #[test]
    fn merges_paragraph_text_lines() {
        let tokens = vec![
            Token::new(1, 1, 0, TokenKind::ParagraphOpen { extracted_whitespace_per_line: vec![] }),
            text("foo"),
            text("bar"),
            Token::new(2, 4, 0, TokenKind::ParagraphClose { was_forced: false }),
        ];
        let merged = coalesce(tokens);
        assert_eq!(merged.len(), 3);
        match &merged[1].kind {
            TokenKind::Text { payload, .. } => assert_eq!(payload, "foo\nbar"),
            _ => panic!("expected merged text"),
        }
    }

    #[test]
    fn leaves_non_text_bearing_tokens_untouched() {
        let tokens = vec![Token::new(1, 1, 0, TokenKind::ThematicBreak { marker_char: '-', rest_of_line: "---".into(), extracted_whitespace: String::new() })];
        let merged = coalesce(tokens.clone());
        assert_eq!(merged, tokens);
    }
}
