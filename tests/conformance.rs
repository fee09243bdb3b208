//! End-to-end scenarios against literal inputs, checked by token kind
//! sequence rather than full canonical-text equality (provenance details
//! like column numbers are covered at the unit level; these confirm block
//! and inline recognition land in the right order).

use gfmcore_lib::parser::Parser;
use gfmcore_lib::token::TokenKind;
use gfmcore_lib::{HtmlRenderer, ParserConfig, Writer};
use pretty_assertions::assert_eq;

fn kinds(src: &str) -> Vec<&'static str> {
    let parser = Parser::new(ParserConfig::default()).unwrap();
    parser.parse(src).iter().map(|t| t.kind.kind_name()).collect()
}

#[test]
fn blockquote_with_heading_and_paragraph() {
    let k = kinds("> # Foo\n> bar\n> baz");
    assert_eq!(k, vec!["block-quote", "atx", "text", "end-atx", "para", "text", "end-para", "end-block-quote"]);
}

#[test]
fn blockquote_close_then_thematic_break_is_not_setext() {
    let k = kinds("> foo\n---");
    assert!(k.contains(&"block-quote"));
    assert!(k.contains(&"end-block-quote"));
    assert!(k.contains(&"tbreak"));
    assert!(!k.contains(&"setext"));
}

#[test]
fn lazy_continuation_keeps_paragraph_inside_blockquote() {
    let k = kinds("> bar\nbaz");
    let bq_close_idx = k.iter().position(|x| *x == "end-block-quote").unwrap();
    let para_close_idx = k.iter().position(|x| *x == "end-para").unwrap();
    assert!(para_close_idx < bq_close_idx, "paragraph should close before the block quote, proving lazy continuation joined both lines into one paragraph");
}

#[test]
fn blockquote_list_then_unrelated_list_are_separate() {
    let k = kinds("> - foo\n- bar");
    assert_eq!(
        k,
        vec!["block-quote", "ulist", "para", "text", "end-para", "end-list", "end-block-quote", "ulist", "para", "text", "end-para", "end-list"]
    );
}

#[test]
fn tab_indented_nested_list_accounts_for_enclosing_column() {
    let parser = Parser::new(ParserConfig::default()).unwrap();
    let tokens = parser.parse("1. list item\n\t1. inner list item");
    let indents: Vec<usize> = tokens
        .iter()
        .filter_map(|t| match &t.kind {
            TokenKind::OrderedListOpen { indent_level, .. } => Some(*indent_level),
            _ => None,
        })
        .collect();
    assert_eq!(indents, vec![3, 7]);
}

#[test]
fn setext_heading_conversion_balances_tokens() {
    let k = kinds("Title\n=====\n");
    assert_eq!(k, vec!["setext", "text", "end-setext"]);
}

#[test]
fn code_span_around_triple_backtick() {
    let parser = Parser::new(ParserConfig::default()).unwrap();
    let tokens = parser.parse("`` ``` ``");
    let span = tokens.iter().find_map(|t| match &t.kind {
        TokenKind::InlineCodeSpan { payload, .. } => Some(payload.clone()),
        _ => None,
    });
    assert_eq!(span.as_deref(), Some("```"));
}

#[test]
fn every_open_has_a_matching_close() {
    for src in [
        "> # Foo\n> bar\n> baz",
        "> foo\n---",
        "> bar\nbaz",
        "# hi\n\npara\n",
        "> - foo\n- bar",
        "1. list item\n\t1. inner list item",
        "Title\n=====\n",
    ] {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let tokens = parser.parse(src);
        let mut depth = 0i32;
        for t in &tokens {
            if t.kind.is_open() {
                depth += 1;
            } else if t.kind.is_close() {
                depth -= 1;
                assert!(depth >= 0, "depth went negative for {src:?}");
            }
        }
        assert_eq!(depth, 0, "unbalanced open/close for {src:?}");
    }
}

#[test]
fn scenarios_round_trip() {
    for src in ["> # Foo\n> bar\n> baz\n", "> foo\n---\n", "> bar\nbaz\n", "hi\n", "# Title\n"] {
        let parser = Parser::new(ParserConfig::default()).unwrap();
        let tokens = parser.parse(src);
        assert_eq!(Writer::write(&tokens), src, "round-trip mismatch for {src:?}");
    }
}

#[test]
fn heading_renders_expected_html() {
    let parser = Parser::new(ParserConfig::default()).unwrap();
    let tokens = parser.parse("# Foo\n");
    assert_eq!(HtmlRenderer::render(&tokens), "<h1>Foo</h1>\n");
}
