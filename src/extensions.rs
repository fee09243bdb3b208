//!
//! Extension registry. The core never hardcodes GFM
//! extensions (front-matter, tables, strikethrough, task lists, extended
//! autolinks, disallow-raw-html, pragma comments) — it exposes a fixed
//! set of hook points and invokes registered extensions in order,
//! first-success-wins, a dynamic-dispatch `Vec<Box<dyn Trait>>` registry.

use crate::block_stack::BlockStack;
use crate::error::ExtensionError;
use crate::line_source::Line;
use crate::token::Token;

/// Capability-set interface an extension implements. Any hook may be a
/// no-op (return `None`); the core treats "hook did not apply" and "hook
/// errored" identically — an extension cannot corrupt the
/// token stream by failing.
pub trait Extension {
    fn name(&self) -> &'static str;

    /// Attempt to recognize a new block starting at `line`, given the
    /// container/leaf stack so far. Returns the tokens to emit and how
    /// many lines were consumed.
    fn try_block_start(&self, _stack: &BlockStack, _line: &Line) -> Result<Option<(Vec<Token>, usize)>, ExtensionError> {
        Ok(None)
    }

    /// Attempt to recognize inline content at byte offset `pos` in `text`.
    /// Returns the tokens to emit and how many bytes were consumed.
    fn try_inline(&self, _text: &str, _pos: usize) -> Result<Option<(Vec<Token>, usize)>, ExtensionError> {
        Ok(None)
    }

    /// Post-process the finalized token stream (e.g. to fold adjacent
    /// extension-specific tokens).
    fn on_finalize(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
    }
}

/// Holds registered extensions and dispatches hooks in registration
/// order. A static registry — no dynamic plugin loading.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self { extensions: Vec::new() }
    }

    pub fn register(&mut self, extension: Box<dyn Extension>) {
        self.extensions.push(extension);
    }

    pub fn try_block_start(&self, stack: &BlockStack, line: &Line) -> Option<(Vec<Token>, usize)> {
        for ext in &self.extensions {
            match ext.try_block_start(stack, line) {
                Ok(Some(result)) => {
                    log::debug!("extension {} matched block start at line {}", ext.name(), line.line_number);
                    return Some(result);
                }
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("extension {} try_block_start failed, skipping: {e}", ext.name());
                    continue;
                }
            }
        }
        None
    }

    pub fn try_inline(&self, text: &str, pos: usize) -> Option<(Vec<Token>, usize)> {
        for ext in &self.extensions {
            match ext.try_inline(text, pos) {
                Ok(Some(result)) => return Some(result),
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("extension {} try_inline failed, skipping: {e}", ext.name());
                    continue;
                }
            }
        }
        None
    }

    pub fn on_finalize(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for ext in &self.extensions {
            tokens = ext.on_finalize(tokens);
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    struct AlwaysNoop;
    impl Extension for AlwaysNoop {
        fn name(&self) -> &'static str {
            "noop"
        }
    }

    struct AlwaysFails;
    impl Extension for AlwaysFails {
        fn name(&self) -> &'static str {
            "fails"
        }
        fn try_block_start(&self, _stack: &BlockStack, _line: &Line) -> Result<Option<(Vec<Token>, usize)>, ExtensionError> {
            Err(ExtensionError::HookFailed("boom".into()))
        }
    }

    struct AlwaysMatches;
    impl Extension for AlwaysMatches {
        fn name(&self) -> &'static str {
            "matches"
        }
        fn try_block_start(&self, _stack: &BlockStack, line: &Line) -> Result<Option<(Vec<Token>, usize)>, ExtensionError> {
            Ok(Some((vec![Token::new(line.line_number, 1, 0, TokenKind::BlankLine { extracted_whitespace: String::new() })], 1)))
        }
    }

    #[test]
    fn errored_hook_is_skipped_not_fatal() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(AlwaysFails));
        registry.register(Box::new(AlwaysMatches));
        let stack = BlockStack::new();
        let line = Line::new("x", 1);
        assert!(registry.try_block_start(&stack, &line).is_some());
    }

    #[test]
    fn first_success_wins() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(AlwaysNoop));
        registry.register(Box::new(AlwaysMatches));
        let stack = BlockStack::new();
        let line = Line::new("x", 1);
        let (tokens, consumed) = registry.try_block_start(&stack, &line).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(tokens.len(), 1);
    }
}
