//!
//! Error types for the tokenizer core. Malformed Markdown never produces
//! an error — ambiguous syntax resolves to literal text. The only
//! fallible paths are initialization (the entity table) and extension
//! hooks, which degrade to "did not apply" rather than aborting the
//! parse.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserInitError {
    #[error("Bad tokenization initialization: \"{path}\" not loaded ({cause})")]
    EntityTableLoadFailed { path: String, cause: String },
}

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("extension hook panicked or returned malformed tokens: {0}")]
    HookFailed(String),
}
