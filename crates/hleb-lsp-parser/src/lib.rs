//! PHP parser for hleb-lsp.
//!
//! Wraps tree-sitter-php for incremental parsing and provides the call-site
//! model, import resolution and syntax diagnostics the framework features
//! are built on.

pub mod calls;
pub mod diagnostics;
pub mod literal;
pub mod parser;
pub mod position;
pub mod symbols;
