//! Completion engine for hleb-lsp.
//!
//! Determines which framework argument the cursor is in and provides the
//! values it can take from the framework index.

pub mod context;
pub mod provider;
