//! HLEB2 language server.
//!
//! Framework-aware hovers, definitions, completion, document links and
//! diagnostics for HLEB2 PHP projects, served over LSP.

pub mod annotations;
pub mod content;
pub mod server;
pub mod settings;

pub use server::HlebLspBackend;
