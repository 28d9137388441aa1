//! Framework model for hleb-lsp.
//!
//! Holds what the language features need to know about an HLEB2 project:
//! its files, configuration documents, declared routes and composer
//! manifest, plus the resolution rules for path, view and config arguments.

pub mod composer;
pub mod config;
pub mod detect;
pub mod error;
pub mod framework;
pub mod paths;
pub mod routes;
pub mod tree;
pub mod views;
pub mod workspace;

pub use error::{IndexError, IndexResult};
pub use workspace::{FileChange, FrameworkIndex};
