//! tcbom: Teamcenter BOM retrieval and Markdown sync
//!
//! Pulls a multi-level bill of materials from a Teamcenter server, rebuilds
//! it as a tree and keeps a folder of Markdown notes in step with it without
//! touching what people wrote in those notes.

pub mod cli;
pub mod core;
pub mod error;
pub mod remote;
pub mod sync;
pub mod workflow;

pub use error::{ErrorKind, TcError, TcResult};
pub use workflow::Workflow;
