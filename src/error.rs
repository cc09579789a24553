//! Error taxonomy shared by the remote client, tree reconstruction and sync
//!
//! Every public operation either returns its typed result or fails with one
//! of these variants. Nothing here retries; the caller decides whether the
//! user should run the whole operation again.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`TcError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    NotFound,
    Protocol,
    Transport,
    PartialSync,
    Usage,
    Io,
}

#[derive(Debug, Error, Diagnostic)]
pub enum TcError {
    #[error("Authentication failed: {0}")]
    #[diagnostic(
        code(tcbom::auth),
        help("check the user name and password, then run the command again")
    )]
    Authentication(String),

    #[error("Not logged in")]
    #[diagnostic(
        code(tcbom::auth::no_session),
        help("log in before issuing server requests")
    )]
    NotAuthenticated,

    #[error("Not found: {0}")]
    #[diagnostic(code(tcbom::not_found))]
    NotFound(String),

    #[error("Unexpected server response: {0}")]
    #[diagnostic(code(tcbom::protocol))]
    Protocol(String),

    #[error("Transport error: {0}")]
    #[diagnostic(
        code(tcbom::transport),
        help("check the server address, port and network connection")
    )]
    Transport(String),

    #[error("Sync stopped at {} after {completed} node(s): {source}", .path.display())]
    #[diagnostic(
        code(tcbom::sync::partial),
        help("documents written before the failure were kept; fix the cause and sync again")
    )]
    PartialSync {
        path: PathBuf,
        completed: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("No BOM loaded")]
    #[diagnostic(
        code(tcbom::sync::no_tree),
        help("run a search (or pass --from with a saved BOM) before syncing")
    )]
    NoTree,

    #[error("Configuration error: {0}")]
    #[diagnostic(code(tcbom::config))]
    Config(String),

    #[error("Template error: {0}")]
    #[diagnostic(code(tcbom::template))]
    Template(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(tcbom::io))]
    Io(#[from] std::io::Error),
}

impl TcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TcError::Authentication(_) | TcError::NotAuthenticated => ErrorKind::Authentication,
            TcError::NotFound(_) => ErrorKind::NotFound,
            TcError::Protocol(_) => ErrorKind::Protocol,
            TcError::Transport(_) => ErrorKind::Transport,
            TcError::PartialSync { .. } => ErrorKind::PartialSync,
            TcError::NoTree | TcError::Config(_) | TcError::Template(_) => ErrorKind::Usage,
            TcError::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for a protocol error about a missing response field
    pub(crate) fn missing(field: &str) -> Self {
        TcError::Protocol(format!("missing field `{}`", field))
    }
}

impl From<reqwest::Error> for TcError {
    fn from(err: reqwest::Error) -> Self {
        TcError::Transport(err.to_string())
    }
}

/// Result type alias using TcError.
pub type TcResult<T> = Result<T, TcError>;
