//! CLI error hierarchy.
//!
//! `keyrx_core` stays on hand-written `Display` impls because it is
//! `no_std` (see `keyrx_core::error`); this crate is ordinary `std` code, so
//! it uses `thiserror` the way `keyrx_daemon::error` does — one
//! `#[non_exhaustive]` enum per concern, `#[from]` on the wrapped causes.

use std::path::PathBuf;

use keyrx_core::error::CoreError;
use thiserror::Error;

use crate::artifact::ArtifactError;

/// Failures reading or writing a file, common to every subcommand.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}", path = path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the `compile` subcommand.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("could not compile keymap: {0}")]
    Compile(#[from] CoreError),

    #[error(
        "compilation reported {error_count} error(s); refusing to write an artifact for a keymap that failed to compile cleanly"
    )]
    DirtyCompile { error_count: usize },
}

/// Errors from the `check` subcommand (compile without writing an artifact).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("could not compile keymap: {0}")]
    Compile(#[from] CoreError),
}

/// Errors from the `hash` subcommand.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HashError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Errors from the `verify` subcommand.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VerifyError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("artifact text no longer compiles cleanly: {0}")]
    Compile(#[from] CoreError),
}

/// Errors from the `view` subcommand.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViewError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("could not compile keymap: {0}")]
    Compile(#[from] CoreError),
}
