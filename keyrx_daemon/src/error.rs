//! Error types for the `keyrx_daemon` demo binary.
//!
//! Trimmed to the two things this crate actually does: load a compiled (or
//! canonical-text) keymap, and replay a synthetic event script against it.
//! Follows the same one-`#[non_exhaustive]`-enum-per-concern,
//! `#[from]`-on-wrapped-causes shape as `keyrx_compiler::error`.

use std::path::PathBuf;

use keyrx_core::error::CoreError;
use thiserror::Error;

use crate::demo::EventScriptError;
use keyrx_compiler::artifact::ArtifactError;

/// Failures reading or writing a file, shared across subcommands.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading a keymap, whether from canonical text or a `.krx`
/// artifact (distinguished by file extension).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeymapLoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("could not compile keymap: {0}")]
    Compile(#[from] CoreError),

    #[error(
        "compilation reported {error_count} error(s); refusing to run the demo against a keymap that failed to compile cleanly"
    )]
    DirtyCompile { error_count: usize },
}

/// Top-level error for the `run` subcommand.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DemoError {
    #[error(transparent)]
    Keymap(#[from] KeymapLoadError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    EventScript(#[from] EventScriptError),
}
