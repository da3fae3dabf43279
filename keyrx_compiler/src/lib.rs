//! KeyRx Compiler Library
//!
//! Compiles canonical XKB-style keymap text ([`keyrx_core::reader`]) into an
//! in-memory [`keyrx_core::domain::aggregates::Keymap`] and freezes it as a
//! `.krx` artifact ([`artifact`]): a magic header, a SHA256 content hash,
//! and the canonical text itself.

use std::path::Path;

use keyrx_core::compiler::assembler::Assembler;
use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::domain::events::DiagnosticBus;
use keyrx_core::domain::value_objects::MergeMode;
use keyrx_core::error::CoreResult;
use keyrx_core::reader;

pub mod artifact;
pub mod cli;
pub mod error;

pub use cli::compile::handle_compile;
pub use error::CompileError;

/// Parses and assembles canonical keymap text into a live `Keymap`,
/// returning whatever diagnostics the section compilers recorded along the
/// way. Every CLI subcommand that needs a compiled keymap goes through this.
pub fn compile_text(text: &str) -> CoreResult<(Keymap, DiagnosticBus)> {
    compile_text_with_merge(text, None)
}

/// As [`compile_text`], but `merge` — when given — overrides the merge mode
/// the reader assigned every top-level section (the reader itself always
/// produces `MergeMode::Default`, since canonical text carries no merge
/// keyword of its own). This is the CLI's `--merge` override.
pub fn compile_text_with_merge(
    text: &str,
    merge: Option<MergeMode>,
) -> CoreResult<(Keymap, DiagnosticBus)> {
    let mut keymap = Keymap::new();
    let mut sections = reader::read(text, &mut keymap)?;
    if let Some(mode) = merge {
        if let Some(section) = &mut sections.keycodes {
            section.merge = mode;
        }
        if let Some(section) = &mut sections.types {
            section.merge = mode;
        }
        if let Some(section) = &mut sections.compat {
            section.merge = mode;
        }
        if let Some(section) = &mut sections.symbols {
            section.merge = mode;
        }
    }
    let diagnostics = Assembler::new().assemble(&sections, &mut keymap)?;
    Ok((keymap, diagnostics))
}

/// Compiles a canonical-text keymap file to a `.krx` artifact.
///
/// # Errors
///
/// Returns `CompileError` if reading, parsing, assembling or writing fails.
pub fn compile_file(input: &Path, output: &Path) -> Result<(), CompileError> {
    cli::compile::handle_compile(input, output, None)
}
