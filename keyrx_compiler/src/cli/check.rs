//! `check` subcommand: compile a keymap and report diagnostics without
//! writing an artifact. Useful for validating a keymap while editing it.

use std::fs;
use std::path::Path;

use crate::compile_text;
use crate::error::format_error;
use crate::error::{CheckError, SourceError};

pub fn handle_check(input: &Path) -> Result<(), CheckError> {
    let text = fs::read_to_string(input).map_err(|source| SourceError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    match compile_text(&text) {
        Ok((keymap, mut diagnostics)) => {
            let warning_count = diagnostics.iter().count() - diagnostics.error_count();
            let error_count = diagnostics.error_count();
            for diagnostic in diagnostics.drain() {
                match diagnostic.severity {
                    keyrx_core::domain::events::Severity::Warning => {
                        log::warn!("{}", diagnostic.message)
                    }
                    keyrx_core::domain::events::Severity::Error => {
                        log::error!("{}", diagnostic.message)
                    }
                }
            }
            println!(
                "{} keys, {} modifiers, {} interprets — {} warning(s), {} error(s)",
                keymap.keys.len(),
                keymap.mods.len(),
                keymap.interprets.len(),
                warning_count,
                error_count
            );
            Ok(())
        }
        Err(err) => {
            eprint!("{}", format_error(&err, input, &text));
            Err(CheckError::Compile(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn a_clean_keymap_checks_ok() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            "xkb_keycodes \"t\" {\n    <ESC> = 9;\n};\n",
        )
        .unwrap();
        assert!(handle_check(file.path()).is_ok());
    }

    #[test]
    fn a_malformed_keymap_reports_a_compile_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "not a keymap").unwrap();
        let err = handle_check(file.path()).unwrap_err();
        assert!(matches!(err, CheckError::Compile(_)));
    }
}
