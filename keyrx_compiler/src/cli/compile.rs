//! `compile` subcommand: canonical keymap text in, `.krx` artifact out.

use std::fs;
use std::path::Path;

use keyrx_core::domain::value_objects::MergeMode;

use crate::artifact;
use crate::compile_text_with_merge;
use crate::error::{CompileError, SourceError};

/// Reads `input`, compiles it, and writes the resulting `.krx` artifact to
/// `output`. `merge`, when given, overrides the merge mode of every
/// top-level section the reader parsed. Diagnostics (warnings, recoverable
/// collisions) are logged through the `log` facade as they are produced;
/// the artifact is only written once compilation reports zero errors.
pub fn handle_compile(
    input: &Path,
    output: &Path,
    merge: Option<MergeMode>,
) -> Result<(), CompileError> {
    let text = fs::read_to_string(input).map_err(|source| SourceError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let (keymap, mut diagnostics) = compile_text_with_merge(&text, merge)?;
    let error_count = diagnostics.error_count();
    for diagnostic in diagnostics.drain() {
        match diagnostic.severity {
            keyrx_core::domain::events::Severity::Warning => log::warn!("{}", diagnostic.message),
            keyrx_core::domain::events::Severity::Error => log::error!("{}", diagnostic.message),
        }
    }
    if error_count > 0 {
        return Err(CompileError::DirtyCompile { error_count });
    }

    let serialized = keyrx_core::serializer::serialize(&keymap);
    let bytes = artifact::encode(&serialized);
    fs::write(output, &bytes).map_err(|source| SourceError::Write {
        path: output.to_path_buf(),
        source,
    })?;

    println!(
        "Compiled {} -> {} ({} bytes)",
        input.display(),
        output.display(),
        bytes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const FIXTURE: &str = r#"xkb_keycodes "t" {
    <ESC> = 9;
};
xkb_symbols "t" {
    key <ESC> { [ Escape ] };
};
"#;

    #[test]
    fn compiles_a_valid_keymap_to_an_artifact() {
        let input = NamedTempFile::new().unwrap();
        fs::write(input.path(), FIXTURE).unwrap();
        let output = NamedTempFile::new().unwrap();

        handle_compile(input.path(), output.path(), None).unwrap();

        let bytes = fs::read(output.path()).unwrap();
        let decoded = artifact::decode(&bytes).unwrap();
        artifact::verify(&decoded).unwrap();
        assert!(decoded.text.contains("ESC"));
    }

    #[test]
    fn reports_a_parse_error_without_writing_an_artifact() {
        let input = NamedTempFile::new().unwrap();
        fs::write(input.path(), "not a valid keymap at all {{{").unwrap();
        let output = NamedTempFile::new().unwrap();

        let err = handle_compile(input.path(), output.path(), None).unwrap_err();
        assert!(matches!(err, CompileError::Compile(_)));
    }

    #[test]
    fn missing_input_file_is_a_source_error() {
        let output = NamedTempFile::new().unwrap();
        let err =
            handle_compile(Path::new("/no/such/file.xkb"), output.path(), None).unwrap_err();
        assert!(matches!(err, CompileError::Source(_)));
    }

    #[test]
    fn merge_override_replaces_every_top_level_section_merge_mode() {
        let input = NamedTempFile::new().unwrap();
        fs::write(input.path(), FIXTURE).unwrap();
        let output = NamedTempFile::new().unwrap();

        assert!(handle_compile(input.path(), output.path(), Some(MergeMode::Augment)).is_ok());
    }
}
