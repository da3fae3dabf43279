//! `verify` subcommand: confirm a `.krx` artifact's content hash matches
//! its text, and that the text still compiles cleanly.

use std::fs;
use std::path::Path;

use crate::artifact;
use crate::compile_text;
use crate::error::{SourceError, VerifyError};

pub fn handle_verify(file: &Path) -> Result<(), VerifyError> {
    let bytes = fs::read(file).map_err(|source| SourceError::Read {
        path: file.to_path_buf(),
        source,
    })?;

    let decoded = artifact::decode(&bytes)?;
    artifact::verify(&decoded)?;

    let (keymap, diagnostics) = compile_text(&decoded.text)?;
    if diagnostics.error_count() > 0 {
        return Err(VerifyError::Compile(keyrx_core::error::CoreError::TooManyErrors {
            file: file.display().to_string(),
            count: diagnostics.error_count(),
        }));
    }

    println!(
        "{}: hash OK, {} keys compile cleanly",
        file.display(),
        keymap.keys.len()
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
    fn verifies_a_freshly_compiled_artifact() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), artifact::encode(FIXTURE)).unwrap();
        assert!(handle_verify(file.path()).is_ok());
    }

    #[test]
    fn rejects_a_hash_that_no_longer_matches_the_text() {
        let file = NamedTempFile::new().unwrap();
        let mut bytes = artifact::encode(FIXTURE);
        *bytes.last_mut().unwrap() ^= 0xFF;
        fs::write(file.path(), &bytes).unwrap();

        let err = handle_verify(file.path()).unwrap_err();
        assert!(matches!(err, VerifyError::Artifact(_)));
    }
}
