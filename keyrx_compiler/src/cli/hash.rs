//! `hash` subcommand: extract (and optionally verify) a `.krx` artifact's
//! embedded SHA256 content hash.

use std::fs;
use std::path::Path;

use crate::artifact;
use crate::error::{HashError, SourceError};

/// Prints the embedded hash; with `verify`, also recomputes it over the
/// artifact's text and fails if the two disagree.
pub fn handle_hash(file: &Path, verify: bool) -> Result<(), HashError> {
    let bytes = fs::read(file).map_err(|source| SourceError::Read {
        path: file.to_path_buf(),
        source,
    })?;

    let decoded = artifact::decode(&bytes)?;
    println!("{}", hex::encode(decoded.hash));

    if verify {
        match artifact::verify(&decoded) {
            Ok(()) => eprintln!("\u{2713} hash matches"),
            Err(err) => {
                eprintln!("\u{2717} hash mismatch");
                return Err(err.into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_krx(text: &str) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), artifact::encode(text)).unwrap();
        file
    }

    #[test]
    fn extracts_the_embedded_hash() {
        let file = write_krx("xkb_keycodes \"t\" {};\n");
        assert!(handle_hash(file.path(), false).is_ok());
    }

    #[test]
    fn verify_succeeds_on_an_untampered_file() {
        let file = write_krx("xkb_keycodes \"t\" {};\n");
        assert!(handle_hash(file.path(), true).is_ok());
    }

    #[test]
    fn verify_fails_on_a_tampered_file() {
        let file = write_krx("xkb_keycodes \"t\" {};\n");
        let mut bytes = fs::read(file.path()).unwrap();
        *bytes.last_mut().unwrap() ^= 0xFF;
        fs::write(file.path(), &bytes).unwrap();

        let err = handle_hash(file.path(), true).unwrap_err();
        assert!(matches!(err, HashError::Artifact(_)));
    }

    #[test]
    fn rejects_a_file_too_small_to_be_a_krx_header() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), [0u8; 10]).unwrap();
        let err = handle_hash(file.path(), false).unwrap_err();
        assert!(matches!(err, HashError::Artifact(_)));
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let err = handle_hash(Path::new("/no/such/file.krx"), false).unwrap_err();
        assert!(matches!(err, HashError::Source(_)));
    }
}
