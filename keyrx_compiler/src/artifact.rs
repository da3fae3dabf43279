//! `.krx` artifact framing: a magic header, a version, an embedded SHA256
//! content hash, and the canonical keymap text itself.
//!
//! The teacher crate froze a compiled keymap as an `rkyv` archive with the
//! hash recorded alongside it. `keyrx_core`'s `Keymap` never grew `Archive`
//! impls (it leans on `hashbrown`/`Rc`-free interning instead), so this
//! rendition freezes the same canonical text [`keyrx_core::serializer`]
//! already produces and treats that as the payload instead of a binary
//! archive. Reparsing that text with [`keyrx_core::reader`] is how a `.krx`
//! file gets back to a live `Keymap`.

use sha2::{Digest, Sha256};

pub const MAGIC: &[u8; 4] = b"KRX1";
pub const VERSION: u32 = 1;
const HASH_LEN: usize = 32;
pub const HEADER_LEN: usize = MAGIC.len() + 4 + HASH_LEN;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArtifactError {
    #[error("file too small: need at least {HEADER_LEN} bytes, found {found}")]
    TooSmall { found: usize },

    #[error("bad magic bytes: expected {MAGIC:?}, found {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported artifact version: expected {VERSION}, found {found}")]
    VersionMismatch { found: u32 },

    #[error("embedded text is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("hash mismatch: file carries {expected}, contents hash to {computed}")]
    HashMismatch { expected: String, computed: String },
}

/// A decoded `.krx` artifact: the hash the header carries and the text it
/// was computed over. `decode` does not itself verify the hash matches —
/// callers that care use [`verify`].
pub struct Artifact {
    pub hash: [u8; HASH_LEN],
    pub text: String,
}

fn hash_of(text: &str) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

/// Frames `text` as a `.krx` artifact, embedding its SHA256 hash.
pub fn encode(text: &str) -> Vec<u8> {
    let hash = hash_of(text);
    let mut out = Vec::with_capacity(HEADER_LEN + text.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&hash);
    out.extend_from_slice(text.as_bytes());
    out
}

/// Validates the header and extracts the embedded hash and text, without
/// recomputing the hash over the text.
pub fn decode(bytes: &[u8]) -> Result<Artifact, ArtifactError> {
    if bytes.len() < HEADER_LEN {
        return Err(ArtifactError::TooSmall { found: bytes.len() });
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[0..4]);
    if &magic != MAGIC {
        return Err(ArtifactError::BadMagic { found: magic });
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes"));
    if version != VERSION {
        return Err(ArtifactError::VersionMismatch { found: version });
    }
    let mut hash = [0u8; HASH_LEN];
    hash.copy_from_slice(&bytes[8..HEADER_LEN]);
    let text = std::str::from_utf8(&bytes[HEADER_LEN..])?.to_string();
    Ok(Artifact { hash, text })
}

/// Recomputes the hash over an artifact's text and compares it against the
/// embedded one.
pub fn verify(artifact: &Artifact) -> Result<(), ArtifactError> {
    let computed = hash_of(&artifact.text);
    if computed != artifact.hash {
        return Err(ArtifactError::HashMismatch {
            expected: hex::encode(artifact.hash),
            computed: hex::encode(computed),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_recovers_the_text_a_known_good_file_was_encoded_from() {
        let bytes = encode("xkb_keycodes \"t\" {\n    <A> = 9;\n};\n");
        let artifact = decode(&bytes).unwrap();
        assert_eq!(artifact.text, "xkb_keycodes \"t\" {\n    <A> = 9;\n};\n");
        verify(&artifact).unwrap();
    }

    #[test]
    fn decode_rejects_a_file_shorter_than_the_header() {
        let err = decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, ArtifactError::TooSmall { found: 10 }));
    }

    #[test]
    fn decode_rejects_a_bad_magic() {
        let mut bytes = encode("xkb_keycodes \"t\" {};\n");
        bytes[0] = b'X';
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ArtifactError::BadMagic { .. }));
    }

    #[test]
    fn verify_rejects_tampered_text() {
        let mut bytes = encode("xkb_keycodes \"t\" {\n    <A> = 9;\n};\n");
        *bytes.last_mut().unwrap() = b'!';
        let artifact = decode(&bytes).unwrap();
        let err = verify(&artifact).unwrap_err();
        assert!(matches!(err, ArtifactError::HashMismatch { .. }));
    }
}
