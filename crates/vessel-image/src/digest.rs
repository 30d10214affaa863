//! SHA-256 content addressing.
//!
//! All layers and blobs are identified by the digest of their bytes, so
//! identical content always resolves to the same storage location.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::Sha256Digest;

/// Computes the SHA-256 digest of a byte slice.
///
/// # Errors
///
/// Returns an error only if the computed digest fails validation, which
/// would indicate a bug.
pub fn hash_bytes(bytes: &[u8]) -> Result<Sha256Digest> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Sha256Digest::from_hex(format!("{:x}", hasher.finalize()))
}

/// Computes the SHA-256 digest of a file, streaming its contents.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<Sha256Digest> {
    let file = std::fs::File::open(path).map_err(|e| VesselError::io(path.to_path_buf(), e))?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| VesselError::io(path.to_path_buf(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = Sha256Digest::from_hex(format!("{:x}", hasher.finalize()))?;
    tracing::debug!(path = %path.display(), digest = %digest, "file hashed");
    Ok(digest)
}

/// Validates that a file's content matches the expected digest.
///
/// # Errors
///
/// Returns `VesselError::DigestMismatch` if the digests differ, or an I/O
/// error if the file cannot be read.
pub fn verify_file(path: &Path, expected: &Sha256Digest) -> Result<()> {
    let actual = hash_file(path)?;
    if actual != *expected {
        return Err(VesselError::DigestMismatch {
            resource: path.display().to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known SHA-256 of the empty input.
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_bytes_of_empty_input_matches_known_value() {
        let digest = hash_bytes(b"").expect("hash");
        assert_eq!(digest.as_hex(), EMPTY_SHA256);
    }

    #[test]
    fn hash_file_matches_hash_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob");
        std::fs::write(&path, b"layer content").expect("write");

        let from_file = hash_file(&path).expect("hash_file");
        let from_bytes = hash_bytes(b"layer content").expect("hash_bytes");
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn verify_file_accepts_matching_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob");
        std::fs::write(&path, b"data").expect("write");
        let digest = hash_file(&path).expect("hash");
        verify_file(&path, &digest).expect("verify");
    }

    #[test]
    fn verify_file_rejects_tampered_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob");
        std::fs::write(&path, b"data").expect("write");
        let digest = hash_file(&path).expect("hash");

        std::fs::write(&path, b"tampered").expect("rewrite");
        let err = verify_file(&path, &digest).unwrap_err();
        assert!(err.to_string().contains("digest mismatch"), "{err}");
    }

    #[test]
    fn hash_file_missing_path_is_error() {
        assert!(hash_file(Path::new("/nonexistent/blob")).is_err());
    }
}
