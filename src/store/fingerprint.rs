// src/store/fingerprint.rs

use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::Fingerprint;

/// Fingerprint of an in-memory document.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    Fingerprint::from_hex(hasher.finalize().to_hex().to_string())
}

/// Read `path` and fingerprint its contents, returning both.
pub fn read_with_fingerprint(fs: &dyn FileSystem, path: &Path) -> Result<(Vec<u8>, Fingerprint)> {
    let bytes = fs.read(path)?;
    let fingerprint = fingerprint_bytes(&bytes);
    debug!(path = ?path, %fingerprint, "fingerprinted document");
    Ok((bytes, fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn tracks_content_not_identity() {
        let fs = MockFileSystem::new();
        fs.add_file("a.json", b"{}".to_vec());
        fs.add_file("b.json", b"{}".to_vec());

        let (_, a) = read_with_fingerprint(&fs, Path::new("a.json")).unwrap();
        let (_, b) = read_with_fingerprint(&fs, Path::new("b.json")).unwrap();
        assert_eq!(a, b);

        fs.add_file("b.json", b"{ }".to_vec());
        let (_, b2) = read_with_fingerprint(&fs, Path::new("b.json")).unwrap();
        assert_ne!(a, b2);
    }

    #[test]
    fn matches_blake3_hex() {
        let fp = fingerprint_bytes(b"hello world");
        assert_eq!(
            fp.as_str(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }
}
