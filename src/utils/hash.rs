use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default read buffer for streaming hashes.
pub const DEFAULT_CHUNK_SIZE: usize = 65_536;

/// A SHA-256 content digest.
pub type ContentDigest = [u8; 32];

/// SHA-256 digest of an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> ContentDigest {
    Sha256::digest(data).into()
}

/// Hashes a file in fixed-size chunks so memory use is bounded by
/// `chunk_size` regardless of file size.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file_streaming(path: &Path, chunk_size: usize) -> Result<ContentDigest> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// Formats a digest as 64 lowercase hex characters.
#[must_use]
pub fn to_hex(digest: &ContentDigest) -> String {
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
