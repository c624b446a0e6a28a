//! Deciding whether a destination file needs to be overwritten.
//!
//! Comparison is cheapest-first: a missing destination or a size mismatch
//! settles the question without reading either file. Only equal-size pairs
//! are hashed, which catches same-size edits (the common case for
//! fixed-size battery saves) that size or timestamps alone would miss.
//! Timestamps are never consulted.

use crate::utils::hash::{ContentDigest, DEFAULT_CHUNK_SIZE, hash_file_streaming, to_hex};
use anyhow::{Context, Result, bail};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{Level, debug, span};

/// Produces a content digest for a file.
pub trait ContentHasher {
    /// Digest of the full byte stream of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn digest(&self, path: &Path) -> Result<ContentDigest>;
}

/// Streaming SHA-256 hasher reading in fixed-size chunks.
#[derive(Debug, Clone, Copy)]
pub struct Sha256Hasher {
    /// Read buffer size in bytes
    chunk_size: usize,
}

impl Sha256Hasher {
    /// Hasher reading `chunk_size` bytes at a time.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ContentHasher for Sha256Hasher {
    fn digest(&self, path: &Path) -> Result<ContentDigest> {
        hash_file_streaming(path, self.chunk_size)
    }
}

/// Why a source file does or does not match its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Nothing exists at the destination path.
    Missing,
    /// Both exist with different sizes.
    SizeMismatch {
        /// Source length in bytes
        source: u64,
        /// Destination length in bytes
        dest: u64,
    },
    /// Same size, different digests.
    ContentMismatch,
    /// Same size and digest.
    Identical,
}

impl Comparison {
    /// Whether the destination must be rewritten.
    #[must_use]
    pub const fn differs(self) -> bool {
        !matches!(self, Self::Identical)
    }

    /// Short label used in progress and log lines.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Missing => "new",
            Self::SizeMismatch { .. } => "size changed",
            Self::ContentMismatch => "content changed",
            Self::Identical => "unchanged",
        }
    }
}

/// Compares a source file with its destination counterpart.
#[derive(Debug, Clone, Default)]
pub struct ContentComparator<H = Sha256Hasher> {
    /// Digest used for equal-size pairs
    hasher: H,
}

impl<H: ContentHasher> ContentComparator<H> {
    /// Comparator hashing with `hasher`.
    pub const fn new(hasher: H) -> Self {
        Self { hasher }
    }

    /// Full comparison result for `source` against `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or unreadable, or if the
    /// destination exists but is a directory or cannot be inspected.
    pub fn compare(&self, source: &Path, dest: &Path) -> Result<Comparison> {
        let span = span!(Level::DEBUG, "compare", source = %source.display());
        let _guard = span.enter();

        let dest_meta = match std::fs::metadata(dest) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Comparison::Missing),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", dest.display()));
            }
        };
        if dest_meta.is_dir() {
            bail!("Destination is a directory: {}", dest.display());
        }
        let source_meta = std::fs::metadata(source)
            .with_context(|| format!("Failed to stat {}", source.display()))?;

        if source_meta.len() != dest_meta.len() {
            return Ok(Comparison::SizeMismatch {
                source: source_meta.len(),
                dest: dest_meta.len(),
            });
        }

        let source_digest = self.hasher.digest(source)?;
        let dest_digest = self.hasher.digest(dest)?;
        debug!(
            size = source_meta.len(),
            source_digest = %to_hex(&source_digest),
            dest_digest = %to_hex(&dest_digest),
            "Hashed equal-size pair"
        );

        if source_digest == dest_digest {
            Ok(Comparison::Identical)
        } else {
            Ok(Comparison::ContentMismatch)
        }
    }

    /// Whether `dest` must be rewritten from `source`.
    ///
    /// # Errors
    ///
    /// See [`ContentComparator::compare`].
    pub fn differs(&self, source: &Path, dest: &Path) -> Result<bool> {
        Ok(self.compare(source, dest)?.differs())
    }
}

impl<H: ContentHasher> ContentHasher for &H {
    fn digest(&self, path: &Path) -> Result<ContentDigest> {
        (**self).digest(path)
    }
}
