// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hygiene;
use crate::mmap_file::MmapFile;
use crate::mmap_limiter::MmapLimiter;
use crate::positional_file::PositionalFile;

/// A read-only file handle supporting reads at arbitrary offsets.
///
/// Obtain one from [`Env::new_random_access_file`](crate::Env::new_random_access_file).
/// Whether the file is served from a memory mapping or from positional reads is decided
/// when it is opened, based on whether the environment's [`MmapLimiter`] had a free slot.
/// Both variants honor the same [`read`](Self::read) contract, so callers normally do not
/// need to care which one they got.
///
/// Dropping the handle releases everything it owns: the mapping and its limiter slot, or
/// the operating system file handle.
#[derive(Debug)]
pub enum RandomAccessFile {
    /// Served from a read-only memory mapping.
    Mapped(MmapFile),

    /// Served by positional reads through an open file handle.
    Buffered(PositionalFile),
}

impl RandomAccessFile {
    pub(crate) fn open(path: &Path, limiter: &Arc<MmapLimiter>) -> Result<Self> {
        let file = hygiene::open_for_read(path).map_err(|e| Error::open(path, e))?;
        let size = file.metadata().map_err(|e| Error::open(path, e))?.len();

        // An empty file has nothing to map, so it never takes a slot.
        if size > 0 {
            if let Some(slot) = limiter.try_acquire_slot() {
                match MmapFile::map(path, &file, slot) {
                    Ok(mapped) => {
                        tracing::debug!(path = %path.display(), size, "serving file from memory mapping");
                        return Ok(Self::Mapped(mapped));
                    }
                    Err(error) => {
                        tracing::debug!(%error, "falling back to positional reads");
                    }
                }
            } else {
                tracing::debug!(
                    path = %path.display(),
                    total_slots = limiter.total_slots(),
                    "mmap slots exhausted, serving file with positional reads"
                );
            }
        }

        Ok(Self::Buffered(PositionalFile::new(path, file, size)))
    }

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// The returned slice either borrows the memory mapping directly or is a prefix of
    /// `scratch`, which receives the bytes of a positional read. It is shorter than `len`
    /// only when the end of the file is reached; reading at or past the end of the file
    /// returns an empty slice. A `len` of zero is a valid no-op.
    ///
    /// # Panics
    ///
    /// Panics if `len > scratch.len()`, regardless of which variant serves the read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the operating system reports an I/O error. Memory-mapped
    /// reads never fail.
    pub fn read<'a>(&'a self, offset: u64, len: usize, scratch: &'a mut [u8]) -> Result<&'a [u8]> {
        assert!(len <= scratch.len(), "len must not exceed scratch.len()");
        match self {
            Self::Mapped(mapped) => Ok(mapped.read(offset, len)),
            Self::Buffered(positional) => positional.read(offset, &mut scratch[..len]),
        }
    }

    /// The size of the file at the time it was opened.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::Mapped(mapped) => mapped.size(),
            Self::Buffered(positional) => positional.size(),
        }
    }

    /// The path this file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Mapped(mapped) => mapped.path(),
            Self::Buffered(positional) => positional.path(),
        }
    }

    /// Returns `true` if reads are served from a memory mapping.
    #[must_use]
    pub const fn is_memory_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }
}
