// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::mmap_limiter::MmapSlot;

/// A random-access file served from a read-only memory mapping of its whole contents.
///
/// The mapping occupies one slot of the [`MmapLimiter`](crate::MmapLimiter) it was admitted
/// by. The file handle used to create the mapping is closed once the mapping exists, so
/// this variant holds no operating system file handle.
///
/// Reads are zero-copy and lock-free.
#[derive(Debug)]
pub struct MmapFile {
    path: PathBuf,
    // Declared before `mmap` so the slot returns to the limiter before the view is unmapped.
    _slot: MmapSlot,
    mmap: Mmap,
}

impl MmapFile {
    /// Maps all of `file` read-only, taking ownership of `slot` for the lifetime of the mapping.
    ///
    /// On failure the slot is dropped and thereby returned to its limiter.
    pub(crate) fn map(path: &Path, file: &File, slot: MmapSlot) -> Result<Self, MapError> {
        // SAFETY: Files served through this layer are immutable once written; the storage
        // engine never truncates or rewrites a file while readers have it open.
        let mmap = unsafe { Mmap::map(file) }.map_err(|source| MapError {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            _slot: slot,
            mmap,
        })
    }

    /// The path this file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The size of the mapped file.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Returns the bytes in `[offset, offset + len)`, clamped to the end of the file.
    pub(crate) fn read(&self, offset: u64, len: usize) -> &[u8] {
        let size = self.mmap.len();
        let start = usize::try_from(offset).map_or(size, |offset| offset.min(size));
        let end = start.saturating_add(len).min(size);
        &self.mmap[start..end]
    }
}

/// Mapping a file into memory failed.
///
/// This never reaches callers of the crate: the provider logs it and serves the file with
/// positional reads instead.
#[derive(Debug, thiserror::Error)]
#[error("cannot memory-map {}: {source}", .path.display())]
pub(crate) struct MapError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}
