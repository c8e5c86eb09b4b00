// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// The largest offset the OS accepts for a positional read; file offsets are signed.
const MAX_OFFSET: u64 = i64::MAX.cast_unsigned();

/// A random-access file served by explicit positional reads.
///
/// This is the variant used when no memory-mapping slot is available, when mapping the
/// file failed, or when the file is empty. It owns exactly one operating system handle
/// and no mapping slot.
///
/// Reads on one handle are serialized by a lock: on Windows a positional read moves the
/// file cursor as a side effect, so two concurrent reads through the same handle could
/// otherwise observe each other's seek. Distinct handles never contend.
#[derive(Debug)]
pub struct PositionalFile {
    path: PathBuf,
    size: u64,
    file: Mutex<File>,
}

impl PositionalFile {
    pub(crate) fn new(path: &Path, file: File, size: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            size,
            file: Mutex::new(file),
        }
    }

    /// The path this file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The size of the file at the time it was opened.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Fills `scratch` with bytes starting at `offset`, stopping early only at end of file.
    ///
    /// Returns the prefix of `scratch` that was filled. Offsets beyond [`MAX_OFFSET`] are
    /// past the end of any file and read as end of file.
    pub(crate) fn read<'a>(&self, offset: u64, scratch: &'a mut [u8]) -> Result<&'a [u8]> {
        let file = self.file.lock();
        let mut total = 0;
        while total < scratch.len() {
            let current_offset = offset.saturating_add(total as u64);
            // The OS rejects such offsets with EINVAL instead of reporting end of file.
            if current_offset > MAX_OFFSET {
                break;
            }
            match positional_read(&file, &mut scratch[total..], current_offset) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::read(&self.path, offset, e)),
            }
        }
        Ok(&scratch[..total])
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for PositionalFile {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::AsRawFd;
        self.file.lock().as_raw_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawHandle for PositionalFile {
    fn as_raw_handle(&self) -> std::os::windows::io::RawHandle {
        use std::os::windows::io::AsRawHandle;
        self.file.lock().as_raw_handle()
    }
}

/// Reads bytes at `offset` without relying on the cursor.
#[cfg(unix)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

/// Reads bytes at `offset`; moves the cursor as a side effect.
#[cfg(windows)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}
