// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hygiene;

/// A file opened for appending, created if it did not exist.
///
/// Obtain one from [`Env::new_appendable_file`](crate::Env::new_appendable_file). Writes
/// always land at the end of the file. Like every handle created by this crate, the
/// underlying handle is not inherited by child processes.
#[derive(Debug)]
pub struct AppendableFile {
    path: PathBuf,
    file: File,
}

impl AppendableFile {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = hygiene::open_for_append(path).map_err(|e| Error::open(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// The path this file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends all of `data` to the end of the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the operating system rejects the write.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data).map_err(|e| Error::write(&self.path, e))
    }

    /// Flushes buffered data to the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush().map_err(|e| Error::write(&self.path, e))
    }

    /// Flushes data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sync fails.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all().map_err(|e| Error::write(&self.path, e))
    }
}

#[cfg(unix)]
impl std::os::fd::AsFd for AppendableFile {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        self.file.as_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsHandle for AppendableFile {
    fn as_handle(&self) -> std::os::windows::io::BorrowedHandle<'_> {
        self.file.as_handle()
    }
}
