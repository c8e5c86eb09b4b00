// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Any error surfaced by the file-access layer.
///
/// Every variant names the offending path and carries the operating system error that
/// caused it, so callers can tell which class of operation failed without parsing
/// messages. Nothing in this crate retries; retry policy belongs to the caller.
///
/// Failing to memory-map a file has no variant: that failure is recovered internally by
/// falling back to buffered positional reads.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A file could not be opened or its size could not be determined.
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        /// The path that was being opened.
        path: PathBuf,
        /// The underlying operating system error.
        #[source]
        source: std::io::Error,
    },

    /// A positional read failed with a genuine I/O error.
    ///
    /// Reading fewer bytes than requested near the end of a file is not an error.
    #[error("cannot read {} at offset {offset}: {source}", .path.display())]
    Read {
        /// The path of the file being read.
        path: PathBuf,
        /// The offset the read started at.
        offset: u64,
        /// The underlying operating system error.
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be listed, or one of its entry names is not valid Unicode.
    #[error("cannot list directory {}: {source}", .path.display())]
    List {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying operating system error.
        #[source]
        source: std::io::Error,
    },

    /// Appending to, flushing, or syncing an appendable file failed.
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// The path of the file being written.
        path: PathBuf,
        /// The underlying operating system error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be removed.
    #[error("cannot remove {}: {source}", .path.display())]
    Remove {
        /// The path that was being removed.
        path: PathBuf,
        /// The underlying operating system error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized `Result` for file-access operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open { path: path.into(), source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, offset: u64, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            offset,
            source,
        }
    }

    pub(crate) fn list(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::List { path: path.into(), source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    pub(crate) fn remove(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Remove { path: path.into(), source }
    }

    /// Returns the path the failed operation was applied to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::List { path, .. }
            | Self::Write { path, .. }
            | Self::Remove { path, .. } => path,
        }
    }

    /// Returns the raw operating system error code, if the failure originated in an OS call.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().raw_os_error()
    }

    /// Returns the category of the underlying I/O error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.io_error().kind()
    }

    const fn io_error(&self) -> &std::io::Error {
        match self {
            Self::Open { source, .. }
            | Self::Read { source, .. }
            | Self::List { source, .. }
            | Self::Write { source, .. }
            | Self::Remove { source, .. } => source,
        }
    }
}

/// Represents a file-access error as a standard I/O error of the same kind.
///
/// This is often used when interoperating with code that expects standard I/O errors.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        Self::new(value.kind(), value)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Error: Send, Sync);
    }

    #[test]
    fn open_error_carries_path_and_os_code() {
        let e = Error::open("data/000005.ldb", std::io::Error::from_raw_os_error(2));

        assert_eq!(e.path(), Path::new("data/000005.ldb"));
        assert_eq!(e.raw_os_error(), Some(2));
        assert!(matches!(e, Error::Open { .. }));
        assert!(e.to_string().starts_with("cannot open data/000005.ldb: "));
    }

    #[test]
    fn read_error_mentions_offset() {
        let e = Error::read("table.ldb", 4096, std::io::Error::other("device gone"));

        assert_eq!(e.to_string(), "cannot read table.ldb at offset 4096: device gone");
        assert_eq!(e.raw_os_error(), None);
    }

    #[test]
    fn into_stdio_error_preserves_kind() {
        let e = Error::list("missing", std::io::Error::new(ErrorKind::NotFound, "no such directory"));

        let io_error: std::io::Error = e.into();
        assert_eq!(io_error.kind(), ErrorKind::NotFound);
        assert!(io_error.to_string().contains("missing"));
    }
}
