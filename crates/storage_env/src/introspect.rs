// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Inspection of the live operating system handles of the current process.
//!
//! This exists to verify, from the outside, that handles created by this crate are not
//! inheritable by child processes. Enumerating handles is slow (on Windows it is a
//! brute-force scan of the handle value space) and is only available to tests; nothing
//! else in the crate calls into this module.
//!
//! The platform-specific work sits behind [`HandleIntrospector`]. The matching logic in
//! [`snapshot`], [`find_handle_by_file_name`] and [`check_handle_non_inheritable`] is
//! generic over it, so it can be exercised with a mock on every platform.

use std::ffi::OsStr;
use std::fmt::Debug;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::*;

/// The numeric value of an operating system handle: a file descriptor on Unix, a
/// `HANDLE` on Windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OsHandle(pub usize);

/// Platform-specific access to the handle table of the current process.
#[cfg_attr(test, mockall::automock)]
pub trait HandleIntrospector: Debug {
    /// Returns every handle value that currently refers to an open object.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle table cannot be enumerated.
    fn open_handles(&self) -> io::Result<Vec<OsHandle>>;

    /// Resolves a handle to the canonical path of the file it refers to.
    ///
    /// Returns `None` if the handle does not refer to a file or was closed since it
    /// was enumerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails for any other reason.
    fn final_path(&self, handle: OsHandle) -> io::Result<Option<PathBuf>>;

    /// Returns whether child processes would inherit the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle's flags cannot be queried.
    fn is_inheritable(&self, handle: OsHandle) -> io::Result<bool>;
}

/// One open file handle observed in the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenHandle {
    /// The handle value.
    pub handle: OsHandle,
    /// The canonical path of the file the handle refers to.
    pub path: PathBuf,
    /// Whether child processes would inherit the handle.
    pub inheritable: bool,
}

/// Failure to verify a handle through introspection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IntrospectError {
    /// No open handle refers to a file with the given name.
    #[error("no open handle refers to a file named {0:?}")]
    NotFound(String),

    /// A handle to the named file would be inherited by child processes.
    #[error("handle {handle:?} to {name:?} is inheritable")]
    Inheritable {
        /// The file name that was looked up.
        name: String,
        /// The offending handle.
        handle: OsHandle,
    },

    /// The operating system rejected a query.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Lists every open handle that refers to a file, with its path and inheritance flag.
///
/// # Errors
///
/// Returns an error if any query other than path resolution of a non-file handle fails.
pub fn snapshot(introspector: &impl HandleIntrospector) -> io::Result<Vec<OpenHandle>> {
    let mut handles = Vec::new();
    for handle in introspector.open_handles()? {
        let Some(path) = introspector.final_path(handle)? else {
            continue;
        };
        handles.push(OpenHandle {
            handle,
            path,
            inheritable: introspector.is_inheritable(handle)?,
        });
    }
    Ok(handles)
}

/// Finds an open handle whose final path component equals `name`.
///
/// # Errors
///
/// Returns an error if the handle table cannot be enumerated or a handle cannot be resolved.
pub fn find_handle_by_file_name(introspector: &impl HandleIntrospector, name: &str) -> io::Result<Option<OsHandle>> {
    for handle in introspector.open_handles()? {
        let Some(path) = introspector.final_path(handle)? else {
            continue;
        };
        if path.file_name() == Some(OsStr::new(name)) {
            return Ok(Some(handle));
        }
    }
    Ok(None)
}

/// Verifies that an open handle to the file called `name` exists and is not inheritable.
///
/// # Errors
///
/// Returns [`IntrospectError::NotFound`] if no handle refers to such a file,
/// [`IntrospectError::Inheritable`] if the handle found is inheritable, or
/// [`IntrospectError::Io`] if a query fails.
pub fn check_handle_non_inheritable(introspector: &impl HandleIntrospector, name: &str) -> Result<(), IntrospectError> {
    let handle = find_handle_by_file_name(introspector, name)?.ok_or_else(|| IntrospectError::NotFound(name.to_owned()))?;

    if introspector.is_inheritable(handle)? {
        return Err(IntrospectError::Inheritable {
            name: name.to_owned(),
            handle,
        });
    }

    Ok(())
}
