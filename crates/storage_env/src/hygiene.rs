// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Creation of operating system file handles that child processes never inherit.
//!
//! Every handle this crate opens goes through one of the `open_for_*` functions here.
//! The non-inheritable flag is requested as part of the open call itself rather than
//! set afterwards, so there is no window in which a concurrently spawned child process
//! could receive a duplicate of the handle.
//!
//! * On Unix, files are opened with `O_CLOEXEC`.
//! * On Windows, files are created without inheritable security attributes and with a
//!   share mode that permits concurrent readers, writers and deletion.

use std::fs::{File, OpenOptions};
use std::io::Result;
use std::path::Path;

/// Opens an existing file for reading.
pub(crate) fn open_for_read(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    let _ = options.read(true);
    open_with_policy(&mut options, path)
}

/// Opens a file for appending, creating it if it does not exist.
pub(crate) fn open_for_append(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    let _ = options.append(true).create(true);
    open_with_policy(&mut options, path)
}

fn open_with_policy(options: &mut OpenOptions, path: &Path) -> Result<File> {
    apply_policy(options);
    let file = options.open(path)?;
    debug_assert!(
        matches!(is_inheritable(&file), Ok(false)),
        "handle for {} was created inheritable",
        path.display()
    );
    Ok(file)
}

#[cfg(unix)]
fn apply_policy(options: &mut OpenOptions) {
    use std::os::unix::fs::OpenOptionsExt;

    let _ = options.custom_flags(libc::O_CLOEXEC);
}

#[cfg(windows)]
fn apply_policy(options: &mut OpenOptions) {
    use std::os::windows::fs::OpenOptionsExt;

    use windows_sys::Win32::Storage::FileSystem::{FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE};

    // The standard library passes no security attributes to CreateFileW, which makes
    // the handle non-inheritable; only the share mode needs to be set here.
    let _ = options.share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE);
}

/// Returns whether child processes spawned from now on would inherit `file`.
///
/// This is a single query of the descriptor flags (`fcntl(F_GETFD)` on Unix,
/// `GetHandleInformation` on Windows), not a scan of the handle table.
///
/// # Errors
///
/// Returns the operating system error if the flags cannot be queried.
#[cfg(unix)]
pub fn is_inheritable(file: &impl std::os::fd::AsFd) -> Result<bool> {
    use std::os::fd::AsRawFd;

    let fd = file.as_fd().as_raw_fd();

    // SAFETY: F_GETFD only reads the flags of a descriptor that stays open for the
    // duration of the borrow.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags == -1 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(flags & libc::FD_CLOEXEC == 0)
}

/// Returns whether child processes spawned from now on would inherit `file`.
///
/// This is a single query of the descriptor flags (`fcntl(F_GETFD)` on Unix,
/// `GetHandleInformation` on Windows), not a scan of the handle table.
///
/// # Errors
///
/// Returns the operating system error if the flags cannot be queried.
#[cfg(windows)]
pub fn is_inheritable(file: &impl std::os::windows::io::AsHandle) -> Result<bool> {
    use std::os::windows::io::AsRawHandle;

    use windows_sys::Win32::Foundation::{GetHandleInformation, HANDLE_FLAG_INHERIT};

    let handle = file.as_handle().as_raw_handle();
    let mut flags: u32 = 0;

    // SAFETY: The handle stays open for the duration of the borrow and `flags` outlives
    // the call.
    let ok = unsafe { GetHandleInformation(handle, &raw mut flags) };
    if ok == 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(flags & HANDLE_FLAG_INHERIT != 0)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn read_handle_is_not_inheritable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("table.ldb");
        std::fs::write(&path, b"0123456789").unwrap();

        let file = open_for_read(&path).unwrap();

        assert!(!is_inheritable(&file).unwrap());
    }

    #[test]
    fn append_handle_is_not_inheritable_and_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("LOG");
        std::fs::write(&path, b"first\n").unwrap();

        let mut file = open_for_append(&path).unwrap();
        assert!(!is_inheritable(&file).unwrap());

        file.write_all(b"second\n").unwrap();
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"first\nsecond\n");
    }

    #[test]
    fn append_creates_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("LOG.new");

        let _file = open_for_append(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn read_missing_file_fails() {
        let tmp = TempDir::new().unwrap();

        let error = open_for_read(&tmp.path().join("absent.ldb")).unwrap_err();

        assert_eq!(error.kind(), std::io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn inheritable_descriptor_is_reported() {
        use std::os::fd::AsRawFd;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plain.txt");
        std::fs::write(&path, b"x").unwrap();
        let file = File::open(&path).unwrap();

        // SAFETY: Clears FD_CLOEXEC on a descriptor we own.
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETFD, 0) };
        assert_eq!(rc, 0);

        assert!(is_inheritable(&file).unwrap());
    }
}
