// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ffi::OsString;
use std::io::{Error, ErrorKind, Result};
use std::path::PathBuf;

/// Converts a native directory entry name into UTF-8.
///
/// On Windows names arrive as UTF-16 and on Unix as raw bytes; both are decoded strictly.
/// A name that is not valid Unicode is an error rather than a lossy substitution, because
/// a substituted name could never be used to open the entry again.
pub fn entry_name(name: OsString) -> Result<String> {
    name.into_string().map_err(|name| {
        Error::new(
            ErrorKind::InvalidData,
            format!("directory entry name is not valid Unicode: {}", name.display()),
        )
    })
}

/// Returns the scratch directory used by tests of code built on this crate.
///
/// Honors `TEST_TMPDIR` when set; otherwise uses a per-user directory under the system
/// temporary directory. The directory is created if it does not exist.
pub fn test_directory() -> crate::Result<PathBuf> {
    let dir = match std::env::var_os("TEST_TMPDIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join(format!("storage_env-test-{}", owner_id())),
    };
    ensure_directory(dir)
}

/// Creates `dir` and its parents if missing; the error names `dir` itself.
fn ensure_directory(dir: PathBuf) -> crate::Result<PathBuf> {
    match std::fs::create_dir_all(&dir) {
        Ok(()) => Ok(dir),
        Err(e) => Err(crate::Error::open(dir, e)),
    }
}

#[cfg(unix)]
fn owner_id() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

#[cfg(not(unix))]
fn owner_id() -> u32 {
    std::process::id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_name() {
        assert_eq!(entry_name(OsString::from("000005.ldb")).unwrap(), "000005.ldb");
    }

    #[test]
    fn multi_byte_name() {
        let name = "run\u{1F3C3}_and_jump\u{1F998}_0.txt";
        assert_eq!(entry_name(OsString::from(name)).unwrap(), name);
    }

    #[cfg(unix)]
    #[test]
    fn invalid_utf8_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let error = entry_name(OsString::from_vec(vec![b'a', 0xFF, b'b'])).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidData);
    }

    #[cfg(windows)]
    #[test]
    fn unpaired_surrogate_rejected() {
        use std::os::windows::ffi::OsStringExt;

        let error = entry_name(OsString::from_wide(&[0x61, 0xD800, 0x62])).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_directory_exists() {
        let dir = test_directory().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn ensure_directory_creates_nested() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");

        assert_eq!(ensure_directory(dir.clone()).unwrap(), dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn ensure_directory_error_names_requested_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("plain.txt");
        std::fs::write(&blocker, b"x").unwrap();
        let dir = blocker.join("scratch");

        let error = ensure_directory(dir.clone()).unwrap_err();

        assert!(matches!(error, crate::Error::Open { .. }));
        assert_eq!(error.path(), dir);
    }
}
