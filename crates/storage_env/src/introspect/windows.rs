// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ffi::{OsString, c_void};
use std::io;
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;

use windows_sys::Win32::Foundation::{ERROR_INVALID_HANDLE, GetHandleInformation, GetLastError, HANDLE, HANDLE_FLAG_INHERIT};
use windows_sys::Win32::Storage::FileSystem::{FILE_NAME_NORMALIZED, GetFinalPathNameByHandleW};

use crate::introspect::{HandleIntrospector, OsHandle};

/// Handle values are multiples of four.
const HANDLE_STEP: usize = 4;

/// Scanning stops at this handle value; test processes hold far fewer handles.
const HANDLE_UPPER_BOUND: usize = 1000 * HANDLE_STEP;

/// Introspects the handle table of the current process by probing every plausible
/// handle value with `GetHandleInformation`.
///
/// There is no supported API that lists the handles of a process, so this is a
/// brute-force scan. It is slow, which is acceptable for tests only.
#[derive(Debug, Default)]
pub struct BuildTargetIntrospector;

impl HandleIntrospector for BuildTargetIntrospector {
    fn open_handles(&self) -> io::Result<Vec<OsHandle>> {
        let mut handles = Vec::new();
        for value in (HANDLE_STEP..HANDLE_UPPER_BOUND).step_by(HANDLE_STEP) {
            let mut flags: u32 = 0;

            // SAFETY: GetHandleInformation validates the handle value and fails cleanly
            // for values that are not open handles.
            let ok = unsafe { GetHandleInformation(to_handle(value), &raw mut flags) };
            if ok != 0 {
                handles.push(OsHandle(value));
                continue;
            }

            // SAFETY: No safety requirements.
            let code = unsafe { GetLastError() };
            if code != ERROR_INVALID_HANDLE {
                return Err(io::Error::from_raw_os_error(code.cast_signed()));
            }
        }
        Ok(handles)
    }

    fn final_path(&self, handle: OsHandle) -> io::Result<Option<PathBuf>> {
        let mut buffer = vec![0_u16; 260];
        loop {
            let capacity = u32::try_from(buffer.len()).map_err(io::Error::other)?;

            // SAFETY: The buffer is valid for `capacity` UTF-16 units and outlives the call.
            let len = unsafe { GetFinalPathNameByHandleW(to_handle(handle.0), buffer.as_mut_ptr(), capacity, FILE_NAME_NORMALIZED) };

            // Fails for handles that are not files, such as events or threads.
            if len == 0 {
                return Ok(None);
            }

            let len = len as usize;
            if len < buffer.len() {
                return Ok(Some(PathBuf::from(OsString::from_wide(&buffer[..len]))));
            }

            // The buffer was too small and `len` is the required size, terminator included.
            buffer.resize(len, 0);
        }
    }

    fn is_inheritable(&self, handle: OsHandle) -> io::Result<bool> {
        let mut flags: u32 = 0;

        // SAFETY: GetHandleInformation validates the handle value and `flags` outlives the call.
        let ok = unsafe { GetHandleInformation(to_handle(handle.0), &raw mut flags) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(flags & HANDLE_FLAG_INHERIT != 0)
    }
}

fn to_handle(value: usize) -> HANDLE {
    std::ptr::without_provenance_mut::<c_void>(value)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::os::windows::io::AsRawHandle;

    use tempfile::TempDir;

    use super::*;
    use crate::introspect::{check_handle_non_inheritable, find_handle_by_file_name};

    #[test]
    fn finds_own_handle() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("introspect_probe.txt");
        std::fs::write(&path, b"probe").unwrap();
        let file = File::open(&path).unwrap();

        let found = find_handle_by_file_name(&BuildTargetIntrospector, "introspect_probe.txt").unwrap();

        assert_eq!(found, Some(OsHandle(file.as_raw_handle().addr())));
        check_handle_non_inheritable(&BuildTargetIntrospector, "introspect_probe.txt").unwrap();
    }

    // Platform-defined behavior: querying a value that is not a handle reports
    // ERROR_INVALID_HANDLE.
    #[test]
    fn invalid_handle_reports_invalid_handle() {
        let error = BuildTargetIntrospector
            .is_inheritable(OsHandle(HANDLE_UPPER_BOUND * 1000))
            .unwrap_err();

        assert_eq!(error.raw_os_error(), Some(ERROR_INVALID_HANDLE.cast_signed()));
    }
}
