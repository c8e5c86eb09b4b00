// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, ErrorKind};
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use crate::introspect::{HandleIntrospector, OsHandle};

const PROC_SELF_FD: &str = "/proc/self/fd";

/// Introspects the file descriptor table of the current process through procfs.
///
/// Descriptors are enumerated from `/proc/self/fd`, resolved to paths through the
/// symbolic links found there, and queried with `fcntl(F_GETFD)`.
#[derive(Debug, Default)]
pub struct BuildTargetIntrospector;

impl HandleIntrospector for BuildTargetIntrospector {
    fn open_handles(&self) -> io::Result<Vec<OsHandle>> {
        let mut handles = Vec::new();
        for entry in std::fs::read_dir(PROC_SELF_FD)? {
            let entry = entry?;
            // Every entry name is a descriptor number.
            if let Some(fd) = entry.file_name().to_str().and_then(|name| name.parse().ok()) {
                handles.push(OsHandle(fd));
            }
        }
        Ok(handles)
    }

    fn final_path(&self, handle: OsHandle) -> io::Result<Option<PathBuf>> {
        match std::fs::read_link(Path::new(PROC_SELF_FD).join(handle.0.to_string())) {
            // Sockets, pipes and anonymous inodes resolve to pseudo-paths such as "pipe:[42]".
            Ok(path) if path.is_absolute() => Ok(Some(path)),
            Ok(_) => Ok(None),
            // The descriptor used to enumerate the directory is gone by now.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn is_inheritable(&self, handle: OsHandle) -> io::Result<bool> {
        let fd = RawFd::try_from(handle.0).map_err(io::Error::other)?;

        // SAFETY: F_GETFD only reads descriptor flags. An fd that is not open yields
        // EBADF rather than undefined behavior.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(flags & libc::FD_CLOEXEC == 0)
    }
}
