// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Write as _};
use std::path::Path;

use jiff::Timestamp;
use parking_lot::Mutex;

use crate::appendable_file::AppendableFile;
use crate::error::Result;

/// An informational log written to a file, one line per message.
///
/// Obtain one from [`Env::new_logger`](crate::Env::new_logger). Each line has the form
///
/// ```text
/// 2026/10/16-09:41:07.123456 ThreadId(1) compacted 4@0 files
/// ```
///
/// with the timestamp in UTC. Lines are appended to the file and flushed immediately.
/// A failed write is reported through `tracing` and otherwise ignored: logging never
/// fails the operation being logged.
#[derive(Debug)]
pub struct FileLogger {
    file: Mutex<AppendableFile>,
}

impl FileLogger {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: Mutex::new(AppendableFile::open(path)?),
        })
    }

    /// Appends one formatted line to the log.
    ///
    /// A trailing newline is added unless the message already ends with one.
    pub fn log(&self, args: fmt::Arguments<'_>) {
        let line = format_line(Timestamp::now(), args);

        let mut file = self.file.lock();
        if let Err(error) = file.append(line.as_bytes()).and_then(|()| file.flush()) {
            tracing::warn!(%error, "dropping info log line");
        }
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for FileLogger {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::{AsFd, AsRawFd};
        self.file.lock().as_fd().as_raw_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawHandle for FileLogger {
    fn as_raw_handle(&self) -> std::os::windows::io::RawHandle {
        use std::os::windows::io::{AsHandle, AsRawHandle};
        self.file.lock().as_handle().as_raw_handle()
    }
}

fn format_line(now: Timestamp, args: fmt::Arguments<'_>) -> String {
    let mut line = String::new();
    let _ = write!(
        line,
        "{}.{:06} {:?} {args}",
        now.strftime("%Y/%m/%d-%H:%M:%S"),
        now.subsec_microsecond(),
        std::thread::current().id()
    );
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn line_layout() {
        let now = Timestamp::from_microsecond(1_792_143_667_000_042).unwrap();

        let line = format_line(now, format_args!("recovered {} files", 3));

        assert!(line.starts_with("2026/10/16-09:41:07.000042 ThreadId("), "{line}");
        assert!(line.ends_with(") recovered 3 files\n"), "{line}");
    }

    #[test]
    fn existing_newline_is_kept_single() {
        let line = format_line(Timestamp::UNIX_EPOCH, format_args!("done\n"));

        assert!(line.starts_with("1970/01/01-00:00:00.000000 "), "{line}");
        assert!(line.ends_with(" done\n"), "{line}");
        assert!(!line.ends_with("\n\n"), "{line}");
    }

    #[test]
    fn appends_lines_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("LOG");
        std::fs::write(&path, b"previous run\n").unwrap();

        let logger = FileLogger::open(&path).unwrap();
        logger.log(format_args!("first"));
        logger.log(format_args!("second {}", 2));
        drop(logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "previous run");
        assert!(lines[1].ends_with(" first"));
        assert!(lines[2].ends_with(" second 2"));
    }
}
