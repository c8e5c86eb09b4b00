// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! File-access layer for embedded storage engines.
//!
//! This crate is the part of a storage engine's operating system abstraction that opens
//! data files for reads at arbitrary offsets, appends to log files and discovers the files
//! in a database directory. It differs from using [`std::fs`] directly in three ways:
//!
//! 1. **Bounded memory mapping.** Files opened through [`Env::new_random_access_file`] are
//!    memory-mapped while the environment's [`MmapLimiter`] has slots to spare, and served
//!    by positional reads once it runs out. Exhaustion never makes an open fail or block;
//!    both kinds of [`RandomAccessFile`] return the same bytes for the same reads.
//!
//! 2. **Handle hygiene.** Every operating system handle the crate creates, whether for
//!    reading or for appending, is created non-inheritable. Child processes spawned by the
//!    host application never receive a duplicate of it.
//!
//! 3. **Faithful directory listings.** [`Env::get_children`] always includes the `.` and
//!    `..` entries and returns names as UTF-8 exactly as stored, including multi-byte
//!    characters.
//!
//! The crate is passive: every operation runs on the calling thread and spawns nothing.
//!
//! # Quick start
//!
//! ```no_run
//! # fn example() -> storage_env::Result<()> {
//! use storage_env::Env;
//!
//! // Map at most four files at a time.
//! let env = Env::builder().mmap_limit(4).build();
//!
//! for name in env.get_children("/var/db")? {
//!     if name.ends_with(".ldb") {
//!         let file = env.new_random_access_file(format!("/var/db/{name}"))?;
//!         let mut scratch = [0; 16];
//!         let footer = file.read(file.size().saturating_sub(16), 16, &mut scratch)?;
//!         // parse footer...
//!     }
//! }
//!
//! let log = env.new_logger("/var/db/LOG")?;
//! log.log(format_args!("opened database"));
//! # Ok(())
//! # }
//! ```
//!
//! # Reads near the end of a file
//!
//! [`RandomAccessFile::read`] returns fewer bytes than requested only when the end of the
//! file is reached, and an empty slice when the offset is at or past the end. Neither is
//! an error; [`Error::Read`] is reserved for genuine I/O failures.
//!
//! # Testing
//!
//! With the `unstable-testing` feature, the `introspect` module can enumerate the live
//! handles of the process to verify from the outside that a handle to a given file is
//! not inheritable.

pub use crate::appendable_file::AppendableFile;
pub use crate::children::{CURRENT_DIR, PARENT_DIR};
pub use crate::env::{DEFAULT_MMAP_LIMIT, Env, EnvBuilder, EnvOptions};
pub use crate::error::{Error, Result};
pub use crate::logger::FileLogger;
pub use crate::mmap_file::MmapFile;
pub use crate::mmap_limiter::{MmapLimiter, MmapSlot};
pub use crate::positional_file::PositionalFile;
pub use crate::random_access_file::RandomAccessFile;

mod appendable_file;
mod children;
mod env;
mod error;
pub mod hygiene;
#[cfg(any(test, feature = "unstable-testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "unstable-testing")))]
pub mod introspect;
mod logger;
mod mmap_file;
mod mmap_limiter;
mod path_utils;
mod positional_file;
mod random_access_file;
