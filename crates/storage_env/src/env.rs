// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::appendable_file::AppendableFile;
use crate::error::{Error, Result};
use crate::logger::FileLogger;
use crate::mmap_limiter::MmapLimiter;
use crate::random_access_file::RandomAccessFile;

/// Default number of files that may be memory-mapped at once.
///
/// Mapping is only worthwhile where address space is plentiful, so 32-bit targets map
/// nothing by default.
pub const DEFAULT_MMAP_LIMIT: usize = if size_of::<usize>() >= 8 { 1000 } else { 0 };

/// Construction-time configuration of an [`Env`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct EnvOptions {
    /// How many files may be served from memory mappings at the same time.
    pub mmap_limit: usize,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            mmap_limit: DEFAULT_MMAP_LIMIT,
        }
    }
}

/// Collects the configuration for an [`Env`].
#[derive(Debug, Default)]
pub struct EnvBuilder {
    options: EnvOptions,
    limiter: Option<Arc<MmapLimiter>>,
}

impl EnvBuilder {
    /// Sets how many files may be memory-mapped at the same time.
    ///
    /// Files opened while every slot is taken are served with positional reads instead.
    /// Ignored if [`with_limiter`](Self::with_limiter) supplies a limiter.
    #[must_use]
    pub const fn mmap_limit(mut self, limit: usize) -> Self {
        self.options.mmap_limit = limit;
        self
    }

    /// Draws mapping slots from an existing limiter, sharing its budget with every other
    /// environment that uses it.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<MmapLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Creates the environment.
    #[must_use]
    pub fn build(self) -> Env {
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(MmapLimiter::new(self.options.mmap_limit)));
        Env { limiter }
    }
}

/// The storage engine's view of the operating system's filesystem.
///
/// An `Env` opens files for random-access reads, opens files for appending, lists
/// directories and removes files. It is passive: every operation runs on the calling
/// thread and blocks only inside operating system calls. Every handle it creates is
/// non-inheritable, so child processes spawned by the host application never receive it.
///
/// The only state an `Env` carries is its [`MmapLimiter`], which bounds how many of the
/// files it opens may be memory-mapped at once.
///
/// # Examples
///
/// ```no_run
/// # fn example() -> storage_env::Result<()> {
/// use storage_env::Env;
///
/// let env = Env::builder().mmap_limit(64).build();
/// let file = env.new_random_access_file("/var/db/000005.ldb")?;
///
/// let mut scratch = vec![0; 4096];
/// let block = file.read(0, 4096, &mut scratch)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Env {
    limiter: Arc<MmapLimiter>,
}

impl Env {
    /// Returns a builder for configuring a new environment.
    #[must_use]
    pub fn builder() -> EnvBuilder {
        EnvBuilder::default()
    }

    /// Creates an environment from explicit options.
    #[must_use]
    pub fn with_options(options: EnvOptions) -> Self {
        Self::builder().mmap_limit(options.mmap_limit).build()
    }

    /// The limiter bounding how many files this environment memory-maps at once.
    #[must_use]
    pub const fn mmap_limiter(&self) -> &Arc<MmapLimiter> {
        &self.limiter
    }

    /// Opens an existing file for reads at arbitrary offsets.
    ///
    /// The file is memory-mapped if the limiter has a free slot and mapping succeeds;
    /// otherwise it is served by positional reads. Running out of slots never makes the
    /// open fail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened or its size cannot be read.
    pub fn new_random_access_file(&self, path: impl AsRef<Path>) -> Result<RandomAccessFile> {
        RandomAccessFile::open(path.as_ref(), &self.limiter)
    }

    /// Opens a file for appending, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened or created.
    pub fn new_appendable_file(&self, path: impl AsRef<Path>) -> Result<AppendableFile> {
        AppendableFile::open(path.as_ref())
    }

    /// Opens an informational log that appends to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened or created.
    pub fn new_logger(&self, path: impl AsRef<Path>) -> Result<FileLogger> {
        FileLogger::open(path.as_ref())
    }

    /// Lists the entry names of a directory, including `.` and `..`.
    ///
    /// An empty directory yields exactly two names. Names are returned as UTF-8 exactly
    /// as stored, including multi-byte characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::List`] if the directory does not exist, cannot be read, or contains
    /// a name that is not valid Unicode.
    pub fn get_children(&self, dir: impl AsRef<Path>) -> Result<Vec<String>> {
        crate::children::get_children(dir.as_ref())
    }

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remove`] if the file does not exist or cannot be removed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::remove_file(path).map_err(|e| Error::remove(path, e))
    }

    /// Returns `true` if anything exists at `path`.
    #[must_use]
    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    /// Returns the size of the file at `path` in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file's metadata cannot be read.
    pub fn get_file_size(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        std::fs::metadata(path).map(|m| m.len()).map_err(|e| Error::open(path, e))
    }

    /// Returns a writable scratch directory for tests, creating it if needed.
    ///
    /// Honors the `TEST_TMPDIR` environment variable when set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] naming the chosen directory if it cannot be created.
    pub fn test_directory(&self) -> Result<PathBuf> {
        crate::path_utils::test_directory()
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::with_options(EnvOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Env: Send, Sync, Clone);
    }

    #[test]
    fn default_limit_matches_pointer_width() {
        let env = Env::default();

        #[cfg(target_pointer_width = "64")]
        assert_eq!(env.mmap_limiter().total_slots(), 1000);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(env.mmap_limiter().total_slots(), 0);
    }

    #[test]
    fn builder_sets_limit() {
        let env = Env::builder().mmap_limit(4).build();

        assert_eq!(env.mmap_limiter().total_slots(), 4);
        assert_eq!(env.mmap_limiter().available(), 4);
    }

    #[test]
    fn with_options_sets_limit() {
        let options = EnvOptions { mmap_limit: 7 };

        let env = Env::with_options(options);

        assert_eq!(env.mmap_limiter().total_slots(), 7);
    }

    #[test]
    fn shared_limiter_is_shared() {
        let limiter = Arc::new(MmapLimiter::new(1));
        let a = Env::builder().with_limiter(Arc::clone(&limiter)).build();
        let b = Env::builder().mmap_limit(99).with_limiter(Arc::clone(&limiter)).build();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shared.ldb");
        std::fs::write(&path, b"shared").unwrap();

        let first = a.new_random_access_file(&path).unwrap();
        let second = b.new_random_access_file(&path).unwrap();

        assert!(first.is_memory_mapped());
        assert!(!second.is_memory_mapped());
    }

    #[test]
    fn independent_envs_do_not_interfere() {
        let a = Env::builder().mmap_limit(1).build();
        let b = Env::builder().mmap_limit(1).build();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("independent.ldb");
        std::fs::write(&path, b"independent").unwrap();

        let first = a.new_random_access_file(&path).unwrap();
        let second = b.new_random_access_file(&path).unwrap();

        assert!(first.is_memory_mapped());
        assert!(second.is_memory_mapped());
    }

    #[test]
    fn remove_and_exists() {
        let env = Env::default();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("000007.log");
        std::fs::write(&path, b"12345").unwrap();

        assert!(env.file_exists(&path));
        assert_eq!(env.get_file_size(&path).unwrap(), 5);

        env.remove_file(&path).unwrap();

        assert!(!env.file_exists(&path));
        let error = env.remove_file(&path).unwrap_err();
        assert!(matches!(error, Error::Remove { .. }));
        let error = env.get_file_size(&path).unwrap_err();
        assert!(matches!(error, Error::Open { .. }));
    }

    #[test]
    fn test_directory_is_writable() {
        let env = Env::default();
        let dir = env.test_directory().unwrap();
        let path = dir.join(format!("env-probe-{}", std::process::id()));

        std::fs::write(&path, b"probe").unwrap();
        env.remove_file(&path).unwrap();
    }
}
