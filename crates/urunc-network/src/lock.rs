//! Per-namespace setup lock.
//!
//! Dynamic setups in one network namespace derive their tap ordinal from the
//! live interface list and then create the device. An exclusive `flock(2)`
//! on a file keyed by the namespace inode serializes that sequence across
//! processes. The kernel drops the lock when the holder exits.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use urunc_common::error::{NetworkError, Result};

/// Exclusive lock over tap setup in one network namespace, held until drop.
#[derive(Debug)]
pub struct NamespaceLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl NamespaceLock {
    /// Blocks until the lock for `namespace_id` under `dir` is held.
    ///
    /// `namespace_id` is reduced to its alphanumeric characters, so
    /// `net:[4026531840]` locks `<dir>/net4026531840.lock`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Lock`] if the directory or file cannot be
    /// created or the lock cannot be taken.
    pub fn acquire(dir: &Path, namespace_id: &str) -> Result<Self> {
        let path = lock_path(dir, namespace_id);
        let lock_err = |source: io::Error| NetworkError::Lock {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(lock_err)?;
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_err)?;
        let lock = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| lock_err(io::Error::from(errno)))?;

        tracing::debug!(path = %path.display(), "acquired namespace lock");
        Ok(Self { path, _lock: lock })
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(dir: &Path, namespace_id: &str) -> PathBuf {
    let key: String = namespace_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let key = if key.is_empty() { "default".to_string() } else { key };
    dir.join(format!("{key}.lock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_is_keyed_by_namespace_inode() {
        let dir = tempfile::tempdir().unwrap();
        let lock = NamespaceLock::acquire(dir.path(), "net:[4026531840]").unwrap();
        assert_eq!(lock.path(), dir.path().join("net4026531840.lock"));
        assert!(lock.path().exists());
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("run").join("netns");
        let lock = NamespaceLock::acquire(&nested, "net:[1]").unwrap();
        assert!(lock.path().starts_with(&nested));
    }

    #[test]
    fn held_lock_excludes_other_holders() {
        let dir = tempfile::tempdir().unwrap();
        let held = NamespaceLock::acquire(dir.path(), "net:[7]").unwrap();

        let other = File::options().write(true).open(held.path()).unwrap();
        assert!(Flock::lock(other, FlockArg::LockExclusiveNonblock).is_err());

        drop(held);
        let other = File::options()
            .write(true)
            .open(dir.path().join("net7.lock"))
            .unwrap();
        assert!(Flock::lock(other, FlockArg::LockExclusiveNonblock).is_ok());
    }

    #[test]
    fn unusable_directory_is_a_lock_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = NamespaceLock::acquire(file.path(), "net:[1]").unwrap_err();
        assert!(matches!(err, NetworkError::Lock { .. }));
    }
}
