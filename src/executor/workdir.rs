//! Scoped working directory.
//!
//! Phases never touch the process-wide current directory. Instead they
//! enter a directory on a [`WorkDir`]; the returned guard restores the
//! previous directory when it goes out of scope, on success and on error.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use super::error::ExecuteError;

/// The directory commands are currently run in.
#[derive(Debug)]
pub struct WorkDir {
    current: RefCell<PathBuf>,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            current: RefCell::new(root.into()),
        }
    }

    pub fn current(&self) -> PathBuf {
        self.current.borrow().clone()
    }

    /// Enter `dir` (relative paths resolve against the current directory)
    /// until the returned guard is dropped.
    pub fn enter(&self, dir: impl AsRef<Path>) -> Result<DirScope<'_>, ExecuteError> {
        let target = self.current.borrow().join(dir.as_ref());
        if !target.is_dir() {
            return Err(ExecuteError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("directory does not exist: {}", target.display()),
            )));
        }
        let previous = self.current.replace(target);
        Ok(DirScope {
            work_dir: self,
            previous: Some(previous),
        })
    }
}

/// Restores the previous directory of a [`WorkDir`] on drop.
#[must_use = "the directory is left as soon as the scope is dropped"]
pub struct DirScope<'a> {
    work_dir: &'a WorkDir,
    previous: Option<PathBuf>,
}

impl DirScope<'_> {
    pub fn path(&self) -> PathBuf {
        self.work_dir.current()
    }
}

impl Drop for DirScope<'_> {
    fn drop(&mut self) {
        if let Some(prev) = self.previous.take() {
            *self.work_dir.current.borrow_mut() = prev;
        }
    }
}
