//! Runtime abstraction for system operations.
//!
//! Everything that touches the file system or the process environment goes
//! through [`Runtime`], so the manifest store, the define store and the
//! settings loader can be exercised against a `MockRuntime` in tests.
//!
//! # Structure
//!
//! - `env` - Working directory
//! - `fs` - File system operations (read, write, rename, directory)

mod env;
mod fs;

use anyhow::Result;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn current_dir(&self) -> Result<PathBuf>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
}

/// Replace `path` with `contents` in a single step.
///
/// The contents are written to a sibling temporary file which is then renamed
/// over the target, so readers never observe a half-written file.
pub fn write_atomic<R: Runtime + ?Sized>(runtime: &R, path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    runtime.write(&tmp, contents)?;
    if let Err(e) = runtime.rename(&tmp, path) {
        let _ = runtime.remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    #[test]
    fn test_write_atomic_writes_temp_then_renames() {
        let mut runtime = MockRuntime::new();
        let target = PathBuf::from("/project/Packages/manifest.json");
        let tmp = PathBuf::from("/project/Packages/manifest.json.tmp");

        let mut seq = mockall::Sequence::new();
        runtime
            .expect_write()
            .with(eq(tmp.clone()), eq(b"{}".to_vec()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(eq(tmp), eq(target.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        write_atomic(&runtime, &target, b"{}").unwrap();
    }

    #[test]
    fn test_write_atomic_cleans_up_on_rename_failure() {
        let mut runtime = MockRuntime::new();
        let target = PathBuf::from("/project/settings.json");

        runtime.expect_write().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("cross-device link")));
        runtime
            .expect_remove_file()
            .with(eq(PathBuf::from("/project/settings.json.tmp")))
            .times(1)
            .returning(|_| Ok(()));

        let err = write_atomic(&runtime, &target, b"{}").unwrap_err();
        assert!(err.to_string().contains("cross-device"));
    }
}
