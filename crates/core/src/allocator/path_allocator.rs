//! Sequential `base-N.ext` allocation.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use super::error::AllocationError;

/// Hands out destination paths that exist neither on disk nor earlier in
/// the same batch.
#[derive(Debug, Default)]
pub struct PathAllocator {
    reserved: HashSet<PathBuf>,
    verified_dirs: HashSet<PathBuf>,
    metadata_only: bool,
}

impl PathAllocator {
    /// Creates an allocator with nothing reserved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that never writes to disk. Writability is judged
    /// from directory permissions instead of a probe file.
    pub fn for_dry_run() -> Self {
        Self {
            metadata_only: true,
            ..Self::default()
        }
    }

    /// Returns the first free path among `base.ext`, `base-1.ext`,
    /// `base-2.ext`, ... inside `directory` and reserves it.
    pub fn allocate(
        &mut self,
        directory: &Path,
        base: impl AsRef<OsStr>,
        extension: &str,
    ) -> Result<PathBuf, AllocationError> {
        self.ensure_writable(directory)?;

        let base = base.as_ref();
        let extension = extension.trim_start_matches('.');
        let mut counter: u64 = 0;
        loop {
            let candidate = directory.join(Self::file_name(base, counter, extension));
            if !self.reserved.contains(&candidate) && !Self::exists(&candidate)? {
                debug!(path = %candidate.display(), "Allocated destination");
                self.reserved.insert(candidate.clone());
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Allocates a destination named after `source`'s stem.
    ///
    /// The stem is used byte for byte, so names that are not valid UTF-8
    /// are fine. Only a source without a file name is rejected.
    pub fn allocate_for(
        &mut self,
        directory: &Path,
        source: &Path,
        extension: &str,
    ) -> Result<PathBuf, AllocationError> {
        let base = source
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AllocationError::InvalidBaseName {
                path: source.to_path_buf(),
            })?;
        self.allocate(directory, base, extension)
    }

    /// Verifies that files can be created in `directory`.
    ///
    /// Each directory is probed once per allocator.
    pub fn ensure_writable(&mut self, directory: &Path) -> Result<(), AllocationError> {
        if self.verified_dirs.contains(directory) {
            return Ok(());
        }

        let metadata = std::fs::metadata(directory)
            .map_err(|e| AllocationError::not_writable(directory.to_path_buf(), e))?;
        if !metadata.is_dir() {
            return Err(AllocationError::not_writable(
                directory.to_path_buf(),
                io::Error::new(io::ErrorKind::Other, "not a directory"),
            ));
        }

        if self.metadata_only {
            if metadata.permissions().readonly() {
                return Err(AllocationError::not_writable(
                    directory.to_path_buf(),
                    io::Error::new(io::ErrorKind::PermissionDenied, "read-only directory"),
                ));
            }
            self.verified_dirs.insert(directory.to_path_buf());
            return Ok(());
        }

        let probe = directory.join(format!(".rulebatch-probe-{}", Uuid::new_v4()));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
            .map_err(|e| AllocationError::not_writable(directory.to_path_buf(), e))?;
        std::fs::remove_file(&probe)?;

        self.verified_dirs.insert(directory.to_path_buf());
        Ok(())
    }

    /// Number of paths handed out so far.
    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    fn file_name(base: &OsStr, counter: u64, extension: &str) -> OsString {
        let mut name = base.to_os_string();
        if counter > 0 {
            name.push(format!("-{}", counter));
        }
        if !extension.is_empty() {
            name.push(".");
            name.push(extension);
        }
        name
    }

    fn exists(path: &Path) -> Result<bool, AllocationError> {
        // symlink_metadata so a dangling link still counts as taken
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AllocationError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_free_name() {
        let temp = TempDir::new().unwrap();
        let mut allocator = PathAllocator::new();

        let path = allocator.allocate(temp.path(), "a", ".xml").unwrap();
        assert_eq!(path, temp.path().join("a.xml"));
    }

    #[test]
    fn test_allocate_skips_existing_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.xml"), "<a/>").unwrap();

        let path = PathAllocator::new()
            .allocate(temp.path(), "a", ".xml")
            .unwrap();
        assert_eq!(path, temp.path().join("a-1.xml"));

        std::fs::write(temp.path().join("a-1.xml"), "<a/>").unwrap();
        let path = PathAllocator::new()
            .allocate(temp.path(), "a", ".xml")
            .unwrap();
        assert_eq!(path, temp.path().join("a-2.xml"));
    }

    #[test]
    fn test_allocate_never_repeats_within_batch() {
        let temp = TempDir::new().unwrap();
        let mut allocator = PathAllocator::new();

        let first = allocator.allocate(temp.path(), "a", "xml").unwrap();
        let second = allocator.allocate(temp.path(), "a", "xml").unwrap();
        let third = allocator.allocate(temp.path(), "a", "xml").unwrap();

        assert_eq!(first, temp.path().join("a.xml"));
        assert_eq!(second, temp.path().join("a-1.xml"));
        assert_eq!(third, temp.path().join("a-2.xml"));
        assert_eq!(allocator.reserved_count(), 3);
    }

    #[test]
    fn test_allocate_for_sources_sharing_a_stem() {
        let temp = TempDir::new().unwrap();
        let xml = temp.path().join("a.xml");
        let txt = temp.path().join("a.txt");
        std::fs::write(&xml, "<a/>").unwrap();
        std::fs::write(&txt, "a").unwrap();

        let mut allocator = PathAllocator::new();
        let first = allocator.allocate_for(temp.path(), &xml, "xml").unwrap();
        let second = allocator.allocate_for(temp.path(), &txt, "xml").unwrap();

        assert_eq!(first, temp.path().join("a-1.xml"));
        assert_eq!(second, temp.path().join("a-2.xml"));
    }

    #[test]
    fn test_allocate_without_extension() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("out"), "").unwrap();

        let path = PathAllocator::new().allocate(temp.path(), "out", "").unwrap();
        assert_eq!(path, temp.path().join("out-1"));
    }

    #[test]
    fn test_missing_directory_is_not_writable() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");

        let err = PathAllocator::new()
            .allocate(&missing, "a", "xml")
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotWritable { .. }));
    }

    #[test]
    fn test_file_is_not_a_writable_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain");
        std::fs::write(&file, "").unwrap();

        let err = PathAllocator::new().ensure_writable(&file).unwrap_err();
        assert!(matches!(err, AllocationError::NotWritable { .. }));
    }

    #[test]
    fn test_probe_leaves_no_files_behind() {
        let temp = TempDir::new().unwrap();
        PathAllocator::new().ensure_writable(temp.path()).unwrap();

        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn test_allocate_for_rejects_nameless_source() {
        let temp = TempDir::new().unwrap();
        let err = PathAllocator::new()
            .allocate_for(temp.path(), Path::new("/"), "xml")
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidBaseName { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_allocate_for_non_utf8_stem() {
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join(OsStr::from_bytes(b"bad\xff.xml"));
        std::fs::write(&source, "<a/>").unwrap();

        let path = PathAllocator::new()
            .allocate_for(temp.path(), &source, "xml")
            .unwrap();
        assert_eq!(
            path.file_name().unwrap().as_bytes(),
            b"bad\xff-1.xml".as_slice()
        );
    }

    #[test]
    fn test_dry_run_allocator_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut allocator = PathAllocator::for_dry_run();

        let path = allocator.allocate(temp.path(), "a", "xml").unwrap();
        assert_eq!(path, temp.path().join("a.xml"));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_dry_run_allocator_rejects_read_only_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = PathAllocator::for_dry_run().ensure_writable(&locked);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(AllocationError::NotWritable { .. })));
    }

    #[test]
    fn test_dry_run_allocator_rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        let err = PathAllocator::for_dry_run()
            .ensure_writable(&temp.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotWritable { .. }));
    }
}
