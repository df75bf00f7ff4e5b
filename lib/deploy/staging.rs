//! Content copies of built packages.
//!
//! A package nested in another package's `content` folder must not look like a
//! package itself, so each artifact is copied next to the original under a
//! channel suffix (`App.1.0.0.nupkg.nzip`). Originals are never moved. The
//! copies live exactly as long as their [`ContentCopies`] guard.

use crate::constants::{ALTERNATE_CONTENT_SUFFIX, PACKAGE_SUFFIX, PRIMARY_CONTENT_SUFFIX};
use crate::error::{PackError, PackResult};
use std::path::{Path, PathBuf};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Owns the temporary content copies of one orchestration run.
///
/// Dropping the guard deletes every copy it still owns.
#[derive(Debug, Default)]
pub struct ContentCopies {
    copies: Vec<PathBuf>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContentCopies {
    /// Guard owning nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every package in `dir` under `suffix`.
    ///
    /// Leftover copies from an earlier interrupted run are removed first. Each
    /// copy is owned by the guard as soon as it exists.
    pub fn stage_dir(&mut self, dir: &Path, suffix: &str) -> PackResult<Vec<PathBuf>> {
        sweep_stale(dir)?;

        let mut staged = Vec::new();
        for artifact in list_packages(dir)? {
            staged.push(self.copy(&artifact, suffix)?);
        }
        Ok(staged)
    }

    /// Copy one artifact to `{artifact}{suffix}`.
    pub fn copy(&mut self, artifact: &Path, suffix: &str) -> PackResult<PathBuf> {
        let mut name = artifact.as_os_str().to_os_string();
        name.push(suffix);
        let copy = PathBuf::from(name);

        std::fs::copy(artifact, &copy).map_err(|e| PackError::io(artifact, e))?;
        tracing::debug!("Staged {} -> {}", artifact.display(), copy.display());

        self.copies.push(copy.clone());
        Ok(copy)
    }

    /// Copies currently owned.
    pub fn paths(&self) -> &[PathBuf] {
        &self.copies
    }

    /// Whether no copy is owned.
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// Delete every copy now, reporting the first failure.
    ///
    /// All deletions are attempted even when one fails.
    pub fn release(mut self) -> PackResult<()> {
        self.remove_all()
    }

    fn remove_all(&mut self) -> PackResult<()> {
        let mut first_error = None;

        for copy in self.copies.drain(..) {
            match std::fs::remove_file(&copy) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(PackError::io(&copy, e));
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Built packages in `dir`, sorted. A missing directory has none.
pub fn list_packages(dir: &Path) -> PackResult<Vec<PathBuf>> {
    list_with_suffix(dir, &[PACKAGE_SUFFIX])
}

/// Delete content copies left behind in `dir`. Returns how many were removed.
pub fn sweep_stale(dir: &Path) -> PackResult<usize> {
    let stale = list_with_suffix(dir, &[PRIMARY_CONTENT_SUFFIX, ALTERNATE_CONTENT_SUFFIX])?;
    for path in &stale {
        tracing::warn!("Removing stale content copy {}", path.display());
        std::fs::remove_file(path).map_err(|e| PackError::io(path, e))?;
    }
    Ok(stale.len())
}

fn list_with_suffix(dir: &Path, suffixes: &[&str]) -> PackResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PackError::io(dir, e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PackError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        if path.is_file() && suffixes.iter().any(|s| name.ends_with(s)) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for ContentCopies {
    fn drop(&mut self) {
        if let Err(e) = self.remove_all() {
            tracing::warn!("Failed to clean up content copies: {}", e);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_copies_leave_originals_and_vanish_on_drop() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("App.1.0.0.nupkg"), b"pkg").unwrap();

        {
            let mut copies = ContentCopies::new();
            let staged = copies.stage_dir(dir.path(), PRIMARY_CONTENT_SUFFIX).unwrap();
            assert_eq!(staged.len(), 1);
            assert_eq!(
                names(dir.path()),
                vec!["App.1.0.0.nupkg", "App.1.0.0.nupkg.nzip"]
            );
            assert_eq!(std::fs::read(&staged[0]).unwrap(), b"pkg");
        }

        assert_eq!(names(dir.path()), vec!["App.1.0.0.nupkg"]);
    }

    #[test]
    fn test_release_deletes_copies() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.1.0.0.nupkg"), b"a").unwrap();
        std::fs::write(dir.path().join("B.1.0.0.nupkg"), b"b").unwrap();

        let mut copies = ContentCopies::new();
        copies.stage_dir(dir.path(), ALTERNATE_CONTENT_SUFFIX).unwrap();
        assert_eq!(copies.paths().len(), 2);

        copies.release().unwrap();
        assert_eq!(names(dir.path()), vec!["A.1.0.0.nupkg", "B.1.0.0.nupkg"]);
    }

    #[test]
    fn test_stale_copies_are_swept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.1.0.0.nupkg"), b"a").unwrap();
        std::fs::write(dir.path().join("Old.0.9.0.nupkg.czip"), b"old").unwrap();

        assert_eq!(sweep_stale(dir.path()).unwrap(), 1);
        assert_eq!(names(dir.path()), vec!["A.1.0.0.nupkg"]);
    }

    #[test]
    fn test_missing_dir_has_no_packages() {
        let dir = TempDir::new().unwrap();
        assert!(list_packages(&dir.path().join("absent")).unwrap().is_empty());

        let mut copies = ContentCopies::new();
        assert!(copies.stage_dir(&dir.path().join("absent"), PRIMARY_CONTENT_SUFFIX).unwrap().is_empty());
        assert!(copies.is_empty());
    }

    #[test]
    fn test_failed_copy_keeps_earlier_copies_owned() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.1.0.0.nupkg"), b"a").unwrap();

        let mut copies = ContentCopies::new();
        copies.copy(&dir.path().join("A.1.0.0.nupkg"), PRIMARY_CONTENT_SUFFIX).unwrap();
        assert!(copies.copy(&dir.path().join("Gone.nupkg"), PRIMARY_CONTENT_SUFFIX).is_err());
        assert_eq!(copies.paths().len(), 1);

        drop(copies);
        assert_eq!(names(dir.path()), vec!["A.1.0.0.nupkg"]);
    }
}
