//! Package assembly.
//!
//! Turns a [`PackageManifest`] into a zip container named `{id}.{version}{suffix}`.
//! The resolved metadata is written first as `{id}.pkgspec.json`, followed by
//! every file entry in manifest order. Entry timestamps are fixed, so the same
//! inputs always produce the same bytes.

use crate::constants::{MANIFEST_EXT, PACKAGE_SUFFIX};
use crate::error::{ManifestError, PackError, PackResult};
use crate::manifest::{FileSource, ManifestFileEntry, PackageManifest};
use semver::Version;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::DateTime as ZipDateTime;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A package written to disk.
#[derive(Debug, Clone)]
pub struct PackageArtifact {
    /// Package identity.
    pub id: String,

    /// Package version.
    pub version: Version,

    /// Package description.
    pub description: String,

    /// Package authors.
    pub authors: Vec<String>,

    /// Location of the container file.
    pub path: PathBuf,

    /// Paths of the entries inside the container, in write order.
    pub entries: Vec<String>,

    /// Size of the container in bytes.
    pub size: u64,

    /// SHA-256 checksum of the container.
    pub checksum: String,
}

/// Writes package containers.
#[derive(Debug, Clone)]
pub struct PackageAssembler {
    suffix: String,
}

/// A resolved entry waiting to be written.
#[derive(Debug)]
struct PendingEntry<'m> {
    archive_path: String,
    contents: PendingContents<'m>,
}

#[derive(Debug)]
enum PendingContents<'m> {
    File(PathBuf),
    Bytes(&'m [u8]),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PackageAssembler {
    /// Assembler writing files with the given suffix (e.g. `.nupkg`).
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Suffix appended to `{id}.{version}`.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Write `manifest` as a package into `destination`.
    ///
    /// The directory is created if needed. An existing artifact with the same
    /// name is replaced.
    pub fn assemble(
        &self,
        manifest: &PackageManifest,
        destination: &Path,
    ) -> PackResult<PackageArtifact> {
        std::fs::create_dir_all(destination).map_err(|e| PackError::io(destination, e))?;

        let pending = resolve_entries(manifest)?;
        let output_path = destination.join(manifest.file_name(&self.suffix));

        if let Err(e) = write_container(&output_path, manifest, &pending) {
            // Never leave a truncated container behind.
            let _ = std::fs::remove_file(&output_path);
            return Err(e);
        }

        let bytes = std::fs::read(&output_path).map_err(|e| PackError::io(&output_path, e))?;
        let checksum = compute_sha256(&bytes);

        tracing::info!(
            "Package created -> {} (sha256 {})",
            output_path.display(),
            checksum
        );

        let mut entries = Vec::with_capacity(pending.len() + 1);
        entries.push(metadata_entry_name(manifest));
        entries.extend(pending.into_iter().map(|p| p.archive_path));

        Ok(PackageArtifact {
            id: manifest.id.clone(),
            version: manifest.version.clone(),
            description: manifest.description.clone(),
            authors: manifest.authors.clone(),
            path: output_path,
            entries,
            size: bytes.len() as u64,
            checksum,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Compute SHA-256 checksum of data and return as hex string.
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn metadata_entry_name(manifest: &PackageManifest) -> String {
    format!("{}.{}", manifest.id, MANIFEST_EXT)
}

/// Expand every file entry into concrete archive paths.
fn resolve_entries(manifest: &PackageManifest) -> PackResult<Vec<PendingEntry<'_>>> {
    let mut pending = Vec::new();

    for entry in &manifest.files {
        match &entry.source {
            FileSource::Generated(bytes) => pending.push(PendingEntry {
                archive_path: entry.target.trim_end_matches('/').to_string(),
                contents: PendingContents::Bytes(bytes),
            }),
            FileSource::Path(source) => resolve_path_entry(entry, source, &mut pending)?,
        }
    }

    Ok(pending)
}

fn resolve_path_entry(
    entry: &ManifestFileEntry,
    source: &Path,
    pending: &mut Vec<PendingEntry<'_>>,
) -> PackResult<()> {
    let pattern = source.to_string_lossy().replace('\\', "/");

    if !has_wildcard(&pattern) {
        if !source.is_file() {
            return Err(not_found(source));
        }
        pending.push(PendingEntry {
            archive_path: single_file_target(source, &entry.target),
            contents: PendingContents::File(source.to_path_buf()),
        });
        return Ok(());
    }

    let excludes = entry
        .exclude
        .iter()
        .map(|e| {
            glob::Pattern::new(&e.replace('\\', "/")).map_err(|err| {
                PackError::manifest(
                    source,
                    ManifestError::InvalidPattern {
                        pattern: e.clone(),
                        source: err,
                    },
                )
            })
        })
        .collect::<PackResult<Vec<_>>>()?;

    let paths = glob::glob(&pattern).map_err(|err| {
        PackError::manifest(
            source,
            ManifestError::InvalidPattern {
                pattern: pattern.clone(),
                source: err,
            },
        )
    })?;

    let root = wildcard_root(&pattern);
    let mut matches: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .filter(|p| !excludes.iter().any(|x| x.matches_path(p)))
        .collect();
    matches.sort();

    if matches.is_empty() {
        return Err(not_found(source));
    }

    for path in matches {
        let relative = path
            .strip_prefix(&root)
            .map(|r| r.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| file_name(&path));
        pending.push(PendingEntry {
            archive_path: join_archive_path(&entry.target, &relative),
            contents: PendingContents::File(path),
        });
    }

    Ok(())
}

fn write_container(
    output_path: &Path,
    manifest: &PackageManifest,
    pending: &[PendingEntry<'_>],
) -> PackResult<()> {
    let zip_err = |source| PackError::Zip {
        path: output_path.to_path_buf(),
        source,
    };
    let io_err = |source| PackError::io(output_path, source);

    let file = File::create(output_path).map_err(io_err)?;
    let mut zip = ZipWriter::new(file);

    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .last_modified_time(ZipDateTime::default());

    zip.start_file(metadata_entry_name(manifest), options)
        .map_err(zip_err)?;
    zip.write_all(&serde_json::to_vec_pretty(manifest)?)
        .map_err(io_err)?;

    for entry in pending {
        zip.start_file(entry.archive_path.as_str(), options)
            .map_err(zip_err)?;
        match &entry.contents {
            PendingContents::Bytes(bytes) => zip.write_all(bytes).map_err(io_err)?,
            PendingContents::File(path) => {
                let contents = std::fs::read(path).map_err(|e| PackError::io(path, e))?;
                zip.write_all(&contents).map_err(io_err)?;
            }
        }
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

fn not_found(source: &Path) -> PackError {
    PackError::io(
        source,
        std::io::Error::new(std::io::ErrorKind::NotFound, "no file matches this source"),
    )
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Directory part of a pattern before its first wildcard component.
fn wildcard_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in pattern.split('/') {
        if has_wildcard(component) {
            break;
        }
        if component.is_empty() && root.as_os_str().is_empty() {
            root.push("/");
        } else {
            root.push(component);
        }
    }
    root
}

/// Archive path for a single, non-wildcard source.
///
/// A target with the source's extension names the file itself; anything else
/// is a directory that receives the file under its own name.
fn single_file_target(source: &Path, target: &str) -> String {
    let name = file_name(source);

    if target.is_empty() {
        return name;
    }
    if target.ends_with('/') {
        return join_archive_path(target, &name);
    }

    let target_ext = Path::new(target).extension();
    if target_ext.is_some() && target_ext == source.extension() {
        target.to_string()
    } else {
        join_archive_path(target, &name)
    }
}

fn join_archive_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for PackageAssembler {
    fn default() -> Self {
        Self::new(PACKAGE_SUFFIX)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
