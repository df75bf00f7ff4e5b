//! Package manifest structure and loading.
//!
//! A manifest is a JSON document (`{project}.pkgspec.json`) with a `metadata`
//! object and an optional `files` list. Metadata strings may contain `$name$`
//! placeholders which are resolved through [`PropertyBindings`].

use crate::error::{ManifestError, PackError, PackResult};
use crate::properties::PropertyBindings;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Regex for `$name$` property placeholders.
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_.]*)\$").expect("Invalid regex pattern")
});

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Fully resolved package definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package identity.
    pub id: String,

    /// Semantic version.
    pub version: Version,

    /// Package description.
    pub description: String,

    /// Package authors.
    pub authors: Vec<String>,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Package owners.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,

    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Release notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,

    /// Copyright notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    /// License URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,

    /// Project URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,

    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,

    /// Search tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Consumers must accept the license before installing.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub require_license_acceptance: bool,

    /// Declared dependencies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ManifestDependency>,

    /// Files to place in the package, in order.
    #[serde(skip)]
    pub files: Vec<ManifestFileEntry>,
}

/// A dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDependency {
    /// Dependency package id.
    pub id: String,

    /// Version range, if constrained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A file (or file pattern) and where it goes inside the package.
#[derive(Debug, Clone)]
pub struct ManifestFileEntry {
    /// Where the bytes come from.
    pub source: FileSource,

    /// Target path or directory inside the package (`/`-separated, may be empty).
    pub target: String,

    /// Glob patterns (anchored like the source) excluded from a wildcard source.
    pub exclude: Vec<String>,
}

/// Source of a package file.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// File on disk; may contain glob wildcards.
    Path(PathBuf),

    /// Bytes produced during the run (rendered scripts).
    Generated(Vec<u8>),
}

/// Loads manifests, resolving placeholders through a run's bindings.
#[derive(Debug)]
pub struct ManifestLoader<'a> {
    bindings: &'a PropertyBindings,
}

/// On-disk manifest document.
#[derive(Debug, Deserialize)]
struct ManifestDocument {
    metadata: RawMetadata,
    #[serde(default)]
    files: Vec<RawFileEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    id: Option<String>,
    version: Option<String>,
    title: Option<String>,
    authors: Option<String>,
    owners: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    release_notes: Option<String>,
    copyright: Option<String>,
    license_url: Option<String>,
    project_url: Option<String>,
    icon_url: Option<String>,
    tags: Option<String>,
    #[serde(default)]
    require_license_acceptance: bool,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
struct RawDependency {
    id: String,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFileEntry {
    src: String,
    #[serde(default)]
    target: String,
    exclude: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PackageManifest {
    /// Create a manifest with no files and no optional metadata.
    pub fn new(id: impl Into<String>, version: Version, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version,
            description: description.into(),
            authors: Vec::new(),
            title: None,
            owners: Vec::new(),
            summary: None,
            release_notes: None,
            copyright: None,
            license_url: None,
            project_url: None,
            icon_url: None,
            tags: Vec::new(),
            require_license_acceptance: false,
            dependencies: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Add an author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Append a file entry.
    pub fn add_file(&mut self, entry: ManifestFileEntry) {
        self.files.push(entry);
    }

    /// `{id}.{version}`, the stem of the artifact file name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.id, self.version)
    }

    /// Artifact file name for a suffix such as `.nupkg`.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.full_name(), suffix)
    }
}

impl ManifestFileEntry {
    /// Entry for a file (or pattern) on disk.
    pub fn path(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: FileSource::Path(source.into()),
            target: normalize_target(&target.into()),
            exclude: Vec::new(),
        }
    }

    /// Entry for bytes generated during the run, placed at a literal path.
    pub fn generated(target: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            source: FileSource::Generated(contents.into()),
            target: normalize_target(&target.into()),
            exclude: Vec::new(),
        }
    }
}

impl<'a> ManifestLoader<'a> {
    /// Create a loader bound to a run's properties.
    pub fn new(bindings: &'a PropertyBindings) -> Self {
        Self { bindings }
    }

    /// Load and resolve the manifest at `path`.
    ///
    /// File sources are resolved relative to the manifest's directory.
    pub fn load(&self, path: &Path) -> PackResult<PackageManifest> {
        let text = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        self.parse(&text, base_dir)
            .map_err(|source| PackError::manifest(path, source))
    }

    /// Parse and resolve manifest text.
    pub fn parse(&self, text: &str, base_dir: &Path) -> Result<PackageManifest, ManifestError> {
        let document: ManifestDocument = serde_json::from_str(text)?;
        let meta = document.metadata;

        let id = self.required("id", meta.id.as_deref())?;

        let version_text = self.required("version", meta.version.as_deref())?;
        let version =
            Version::parse(&version_text).map_err(|source| ManifestError::InvalidVersion {
                version: version_text.clone(),
                source,
            })?;

        let description = self.required("description", meta.description.as_deref())?;

        let authors = split_list(&self.required("authors", meta.authors.as_deref())?, ',');
        if authors.is_empty() {
            return Err(ManifestError::MissingField { field: "authors" });
        }

        let mut dependencies = Vec::with_capacity(meta.dependencies.len());
        for dep in &meta.dependencies {
            dependencies.push(ManifestDependency {
                id: self.required("dependencies.id", Some(&dep.id))?,
                version: self.optional("dependencies.version", dep.version.as_deref()),
            });
        }

        let mut files = Vec::with_capacity(document.files.len());
        for raw in &document.files {
            let src = raw.src.replace('\\', "/");
            let mut entry = ManifestFileEntry::path(base_dir.join(src), raw.target.as_str());
            entry.exclude = raw
                .exclude
                .as_deref()
                .map(|e| split_list(&e.replace('\\', "/"), ';'))
                .unwrap_or_default()
                .into_iter()
                .map(|e| base_dir.join(e).to_string_lossy().into_owned())
                .collect();
            files.push(entry);
        }

        Ok(PackageManifest {
            id,
            version,
            description,
            authors,
            title: self.optional("title", meta.title.as_deref()),
            owners: self
                .optional("owners", meta.owners.as_deref())
                .map(|o| split_list(&o, ','))
                .unwrap_or_default(),
            summary: self.optional("summary", meta.summary.as_deref()),
            release_notes: self.optional("releaseNotes", meta.release_notes.as_deref()),
            copyright: self.optional("copyright", meta.copyright.as_deref()),
            license_url: self.optional("licenseUrl", meta.license_url.as_deref()),
            project_url: self.optional("projectUrl", meta.project_url.as_deref()),
            icon_url: self.optional("iconUrl", meta.icon_url.as_deref()),
            tags: self
                .optional("tags", meta.tags.as_deref())
                .map(|t| t.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            require_license_acceptance: meta.require_license_acceptance,
            dependencies,
            files,
        })
    }

    fn required(&self, field: &'static str, raw: Option<&str>) -> Result<String, ManifestError> {
        let raw = raw
            .filter(|r| !r.trim().is_empty())
            .ok_or(ManifestError::MissingField { field })?;

        let value = expand_placeholders(raw, self.bindings)
            .map_err(|property| ManifestError::UnresolvedProperty { field, property })?;

        let value = value.trim();
        if value.is_empty() {
            return Err(ManifestError::MissingField { field });
        }
        Ok(value.to_string())
    }

    fn optional(&self, field: &str, raw: Option<&str>) -> Option<String> {
        let raw = raw?;
        match expand_placeholders(raw, self.bindings) {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            Ok(_) => None,
            Err(property) => {
                tracing::debug!(
                    "Omitting '{}': property '${}$' has no value",
                    field,
                    property
                );
                None
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Replace every `$name$` placeholder in `text`.
///
/// Returns the name of the first placeholder with no value as the error.
pub fn expand_placeholders(text: &str, bindings: &PropertyBindings) -> Result<String, String> {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;

    for cap in PLACEHOLDER_REGEX.captures_iter(text) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        let name = &cap[1];
        let value = bindings.resolve(name).ok_or_else(|| name.to_string())?;

        result.push_str(&text[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }

    result.push_str(&text[last..]);
    Ok(result)
}

/// Split a delimited list, dropping blanks.
fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Use `/` separators and drop leading/trailing separators except a trailing one
/// that marks a directory.
fn normalize_target(target: &str) -> String {
    let target = target.replace('\\', "/");
    let trimmed = target.trim_start_matches('/');
    if trimmed.ends_with('/') {
        format!("{}/", trimmed.trim_end_matches('/'))
    } else {
        trimmed.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
