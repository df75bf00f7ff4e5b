//! Error types for pkgdeploy.

use std::path::{Path, PathBuf};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Result type for pkgdeploy operations.
pub type PackResult<T> = Result<T, PackError>;

/// Error type for pkgdeploy operations.
#[derive(Debug, Error)]
pub enum PackError {
    /// No manifest was found for either distribution channel.
    #[error("No manifest files found at '{}' or '{}'.", primary.display(), alternate.display())]
    NoManifests {
        /// Primary-channel folder that was searched.
        primary: PathBuf,
        /// Alternate-channel folder that was searched.
        alternate: PathBuf,
    },

    /// No built artifacts were found for either distribution channel.
    #[error("No packages found at '{}' or '{}'.", primary.display(), alternate.display())]
    NoArtifacts {
        /// Primary-channel output folder that was searched.
        primary: PathBuf,
        /// Alternate-channel output folder that was searched.
        alternate: PathBuf,
    },

    /// Run parameters or configuration failed validation.
    #[error("{}", .0.join("\n"))]
    InvalidParameters(Vec<String>),

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration '{}': {source}", path.display())]
    ConfigParse {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A manifest could not be turned into a package definition.
    #[error("Invalid manifest '{}': {source}", path.display())]
    Manifest {
        /// Manifest file path.
        path: PathBuf,
        /// What was wrong with it.
        #[source]
        source: ManifestError,
    },

    /// A tool binary required by a deployment bundle is missing.
    #[error("Could not find tool '{tool}' in '{}' for deployment script.", root.display())]
    ToolNotFound {
        /// File name of the tool.
        tool: String,
        /// Root that was searched.
        root: PathBuf,
    },

    /// A script template is not available from the template source.
    #[error("Script template not found: {name}")]
    TemplateNotFound {
        /// Logical template name.
        name: String,
    },

    /// File system failure.
    #[error("IO error at '{}': {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Zip container failure.
    #[error("Zip error at '{}': {source}", path.display())]
    Zip {
        /// Container path.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// JSON error while serializing package metadata.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Faults found while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The document is not valid manifest JSON.
    #[error("could not parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required metadata field is absent or empty.
    #[error("required field '{field}' is missing")]
    MissingField {
        /// Metadata field name.
        field: &'static str,
    },

    /// A required metadata field references a property with no value.
    #[error("required field '{field}' references unresolved property '${property}$'")]
    UnresolvedProperty {
        /// Metadata field name.
        field: &'static str,
        /// Property name inside the `$...$` token.
        property: String,
    },

    /// The version is not a semantic version.
    #[error("version '{version}' is not a valid semantic version: {source}")]
    InvalidVersion {
        /// Resolved version text.
        version: String,
        /// Parser error.
        #[source]
        source: semver::Error,
    },

    /// A file entry source pattern is not a valid glob.
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern text.
        pattern: String,
        /// Glob error.
        #[source]
        source: glob::PatternError,
    },
}

/// The four failure classes callers discriminate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing configured to package, or invalid run inputs. Fatal.
    Configuration,
    /// A manifest is malformed or incomplete. Fatal for that manifest.
    Manifest,
    /// A tool binary is missing. Collected, skips the affected bundle.
    ToolNotFound,
    /// File system or container failure. Fatal.
    Io,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PackError {
    /// Wrap an IO error with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a manifest fault with the manifest path.
    pub fn manifest(path: impl AsRef<Path>, source: ManifestError) -> Self {
        PackError::Manifest {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackError::NoManifests { .. }
            | PackError::NoArtifacts { .. }
            | PackError::InvalidParameters(_)
            | PackError::ConfigParse { .. } => ErrorKind::Configuration,
            PackError::Manifest { .. } => ErrorKind::Manifest,
            PackError::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            PackError::TemplateNotFound { .. }
            | PackError::Io { .. }
            | PackError::Zip { .. }
            | PackError::Json(_) => ErrorKind::Io,
        }
    }

    /// Whether this error reports bad input rather than an unexpected failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Manifest | ErrorKind::ToolNotFound
        )
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
