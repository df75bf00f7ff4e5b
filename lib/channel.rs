//! Distribution channel detection.
//!
//! A project is published to the primary feed when `nuget/{project}.pkgspec.json`
//! exists under the packaging root, and to the alternate ecosystem when one or
//! more `chocolatey/{project}.*.pkgspec.json` files exist.

use crate::constants::{ALTERNATE_FOLDER, MANIFEST_EXT, PRIMARY_FOLDER};
use crate::error::{PackError, PackResult};
use std::fmt;
use std::path::{Path, PathBuf};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Which distribution channels a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentChannel {
    /// Nothing configured.
    None,
    /// Primary feed only.
    Primary,
    /// Alternate ecosystem only.
    Alternate,
    /// Both channels.
    Both,
}

/// Result of inspecting a packaging root.
#[derive(Debug, Clone)]
pub struct ChannelDetection {
    /// Detected channel; never [`DeploymentChannel::None`].
    pub channel: DeploymentChannel,

    /// The primary manifest, if present.
    pub primary_manifest: Option<PathBuf>,

    /// Alternate manifests, sorted by path.
    pub alternate_manifests: Vec<PathBuf>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DeploymentChannel {
    /// Channel from per-channel presence flags.
    pub fn from_flags(primary: bool, alternate: bool) -> Self {
        match (primary, alternate) {
            (true, true) => DeploymentChannel::Both,
            (true, false) => DeploymentChannel::Primary,
            (false, true) => DeploymentChannel::Alternate,
            (false, false) => DeploymentChannel::None,
        }
    }

    /// Whether the primary feed is targeted.
    pub fn includes_primary(self) -> bool {
        matches!(self, DeploymentChannel::Primary | DeploymentChannel::Both)
    }

    /// Whether the alternate ecosystem is targeted.
    pub fn includes_alternate(self) -> bool {
        matches!(self, DeploymentChannel::Alternate | DeploymentChannel::Both)
    }
}

impl ChannelDetection {
    /// Every manifest to build, primary first.
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        self.primary_manifest
            .iter()
            .chain(self.alternate_manifests.iter())
            .cloned()
            .collect()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Inspect `packaging_root` for the manifests of `project`.
///
/// Fails with [`PackError::NoManifests`] naming both folders when neither
/// channel has a manifest.
pub fn detect(packaging_root: &Path, project: &str) -> PackResult<ChannelDetection> {
    let primary_dir = packaging_root.join(PRIMARY_FOLDER);
    let alternate_dir = packaging_root.join(ALTERNATE_FOLDER);

    let primary_manifest = Some(primary_dir.join(format!("{project}.{MANIFEST_EXT}")))
        .filter(|p| p.is_file());
    let alternate_manifests = find_alternate_manifests(&alternate_dir, project);

    let channel = DeploymentChannel::from_flags(
        primary_manifest.is_some(),
        !alternate_manifests.is_empty(),
    );

    if channel == DeploymentChannel::None {
        return Err(PackError::NoManifests {
            primary: primary_dir,
            alternate: alternate_dir,
        });
    }

    tracing::debug!(
        "Detected channel {} for '{}' ({} manifest(s))",
        channel,
        project,
        primary_manifest.iter().count() + alternate_manifests.len()
    );

    Ok(ChannelDetection {
        channel,
        primary_manifest,
        alternate_manifests,
    })
}

fn find_alternate_manifests(dir: &Path, project: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let pattern = format!(
        "{}/{}.*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(project),
        MANIFEST_EXT
    );

    let mut found: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
        Err(e) => {
            tracing::warn!("Invalid manifest pattern '{}': {}", pattern, e);
            Vec::new()
        }
    };
    found.sort();
    found
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for DeploymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentChannel::None => "none",
            DeploymentChannel::Primary => "primary",
            DeploymentChannel::Alternate => "alternate",
            DeploymentChannel::Both => "both",
        };
        f.write_str(name)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_primary_only() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "nuget/NServiceBus.pkgspec.json");

        let detection = detect(root.path(), "NServiceBus").unwrap();
        assert_eq!(detection.channel, DeploymentChannel::Primary);
        assert_eq!(detection.manifest_paths().len(), 1);
    }

    #[test]
    fn test_alternate_collects_all_sorted() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "chocolatey/App.Tools.pkgspec.json");
        touch(root.path(), "chocolatey/App.Install.pkgspec.json");
        touch(root.path(), "chocolatey/Other.Install.pkgspec.json");

        let detection = detect(root.path(), "App").unwrap();
        assert_eq!(detection.channel, DeploymentChannel::Alternate);
        assert_eq!(detection.primary_manifest, None);
        let names: Vec<_> = detection
            .alternate_manifests
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["App.Install.pkgspec.json", "App.Tools.pkgspec.json"]);
    }

    #[test]
    fn test_both_lists_primary_first() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "nuget/App.pkgspec.json");
        touch(root.path(), "chocolatey/App.Install.pkgspec.json");

        let detection = detect(root.path(), "App").unwrap();
        assert_eq!(detection.channel, DeploymentChannel::Both);
        let paths = detection.manifest_paths();
        assert!(paths[0].ends_with("nuget/App.pkgspec.json"));
    }

    #[test]
    fn test_empty_root_names_both_folders() {
        let root = TempDir::new().unwrap();
        let err = detect(root.path(), "App").unwrap_err();

        let message = err.to_string();
        assert!(message.contains(&root.path().join("nuget").display().to_string()));
        assert!(message.contains(&root.path().join("chocolatey").display().to_string()));
    }

    #[test]
    fn test_project_name_is_matched_literally() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "chocolatey/AppX.Install.pkgspec.json");

        assert!(detect(root.path(), "App?").is_err());
        // the primary manifest must be named exactly
        touch(root.path(), "nuget/app.pkgspec.json.bak");
        assert!(detect(root.path(), "app").is_err());
    }

    #[test]
    fn test_channel_flags() {
        assert!(DeploymentChannel::Both.includes_primary());
        assert!(DeploymentChannel::Both.includes_alternate());
        assert!(!DeploymentChannel::Primary.includes_alternate());
        assert_eq!(
            DeploymentChannel::from_flags(false, false),
            DeploymentChannel::None
        );
    }
}
