//! Run parameters and the optional packager configuration file.

use crate::constants::{
    ALTERNATE_RELEASE_FEED, ALTERNATE_RELEASE_KEY, ALTERNATE_STAGING_FEED, CONFIG_ENV,
    DEFAULT_AUTHOR, DEFAULT_COPYRIGHT_START_YEAR, DEFAULT_ICON_URL, DEFAULT_LICENSE_URL,
    DEFAULT_PROJECT_URL, DEFAULT_TOOLS, PRIMARY_RELEASE_KEY, PRIMARY_STAGING_FEED, STAGING_KEY,
};
use crate::error::{PackError, PackResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Static packaging settings, normally left at their defaults.
///
/// Loaded from TOML. Every field is optional in the file:
///
/// ```toml
/// authors = "Contoso"
/// tools = ["NuGet.exe"]
///
/// [feeds]
/// primary_staging = "https://example.org/feed"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    /// Value bound to `$authors$` and stamped on deployment bundles.
    pub authors: String,

    /// Value bound to `$owners$`; also the copyright holder.
    pub owners: String,

    /// Value bound to `$licenseUrl$`.
    pub license_url: String,

    /// Value bound to `$projectUrl$`.
    pub project_url: String,

    /// Value bound to `$iconUrl$`.
    pub icon_url: String,

    /// First year of the copyright range.
    pub copyright_start_year: i32,

    /// Tool binaries every deployment bundle carries.
    pub tools: Vec<String>,

    /// Feed URLs used by the generated script.
    pub feeds: FeedConfig,

    /// Deployment variable names holding feed keys.
    pub keys: KeyConfig,

    /// Directory with script templates overriding the embedded ones.
    pub templates_dir: Option<PathBuf>,
}

/// Feed URLs written into the rollout script.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Pre-release feed for primary packages.
    pub primary_staging: String,

    /// Pre-release feed for alternate packages.
    pub alternate_staging: String,

    /// Public feed for alternate packages.
    pub alternate_release: String,
}

/// Names of the deployment variables that hold feed keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Key for both staging feeds.
    pub staging: String,

    /// Key for the primary public feed.
    pub primary_release: String,

    /// Key for the alternate public feed.
    pub alternate_release: String,
}

/// Inputs gathered by the entry point for one packaging run.
#[derive(Debug, Clone)]
pub struct RunParameters {
    /// Project (product) name; prefixes manifests and bundle ids.
    pub project_name: String,

    /// Semantic version applied to every package of the run.
    pub version: String,

    /// Source-control branch the build came from.
    pub branch: String,

    /// Root searched recursively for tool binaries.
    pub tools_root: PathBuf,

    /// Root holding the `nuget` and `chocolatey` manifest folders.
    pub packaging_root: PathBuf,

    /// Output folder for primary-channel packages.
    pub primary_output: PathBuf,

    /// Output folder for alternate-channel packages.
    pub alternate_output: PathBuf,

    /// Output folder for deployment bundles.
    pub deploy_output: PathBuf,

    /// Embed package content in the release bundle too.
    pub deploy_content_in_release: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PackagerConfig {
    /// Load configuration from `path`, or from `PKGDEPLOY_CONFIG`, or use defaults.
    pub fn load(path: Option<&Path>) -> PackResult<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        tracing::debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(&path).map_err(|e| PackError::io(&path, e))?;
        Self::from_toml(&text).map_err(|source| PackError::ConfigParse { path, source })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl RunParameters {
    /// Check the inputs before any work is done.
    ///
    /// All problems are reported together, one message per problem.
    pub fn validate(&self) -> PackResult<()> {
        let mut problems = Vec::new();

        if self.project_name.trim().is_empty() {
            problems.push("Project name must not be empty.".to_string());
        }

        if let Err(e) = semver::Version::parse(&self.version) {
            problems.push(format!(
                "Version '{}' is not a valid semantic version: {}",
                self.version, e
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PackError::InvalidParameters(problems))
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            authors: DEFAULT_AUTHOR.to_string(),
            owners: DEFAULT_AUTHOR.to_string(),
            license_url: DEFAULT_LICENSE_URL.to_string(),
            project_url: DEFAULT_PROJECT_URL.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
            copyright_start_year: DEFAULT_COPYRIGHT_START_YEAR,
            tools: DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
            feeds: FeedConfig::default(),
            keys: KeyConfig::default(),
            templates_dir: None,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            primary_staging: PRIMARY_STAGING_FEED.to_string(),
            alternate_staging: ALTERNATE_STAGING_FEED.to_string(),
            alternate_release: ALTERNATE_RELEASE_FEED.to_string(),
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            staging: STAGING_KEY.to_string(),
            primary_release: PRIMARY_RELEASE_KEY.to_string(),
            alternate_release: ALTERNATE_RELEASE_KEY.to_string(),
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

    fn params(project: &str, version: &str) -> RunParameters {
        RunParameters {
            project_name: project.to_string(),
            version: version.to_string(),
            branch: "master".to_string(),
            tools_root: PathBuf::from("tools"),
            packaging_root: PathBuf::from("packaging"),
            primary_output: PathBuf::from("nugets"),
            alternate_output: PathBuf::from("chocos"),
            deploy_output: PathBuf::from("deploy"),
            deploy_content_in_release: false,
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PackagerConfig::from_toml(
            r#"
            authors = "Contoso"

            [feeds]
            primary_staging = "https://feeds.contoso.test/staging"
            "#,
        )
        .unwrap();

        assert_eq!(config.authors, "Contoso");
        assert_eq!(config.owners, DEFAULT_AUTHOR);
        assert_eq!(config.feeds.primary_staging, "https://feeds.contoso.test/staging");
        assert_eq!(config.feeds.alternate_staging, ALTERNATE_STAGING_FEED);
        assert_eq!(config.tools.len(), 2);
        assert_eq!(config.copyright_start_year, 2010);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgdeploy.toml");
        std::fs::write(&path, "tools = [\"NuGet.exe\"]\n").unwrap();

        let config = PackagerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.tools, vec!["NuGet.exe".to_string()]);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgdeploy.toml");
        std::fs::write(&path, "tools = 3\n").unwrap();

        let err = PackagerConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, PackError::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_accepts_semver() {
        assert!(params("NServiceBus", "5.2.0-beta0001").validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let err = params(" ", "5.2").validate().unwrap_err();
        match err {
            PackError::InvalidParameters(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
