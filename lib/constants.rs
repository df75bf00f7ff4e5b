//! Constants for pkgdeploy.
//!
//! Folder names, file extensions and the default feeds used when no
//! configuration file overrides them.

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Subfolder of the packaging root holding the primary-channel manifest.
pub const PRIMARY_FOLDER: &str = "nuget";

/// Subfolder of the packaging root holding the alternate-channel manifests.
pub const ALTERNATE_FOLDER: &str = "chocolatey";

/// Extension shared by every package manifest (`{project}.pkgspec.json`).
pub const MANIFEST_EXT: &str = "pkgspec.json";

/// Suffix appended to `{id}.{version}` for written packages.
pub const PACKAGE_SUFFIX: &str = ".nupkg";

/// Suffix for primary-channel artifacts staged as bundle content.
pub const PRIMARY_CONTENT_SUFFIX: &str = ".nzip";

/// Suffix for alternate-channel artifacts staged as bundle content.
pub const ALTERNATE_CONTENT_SUFFIX: &str = ".czip";

/// Folder inside a deployment bundle that carries tool binaries.
pub const TOOLS_TARGET: &str = "tools";

/// Folder inside a deployment bundle that carries staged artifacts.
pub const CONTENT_TARGET: &str = "content";

/// Template name (and bundle path) of the rollout script.
pub const DEPLOY_SCRIPT: &str = "Deploy.ps1";

/// Template name (and output file name) of the release-project setup script.
pub const PROJECT_SETUP_SCRIPT: &str = "create_update_octopus_project.ps1";

/// Tools every deployment bundle carries.
pub const DEFAULT_TOOLS: &[&str] = &["NuGet.exe", "ReleaseNotesCompiler.CLI.exe"];

/// Author and owner stamped onto packages.
pub const DEFAULT_AUTHOR: &str = "Particular Software";

/// First year of the copyright range.
pub const DEFAULT_COPYRIGHT_START_YEAR: i32 = 2010;

/// Default license URL bound to `$licenseUrl$`.
pub const DEFAULT_LICENSE_URL: &str = "http://particular.net/LicenseAgreement";

/// Default project URL bound to `$projectUrl$`.
pub const DEFAULT_PROJECT_URL: &str = "http://particular.net/";

/// Default icon URL bound to `$iconUrl$`.
pub const DEFAULT_ICON_URL: &str = "http://s3.amazonaws.com/nuget.images/NServiceBus_32.png";

/// Pre-release feed for primary-channel packages.
pub const PRIMARY_STAGING_FEED: &str = "https://www.myget.org/F/particular/api/v2/package";

/// Pre-release feed for alternate-channel packages.
pub const ALTERNATE_STAGING_FEED: &str =
    "https://www.myget.org/F/particular-chocolatey/api/v2/package";

/// Public feed for alternate-channel packages.
pub const ALTERNATE_RELEASE_FEED: &str = "https://chocolatey.org/api/v2/package";

/// Deployment variable holding the staging feed key.
pub const STAGING_KEY: &str = "mygetkey";

/// Deployment variable holding the primary release feed key.
pub const PRIMARY_RELEASE_KEY: &str = "nugetkey";

/// Deployment variable holding the alternate release feed key.
pub const ALTERNATE_RELEASE_KEY: &str = "chocolateykey";

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "PKGDEPLOY_CONFIG";
