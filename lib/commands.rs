//! CLI command definitions.

use crate::config::RunParameters;
use crate::styles::styles;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const PACK_EXAMPLES: &str = "\
Examples:
  pkgdeploy pack -p NServiceBus -v 5.2.0 -b master      Build packages and bundles in ./
  pkgdeploy pack -p App -v 1.0.0 --content-in-release   Embed packages in the release bundle
  pkgdeploy --config ci.toml pack -p App -v 1.0.0       Override feeds and tools";

const DEPLOY_EXAMPLES: &str = "\
Examples:
  pkgdeploy deploy -p NServiceBus -v 5.2.0 -b master    Bundle packages built earlier
  pkgdeploy deploy -p App -v 1.0.0 --deploy-output out  Write the bundle to ./out";

const CLI_EXAMPLES: &str = "\
Examples:
  pkgdeploy pack -p App -v 1.0.0                        Build packages, staging and release bundles
  pkgdeploy deploy -p App -v 1.0.0                      Build the combined deployment bundle

Layout (relative to the working directory by default):
  packaging/nuget/{project}.pkgspec.json                Primary manifest
  packaging/chocolatey/{project}.*.pkgspec.json         Alternate manifests
  packages/                                             Searched for NuGet.exe and ReleaseNotesCompiler.CLI.exe";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// pkgdeploy - Build packages and deployment bundles.
#[derive(Debug, Parser)]
#[command(name = "pkgdeploy", author, version, styles=styles())]
#[command(
    about = "Build versioned packages and channel-aware deployment bundles",
    after_help = CLI_EXAMPLES
)]
pub struct Cli {
    /// Configuration file (TOML) overriding feeds, tools and metadata defaults.
    #[arg(long, global = true, env = "PKGDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build packages from manifests, then staging and release bundles.
    #[command(after_help = PACK_EXAMPLES)]
    Pack {
        #[command(flatten)]
        run: RunArgs,

        /// Embed the built packages in the release bundle too.
        #[arg(long)]
        content_in_release: bool,
    },

    /// Build the combined deployment bundle from packages built earlier.
    #[command(after_help = DEPLOY_EXAMPLES)]
    Deploy {
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Inputs shared by every command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Project (product) name.
    #[arg(short, long)]
    pub project: String,

    /// Semantic version of this build.
    #[arg(short, long)]
    pub version: String,

    /// Source-control branch of this build.
    #[arg(short, long, default_value = "master")]
    pub branch: String,

    /// Root searched for tool binaries.
    #[arg(long, default_value = "packages")]
    pub tools_root: PathBuf,

    /// Root holding the `nuget` and `chocolatey` manifest folders.
    #[arg(long, default_value = "packaging")]
    pub packaging_root: PathBuf,

    /// Output folder for primary-channel packages.
    #[arg(long, default_value = "binaries/nugets")]
    pub primary_output: PathBuf,

    /// Output folder for alternate-channel packages.
    #[arg(long, default_value = "binaries/chocos")]
    pub alternate_output: PathBuf,

    /// Output folder for deployment bundles.
    #[arg(long, default_value = "binaries/deploy")]
    pub deploy_output: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RunArgs {
    /// Run parameters for these arguments.
    pub fn into_params(self, deploy_content_in_release: bool) -> RunParameters {
        RunParameters {
            project_name: self.project,
            version: self.version,
            branch: self.branch,
            tools_root: self.tools_root,
            packaging_root: self.packaging_root,
            primary_output: self.primary_output,
            alternate_output: self.alternate_output,
            deploy_output: self.deploy_output,
            deploy_content_in_release,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
