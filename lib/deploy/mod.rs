//! Deployment bundle orchestration.
//!
//! A run moves through a fixed sequence:
//!
//! 1. collect the built packages of every active channel,
//! 2. copy them under their content suffix ([`ContentCopies`]),
//! 3. resolve the tool binaries once,
//! 4. assemble each requested bundle (tools, content, rendered `Deploy.ps1`),
//! 5. delete the content copies.
//!
//! Step 5 runs on every exit path. Errors are reported into [`Diagnostics`];
//! the first assembly failure stops the remaining bundles.

mod staging;
mod tools;

use crate::assemble::{PackageArtifact, PackageAssembler};
use crate::channel::{self, DeploymentChannel};
use crate::config::{PackagerConfig, RunParameters};
use crate::constants::{
    ALTERNATE_CONTENT_SUFFIX, CONTENT_TARGET, DEPLOY_SCRIPT, PRIMARY_CONTENT_SUFFIX,
    PROJECT_SETUP_SCRIPT, TOOLS_TARGET,
};
use crate::diagnostics::Diagnostics;
use crate::error::{PackError, PackResult};
use crate::manifest::{ManifestFileEntry, PackageManifest};
use crate::script::{Phase, ScriptTemplateEngine, TemplateSource};
use semver::Version;
use std::path::{Path, PathBuf};

pub use staging::*;
pub use tools::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Flavors of deployment bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// `{project}.Staging`: pre-release push, always carries content.
    Staging,
    /// `{project}.Release`: public push, content only on request.
    Release,
    /// `{project}.Deploy`: single release bundle, always carries content.
    Combined,
}

/// What an orchestration run produced.
#[derive(Debug, Default)]
pub struct DeploymentReport {
    /// Saved bundles, in build order.
    pub bundles: Vec<PackageArtifact>,

    /// Rendered project setup script, when one was written.
    pub setup_script: Option<PathBuf>,
}

/// Builds deployment bundles from already-built packages.
#[derive(Debug)]
pub struct DeploymentOrchestrator<'a, S> {
    params: &'a RunParameters,
    config: &'a PackagerConfig,
    engine: &'a ScriptTemplateEngine<S>,
    assembler: PackageAssembler,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl BundleKind {
    /// Bundle package id.
    pub fn id(self, project: &str) -> String {
        match self {
            BundleKind::Staging => format!("{project}.Staging"),
            BundleKind::Release => format!("{project}.Release"),
            BundleKind::Combined => format!("{project}.Deploy"),
        }
    }

    /// Bundle package description.
    pub fn description(self, project: &str) -> String {
        match self {
            BundleKind::Staging => format!("Octopus package for staging {project}."),
            BundleKind::Release | BundleKind::Combined => {
                format!("Octopus package for release {project}.")
            }
        }
    }

    /// Script phase the bundle drives.
    pub fn phase(self) -> Phase {
        match self {
            BundleKind::Staging => Phase::Staging,
            BundleKind::Release | BundleKind::Combined => Phase::Release,
        }
    }

    /// Whether staged packages go into `content/`.
    pub fn includes_content(self, content_in_release: bool) -> bool {
        match self {
            BundleKind::Staging | BundleKind::Combined => true,
            BundleKind::Release => content_in_release,
        }
    }
}

impl<'a, S: TemplateSource> DeploymentOrchestrator<'a, S> {
    /// Orchestrator for one run.
    pub fn new(
        params: &'a RunParameters,
        config: &'a PackagerConfig,
        engine: &'a ScriptTemplateEngine<S>,
    ) -> Self {
        Self {
            params,
            config,
            engine,
            assembler: PackageAssembler::default(),
        }
    }

    /// Build `kinds` for `channel`, reporting failures into `diagnostics`.
    pub fn run(
        &self,
        channel: DeploymentChannel,
        kinds: &[BundleKind],
        diagnostics: &mut Diagnostics,
    ) -> DeploymentReport {
        let mut report = DeploymentReport::default();
        let mut copies = ContentCopies::new();

        if let Err(e) = self.build_bundles(channel, kinds, &mut copies, &mut report, diagnostics) {
            diagnostics.report(e);
        }

        if let Err(e) = copies.release() {
            diagnostics.report(e);
        }

        if kinds.contains(&BundleKind::Combined)
            && !report.bundles.is_empty()
            && !diagnostics.has_errors()
        {
            report.setup_script = diagnostics.check(self.write_project_setup());
        }

        report
    }

    fn build_bundles(
        &self,
        channel: DeploymentChannel,
        kinds: &[BundleKind],
        copies: &mut ContentCopies,
        report: &mut DeploymentReport,
        diagnostics: &mut Diagnostics,
    ) -> PackResult<()> {
        let version = self.version()?;
        let content = self.stage_content(channel, copies)?;

        let locator = ToolLocator::new(&self.params.tools_root);
        let Some(tools) = locator.resolve_all(&self.config.tools, diagnostics) else {
            tracing::warn!("Skipping deployment bundles: required tools are missing");
            return Ok(());
        };

        for &kind in kinds {
            let manifest = self.bundle_manifest(kind, channel, &version, &tools, &content)?;
            let artifact = self.assembler.assemble(&manifest, &self.params.deploy_output)?;
            report.bundles.push(artifact);
        }

        Ok(())
    }

    fn version(&self) -> PackResult<Version> {
        Version::parse(&self.params.version).map_err(|e| {
            PackError::InvalidParameters(vec![format!(
                "Version '{}' is not a valid semantic version: {}",
                self.params.version, e
            )])
        })
    }

    /// Copy the built packages of every active channel.
    fn stage_content(
        &self,
        channel: DeploymentChannel,
        copies: &mut ContentCopies,
    ) -> PackResult<Vec<PathBuf>> {
        let primary = &self.params.primary_output;
        let alternate = &self.params.alternate_output;
        let mut staged = Vec::new();

        if channel.includes_primary() {
            staged.extend(copies.stage_dir(primary, PRIMARY_CONTENT_SUFFIX)?);
        }
        // A shared output folder is staged once.
        if channel.includes_alternate() && !(channel.includes_primary() && primary == alternate)
        {
            staged.extend(copies.stage_dir(alternate, ALTERNATE_CONTENT_SUFFIX)?);
        }

        tracing::debug!("Staged {} package(s) as content", staged.len());
        Ok(staged)
    }

    fn bundle_manifest(
        &self,
        kind: BundleKind,
        channel: DeploymentChannel,
        version: &Version,
        tools: &[LocatedTool],
        content: &[PathBuf],
    ) -> PackResult<PackageManifest> {
        let project = &self.params.project_name;
        let mut manifest =
            PackageManifest::new(kind.id(project), version.clone(), kind.description(project))
                .with_author(&self.config.authors);

        for tool in tools {
            manifest.add_file(ManifestFileEntry::path(&tool.path, TOOLS_TARGET));
        }

        if kind.includes_content(self.params.deploy_content_in_release) {
            for path in content {
                manifest.add_file(ManifestFileEntry::path(path, CONTENT_TARGET));
            }
        }

        let script = crate::script::render_deploy_script(
            self.engine,
            kind.phase(),
            channel,
            self.params,
            self.config,
        )?;
        manifest.add_file(ManifestFileEntry::generated(DEPLOY_SCRIPT, script));

        Ok(manifest)
    }

    fn write_project_setup(&self) -> PackResult<PathBuf> {
        let script = crate::script::render_project_setup(self.engine, self.params)?;
        let dir = &self.params.deploy_output;
        std::fs::create_dir_all(dir).map_err(|e| PackError::io(dir, e))?;

        let path = dir.join(PROJECT_SETUP_SCRIPT);
        std::fs::write(&path, script).map_err(|e| PackError::io(&path, e))?;
        tracing::info!("Project setup script created -> {}", path.display());
        Ok(path)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Channel implied by which output folders hold built packages.
///
/// A shared output folder cannot tell the channels apart, so the manifests
/// under the packaging root decide which of them it serves.
pub fn artifact_channel(params: &RunParameters) -> PackResult<DeploymentChannel> {
    if params.primary_output == params.alternate_output {
        if !has_packages(&params.primary_output)? {
            return Err(no_artifacts(params));
        }
        let detection = channel::detect(&params.packaging_root, &params.project_name)?;
        tracing::debug!(
            "Shared output folder {} serves channel {}",
            params.primary_output.display(),
            detection.channel
        );
        return Ok(detection.channel);
    }

    let primary = has_packages(&params.primary_output)?;
    let alternate = has_packages(&params.alternate_output)?;

    match DeploymentChannel::from_flags(primary, alternate) {
        DeploymentChannel::None => Err(no_artifacts(params)),
        channel => Ok(channel),
    }
}

fn no_artifacts(params: &RunParameters) -> PackError {
    PackError::NoArtifacts {
        primary: params.primary_output.clone(),
        alternate: params.alternate_output.clone(),
    }
}

fn has_packages(dir: &Path) -> PackResult<bool> {
    Ok(!list_packages(dir)?.is_empty())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;
