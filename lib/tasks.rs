//! The two packaging tasks.
//!
//! [`create_packages`] builds every package described by the project's
//! manifests and then the staging and release bundles. [`create_deployment_package`]
//! builds the single combined bundle from packages built earlier.

use crate::assemble::{PackageArtifact, PackageAssembler};
use crate::channel::{self, DeploymentChannel};
use crate::config::{PackagerConfig, RunParameters};
use crate::deploy::{BundleKind, DeploymentOrchestrator, DeploymentReport, artifact_channel};
use crate::diagnostics::{Diagnostics, TaskOutcome};
use crate::manifest::ManifestLoader;
use crate::properties::PropertyBindings;
use crate::script::{DirectoryTemplates, EmbeddedTemplates, ScriptTemplateEngine, TemplateSource};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Everything a task produced, plus its outcome.
#[derive(Debug)]
pub struct TaskReport {
    /// Success flag and reported errors.
    pub outcome: TaskOutcome,

    /// Channel the run targeted, once known.
    pub channel: Option<DeploymentChannel>,

    /// Packages built from manifests.
    pub packages: Vec<PackageArtifact>,

    /// Deployment bundles and scripts.
    pub deployment: DeploymentReport,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Build the project's packages, then its staging and release bundles.
///
/// A failing manifest does not stop the others; bundles are only built when
/// every manifest succeeded.
pub fn create_packages(params: &RunParameters, config: &PackagerConfig) -> TaskReport {
    let mut diagnostics = Diagnostics::new();
    let mut packages = Vec::new();
    let mut deployment = DeploymentReport::default();

    if diagnostics.check(params.validate()).is_none() {
        return finish(diagnostics, None, packages, deployment);
    }

    let Some(detection) =
        diagnostics.check(channel::detect(&params.packaging_root, &params.project_name))
    else {
        return finish(diagnostics, None, packages, deployment);
    };
    tracing::info!(
        "Packaging {} {} for channel {}",
        params.project_name,
        params.version,
        detection.channel
    );

    let bindings = PropertyBindings::for_run(params, config);
    let loader = ManifestLoader::new(&bindings);
    let assembler = PackageAssembler::default();

    let jobs = detection
        .primary_manifest
        .iter()
        .map(|m| (m, &params.primary_output))
        .chain(
            detection
                .alternate_manifests
                .iter()
                .map(|m| (m, &params.alternate_output)),
        );

    for (manifest_path, output) in jobs {
        let built = loader
            .load(manifest_path)
            .and_then(|manifest| assembler.assemble(&manifest, output));
        if let Some(artifact) = diagnostics.check(built) {
            packages.push(artifact);
        }
    }

    if diagnostics.has_errors() {
        tracing::warn!("Skipping deployment bundles: not every package was built");
        return finish(diagnostics, Some(detection.channel), packages, deployment);
    }

    let engine = template_engine(config);
    deployment = DeploymentOrchestrator::new(params, config, &engine).run(
        detection.channel,
        &[BundleKind::Staging, BundleKind::Release],
        &mut diagnostics,
    );

    finish(diagnostics, Some(detection.channel), packages, deployment)
}

/// Build the combined `{project}.Deploy` bundle from already-built packages.
pub fn create_deployment_package(params: &RunParameters, config: &PackagerConfig) -> TaskReport {
    let mut diagnostics = Diagnostics::new();

    if diagnostics.check(params.validate()).is_none() {
        return finish(diagnostics, None, Vec::new(), DeploymentReport::default());
    }

    let Some(channel) = diagnostics.check(artifact_channel(params)) else {
        return finish(diagnostics, None, Vec::new(), DeploymentReport::default());
    };
    tracing::info!(
        "Building deployment bundle for {} {} (channel {})",
        params.project_name,
        params.version,
        channel
    );

    let engine = template_engine(config);
    let deployment = DeploymentOrchestrator::new(params, config, &engine).run(
        channel,
        &[BundleKind::Combined],
        &mut diagnostics,
    );

    finish(diagnostics, Some(channel), Vec::new(), deployment)
}

/// Engine reading from the configured template directory, or the embedded set.
pub fn template_engine(config: &PackagerConfig) -> ScriptTemplateEngine<Box<dyn TemplateSource>> {
    let source: Box<dyn TemplateSource> = match &config.templates_dir {
        Some(dir) => {
            tracing::debug!("Using script templates from {}", dir.display());
            Box::new(DirectoryTemplates::new(dir))
        }
        None => Box::new(EmbeddedTemplates),
    };
    ScriptTemplateEngine::new(source)
}

fn finish(
    diagnostics: Diagnostics,
    channel: Option<DeploymentChannel>,
    packages: Vec<PackageArtifact>,
    deployment: DeploymentReport,
) -> TaskReport {
    TaskReport {
        outcome: diagnostics.into_outcome(),
        channel,
        packages,
        deployment,
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
