use super::*;
use crate::error::ErrorKind;
use crate::script::EmbeddedTemplates;
use std::fs::File;
use std::io::Read;
use tempfile::TempDir;
use zip::ZipArchive;

//--------------------------------------------------------------------------------------------------
// Fixtures
//--------------------------------------------------------------------------------------------------

struct Fixture {
    _dir: TempDir,
    params: RunParameters,
}

fn fixture(tools: &[&str]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    for tool in tools {
        let path = root.join("packages/tools").join(tool);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"MZ").unwrap();
    }

    std::fs::create_dir_all(root.join("nugets")).unwrap();
    std::fs::create_dir_all(root.join("chocos")).unwrap();
    std::fs::write(root.join("nugets/App.1.2.0.nupkg"), b"primary").unwrap();
    std::fs::write(root.join("chocos/App.Install.1.2.0.nupkg"), b"alternate").unwrap();

    let params = RunParameters {
        project_name: "App".to_string(),
        version: "1.2.0".to_string(),
        branch: "master".to_string(),
        tools_root: root.join("packages"),
        packaging_root: root.join("packaging"),
        primary_output: root.join("nugets"),
        alternate_output: root.join("chocos"),
        deploy_output: root.join("deploy"),
        deploy_content_in_release: false,
    };

    Fixture { _dir: dir, params }
}

fn all_tools() -> Fixture {
    fixture(&["NuGet.exe", "ReleaseNotesCompiler.CLI.exe"])
}

fn run(
    params: &RunParameters,
    channel: DeploymentChannel,
    kinds: &[BundleKind],
) -> (DeploymentReport, Diagnostics) {
    let config = PackagerConfig::default();
    let engine = ScriptTemplateEngine::new(EmbeddedTemplates);
    let mut diagnostics = Diagnostics::new();
    let report =
        DeploymentOrchestrator::new(params, &config, &engine).run(channel, kinds, &mut diagnostics);
    (report, diagnostics)
}

fn entries(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn script(path: &Path) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut text = String::new();
    archive
        .by_name(DEPLOY_SCRIPT)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}

fn leftover_copies(params: &RunParameters) -> usize {
    [&params.primary_output, &params.alternate_output]
        .iter()
        .flat_map(|dir| std::fs::read_dir(dir).unwrap())
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(PRIMARY_CONTENT_SUFFIX) || n.ends_with(ALTERNATE_CONTENT_SUFFIX))
        .count()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test]
fn test_staging_and_release_bundles() {
    let f = all_tools();
    let (report, diagnostics) = run(
        &f.params,
        DeploymentChannel::Both,
        &[BundleKind::Staging, BundleKind::Release],
    );

    assert!(!diagnostics.has_errors());
    assert_eq!(report.bundles.len(), 2);
    assert!(report.setup_script.is_none());

    let staging = &report.bundles[0];
    assert!(staging.path.ends_with("deploy/App.Staging.1.2.0.nupkg"));
    assert_eq!(
        entries(&staging.path),
        vec![
            "App.Staging.pkgspec.json",
            "tools/NuGet.exe",
            "tools/ReleaseNotesCompiler.CLI.exe",
            "content/App.1.2.0.nupkg.nzip",
            "content/App.Install.1.2.0.nupkg.czip",
            "Deploy.ps1",
        ]
    );
    let staging_script = script(&staging.path);
    assert!(staging_script.contains("ReleaseNotesCompiler.CLI.exe\" create"));
    assert!(!staging_script.contains("{{"));

    let release = &report.bundles[1];
    assert_eq!(release.description, "Octopus package for release App.");
    assert_eq!(
        entries(&release.path),
        vec![
            "App.Release.pkgspec.json",
            "tools/NuGet.exe",
            "tools/ReleaseNotesCompiler.CLI.exe",
            "Deploy.ps1",
        ]
    );
    assert!(script(&release.path).contains("\"nugetkey\", \"chocolateykey\""));
}

#[test]
fn test_cleanup_after_success() {
    let f = all_tools();
    let (_, diagnostics) = run(&f.params, DeploymentChannel::Both, &[BundleKind::Staging]);

    assert!(!diagnostics.has_errors());
    assert_eq!(leftover_copies(&f.params), 0);
    assert!(f.params.primary_output.join("App.1.2.0.nupkg").exists());
    assert!(f.params.alternate_output.join("App.Install.1.2.0.nupkg").exists());
}

#[test]
fn test_cleanup_after_failure() {
    let f = all_tools();
    // A file where the output folder should be makes assembly fail.
    std::fs::write(&f.params.deploy_output, b"not a directory").unwrap();

    let (report, diagnostics) = run(
        &f.params,
        DeploymentChannel::Both,
        &[BundleKind::Staging, BundleKind::Release],
    );

    assert!(report.bundles.is_empty());
    assert_eq!(diagnostics.errors().len(), 1);
    assert_eq!(diagnostics.count(ErrorKind::Io), 1);
    assert_eq!(leftover_copies(&f.params), 0);
}

#[test]
fn test_one_missing_tool_is_reported_once() {
    let f = fixture(&["NuGet.exe"]);
    let (report, diagnostics) = run(
        &f.params,
        DeploymentChannel::Primary,
        &[BundleKind::Staging, BundleKind::Release],
    );

    assert_eq!(diagnostics.errors().len(), 1);
    match &diagnostics.errors()[0] {
        PackError::ToolNotFound { tool, .. } => assert_eq!(tool, "ReleaseNotesCompiler.CLI.exe"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(report.bundles.is_empty());
    assert!(!f.params.deploy_output.exists());
    assert_eq!(leftover_copies(&f.params), 0);
}

#[test]
fn test_release_content_flag() {
    let mut f = all_tools();
    f.params.deploy_content_in_release = true;

    let (report, diagnostics) = run(&f.params, DeploymentChannel::Primary, &[BundleKind::Release]);
    assert!(!diagnostics.has_errors());
    assert!(
        entries(&report.bundles[0].path).contains(&"content/App.1.2.0.nupkg.nzip".to_string())
    );
}

#[test]
fn test_primary_channel_ignores_alternate_output() {
    let f = all_tools();
    let (report, _) = run(&f.params, DeploymentChannel::Primary, &[BundleKind::Staging]);

    let names = entries(&report.bundles[0].path);
    assert!(names.iter().all(|n| !n.ends_with(ALTERNATE_CONTENT_SUFFIX)));
    assert!(!script(&report.bundles[0].path).contains("particular-chocolatey"));
}

#[test]
fn test_shared_output_folder_is_staged_once() {
    let mut f = all_tools();
    f.params.alternate_output = f.params.primary_output.clone();

    let (report, diagnostics) = run(&f.params, DeploymentChannel::Both, &[BundleKind::Staging]);
    assert!(!diagnostics.has_errors());
    let content: Vec<_> = entries(&report.bundles[0].path)
        .into_iter()
        .filter(|n| n.starts_with("content/"))
        .collect();
    assert_eq!(content, vec!["content/App.1.2.0.nupkg.nzip"]);
}

#[test]
fn test_alternate_staging_bundle() {
    let f = all_tools();
    let (report, diagnostics) =
        run(&f.params, DeploymentChannel::Alternate, &[BundleKind::Staging]);
    assert!(!diagnostics.has_errors());

    let bundle = &report.bundles[0];
    let content: Vec<_> = entries(&bundle.path)
        .into_iter()
        .filter(|n| n.starts_with("content/"))
        .collect();
    assert_eq!(content, vec!["content/App.Install.1.2.0.nupkg.czip"]);

    let text = script(&bundle.path);
    assert!(text.contains(
        "push $fileName $mygetkey -Source https://www.myget.org/F/particular-chocolatey/api/v2/package"
    ));
    assert_eq!(text.matches("NuGet.exe\" push").count(), 1);
    assert!(!text.contains("{{"));
    assert_eq!(leftover_copies(&f.params), 0);
}

#[test]
fn test_shared_output_folder_channel_comes_from_manifests() {
    let mut f = all_tools();
    let shared = f.params.primary_output.clone();
    std::fs::rename(
        f.params.alternate_output.join("App.Install.1.2.0.nupkg"),
        shared.join("App.Install.1.2.0.nupkg"),
    )
    .unwrap();
    f.params.alternate_output = shared;

    let packaging = &f.params.packaging_root;
    std::fs::create_dir_all(packaging.join("nuget")).unwrap();
    std::fs::create_dir_all(packaging.join("chocolatey")).unwrap();
    std::fs::write(packaging.join("nuget/App.pkgspec.json"), "{}").unwrap();
    std::fs::write(packaging.join("chocolatey/App.Install.pkgspec.json"), "{}").unwrap();

    let channel = artifact_channel(&f.params).unwrap();
    assert_eq!(channel, DeploymentChannel::Both);

    let (report, diagnostics) = run(&f.params, channel, &[BundleKind::Combined]);
    assert!(!diagnostics.has_errors());
    let text = script(&report.bundles[0].path);
    assert!(text.contains("\"nugetkey\", \"chocolateykey\""));
    assert!(text.contains("push $fileName $chocolateykey -Source https://chocolatey.org/api/v2/package"));

    std::fs::remove_file(packaging.join("nuget/App.pkgspec.json")).unwrap();
    assert_eq!(artifact_channel(&f.params).unwrap(), DeploymentChannel::Alternate);
}

#[test]
fn test_shared_output_folder_without_manifests() {
    let mut f = all_tools();
    f.params.alternate_output = f.params.primary_output.clone();

    let err = artifact_channel(&f.params).unwrap_err();
    assert!(matches!(err, PackError::NoManifests { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_combined_bundle_writes_setup_script() {
    let f = all_tools();
    let channel = artifact_channel(&f.params).unwrap();
    assert_eq!(channel, DeploymentChannel::Both);

    let (report, diagnostics) = run(&f.params, channel, &[BundleKind::Combined]);
    assert!(!diagnostics.has_errors());

    let bundle = &report.bundles[0];
    assert!(bundle.path.ends_with("App.Deploy.1.2.0.nupkg"));
    assert!(entries(&bundle.path).contains(&"content/App.Install.1.2.0.nupkg.czip".to_string()));

    let setup = report.setup_script.unwrap();
    assert_eq!(setup, f.params.deploy_output.join(PROJECT_SETUP_SCRIPT));
    let text = std::fs::read_to_string(setup).unwrap();
    assert!(text.contains("$product = \"App\""));
    assert!(text.contains("$channel = \"1.2\""));
    assert_eq!(leftover_copies(&f.params), 0);
}

#[test]
fn test_combined_without_tools_writes_nothing() {
    let f = fixture(&[]);
    let (report, diagnostics) = run(&f.params, DeploymentChannel::Both, &[BundleKind::Combined]);

    assert_eq!(diagnostics.count(ErrorKind::ToolNotFound), 2);
    assert!(report.bundles.is_empty());
    assert!(report.setup_script.is_none());
}

#[test]
fn test_artifact_channel_requires_packages() {
    let f = all_tools();
    std::fs::remove_file(f.params.primary_output.join("App.1.2.0.nupkg")).unwrap();
    assert_eq!(artifact_channel(&f.params).unwrap(), DeploymentChannel::Alternate);

    std::fs::remove_file(f.params.alternate_output.join("App.Install.1.2.0.nupkg")).unwrap();
    let err = artifact_channel(&f.params).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_bundle_kinds() {
    assert_eq!(BundleKind::Staging.id("App"), "App.Staging");
    assert_eq!(
        BundleKind::Staging.description("App"),
        "Octopus package for staging App."
    );
    assert_eq!(BundleKind::Combined.phase(), Phase::Release);
    assert!(!BundleKind::Release.includes_content(false));
    assert!(BundleKind::Combined.includes_content(false));
}
