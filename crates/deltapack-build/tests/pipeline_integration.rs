//! Integration tests for the delta-to-package pipeline against real git
//! repositories.

use async_trait::async_trait;
use deltapack_build::{
    BuildExecutor, DeltaPipeline, PackageRequest, ProcessBuildExecutor, ToolAvailability,
    ToolCommand, Toolchain,
};
use deltapack_core::{
    BuildOutcome, BuildResult, BuildUnit, ClassifierConfig, DeltaError, DescriptorClassifier,
    ProjectKind, RevisionRange,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use walkdir::WalkDir;

const MODERN_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
</Project>"#;

const LEGACY_PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <OutputType>Library</OutputType>
  </PropertyGroup>
</Project>"#;

fn git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write(repo: &Path, rel: &str, content: &str) {
    let path = repo.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn commit_all(repo: &Path, message: &str) {
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-q", "-m", message]);
}

/// Repository whose last commit modifies `site.css` and `lib/Foo/Foo.cs` and
/// deletes `old.txt`.
fn make_scenario_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init", "-q"]);
    git(repo, &["config", "user.name", "test-user"]);
    git(repo, &["config", "user.email", "test@example.com"]);

    write(repo, "old.txt", "old");
    write(repo, "site.css", "body {}");
    write(repo, "lib/Foo/Foo.csproj", MODERN_PROJECT);
    write(repo, "lib/Foo/Foo.cs", "class Foo {}");
    commit_all(repo, "initial");

    write(repo, "site.css", "body { color: red }");
    write(repo, "lib/Foo/Foo.cs", "class Foo { int x; }");
    std::fs::remove_file(repo.join("old.txt")).unwrap();
    commit_all(repo, "change");

    dir
}

fn request(repo: &Path, package_root: &Path, count: u32) -> PackageRequest {
    PackageRequest {
        repo_root: repo.to_path_buf(),
        range: RevisionRange::last_commits(count).unwrap(),
        package_root: package_root.to_path_buf(),
        classifier: ClassifierConfig::default(),
    }
}

/// Relative paths of every file under `root`.
fn tree(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

/// Stands in for the .NET toolchain: writes `<name>.dll` into the output dir.
struct FakeExecutor;

#[async_trait]
impl BuildExecutor for FakeExecutor {
    async fn build(&self, unit: &BuildUnit, output_dir: &Path) -> BuildResult {
        std::fs::create_dir_all(output_dir).unwrap();
        let artifact = output_dir.join(format!("{}.dll", unit.name));
        std::fs::write(&artifact, unit.name.as_bytes()).unwrap();
        BuildResult {
            unit: unit.clone(),
            kind: Some(ProjectKind::Modern),
            output_directory: output_dir.to_path_buf(),
            artifact_path: Some(artifact),
            outcome: BuildOutcome::Built,
            duration_ms: 1,
        }
    }
}

/// Test: static file copied, artifact placed, deleted file absent
#[tokio::test]
async fn test_end_to_end_package() {
    let repo = make_scenario_repo();
    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");

    let pipeline = DeltaPipeline::new(Arc::new(FakeExecutor), 2);
    let outcome = pipeline
        .run(&request(repo.path(), &package, 1))
        .await
        .expect("pipeline failed");

    let files = tree(&package);
    assert!(files.contains(Path::new("site.css")));
    assert!(files.contains(&PathBuf::from("lib").join("Foo").join("bin").join("Foo.dll")));
    assert!(!files.iter().any(|p| p.ends_with("old.txt")));
    assert_eq!(files.len(), 2, "unexpected package contents: {files:?}");

    assert_eq!(
        std::fs::read_to_string(package.join("site.css")).unwrap(),
        "body { color: red }"
    );

    let summary = &outcome.summary;
    assert_eq!(summary.total_changes, 3);
    assert_eq!(summary.static_files_copied, 1);
    assert_eq!(summary.units_attempted, 1);
    assert_eq!(summary.units_built, 1);
    assert!(summary.failures.is_empty());
    assert!(summary.is_complete());
    assert_eq!(outcome.built_count(), 1);
}

/// Test: preview reports counts and writes nothing
#[tokio::test]
async fn test_preview_is_read_only() {
    let repo = make_scenario_repo();
    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");

    let pipeline = DeltaPipeline::new(Arc::new(FakeExecutor), 2);
    let report = pipeline
        .preview(&request(repo.path(), &package, 1))
        .expect("preview failed");

    assert_eq!(report.static_files, 1);
    assert_eq!(report.compiled_files, 1);
    assert_eq!(report.total_changes, 3);
    assert!(!package.exists());
}

/// Test: asking for more commits than exist fails instead of truncating
#[tokio::test]
async fn test_count_beyond_history_is_diff_unavailable() {
    let repo = make_scenario_repo();
    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");

    let pipeline = DeltaPipeline::new(Arc::new(FakeExecutor), 2);
    let err = pipeline
        .run(&request(repo.path(), &package, 5))
        .await
        .unwrap_err();

    assert!(matches!(err, DeltaError::DiffUnavailable(_)));
    assert!(!package.exists());
}

/// Test: missing repository path is rejected before any write
#[tokio::test]
async fn test_missing_repository_is_invalid_input() {
    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");

    let pipeline = DeltaPipeline::new(Arc::new(FakeExecutor), 2);
    let err = pipeline
        .run(&request(&out.path().join("missing"), &package, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, DeltaError::InvalidInput(_)));
    assert!(!package.exists());
}

/// Test: a subdirectory of the work tree is widened to the work-tree top
#[tokio::test]
async fn test_subdirectory_repo_root_uses_work_tree_top() {
    let repo = make_scenario_repo();
    write(repo.path(), "web/site.css", "h1 {}");
    commit_all(repo.path(), "add web styles");
    write(repo.path(), "web/site.css", "h1 { margin: 0 }");
    commit_all(repo.path(), "restyle web");

    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");
    let request = request(&repo.path().join("web"), &package, 1);
    let pipeline = DeltaPipeline::new(Arc::new(FakeExecutor), 2);

    let report = pipeline.preview(&request).unwrap();
    assert_eq!(report.static_files, 1);

    let outcome = pipeline.run(&request).await.expect("pipeline failed");
    assert_eq!(outcome.summary.static_files_copied, 1);
    assert_eq!(
        tree(&package),
        BTreeSet::from([PathBuf::from("web").join("site.css")])
    );
    assert_eq!(
        std::fs::read_to_string(package.join("web").join("site.css")).unwrap(),
        "h1 { margin: 0 }"
    );
}

/// Test: legacy unit without the legacy tool is skipped, rest still packaged
#[tokio::test]
async fn test_legacy_unit_skipped_without_tool() {
    let repo = make_scenario_repo();
    write(repo.path(), "legacy/Old/Old.csproj", LEGACY_PROJECT);
    write(repo.path(), "legacy/Old/Old.cs", "class Old {}");
    write(repo.path(), "site.css", "body { color: blue }");
    commit_all(repo.path(), "add legacy project");

    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");

    let executor = ProcessBuildExecutor::new(
        Toolchain {
            legacy: ToolCommand::new("deltapack-no-such-msbuild", &[]),
            ..Default::default()
        },
        DescriptorClassifier::default(),
        ToolAvailability {
            modern: true,
            legacy: false,
        },
    );
    let pipeline = DeltaPipeline::new(Arc::new(executor), 2);
    let outcome = pipeline
        .run(&request(repo.path(), &package, 1))
        .await
        .expect("pipeline should complete");

    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];
    assert_eq!(result.unit.name, "Old");
    assert_eq!(result.kind, Some(ProjectKind::Legacy));
    assert!(matches!(result.outcome, BuildOutcome::Skipped { .. }));

    assert_eq!(outcome.summary.units_attempted, 1);
    assert_eq!(outcome.summary.units_built, 0);
    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(outcome.summary.failures.len(), 1);
    assert_eq!(outcome.summary.failures[0].unit, "Old");

    let files = tree(&package);
    assert_eq!(files, BTreeSet::from([PathBuf::from("site.css")]));
}

/// Test: one worker and many workers produce the same package
#[tokio::test]
async fn test_sequential_and_parallel_packages_match() {
    let repo = make_scenario_repo();
    for name in ["Alpha", "Beta", "Gamma"] {
        write(
            repo.path(),
            &format!("src/{name}/{name}.csproj"),
            MODERN_PROJECT,
        );
        write(
            repo.path(),
            &format!("src/{name}/Service.cs"),
            "class Service {}",
        );
    }
    commit_all(repo.path(), "more projects");
    write(repo.path(), "site.css", "body { margin: 0 }");
    for name in ["Alpha", "Beta", "Gamma"] {
        write(
            repo.path(),
            &format!("src/{name}/Service.cs"),
            "class Service { int y; }",
        );
    }
    commit_all(repo.path(), "touch services");

    let out = tempfile::tempdir().unwrap();
    let seq_root = out.path().join("seq");
    let par_root = out.path().join("par");

    let seq = DeltaPipeline::new(Arc::new(FakeExecutor), 1)
        .run(&request(repo.path(), &seq_root, 1))
        .await
        .unwrap();
    let par = DeltaPipeline::new(Arc::new(FakeExecutor), 8)
        .run(&request(repo.path(), &par_root, 1))
        .await
        .unwrap();

    assert_eq!(tree(&seq_root), tree(&par_root));
    assert_eq!(seq.summary.units_built, 3);
    assert_eq!(par.summary.units_built, 3);
    assert!(tree(&par_root).contains(&PathBuf::from("src").join("Beta").join("bin").join("Beta.dll")));
}

/// Test: re-running into an existing package root overwrites without error
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let repo = make_scenario_repo();
    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");
    let pipeline = DeltaPipeline::new(Arc::new(FakeExecutor), 2);

    pipeline
        .run(&request(repo.path(), &package, 1))
        .await
        .unwrap();
    std::fs::write(package.join("site.css"), "stale").unwrap();

    let second = pipeline
        .run(&request(repo.path(), &package, 1))
        .await
        .unwrap();

    assert!(second.summary.is_complete());
    assert_eq!(
        std::fs::read_to_string(package.join("site.css")).unwrap(),
        "body { color: red }"
    );
    assert_eq!(tree(&package).len(), 2);
}

/// Test: real process dispatch through a stand-in publish tool
#[cfg(unix)]
#[tokio::test]
async fn test_process_executor_publishes_modern_unit() {
    use std::os::unix::fs::PermissionsExt;

    let repo = make_scenario_repo();
    let out = tempfile::tempdir().unwrap();
    let package = out.path().join("pkg");

    // Invoked as: <tool> publish <descriptor> -c <cfg> -o <out>
    let tool = out.path().join("fake-dotnet");
    std::fs::write(
        &tool,
        "#!/bin/sh\nname=$(basename \"$2\" .csproj)\nmkdir -p \"$6\"\necho built > \"$6/$name.dll\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let executor = ProcessBuildExecutor::new(
        Toolchain {
            modern: ToolCommand::new(tool.to_string_lossy(), &[]),
            timeout_secs: 60,
            ..Default::default()
        },
        DescriptorClassifier::default(),
        ToolAvailability::all(),
    );
    let outcome = DeltaPipeline::new(Arc::new(executor), 1)
        .run(&request(repo.path(), &package, 1))
        .await
        .unwrap();

    assert_eq!(outcome.summary.units_built, 1, "{:?}", outcome.summary.failures);
    assert_eq!(outcome.results[0].kind, Some(ProjectKind::Modern));
    let artifact = package.join("lib").join("Foo").join("bin").join("Foo.dll");
    assert_eq!(std::fs::read_to_string(artifact).unwrap().trim(), "built");
}
