//! Tests for the `spider` binary.
//!
//! Only commands that work without a Subversion server are exercised end to end;
//! resolution itself is covered against the in-memory backend in `resolve`.

use assert_cmd::Command;
use predicates::prelude::*;
use spider_cli::test_utils::{ProjectFixture, blend_file};

fn spider(fixture: &ProjectFixture) -> Command {
    let mut cmd = Command::cargo_bin("spider").unwrap();
    cmd.arg("--project").arg(fixture.root()).arg("--no-progress").env("NO_COLOR", "1");
    cmd
}

fn scene_project() -> ProjectFixture {
    let fixture = ProjectFixture::new().unwrap();
    fixture.write_local("scene.blend", blend_file(&["//tex/wood.png", "//rig/arm.blend"])).unwrap();
    fixture.write_local("rig/arm.blend", blend_file(&["//../tex/wood.png"])).unwrap();
    fixture.write_local("tex/wood.png", "wood").unwrap();
    fixture
}

#[test]
fn test_crawl_then_validate_and_tree() {
    let fixture = scene_project();

    spider(&fixture)
        .arg("crawl")
        .assert()
        .success()
        .stdout(predicate::str::contains("Crawled 3 files, 3 newly discovered"));
    assert!(fixture.manifest_path().exists());

    spider(&fixture)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid (3 assets, 3 dependencies)"));

    let output = spider(&fixture).args(["tree", "scene.blend"]).assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    assert_eq!(
        stdout,
        "scene.blend (scene)\n\
         ├── rig/arm.blend (scene)\n\
         │   └── tex/wood.png (texture)\n\
         └── tex/wood.png (texture)\n"
    );
}

#[test]
fn test_crawl_json_reports_failures() {
    let fixture = ProjectFixture::new().unwrap();
    fixture.write_local("good.blend", blend_file(&["//a.png"])).unwrap();
    fixture.write_local("a.png", "a").unwrap();
    fixture.write_local("bad.blend", "not a blend file").unwrap();

    let output = spider(&fixture).args(["crawl", "--format", "json"]).assert().success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();

    assert_eq!(json["files_visited"], 3);
    assert_eq!(json["nodes"], 3);
    assert_eq!(json["edges"], 1);
    assert_eq!(json["failures"][0]["path"], "bad.blend");
    assert_eq!(json["failures"][0]["kind"], "scene");
}

#[test]
fn test_crawl_ignore_flag() {
    let fixture = scene_project();
    fixture.write_local("render_cache/frame.exr", "exr").unwrap();

    spider(&fixture)
        .args(["crawl", "--ignore", "render_*"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Crawled 3 files"));

    let manifest = fixture.load_manifest().unwrap();
    assert!(!manifest.contains_node("render_cache/frame.exr"));
}

#[test]
fn test_validate_reports_cycle() {
    let fixture = ProjectFixture::new().unwrap();
    fixture.write_local("a.blend", blend_file(&["//b.blend"])).unwrap();
    fixture.write_local("b.blend", blend_file(&["//a.blend"])).unwrap();

    spider(&fixture).arg("crawl").assert().success();

    spider(&fixture)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Dependency cycle: a.blend → b.blend → a.blend"))
        .stderr(predicate::str::contains("Circular dependency detected"));

    let output = spider(&fixture).args(["validate", "--format", "json"]).assert().failure();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["cycle"]["path"], serde_json::json!(["a.blend", "b.blend"]));
}

#[test]
fn test_validate_empty_project() {
    let fixture = ProjectFixture::new().unwrap();
    spider(&fixture)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid (0 assets, 0 dependencies)"));
}

#[test]
fn test_corrupt_manifest_is_reported() {
    let fixture = ProjectFixture::new().unwrap();
    fixture.write_local("spider.manifest.toml", "this is [[not toml").unwrap();

    spider(&fixture)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is corrupt"));

    // The corrupt file is left alone
    let content = std::fs::read_to_string(fixture.manifest_path()).unwrap();
    assert_eq!(content, "this is [[not toml");
}

#[test]
fn test_tree_unknown_target() {
    let fixture = scene_project();
    spider(&fixture)
        .args(["tree", "missing.blend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the manifest"));
}

#[test]
fn test_resolve_rejects_traversal() {
    let fixture = scene_project();
    spider(&fixture)
        .args(["resolve", "../outside.blend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid project path"));
}

#[test]
fn test_missing_project_dir() {
    let fixture = ProjectFixture::new().unwrap();
    let mut cmd = Command::cargo_bin("spider").unwrap();
    cmd.arg("--project")
        .arg(fixture.root().join("does-not-exist"))
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("spider").unwrap();
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("resolve")
            .and(predicate::str::contains("crawl"))
            .and(predicate::str::contains("tree"))
            .and(predicate::str::contains("validate")),
    );
}
