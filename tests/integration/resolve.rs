//! Resolution scenarios over the in-memory backend.

use spider_cli::core::SpiderError;
use spider_cli::resolver::Resolver;
use spider_cli::test_utils::fixtures::FIXTURE_URL;
use spider_cli::test_utils::{BackendCall, MemoryBackend, ProjectFixture, init_test_logging};

/// `scene.blend` needs a texture and a rig; the rig needs the same texture.
fn scene_fixture() -> ProjectFixture {
    ProjectFixture::new()
        .unwrap()
        .remote_blend("scene.blend", &["//tex/wood.png", "//rig/arm.blend"])
        .remote_blend("rig/arm.blend", &["//../tex/wood.png"])
        .remote_file("tex/wood.png", "wood")
        .remote_file("tex/unused.png", "unused")
        .remote_blend("other/shot.blend", &["//../tex/unused.png"])
}

#[test]
fn test_scene_resolves_dependencies_first() {
    init_test_logging(None);
    let fixture = scene_fixture();

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    let result = resolver.resolve("scene.blend").unwrap();

    assert!(result.is_success());
    assert_eq!(result.target, "scene.blend");
    assert_eq!(result.ordered_nodes, vec!["tex/wood.png", "rig/arm.blend", "scene.blend"]);
    assert_eq!(result.materialized, result.ordered_nodes);
    assert!(result.extraction_failures.is_empty());

    // Only the closure reached the disk
    assert!(fixture.root().join("tex/wood.png").is_file());
    assert!(fixture.root().join("rig/arm.blend").is_file());
    assert!(!fixture.root().join("tex/unused.png").exists());
    assert!(!fixture.root().join("other").exists());

    let manifest = fixture.load_manifest().unwrap();
    assert_eq!(manifest.node_count(), 3);
    assert_eq!(manifest.edge_count(), 3);
    assert!(manifest.nodes().all(|n| n.discovered && n.checked_out));
    assert_eq!(manifest.get_node("tex/wood.png").unwrap().file_kind, "texture");
    assert_eq!(manifest.get_node("rig/arm.blend").unwrap().file_kind, "scene");
}

#[test]
fn test_fresh_project_is_checked_out_shallow_once() {
    let fixture = scene_fixture();

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    resolver.resolve("scene.blend").unwrap();

    let calls = resolver.checkout().backend().calls();
    let checkouts: Vec<&BackendCall> =
        calls.iter().filter(|c| matches!(c, BackendCall::Checkout { .. })).collect();
    assert_eq!(checkouts, vec![&BackendCall::Checkout {
        url: FIXTURE_URL.to_string(),
        path: ".".to_string(),
        shallow: true,
    }]);
    assert!(matches!(calls[0], BackendCall::Info { .. }));
    assert!(matches!(calls[1], BackendCall::Checkout { .. }));

    // Directories are only ever updated shallow
    for call in calls {
        if let BackendCall::Update {
            path,
            shallow: false,
        } = call
        {
            assert!(path.contains('.'), "directory {path} fetched in full");
        }
    }
}

#[test]
fn test_second_resolve_reuses_manifest() {
    let fixture = scene_fixture();
    Resolver::new(fixture.root(), fixture.backend()).resolve("scene.blend").unwrap();
    let before = fixture.load_manifest().unwrap();

    let mut resolver = Resolver::new(fixture.root(), fixture.checked_out_backend());
    let result = resolver.resolve("scene.blend").unwrap();

    assert_eq!(result.ordered_nodes, vec!["tex/wood.png", "rig/arm.blend", "scene.blend"]);
    let backend = resolver.checkout().backend();
    assert!(!backend.calls().iter().any(|c| matches!(c, BackendCall::Checkout { .. })));
    // No discovery fetches: each asset is updated exactly once, during materialization
    assert_eq!(backend.full_updates(), result.ordered_nodes);
    assert_eq!(fixture.load_manifest().unwrap(), before);
}

#[test]
fn test_chain_materializes_in_reverse() {
    let fixture = ProjectFixture::new()
        .unwrap()
        .remote_blend("a.blend", &["//b.blend"])
        .remote_blend("b.blend", &["//c.png"])
        .remote_file("c.png", "c");

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    let result = resolver.resolve("a.blend").unwrap();

    assert_eq!(result.materialized, vec!["c.png", "b.blend", "a.blend"]);
}

#[test]
fn test_cycle_is_reported_and_nothing_materialized() {
    let fixture = ProjectFixture::new()
        .unwrap()
        .remote_blend("a.blend", &["//b.blend"])
        .remote_blend("b.blend", &["//c.blend"])
        .remote_blend("c.blend", &["//a.blend"]);

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    let result = resolver.resolve("a.blend").unwrap();

    assert!(!result.is_success());
    let cycle = result.error.clone().unwrap();
    assert_eq!(cycle.path, vec!["a.blend", "b.blend", "c.blend"]);
    assert_eq!(cycle.to_string(), "a.blend → b.blend → c.blend → a.blend");
    assert!(result.ordered_nodes.is_empty());
    assert!(result.materialized.is_empty());

    // Discovery had to read the files, but no materialization pass ran
    assert_eq!(resolver.checkout().backend().full_updates(), vec!["a.blend", "b.blend", "c.blend"]);

    // Discovery work was saved
    let manifest = fixture.load_manifest().unwrap();
    assert_eq!(manifest.edge_count(), 3);
    assert!(manifest.nodes().all(|n| n.discovered));
}

#[test]
fn test_corrupt_asset_is_recorded_as_unknown_leaf() {
    let fixture = ProjectFixture::new()
        .unwrap()
        .remote_blend("scene.blend", &["//broken.blend", "//tex/a.png"])
        .remote_file("broken.blend", "this is not a blend file")
        .remote_file("tex/a.png", "a");

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    let result = resolver.resolve("scene.blend").unwrap();

    assert!(result.is_success());
    assert_eq!(result.ordered_nodes, vec!["broken.blend", "tex/a.png", "scene.blend"]);
    assert_eq!(result.extraction_failures.len(), 1);
    assert_eq!(result.extraction_failures[0].path, "broken.blend");
    assert_eq!(result.extraction_failures[0].kind, "scene");

    let manifest = fixture.load_manifest().unwrap();
    let broken = manifest.get_node("broken.blend").unwrap();
    assert_eq!(broken.file_kind, "unknown");
    assert!(broken.discovered);
    assert_eq!(manifest.dependencies_of("broken.blend").count(), 0);
}

#[test]
fn test_backend_failure_keeps_confirmed_progress() {
    let fixture = ProjectFixture::new()
        .unwrap()
        .remote_blend("scene.blend", &["//tex/a.png", "//tex/b.png"])
        .remote_file("tex/a.png", "a")
        .remote_file("tex/b.png", "b");

    let mut resolver = Resolver::new(fixture.root(), fixture.backend().failing_on("tex/b.png"));
    let err = resolver.resolve("scene.blend").unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SpiderError>(),
        Some(SpiderError::BackendCommandError { .. })
    ));

    let manifest = fixture.load_manifest().unwrap();
    assert!(manifest.get_node("tex/a.png").unwrap().checked_out);
    assert!(!manifest.get_node("tex/b.png").unwrap().checked_out);
    assert_eq!(manifest.edge_count(), 2);
}

#[test]
fn test_absolute_target_inside_project() {
    let fixture = scene_fixture();
    let target = fixture.root().join("rig").join("arm.blend");

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    let result = resolver.resolve(target.to_str().unwrap()).unwrap();

    assert_eq!(result.target, "rig/arm.blend");
    assert_eq!(result.ordered_nodes, vec!["tex/wood.png", "rig/arm.blend"]);
}

#[test]
fn test_invalid_targets_are_rejected() {
    let fixture = scene_fixture();
    let mut resolver = Resolver::new(fixture.root(), fixture.backend());

    for target in ["../outside.blend", "", "."] {
        let err = resolver.resolve(target).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<SpiderError>(), Some(SpiderError::InvalidPath { .. })),
            "{target:?} gave {err:#}"
        );
    }
    assert!(!resolver.checkout().backend().touched_repository());
}

#[test]
fn test_missing_backend_url_is_config_error() {
    let fixture = scene_fixture();
    fixture.write_config("[project]\n").unwrap();

    let mut resolver = Resolver::new(fixture.root(), fixture.backend());
    let err = resolver.resolve("scene.blend").unwrap_err();

    assert!(matches!(err.downcast_ref::<SpiderError>(), Some(SpiderError::ConfigError { .. })));
}

#[test]
fn test_explicit_backend_url_overrides_config() {
    let fixture = scene_fixture();
    fixture.write_config("[project]\nbackend_url = \"svn://wrong.example/repo\"\n").unwrap();

    let mut resolver =
        Resolver::new(fixture.root(), fixture.backend()).with_backend_url(FIXTURE_URL);
    assert!(resolver.resolve("scene.blend").unwrap().is_success());
}

#[test]
fn test_file_deleted_from_working_copy_is_fetched_again() {
    let fixture = scene_fixture();
    Resolver::new(fixture.root(), fixture.backend()).resolve("scene.blend").unwrap();
    std::fs::remove_file(fixture.root().join("tex/wood.png")).unwrap();

    let manifest = fixture.load_manifest().unwrap();
    assert!(!manifest.get_node("tex/wood.png").unwrap().checked_out);

    let backend: MemoryBackend = fixture.checked_out_backend();
    Resolver::new(fixture.root(), backend).resolve("scene.blend").unwrap();
    assert!(fixture.root().join("tex/wood.png").is_file());
    assert!(fixture.load_manifest().unwrap().get_node("tex/wood.png").unwrap().checked_out);
}
