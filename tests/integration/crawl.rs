//! Eager crawling and its interplay with resolution.

use spider_cli::crawler::ProjectCrawler;
use spider_cli::extractor::ExtractorRegistry;
use spider_cli::manifest::Manifest;
use spider_cli::resolver::Resolver;
use spider_cli::test_utils::{ProjectFixture, blend_file};

fn crawl(fixture: &ProjectFixture) -> spider_cli::crawler::CrawlReport {
    let mut manifest = Manifest::load(fixture.root()).unwrap();
    let registry = ExtractorRegistry::from_config(&manifest.project);
    let crawler = ProjectCrawler::for_manifest(&registry, &manifest).unwrap();
    let report = crawler.walk_project(&mut manifest).unwrap();
    manifest.save().unwrap();
    report
}

#[test]
fn test_crawl_records_local_files() {
    let fixture = ProjectFixture::new().unwrap();
    fixture.write_local("scene.blend", blend_file(&["//tex/wood.png", "//rig/arm.blend"])).unwrap();
    fixture.write_local("rig/arm.blend", blend_file(&["//../tex/wood.png"])).unwrap();
    fixture.write_local("tex/wood.png", "wood").unwrap();
    fixture.write_local("broken.blend", "garbage").unwrap();
    fixture.write_local(".svn/wc.db", "sqlite").unwrap();

    let report = crawl(&fixture);

    assert_eq!(report.files_visited, 4);
    assert_eq!(report.newly_discovered, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "broken.blend");

    let manifest = fixture.load_manifest().unwrap();
    assert_eq!(manifest.node_count(), 4);
    assert_eq!(manifest.edge_count(), 3);
    assert!(manifest.get_node(".svn/wc.db").is_none());
    assert!(manifest.get_node("spider.toml").is_none());
    assert_eq!(manifest.get_node("broken.blend").unwrap().file_kind, "unknown");
}

#[test]
fn test_crawl_is_idempotent() {
    let fixture = ProjectFixture::new().unwrap();
    fixture.write_local("a.blend", blend_file(&["//b.png"])).unwrap();
    fixture.write_local("b.png", "b").unwrap();

    crawl(&fixture);
    let first = fixture.load_manifest().unwrap();
    let report = crawl(&fixture);

    assert_eq!(report.files_visited, 2);
    assert_eq!(report.newly_discovered, 0);
    assert_eq!(fixture.load_manifest().unwrap(), first);
}

#[test]
fn test_resolve_after_crawl_needs_no_discovery_fetches() {
    let fixture = ProjectFixture::new()
        .unwrap()
        .remote_blend("scene.blend", &["//tex/wood.png"])
        .remote_file("tex/wood.png", "wood");
    fixture.write_local("scene.blend", blend_file(&["//tex/wood.png"])).unwrap();
    fixture.write_local("tex/wood.png", "wood").unwrap();
    crawl(&fixture);

    let mut resolver = Resolver::new(fixture.root(), fixture.checked_out_backend());
    let result = resolver.resolve("scene.blend").unwrap();

    assert_eq!(result.ordered_nodes, vec!["tex/wood.png", "scene.blend"]);
    assert_eq!(resolver.checkout().backend().full_updates(), result.ordered_nodes);
}

#[test]
fn test_configured_ignore_patterns_prune_directories() {
    let fixture = ProjectFixture::new().unwrap();
    fixture
        .write_config("[project]\nbackend_url = \"svn://x/y\"\nignore = [\"render_*\"]\n")
        .unwrap();
    fixture.write_local("a.png", "a").unwrap();
    fixture.write_local("render_cache/frame_0001.exr", "exr").unwrap();
    fixture.write_local(".git/HEAD", "ref").unwrap();

    let report = crawl(&fixture);

    assert_eq!(report.files_visited, 1);
    let manifest = fixture.load_manifest().unwrap();
    assert!(manifest.contains_node("a.png"));
    assert!(manifest.project.ignore.contains(&".git".to_string()));
    assert!(manifest.project.ignore.contains(&"render_*".to_string()));
}

#[test]
fn test_relative_root_is_anchored_at_current_dir() {
    let cwd = std::env::current_dir().unwrap();
    let fixture = ProjectFixture::new_in(&cwd)
        .unwrap()
        .remote_blend("scene.blend", &["//tex/wood.png"])
        .remote_file("tex/wood.png", "wood");
    fixture.write_local("scene.blend", blend_file(&["//tex/wood.png"])).unwrap();
    fixture.write_local("tex/wood.png", "wood").unwrap();
    let relative = fixture.root().strip_prefix(&cwd).unwrap().to_path_buf();
    assert!(relative.is_relative());

    let mut manifest = Manifest::load(&relative).unwrap();
    let registry = ExtractorRegistry::from_config(&manifest.project);
    let crawler = ProjectCrawler::new(&registry, &relative, &[]).unwrap();
    let report = crawler.walk_project(&mut manifest).unwrap();

    assert_eq!(report.files_visited, 2);
    assert_eq!(manifest.edge_count(), 1);
    assert_eq!(manifest.project_root(), fixture.root());

    let mut resolver = Resolver::new(&relative, fixture.checked_out_backend());
    let result = resolver.resolve("scene.blend").unwrap();
    assert_eq!(result.ordered_nodes, vec!["tex/wood.png", "scene.blend"]);
}
