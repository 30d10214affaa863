//! End-to-end pipeline tests for the Vessel runtime.
//!
//! These exercise the full cross-platform path against a temp data dir:
//! 1. Import archives into the content-addressed store
//! 2. Resolve layer chains through the layer graph
//! 3. Create containers and persist them in the state index
//! 4. Volume creation, attachment bookkeeping, and removal guards
//! 5. Log append/read isolation
//!
//! Anything that needs namespaces, mounts, or cgroups stays out of here;
//! those paths are covered by their modules' error-path tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use vessel_common::config::VesselConfig;
use vessel_common::types::ContainerState;
use vessel_image::store::ImageConfig;
use vessel_runtime::container::ContainerSpec;
use vessel_runtime::engine::Engine;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_archive(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let archive = dir.join(name);
    let file = std::fs::File::create(&archive).expect("create archive");
    let mut builder = tar::Builder::new(file);
    for (path, content) in entries {
        let data = content.as_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).expect("append");
    }
    builder.finish().expect("finish");
    archive
}

fn engine_in(dir: &Path) -> Engine {
    Engine::with_config(VesselConfig::with_data_dir(dir.join("data"))).expect("engine")
}

// ── Image pipeline ───────────────────────────────────────────────────

#[test]
fn pipeline_import_then_run_spec_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());

    let base = make_archive(dir.path(), "base.tar", &[("etc/os-release", "ID=vessel\n")]);
    let config = ImageConfig {
        cmd: vec!["/bin/sh".into(), "-c".into(), "true".into()],
        ..ImageConfig::default()
    };
    let image = engine
        .store()
        .import_archive(&base, Some("base:1.0"), None, config)
        .expect("import");

    let entry = engine
        .create(&ContainerSpec {
            name: Some("app".into()),
            image: "base:1.0".into(),
            ..ContainerSpec::default()
        })
        .expect("create");

    assert_eq!(entry.image_id, image.id);
    assert_eq!(entry.command, vec!["/bin/sh", "-c", "true"]);
    assert_eq!(entry.state, ContainerState::Created);
    assert!(entry.rootfs.ends_with("merged"));
}

#[test]
fn pipeline_layered_image_resolves_full_chain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());

    let base = make_archive(dir.path(), "base.tar", &[("bin/true", "")]);
    let app = make_archive(dir.path(), "app.tar", &[("srv/app", "binary")]);

    let base_img = engine
        .store()
        .import_archive(&base, Some("base"), None, ImageConfig::default())
        .expect("import base");
    let app_img = engine
        .store()
        .import_archive(
            &app,
            Some("app"),
            Some(&base_img.top_layer),
            ImageConfig::default(),
        )
        .expect("import app");

    let chain = engine.store().rootfs_chain(&app_img).expect("chain");
    assert_eq!(chain.len(), 2);
    assert!(chain[0].join("bin/true").exists());
    assert!(chain[1].join("srv/app").exists());
}

#[test]
fn pipeline_reimport_same_archive_reuses_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());

    let archive = make_archive(dir.path(), "a.tar", &[("f", "same content")]);
    let first = engine
        .store()
        .import_archive(&archive, Some("one"), None, ImageConfig::default())
        .expect("first");
    let second = engine
        .store()
        .import_archive(&archive, Some("two"), None, ImageConfig::default())
        .expect("second");

    assert_eq!(first.top_layer, second.top_layer);
    let images = engine.store().list().expect("list");
    assert_eq!(images.len(), 1, "same content is the same image");
    let tags = &images[0].tags;
    assert!(tags.contains(&"one:latest".to_string()));
    assert!(tags.contains(&"two:latest".to_string()));
}

// ── State persistence ────────────────────────────────────────────────

#[test]
fn pipeline_state_survives_engine_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let engine = engine_in(dir.path());
        let archive = make_archive(dir.path(), "a.tar", &[("f", "x")]);
        let _ = engine
            .store()
            .import_archive(&archive, Some("img"), None, ImageConfig::default())
            .expect("import");
        let _ = engine
            .create(&ContainerSpec {
                name: Some("persistent".into()),
                image: "img".into(),
                command: vec!["/bin/true".into()],
                ..ContainerSpec::default()
            })
            .expect("create");
    }

    let reopened = engine_in(dir.path());
    let entry = reopened.resolve("persistent").expect("resolve");
    assert_eq!(entry.state, ContainerState::Created);
    assert_eq!(entry.command, vec!["/bin/true"]);
}

#[test]
fn pipeline_remove_cleans_index_and_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());

    let archive = make_archive(dir.path(), "a.tar", &[("f", "x")]);
    let _ = engine
        .store()
        .import_archive(&archive, Some("img"), None, ImageConfig::default())
        .expect("import");
    let entry = engine
        .create(&ContainerSpec {
            name: Some("doomed".into()),
            image: "img".into(),
            command: vec!["/bin/true".into()],
            ..ContainerSpec::default()
        })
        .expect("create");

    vessel_runtime::logs::append_log(
        &engine.config().data_dir,
        entry.id.as_str(),
        "about to be removed",
    )
    .expect("log");

    engine.remove("doomed", false).expect("remove");
    assert!(engine.list().expect("list").is_empty());
    assert!(
        vessel_runtime::logs::read_logs(&engine.config().data_dir, entry.id.as_str())
            .expect("read")
            .is_empty()
    );
}

// ── Volumes ──────────────────────────────────────────────────────────

#[test]
fn pipeline_volume_guard_blocks_removal_while_attached() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());

    let archive = make_archive(dir.path(), "a.tar", &[("f", "x")]);
    let _ = engine
        .store()
        .import_archive(&archive, Some("img"), None, ImageConfig::default())
        .expect("import");

    let mut spec = ContainerSpec {
        name: Some("app".into()),
        image: "img".into(),
        command: vec!["/bin/true".into()],
        ..ContainerSpec::default()
    };
    spec.volumes.push("appdata:/data".parse().expect("mount"));
    let _ = engine.create(&spec).expect("create");

    assert_eq!(
        engine.volume_in_use("appdata").expect("in use"),
        Some("app".to_string())
    );

    engine.remove("app", false).expect("remove container");
    assert_eq!(engine.volume_in_use("appdata").expect("in use"), None);
}

// ── Logs ─────────────────────────────────────────────────────────────

#[test]
fn pipeline_log_isolation_between_containers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("data");

    vessel_runtime::logs::append_log(&data, "one", "hello from one").expect("append");
    vessel_runtime::logs::append_log(&data, "two", "hello from two").expect("append");

    let one = vessel_runtime::logs::read_logs(&data, "one").expect("read");
    assert!(one.contains("hello from one"));
    assert!(!one.contains("hello from two"));
}
