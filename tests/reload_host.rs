//! Staleness detection and load failures of the reload host.

#![cfg(feature = "hot-reload")]

use std::fs::File;
use std::time::{Duration, SystemTime};

use beeper::{ArtifactWatch, HostError, ReloadHost};
use bp_ir::RendererTable;
use bp_master::config::ModuleConfig;

fn touch(path: &std::path::Path, time: SystemTime) {
    let file = File::options().create(true).truncate(false).write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

#[test]
fn newer_artifact_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("libbp_module.so");
    let lock = dir.path().join("libbp_module.lock");
    let loaded_at = SystemTime::now() - Duration::from_secs(60);
    let watch = ArtifactWatch::new(&lib, &lock);

    assert!(!watch.is_stale(loaded_at), "missing artifact is never stale");

    touch(&lib, loaded_at);
    assert!(!watch.is_stale(loaded_at), "same timestamp is not newer");

    touch(&lib, loaded_at + Duration::from_secs(5));
    assert!(watch.is_stale(loaded_at));
}

#[test]
fn lock_file_defers_reload() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("libbp_module.so");
    let lock = dir.path().join("libbp_module.lock");
    let loaded_at = SystemTime::now() - Duration::from_secs(60);
    let watch = ArtifactWatch::new(&lib, &lock);

    touch(&lib, loaded_at + Duration::from_secs(5));
    touch(&lock, SystemTime::now());
    assert!(!watch.is_stale(loaded_at));

    std::fs::remove_file(&lock).unwrap();
    assert!(watch.is_stale(loaded_at));
}

fn module_config(dir: &std::path::Path) -> ModuleConfig {
    ModuleConfig {
        library_path: dir.join("libbp_module.so"),
        lock_path: dir.join("libbp_module.lock"),
        shadow_dir: dir.join(".hot"),
    }
}

#[test]
fn missing_artifact_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = ReloadHost::load(&module_config(dir.path()), RendererTable::discard());
    assert!(matches!(result, Err(HostError::MissingArtifact(_))));
}

#[test]
fn malformed_artifact_is_fatal_and_leaves_no_copy() {
    let dir = tempfile::tempdir().unwrap();
    let config = module_config(dir.path());
    std::fs::write(&config.library_path, b"not a shared library").unwrap();

    let result = ReloadHost::load(&config, RendererTable::discard());
    assert!(matches!(result, Err(HostError::Load { .. })));
    let leftovers = std::fs::read_dir(&config.shadow_dir).unwrap().count();
    assert_eq!(leftovers, 0);
}
