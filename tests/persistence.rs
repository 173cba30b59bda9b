use std::fs;
use std::path::PathBuf;

use billet::backend::{FileBackend, backend_for};
use billet::engine::{CloudUpdate, Engine, Error};
use billet::timefmt::parse_stamp;

// ── Test infrastructure ──────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn tmp_snap(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("billet_int_test");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn pool_state_survives_reopen() {
    init_tracing();
    let path = tmp_snap("reopen.snap");

    {
        let mut engine = Engine::open(Box::new(FileBackend::new(path.clone()))).unwrap();
        engine
            .define_cloud("cloud01", CloudUpdate::default(), false)
            .unwrap();
        engine
            .define_cloud("cloud02", CloudUpdate::default(), false)
            .unwrap();
        engine.define_host("h1", "cloud01", false).unwrap();
        engine
            .add_override(
                "h1",
                "cloud02",
                parse_stamp("2030-01-01 00:00").unwrap(),
                parse_stamp("2030-02-01 00:00").unwrap(),
            )
            .unwrap();
    }

    let engine = Engine::open(Box::new(FileBackend::new(path.clone()))).unwrap();
    let a = engine
        .resolve_stamp("h1", Some("2030-01-15 00:00"))
        .unwrap()
        .unwrap();
    assert_eq!(a.default_cloud, "cloud01");
    assert_eq!(a.current_cloud, "cloud02");
    assert_eq!(a.override_id, Some(0));
    assert_eq!(engine.store().history["h1"][&0], "cloud01");
    assert_eq!(engine.store().deployed["h1"], "cloud01");

    let _ = fs::remove_file(&path);
}

#[test]
fn corrupt_snapshot_is_fatal_to_startup() {
    init_tracing();
    let path = tmp_snap("fatal.snap");

    {
        let mut engine = Engine::open(Box::new(FileBackend::new(path.clone()))).unwrap();
        engine
            .define_cloud("cloud01", CloudUpdate::default(), false)
            .unwrap();
    }

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let result = Engine::open(Box::new(FileBackend::new(path.clone())));
    assert!(matches!(result, Err(Error::Backend(_))));

    let _ = fs::remove_file(&path);
}

#[test]
fn registry_selected_backend_round_trips() {
    init_tracing();
    let path = tmp_snap("registry.snap");

    {
        let backend = backend_for("file", Some(&path)).unwrap();
        let mut engine = Engine::open(backend).unwrap();
        engine
            .define_cloud("cloud01", CloudUpdate::default(), false)
            .unwrap();
        engine.define_host("h1", "cloud01", false).unwrap();
    }

    let backend = backend_for("file", Some(&path)).unwrap();
    let engine = Engine::open(backend).unwrap();
    assert!(engine.resolve("h1", None).is_some());
    assert_eq!(engine.summary(None, false).len(), 1);

    let _ = fs::remove_file(&path);
}
