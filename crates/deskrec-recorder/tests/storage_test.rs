use chrono::{TimeZone, Utc};
use deskrec_core::MouseButton;
use deskrec_recorder::prelude::*;
use std::path::PathBuf;

fn session(root: &std::path::Path, id: &str, label: Option<&str>, secs: i64) -> RecordedSession {
    RecordedSession {
        label: label.map(str::to_string),
        dir: root.join(id),
        started_at: Utc.timestamp_opt(secs, 0).unwrap(),
        events: vec![
            Action::type_text("user@example.com\t"),
            Action::ClickImage {
                x: Some(640),
                y: Some(360),
                button: MouseButton::Left,
                image_path: Some(root.join(id).join("click_1700000000000.png")),
                confidence: 0.8,
            },
            Action::ClickImage {
                x: Some(10),
                y: Some(10),
                button: MouseButton::Right,
                image_path: None,
                confidence: 0.8,
            },
        ],
    }
}

#[test]
fn save_and_load() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = SessionStorage::with_dir(tmp.path()).unwrap();
    let original = session(tmp.path(), "20240102_030405", Some("checkout"), 1_704_164_645);

    let path = storage.save(&original).unwrap();
    assert_eq!(path, tmp.path().join("20240102_030405").join("actions.jsonl"));

    let loaded = storage.load("20240102_030405").unwrap();
    assert_eq!(loaded, original);

    // loading by directory path works too
    let by_path = storage.load(original.dir.to_str().unwrap()).unwrap();
    assert_eq!(by_path.events, original.events);
}

#[test]
fn log_is_metadata_then_one_action_per_line() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = SessionStorage::with_dir(tmp.path()).unwrap();
    let path = storage
        .save(&session(tmp.path(), "s1", None, 1_700_000_000))
        .unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);

    let meta: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(meta["events"], 3);
    assert!(meta.get("label").is_none());

    let first: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(first["type"], "desktop_type");
    let second: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(second["type"], "desktop_click_image");
    assert!(second["imagePath"].as_str().unwrap().ends_with("click_1700000000000.png"));
}

#[test]
fn list_orders_by_start_and_skips_strays() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = SessionStorage::with_dir(tmp.path()).unwrap();

    storage.save(&session(tmp.path(), "later", Some("b"), 2_000)).unwrap();
    storage.save(&session(tmp.path(), "earlier", Some("a"), 1_000)).unwrap();
    // a session directory that was never saved, and a stray file
    std::fs::create_dir_all(tmp.path().join("20240101_000000")).unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

    let listed = storage.list().unwrap();
    let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["earlier", "later"]);
    assert_eq!(listed[0].label.as_deref(), Some("a"));
    assert_eq!(listed[0].events, 3);
}

#[test]
fn delete_removes_session_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = SessionStorage::with_dir(tmp.path()).unwrap();
    storage.save(&session(tmp.path(), "gone", None, 1)).unwrap();

    storage.delete("gone").unwrap();
    assert!(!tmp.path().join("gone").exists());
    assert!(storage.delete("gone").is_err());
    assert!(storage.list().unwrap().is_empty());
}

#[test]
fn load_errors_are_descriptive() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = SessionStorage::with_dir(tmp.path()).unwrap();

    let err = storage.load("missing").unwrap_err();
    assert!(format!("{err:#}").contains("no saved session"));

    let dir: PathBuf = tmp.path().join("broken");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("actions.jsonl"),
        "{\"started_at\":\"2024-01-01T00:00:00Z\",\"events\":1}\n{\"type\":\"desktop_fly\"}\n",
    )
    .unwrap();
    let err = storage.load("broken").unwrap_err();
    assert!(format!("{err:#}").contains("line 2"));
}
