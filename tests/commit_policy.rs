use json_vault::{CommitPolicy, Error, JsonStore};
use serde_json::json;
use tempfile::TempDir;

// The parent directory does not exist yet, so every save fails with an I/O
// error until the test creates it.
fn unwritable() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later").join("store.json");
    (dir, path)
}

fn open(path: &std::path::Path, policy: CommitPolicy) -> JsonStore {
    JsonStore::builder(path).policy(policy).build().unwrap()
}

#[test]
fn default_policy_is_after_save() {
    let (_dir, path) = unwritable();
    let db: JsonStore = JsonStore::open(&path).unwrap();
    assert_eq!(db.policy(), CommitPolicy::AfterSave);
}

// ---- AfterSave --------------------------------------------------------------

#[test]
fn after_save_failed_put_leaves_memory_unchanged() {
    let (_dir, path) = unwritable();
    let db = open(&path, CommitPolicy::AfterSave);

    assert!(matches!(db.put("k", 1), Err(Error::Io(_))));
    assert!(!db.contains("k"));
    assert!(db.is_empty());
    assert!(!path.exists());
}

#[test]
fn after_save_failed_delete_keeps_the_entry() {
    let (dir, path) = unwritable();
    std::fs::create_dir(dir.path().join("later")).unwrap();
    let db = open(&path, CommitPolicy::AfterSave);
    db.put("k", 1).unwrap();

    std::fs::remove_dir_all(dir.path().join("later")).unwrap();
    assert!(matches!(db.delete("k"), Err(Error::Io(_))));
    assert_eq!(db.get("k"), Some(json!(1)));
    assert!(!path.exists());
}

#[test]
fn after_save_recovers_once_the_disk_does() {
    let (dir, path) = unwritable();
    let db = open(&path, CommitPolicy::AfterSave);
    assert!(db.put("lost", 1).is_err());

    std::fs::create_dir(dir.path().join("later")).unwrap();
    db.put("kept", 2).unwrap();

    let reopened: JsonStore = JsonStore::open(&path).unwrap();
    assert_eq!(reopened.get("kept"), Some(json!(2)));
    assert!(!reopened.contains("lost"));
}

// ---- BeforeSave -------------------------------------------------------------

#[test]
fn before_save_failed_put_leaves_memory_ahead_of_disk() {
    let (_dir, path) = unwritable();
    let db = open(&path, CommitPolicy::BeforeSave);

    assert!(matches!(db.put("k", 1), Err(Error::Io(_))));
    assert_eq!(db.get("k"), Some(json!(1)));
    assert!(!path.exists());
}

#[test]
fn before_save_divergence_heals_on_next_save() {
    let (dir, path) = unwritable();
    let db = open(&path, CommitPolicy::BeforeSave);
    assert!(db.put("early", 1).is_err());

    std::fs::create_dir(dir.path().join("later")).unwrap();
    db.save().unwrap();

    let reopened: JsonStore = JsonStore::open(&path).unwrap();
    assert_eq!(reopened.get("early"), Some(json!(1)));
}

#[test]
fn both_policies_are_durable_on_success() {
    for policy in [CommitPolicy::AfterSave, CommitPolicy::BeforeSave] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let db = open(&path, policy);
        db.put("a", 1).unwrap();
        db.extend([("b", 2), ("c", 3)]).unwrap();
        db.delete("a").unwrap();

        let reopened: JsonStore = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.keys(), vec!["b", "c"], "{policy:?}");
    }
}
