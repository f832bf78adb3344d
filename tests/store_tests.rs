//! Work-list store tests: schema CRUD, user-row purge, key invariant.

use shredkit::engine::{SqliteWorkList, WorkListStore};
use shredkit::types::ENTROPY_UNKNOWN;
use shredkit::{FileFlags, file_key};

fn user_file_flags() -> FileFlags {
    let mut flags = FileFlags::default();
    flags.set_is_file(true);
    flags
}

fn system_file_flags() -> FileFlags {
    let mut flags = user_file_flags();
    flags.set_system_added(true);
    flags
}

#[test]
fn test_read_all_empty() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    assert!(store.read_all().unwrap().is_empty());
}

#[test]
fn test_insert_and_read_roundtrip() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    let path = "/data/secret.doc";
    let key = file_key(path);
    store.insert(&key, path, user_file_flags()).unwrap();

    let rows = store.read_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, key);
    assert_eq!(rows[0].path, path);
    assert_eq!(rows[0].entropy, ENTROPY_UNKNOWN);
    assert!(rows[0].flags.is_file());
    assert!(!rows[0].flags.is_system_added());
}

#[test]
fn test_key_is_digest_of_path() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    for path in ["/a/b.txt", "/a/c.txt", "/other/d.bin"] {
        store.insert(&file_key(path), path, user_file_flags()).unwrap();
    }
    for row in store.read_all().unwrap() {
        assert_eq!(row.key, file_key(&row.path));
    }
}

#[test]
fn test_duplicate_insert_is_store_error() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    let key = file_key("/dup.txt");
    store.insert(&key, "/dup.txt", user_file_flags()).unwrap();
    assert!(store.insert(&key, "/dup.txt", user_file_flags()).is_err());
}

#[test]
fn test_update_entropy() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    let key = file_key("/e.bin");
    store.insert(&key, "/e.bin", user_file_flags()).unwrap();
    store.update_entropy(&key, 7.25).unwrap();

    let rows = store.read_all().unwrap();
    assert_eq!(rows[0].entropy, 7.25);
}

#[test]
fn test_delete_reports_presence() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    let key = file_key("/gone.txt");
    store.insert(&key, "/gone.txt", user_file_flags()).unwrap();

    assert!(store.delete(&key).unwrap());
    assert!(!store.delete(&key).unwrap());
    assert!(store.read_all().unwrap().is_empty());
}

#[test]
fn test_drop_table_leaves_usable_empty_store() {
    let store = SqliteWorkList::open_in_memory().unwrap();
    store
        .insert(&file_key("/x"), "/x", user_file_flags())
        .unwrap();
    store.drop_table().unwrap();

    assert!(store.read_all().unwrap().is_empty());
    // still usable after the drop
    store
        .insert(&file_key("/y"), "/y", system_file_flags())
        .unwrap();
    assert_eq!(store.read_all().unwrap().len(), 1);
}

#[test]
fn test_delete_user_rows_keeps_system_rows() {
    let store = SqliteWorkList::open_in_memory().unwrap();

    // user file (flags 2), user dir (flags 0), system file (3), system dir (1)
    store
        .insert(&file_key("/user.txt"), "/user.txt", user_file_flags())
        .unwrap();
    store
        .insert(&file_key("/userdir"), "/userdir", FileFlags::default())
        .unwrap();
    store
        .insert(&file_key("/sys.txt"), "/sys.txt", system_file_flags())
        .unwrap();
    let mut system_dir = FileFlags::default();
    system_dir.set_system_added(true);
    store
        .insert(&file_key("/sysdir"), "/sysdir", system_dir)
        .unwrap();

    store.delete_user_rows().unwrap();

    let rows = store.read_all().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.flags.is_system_added()));
}

#[test]
fn test_on_disk_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join(".shredkit");

    {
        let store = SqliteWorkList::open(&db_path).unwrap();
        store
            .insert(&file_key("/persist.me"), "/persist.me", user_file_flags())
            .unwrap();
    }
    let store = SqliteWorkList::open(&db_path).unwrap();
    let rows = store.read_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, "/persist.me");
}
