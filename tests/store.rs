use std::thread;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use seqvault::domain::{AccessionId, RequestSet, SequenceRecord};
use seqvault::error::StoreError;
use seqvault::store::{JsonTableStore, SequenceStore};

fn id(value: &str) -> AccessionId {
    value.parse().unwrap()
}

fn request(values: &[&str]) -> RequestSet {
    values.iter().map(|value| id(value)).collect()
}

fn table_path(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("nested").join("sequences.json")).unwrap()
}

#[test]
fn upsert_inserts_then_overwrites() {
    let temp = tempfile::tempdir().unwrap();
    let store = JsonTableStore::new(table_path(&temp));

    store
        .upsert(&[
            SequenceRecord::new(id("P1"), "old", "MK"),
            SequenceRecord::new(id("P2"), "keep", "TA"),
        ])
        .unwrap();
    store
        .upsert(&[SequenceRecord::new(id("P1"), "new", "MKKK")])
        .unwrap();

    let found = store.lookup(&request(&["P1", "P2", "P3"])).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[&id("P1")].description, "new");
    assert_eq!(found[&id("P1")].sequence, "MKKK");
    assert_eq!(found[&id("P2")].description, "keep");
    assert!(!found.contains_key(&id("P3")));
}

#[test]
fn empty_upsert_does_not_write() {
    let temp = tempfile::tempdir().unwrap();
    let store = JsonTableStore::new(table_path(&temp));

    store.upsert(&[]).unwrap();

    assert!(!store.path().as_std_path().exists());
    assert!(!store.lock_path().as_std_path().exists());
}

#[test]
fn table_survives_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let path = table_path(&temp);
    JsonTableStore::new(path.clone())
        .upsert(&[SequenceRecord::new(id("NP_000509.1"), "hbb", "MVHL")])
        .unwrap();

    let reopened = JsonTableStore::new(path);
    let found = reopened.lookup(&request(&["NP_000509.1"])).unwrap();
    assert_eq!(found[&id("NP_000509.1")].sequence, "MVHL");

    let rows = reopened.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].updated_at.is_empty());
}

#[test]
fn placeholders_are_returned_as_stored() {
    let temp = tempfile::tempdir().unwrap();
    let store = JsonTableStore::new(table_path(&temp));
    store
        .upsert(&[SequenceRecord::new(id("P00002"), "pending", "")])
        .unwrap();

    let found = store.lookup(&request(&["P00002"])).unwrap();
    assert!(!found[&id("P00002")].is_resolved());
}

#[test]
fn corrupt_table_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = table_path(&temp);
    std::fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    std::fs::write(path.as_std_path(), b"{ not json").unwrap();
    let store = JsonTableStore::new(path);

    assert_matches!(
        store.lookup(&request(&["P1"])),
        Err(StoreError::Corrupt { .. })
    );
    assert_matches!(
        store.upsert(&[SequenceRecord::new(id("P1"), "d", "MK")]),
        Err(StoreError::Corrupt { .. })
    );
    assert_eq!(
        std::fs::read_to_string(store.path().as_std_path()).unwrap(),
        "{ not json"
    );
}

#[test]
fn concurrent_writers_on_one_table_keep_every_key() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 20;

    let temp = tempfile::tempdir().unwrap();
    let path = table_path(&temp);

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let path = path.clone();
            scope.spawn(move || {
                let store = JsonTableStore::new(path);
                for index in 0..PER_WRITER {
                    let accession = id(&format!("W{writer}_{index}"));
                    store
                        .upsert(&[SequenceRecord::new(accession, "batch", "MK")])
                        .unwrap();
                }
            });
        }
    });

    let rows = JsonTableStore::new(path).rows().unwrap();
    assert_eq!(rows.len(), WRITERS * PER_WRITER);
    assert!(rows.iter().all(|row| row.sequence == "MK"));
}

#[test]
fn concurrent_writes_to_one_key_keep_a_whole_record() {
    let temp = tempfile::tempdir().unwrap();
    let path = table_path(&temp);
    let candidates = [
        SequenceRecord::new(id("P1"), "first writer", "MKKK"),
        SequenceRecord::new(id("P1"), "second writer", "TTAA"),
    ];

    thread::scope(|scope| {
        for record in &candidates {
            let path = path.clone();
            scope.spawn(move || {
                let store = JsonTableStore::new(path);
                for _ in 0..10 {
                    store.upsert(std::slice::from_ref(record)).unwrap();
                }
            });
        }
    });

    let store = JsonTableStore::new(path);
    let rows = store.rows().unwrap();
    assert_eq!(rows.len(), 1);
    let stored = store.lookup(&request(&["P1"])).unwrap().remove(&id("P1")).unwrap();
    assert!(candidates.contains(&stored));
}
