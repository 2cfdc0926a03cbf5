//! Storage-level tests: schema, rows, updates and persistence

use tempfile::TempDir;

use super::*;
use crate::btree::{BTreeError, DEFAULT_MAX_DEGREE};
use crate::buffer::DEFAULT_POOL_CAPACITY;
use crate::file::FileManager;
use crate::record::{DataType, RecordError, Value};

const FILE: &str = "storage.db";

fn int(i: i32) -> Value {
    Value::Integer(i)
}

fn text(s: &str) -> Value {
    Value::Char(s.to_string())
}

fn create_storage(dir: &TempDir) -> Storage {
    let file_manager = FileManager::new(dir.path()).unwrap();
    Storage::create(file_manager, FILE, DEFAULT_POOL_CAPACITY, DEFAULT_MAX_DEGREE).unwrap()
}

fn open_storage(dir: &TempDir) -> Storage {
    let file_manager = FileManager::new(dir.path()).unwrap();
    Storage::open(file_manager, FILE, DEFAULT_POOL_CAPACITY).unwrap()
}

/// Three integer columns holding the eight seed rows
fn setup_test_env() -> (TempDir, Storage) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut storage = create_storage(&temp_dir);

    storage.add_column("hoge", DataType::Integer).unwrap();
    storage.add_column("fuga", DataType::Integer).unwrap();
    storage.add_column("piyo", DataType::Integer).unwrap();

    for (a, b, c) in [
        (2, -13, 89),
        (10000, 4, 44),
        (500, 5, 90),
        (10, 45, -999),
        (-345, 77, 43),
        (-100, 89, 111),
        (0, 0, 0),
        (80000, 10, 0),
    ] {
        storage.add(&[int(a), int(b), int(c)]).unwrap();
    }

    (temp_dir, storage)
}

#[test]
fn test_select_sorted_by_primary_key() {
    let (_temp_dir, mut storage) = setup_test_env();

    let rows = storage.select(&["hoge", "fuga", "piyo", "fuga"]).unwrap();
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0], vec![int(-345), int(77), int(43), int(77)]);
    assert_eq!(rows[1][1], int(89));
    assert_eq!(rows[2][2], int(0));
    assert_eq!(rows[3][3], int(-13));

    let keys: Vec<Value> = rows.iter().map(|r| r[0].clone()).collect();
    assert_eq!(
        keys,
        [-345, -100, 0, 2, 10, 500, 10000, 80000].map(int).to_vec()
    );
}

#[test]
fn test_reopen_reproduces_select() {
    let (temp_dir, mut storage) = setup_test_env();
    let before = storage.select(&["hoge", "fuga", "piyo", "fuga"]).unwrap();
    storage.flush().unwrap();
    drop(storage);

    let mut reopened = open_storage(&temp_dir);
    assert_eq!(reopened.schema().column_count(), 3);
    assert_eq!(
        reopened.select(&["hoge", "fuga", "piyo", "fuga"]).unwrap(),
        before
    );
}

#[test]
fn test_create_twice() {
    let (temp_dir, mut storage) = setup_test_env();
    storage.flush().unwrap();

    let file_manager = FileManager::new(temp_dir.path()).unwrap();
    let result = Storage::create(file_manager, FILE, DEFAULT_POOL_CAPACITY, DEFAULT_MAX_DEGREE);
    assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
}

#[test]
fn test_open_missing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_manager = FileManager::new(temp_dir.path()).unwrap();
    let result = Storage::open(file_manager, FILE, DEFAULT_POOL_CAPACITY);
    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

#[test]
fn test_find() {
    let (_temp_dir, mut storage) = setup_test_env();

    assert_eq!(
        storage.find(&int(10)).unwrap(),
        Some(vec![int(10), int(45), int(-999)])
    );
    assert_eq!(storage.find(&int(11)).unwrap(), None);
}

#[test]
fn test_update_returns_change() {
    let (_temp_dir, mut storage) = setup_test_env();

    let info = storage.update(&int(500), "fuga", &int(33)).unwrap();
    assert_eq!(info.col_num, 1);
    assert_eq!(info.before, 5i32.to_le_bytes().to_vec());
    assert_eq!(info.after, 33i32.to_le_bytes().to_vec());

    assert_eq!(
        storage.find(&int(500)).unwrap(),
        Some(vec![int(500), int(33), int(90)])
    );
    assert_eq!(storage.page_table().num_pinned(), 0);
}

#[test]
fn test_apply_update_replays_after_image() {
    let (_temp_dir, mut storage) = setup_test_env();

    let info = storage.update(&int(2), "piyo", &int(7)).unwrap();
    storage.update(&int(2), "piyo", &int(8)).unwrap();

    storage.apply_update(&info).unwrap();
    assert_eq!(
        storage.find(&int(2)).unwrap(),
        Some(vec![int(2), int(-13), int(7)])
    );
}

#[test]
fn test_apply_update_validation() {
    let (_temp_dir, mut storage) = setup_test_env();
    let info = storage.update(&int(2), "piyo", &int(7)).unwrap();

    let bad_slot = UpdateInfo {
        ptr_idx: 99,
        ..info.clone()
    };
    assert!(matches!(
        storage.apply_update(&bad_slot),
        Err(StorageError::InvalidUpdate(_))
    ));

    let bad_image = UpdateInfo {
        after: vec![1, 2],
        ..info.clone()
    };
    assert!(matches!(
        storage.apply_update(&bad_image),
        Err(StorageError::InvalidUpdate(_))
    ));

    let key_column = UpdateInfo { col_num: 0, ..info };
    assert!(matches!(
        storage.apply_update(&key_column),
        Err(StorageError::PrimaryKeyUpdate)
    ));
}

#[test]
fn test_update_errors() {
    let (_temp_dir, mut storage) = setup_test_env();

    assert!(matches!(
        storage.update(&int(2), "hoge", &int(3)),
        Err(StorageError::PrimaryKeyUpdate)
    ));
    assert!(matches!(
        storage.update(&int(3), "fuga", &int(3)),
        Err(StorageError::KeyNotFound(_))
    ));
    assert!(matches!(
        storage.update(&int(2), "nope", &int(3)),
        Err(StorageError::Record(RecordError::ColumnNotFound(_)))
    ));
    assert!(matches!(
        storage.update(&int(2), "fuga", &text("x")),
        Err(StorageError::Record(RecordError::TypeMismatch { .. }))
    ));
}

#[test]
fn test_add_errors() {
    let (_temp_dir, mut storage) = setup_test_env();

    assert!(matches!(
        storage.add(&[int(2), int(0), int(0)]),
        Err(StorageError::BTree(BTreeError::DuplicateKey(2)))
    ));
    assert!(matches!(
        storage.add(&[int(1), int(0)]),
        Err(StorageError::Record(RecordError::SchemaMismatch(_)))
    ));
    assert!(matches!(
        storage.add(&[int(i32::MAX), int(0), int(0)]),
        Err(StorageError::BTree(BTreeError::KeyOutOfRange(_)))
    ));
}

#[test]
fn test_schema_frozen_after_first_row() {
    let (_temp_dir, mut storage) = setup_test_env();
    assert!(matches!(
        storage.add_column("extra", DataType::Integer),
        Err(StorageError::SchemaFrozen)
    ));
}

#[test]
fn test_select_unknown_column() {
    let (_temp_dir, mut storage) = setup_test_env();
    assert!(matches!(
        storage.select(&["hoge", "missing"]),
        Err(StorageError::Record(RecordError::ColumnNotFound(_)))
    ));
}

#[test]
fn test_char_primary_key() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut storage = create_storage(&temp_dir);
    storage.add_column("country", DataType::Char(15)).unwrap();
    storage.add_column("population", DataType::Integer).unwrap();
    storage.add_column("capital", DataType::Char(13)).unwrap();

    for (country, population, capital) in [
        ("Japan", 125, "Tokyo"),
        ("China", 1410, "Beijing"),
        ("United States", 333, "Washington"),
        ("Russia", 144, "Moscow"),
        ("Brazil", 215, "Brasilia"),
        ("Nigeria", 218, "Abuja"),
    ] {
        storage
            .add(&[text(country), int(population), text(capital)])
            .unwrap();
    }

    let rows = storage.select(&["country", "capital"]).unwrap();
    let countries: Vec<Value> = rows.iter().map(|r| r[0].clone()).collect();
    assert_eq!(
        countries,
        ["Brazil", "China", "Japan", "Nigeria", "Russia", "United States"]
            .map(text)
            .to_vec()
    );
    assert_eq!(rows[2][1], text("Tokyo"));

    storage
        .update(&text("Japan"), "population", &int(124))
        .unwrap();
    assert_eq!(
        storage.find(&text("Japan")).unwrap(),
        Some(vec![text("Japan"), int(124), text("Tokyo")])
    );
}

#[test]
fn test_char_key_sharing_a_prefix() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut storage = create_storage(&temp_dir);
    storage.add_column("country", DataType::Char(15)).unwrap();
    storage.add_column("population", DataType::Integer).unwrap();
    storage.add(&[text("Japan"), int(125)]).unwrap();

    // "Japanese" indexes to the same tree key as "Japan" but is not stored
    assert_eq!(storage.find(&text("Japanese")).unwrap(), None);
    assert!(matches!(
        storage.update(&text("Japanese"), "population", &int(1)),
        Err(StorageError::KeyNotFound(_))
    ));
    assert_eq!(
        storage.find(&text("Japan")).unwrap(),
        Some(vec![text("Japan"), int(125)])
    );
    assert!(matches!(
        storage.add(&[text("Japanese"), int(1)]),
        Err(StorageError::BTree(BTreeError::DuplicateKey(_)))
    ));
}

#[test]
fn test_clear_falls_back_to_disk() {
    let (_temp_dir, mut storage) = setup_test_env();
    storage.flush().unwrap();

    storage.update(&int(10), "fuga", &int(1)).unwrap();
    storage.add(&[int(11), int(0), int(0)]).unwrap();
    storage.clear().unwrap();

    assert_eq!(
        storage.find(&int(10)).unwrap(),
        Some(vec![int(10), int(45), int(-999)])
    );
    assert_eq!(storage.find(&int(11)).unwrap(), None);
}

#[test]
fn test_many_rows_across_flushes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut storage = create_storage(&temp_dir);
    storage.add_column("id", DataType::Integer).unwrap();
    storage.add_column("name", DataType::Char(20)).unwrap();

    for id in (0..200).rev() {
        storage.add(&[int(id), text(&format!("row{}", id))]).unwrap();
        if id % 50 == 0 {
            storage.flush().unwrap();
        }
    }
    drop(storage);

    let mut reopened = open_storage(&temp_dir);
    let rows = reopened.select(&["id", "name"]).unwrap();
    assert_eq!(rows.len(), 200);
    assert_eq!(rows[199], vec![int(199), text("row199")]);
    assert!(rows.windows(2).all(|w| match (&w[0][0], &w[1][0]) {
        (Value::Integer(a), Value::Integer(b)) => a < b,
        _ => false,
    }));
}

#[test]
fn test_page_lsn_accessors() {
    let (_temp_dir, mut storage) = setup_test_env();
    let info = storage.update(&int(0), "fuga", &int(1)).unwrap();

    assert_eq!(storage.page_lsn(info.page_idx).unwrap(), 0);
    storage.set_page_lsn(info.page_idx, 12).unwrap();
    assert_eq!(storage.page_lsn(info.page_idx).unwrap(), 12);
}
