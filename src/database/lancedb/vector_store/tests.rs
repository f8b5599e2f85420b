use super::*;
use crate::database::SENTINEL_ID;
use tempfile::TempDir;

const DIM: usize = 5;

async fn create_test_store() -> (LanceRecordStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = LanceRecordStore::open(&temp_dir.path().join("vectors"), DIM)
        .await
        .expect("should open vector store");
    (store, temp_dir)
}

fn create_test_record(id: &str, filepath: &str, seed: f32) -> Record {
    let vector = (0..DIM)
        .map(|i| seed.mul_add(0.1, i as f32 * 0.01))
        .collect();
    Record {
        id: id.to_string(),
        vector,
        text: format!("chunk text for {}", id),
        filepath: filepath.to_string(),
    }
}

#[tokio::test]
async fn new_store_contains_only_sentinel() {
    let (store, _temp_dir) = create_test_store().await;

    assert_eq!(store.dimension(), DIM);
    assert_eq!(store.count().await.expect("should count"), 1);

    let records = store.scan().await.expect("should scan");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, SENTINEL_ID);
    assert!(records[0].is_sentinel());
}

#[tokio::test]
async fn add_and_scan_records() {
    let (store, _temp_dir) = create_test_store().await;

    store
        .add(vec![
            create_test_record("a", "/src/a.rs", 1.0),
            create_test_record("b", "/src/b.rs", 2.0),
        ])
        .await
        .expect("should add records");

    assert_eq!(store.count().await.expect("should count"), 3);

    let records = store.scan().await.expect("should scan");
    let a = records
        .iter()
        .find(|r| r.id == "a")
        .expect("record a should be stored");
    assert_eq!(a.filepath, "/src/a.rs");
    assert_eq!(a.text, "chunk text for a");
    assert_eq!(a.vector.len(), DIM);
}

#[tokio::test]
async fn add_empty_batch_is_noop() {
    let (store, _temp_dir) = create_test_store().await;
    store.add(Vec::new()).await.expect("empty add should succeed");
    assert_eq!(store.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let (store, _temp_dir) = create_test_store().await;
    let record = Record {
        id: "bad".to_string(),
        vector: vec![0.1, 0.2],
        text: "short vector".to_string(),
        filepath: "/bad.rs".to_string(),
    };

    let result = store.add(vec![record]).await;
    assert!(matches!(result, Err(RagError::Database(_))));
    assert_eq!(store.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn query_orders_by_distance() {
    let (store, _temp_dir) = create_test_store().await;

    let records = vec![
        Record {
            id: "x".to_string(),
            vector: vec![1.0, 0.0, 0.0, 0.0, 0.0],
            text: "x axis".to_string(),
            filepath: "/x.rs".to_string(),
        },
        Record {
            id: "y".to_string(),
            vector: vec![0.0, 1.0, 0.0, 0.0, 0.0],
            text: "y axis".to_string(),
            filepath: "/y.rs".to_string(),
        },
        Record {
            id: "xy".to_string(),
            vector: vec![0.9, 0.1, 0.0, 0.0, 0.0],
            text: "mostly x".to_string(),
            filepath: "/xy.rs".to_string(),
        },
    ];
    store.add(records).await.expect("should add records");

    let hits = store
        .query(&[1.0, 0.0, 0.0, 0.0, 0.0], 2)
        .await
        .expect("should query");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].record.id, "x");
    assert_eq!(hits[1].record.id, "xy");
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn delete_by_filepath_and_id() {
    let (store, _temp_dir) = create_test_store().await;
    store
        .add(vec![
            create_test_record("a1", "/src/a.rs", 1.0),
            create_test_record("a2", "/src/a.rs", 1.5),
            create_test_record("b1", "/src/b.rs", 2.0),
        ])
        .await
        .expect("should add records");

    store
        .delete(&Predicate::FilepathEquals("/src/a.rs".to_string()))
        .await
        .expect("should delete by filepath");
    assert_eq!(store.count().await.expect("should count"), 2);

    store
        .delete(&Predicate::IdEquals("b1".to_string()))
        .await
        .expect("should delete by id");

    let remaining = store.scan().await.expect("should scan");
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].is_sentinel());
}

#[tokio::test]
async fn delete_with_quoted_filepath() {
    let (store, _temp_dir) = create_test_store().await;
    let quoted = "/src/it's here.rs";
    store
        .add(vec![
            create_test_record("q", quoted, 1.0),
            create_test_record("other", "/src/other.rs", 2.0),
        ])
        .await
        .expect("should add records");

    store
        .delete(&Predicate::FilepathEquals(quoted.to_string()))
        .await
        .expect("quoted filepath should not break the predicate");

    let remaining = store.scan().await.expect("should scan");
    assert!(remaining.iter().all(|r| r.filepath != quoted));
    assert!(remaining.iter().any(|r| r.id == "other"));
}

#[tokio::test]
async fn reopen_keeps_records_and_checks_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("vectors");

    {
        let store = LanceRecordStore::open(&path, DIM)
            .await
            .expect("should open vector store");
        store
            .add(vec![create_test_record("persisted", "/p.rs", 1.0)])
            .await
            .expect("should add record");
    }

    let reopened = LanceRecordStore::open(&path, DIM)
        .await
        .expect("should reopen vector store");
    assert_eq!(reopened.count().await.expect("should count"), 2);

    let mismatched = LanceRecordStore::open(&path, DIM + 1).await;
    assert!(matches!(mismatched, Err(RagError::Database(_))));
}

#[tokio::test]
async fn optimize_after_delete() {
    let (store, _temp_dir) = create_test_store().await;
    store
        .add(vec![create_test_record("a", "/a.rs", 1.0)])
        .await
        .expect("should add record");
    store
        .delete(&Predicate::IdEquals("a".to_string()))
        .await
        .expect("should delete");

    store.optimize().await.expect("should optimize");
    assert_eq!(store.count().await.expect("should count"), 1);
}
