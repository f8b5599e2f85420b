use super::*;

#[test]
fn sentinel_record_shape() {
    let sentinel = Record::sentinel(4);
    assert_eq!(sentinel.id, "0");
    assert_eq!(sentinel.filepath, "init");
    assert_eq!(sentinel.text, "init");
    assert_eq!(sentinel.vector, vec![0.0; 4]);
    assert!(sentinel.is_sentinel());
}

#[test]
fn regular_record_is_not_sentinel() {
    let record = Record {
        id: "6f1c0c1e-2c55-4b0e-9d7e-1f1a3f4c5b6d".to_string(),
        vector: vec![0.1, 0.2],
        text: "fn main() {}".to_string(),
        filepath: "/src/main.rs".to_string(),
    };
    assert!(!record.is_sentinel());
}

#[test]
fn predicate_rendering() {
    assert_eq!(
        Predicate::IdEquals("abc".to_string()).to_filter(),
        "id = 'abc'"
    );
    assert_eq!(
        Predicate::FilepathEquals("/src/lib.rs".to_string()).to_string(),
        "filepath = '/src/lib.rs'"
    );
}

#[test]
fn predicate_escapes_quotes() {
    let predicate = Predicate::FilepathEquals("/tmp/it's' OR '1'='1".to_string());
    assert_eq!(
        predicate.to_filter(),
        "filepath = '/tmp/it''s'' OR ''1''=''1'"
    );
}

#[test]
fn record_serialization() {
    let record = Record {
        id: "id-1".to_string(),
        vector: vec![0.5, -0.5],
        text: "hello".to_string(),
        filepath: "a.txt".to_string(),
    };
    let json = serde_json::to_string(&record).expect("should serialize");
    let parsed: Record = serde_json::from_str(&json).expect("should deserialize");
    assert_eq!(parsed, record);
}
