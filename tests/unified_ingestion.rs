use titanic_prep::ingestion::{ingest_from_path, IngestionFormat, IngestionOptions};
use titanic_prep::types::{DataType, Field, Schema, Value};
use titanic_prep::Error;

#[test]
fn format_is_detected_from_extension() {
    let csv = ingest_from_path("tests/fixtures/titanic_sample.csv", &IngestionOptions::default()).unwrap();
    let json = ingest_from_path("tests/fixtures/passengers.json", &IngestionOptions::default()).unwrap();

    assert_eq!(csv.row_count(), 25);
    assert_eq!(json.row_count(), 4);
    assert_eq!(IngestionFormat::from_extension("NDJSON"), Some(IngestionFormat::Json));
    assert_eq!(IngestionFormat::from_extension("xlsx"), None);
}

#[test]
fn explicit_schema_restricts_columns() {
    let opts = IngestionOptions {
        schema: Some(Schema::new(vec![
            Field::new("Sex", DataType::Utf8),
            Field::new("Survived", DataType::Int64),
        ])),
        ..Default::default()
    };
    let ds = ingest_from_path("tests/fixtures/titanic_sample.csv", &opts).unwrap();

    assert_eq!(ds.column_count(), 2);
    assert_eq!(ds.rows[1], vec![Value::Utf8("female".to_string()), Value::Int64(1)]);
}

#[test]
fn forced_format_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passengers.txt");
    std::fs::write(&path, "Sex,Fare\nmale,7.25\n").unwrap();

    let err = ingest_from_path(&path, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));

    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..Default::default()
    };
    let ds = ingest_from_path(&path, &opts).unwrap();
    assert_eq!(ds.rows[0][1], Value::Float64(7.25));
}
