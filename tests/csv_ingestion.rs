use titanic_prep::ingestion::csv::{ingest_csv_from_path, ingest_csv_from_reader, ingest_csv_inferred_from_path};
use titanic_prep::ingestion::write_csv;
use titanic_prep::types::{DataType, Field, Schema, Value};
use titanic_prep::Error;

fn passenger_schema() -> Schema {
    Schema::new(vec![
        Field::new("PassengerId", DataType::Int64),
        Field::new("Name", DataType::Utf8),
        Field::new("Fare", DataType::Float64),
        Field::new("Embarked", DataType::Utf8),
    ])
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let ds = ingest_csv_from_path("tests/fixtures/titanic_sample.csv", &passenger_schema()).unwrap();

    assert_eq!(ds.row_count(), 25);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Braund, Mr. Owen Harris".to_string()),
            Value::Float64(7.25),
            Value::Utf8("S".to_string()),
        ]
    );
    assert_eq!(ds.rows[22][1], Value::Utf8(r#"McGowan, Miss. Anna "Annie""#.to_string()));
    assert_eq!(ds.rows[24][3], Value::Null);
}

#[test]
fn ingest_csv_allows_reordered_columns() {
    let input = "Embarked,Fare,PassengerId,Name\nC,71.2833,2,Cumings\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let ds = ingest_csv_from_reader(&mut rdr, &passenger_schema()).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Int64(2));
    assert_eq!(ds.rows[0][3], Value::Utf8("C".to_string()));
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let input = "PassengerId,Name,Fare\n1,Braund,7.25\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let err = ingest_csv_from_reader(&mut rdr, &passenger_schema()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'Embarked'"));
}

#[test]
fn ingest_csv_errors_on_type_parse() {
    let input = "PassengerId,Name,Fare,Embarked\nnot_an_int,Braund,7.25,S\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let err = ingest_csv_from_reader(&mut rdr, &passenger_schema()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value at row 2"));
    assert!(msg.contains("column 'PassengerId'"));
}

#[test]
fn missing_file_is_file_not_found() {
    let err = ingest_csv_inferred_from_path("tests/fixtures/does_not_exist.csv").unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[test]
fn inferred_types_follow_the_titanic_columns() {
    let ds = ingest_csv_inferred_from_path("tests/fixtures/titanic_sample.csv").unwrap();
    let types: Vec<(&str, DataType)> = ds
        .schema
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.data_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("PassengerId", DataType::Int64),
            ("Survived", DataType::Int64),
            ("Pclass", DataType::Int64),
            ("Name", DataType::Utf8),
            ("Sex", DataType::Utf8),
            ("Age", DataType::Int64),
            ("SibSp", DataType::Int64),
            ("Parch", DataType::Int64),
            ("Ticket", DataType::Utf8),
            ("Fare", DataType::Float64),
            ("Cabin", DataType::Utf8),
            ("Embarked", DataType::Utf8),
        ]
    );
}

#[test]
fn written_csv_reads_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("data.csv");
    let ds = ingest_csv_inferred_from_path("tests/fixtures/titanic_sample.csv").unwrap();

    write_csv(&out, &ds).unwrap();
    let back = ingest_csv_inferred_from_path(&out).unwrap();
    assert_eq!(back, ds);
}
