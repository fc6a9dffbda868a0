use std::collections::BTreeMap;

use titanic_prep::config::{ArtifactPaths, ModelConfig};
use titanic_prep::ingestion::csv::{ingest_csv_inferred_from_path, ingest_csv_inferred_from_reader};
use titanic_prep::preprocessing::{stratified_split, DataPreprocessor, FittedTransform};
use titanic_prep::types::{DataSet, DataType, Field, Schema, Value};
use titanic_prep::Error;

const SAMPLE: &str = "tests/fixtures/titanic_sample.csv";

fn sample() -> DataSet {
    ingest_csv_inferred_from_path(SAMPLE).unwrap()
}

fn preprocessor(dir: &std::path::Path) -> DataPreprocessor {
    DataPreprocessor::new(ModelConfig::default(), ArtifactPaths::in_dir(dir))
}

fn class_counts(values: impl Iterator<Item = Value>) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for v in values {
        *out.entry(v.render()).or_default() += 1;
    }
    out
}

fn column_values(ds: &DataSet, name: &str) -> Vec<Value> {
    let idx = ds.schema.index_of(name).unwrap();
    ds.column(idx).cloned().collect()
}

#[test]
fn split_is_reproducible_for_a_fixed_seed() {
    let dir = tempfile::tempdir().unwrap();
    let pre = preprocessor(dir.path());
    let ds = sample();

    let a = pre.prepare(&ds).unwrap();
    let b = pre.prepare(&ds).unwrap();
    assert_eq!(a.split, b.split);
    assert_eq!(a.train, b.train);
    assert_eq!(a.test, b.test);
}

#[test]
fn partitions_conserve_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let ds = sample();
    let prepared = preprocessor(dir.path()).prepare(&ds).unwrap();

    assert_eq!(prepared.train.row_count() + prepared.test.row_count(), ds.row_count());
    assert_eq!(prepared.test.row_count(), 5);

    let mut all: Vec<usize> = prepared.split.train.iter().chain(&prepared.split.test).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..ds.row_count()).collect::<Vec<_>>());
}

#[test]
fn class_proportions_stay_within_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let ds = sample();
    let prepared = preprocessor(dir.path()).prepare(&ds).unwrap();

    let overall = class_counts(column_values(&ds, "Survived").into_iter());
    let test = class_counts(column_values(&prepared.test, "Survived").into_iter());
    let f = prepared.test.row_count() as f64 / ds.row_count() as f64;
    for (class, n) in &overall {
        let got = *test.get(class).unwrap_or(&0) as f64;
        assert!((got - f * *n as f64).abs() <= 1.0, "class {class}: {got} test rows of {n}");
        assert!(got >= 1.0);
    }
}

#[test]
fn output_columns_are_features_then_target() {
    let dir = tempfile::tempdir().unwrap();
    let prepared = preprocessor(dir.path()).prepare(&sample()).unwrap();

    let mut expected = prepared.transform.feature_names();
    expected.push("Survived".to_string());
    let train_cols: Vec<&str> = prepared.train.schema.field_names().collect();
    let test_cols: Vec<&str> = prepared.test.schema.field_names().collect();
    assert_eq!(train_cols, expected);
    assert_eq!(test_cols, expected);
    assert_eq!(&expected[..4], &["Age", "SibSp", "Parch", "Fare"]);
    assert!(expected.contains(&"Sex_male".to_string()));
    assert!(!expected.contains(&"Sex_female".to_string()));
    assert!(!expected.iter().any(|c| c == "PassengerId" || c == "Name" || c == "Cabin"));
}

#[test]
fn fit_ignores_test_rows_and_unseen_categories_encode_as_zeros() {
    let dir = tempfile::tempdir().unwrap();
    let pre = preprocessor(dir.path());
    let ds = sample();
    let baseline = pre.prepare(&ds).unwrap();

    // Same targets, so the same split; only test-row features change.
    let mut tampered = ds.clone();
    let age = tampered.schema.index_of("Age").unwrap();
    let embarked = tampered.schema.index_of("Embarked").unwrap();
    for &i in &baseline.split.test {
        tampered.rows[i][age] = Value::Float64(999.0);
        tampered.rows[i][embarked] = Value::Utf8("X".to_string());
    }
    let again = pre.prepare(&tampered).unwrap();

    assert_eq!(again.split, baseline.split);
    assert_eq!(again.transform, baseline.transform);
    assert_eq!(again.train, baseline.train);

    let names = again.transform.feature_names();
    for row in &again.test.rows {
        for (name, v) in names.iter().zip(row) {
            if name.starts_with("Embarked_") {
                assert_eq!(*v, Value::Float64(0.0));
            }
        }
    }
}

#[test]
fn split_data_writes_artifacts_and_reloaded_transform_reproduces_train() {
    let dir = tempfile::tempdir().unwrap();
    let pre = preprocessor(dir.path());

    let out = pre.split_data(SAMPLE).unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    assert_eq!(out.train_path, paths.train_data);
    assert_eq!(out.test_path, paths.test_data);
    assert!(paths.preprocessor.exists());

    let prepared = pre.prepare(&sample()).unwrap();
    let loaded = FittedTransform::load(&paths.preprocessor).unwrap();
    assert_eq!(loaded, prepared.transform);
    assert_eq!(out.feature_names, loaded.feature_names());

    let train_x = sample()
        .drop_columns(&ModelConfig::default().drop_columns)
        .take_rows(&prepared.split.train);
    let reapplied = loaded.transform(&train_x).unwrap();
    let without_target = prepared.train.drop_columns(&["Survived"]);
    assert_eq!(reapplied, without_target);

    let written = ingest_csv_inferred_from_path(&paths.train_data).unwrap();
    assert_eq!(written.row_count(), prepared.train.row_count());
    assert_eq!(column_values(&written, "Survived"), column_values(&prepared.train, "Survived"));
}

#[test]
fn ten_row_example_puts_both_classes_in_test() {
    let input = "Age,Sex,Survived\n\
                 22,male,0\n38,female,1\n26,female,1\n35,female,1\n35,male,0\n\
                 ,male,0\n54,male,1\n2,male,1\n27,female,1\n14,female,1\n";
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(input.as_bytes());
    let ds = ingest_csv_inferred_from_reader(&mut rdr).unwrap();

    let mut config = ModelConfig::default();
    config.test_size = 0.3;
    config.features.numerical = vec!["Age".to_string()];
    config.features.categorical = vec!["Sex".to_string()];
    let dir = tempfile::tempdir().unwrap();
    let pre = DataPreprocessor::new(config, ArtifactPaths::in_dir(dir.path()));

    let prepared = pre.prepare(&ds).unwrap();
    assert_eq!(prepared.test.row_count(), 3);
    let test = class_counts(column_values(&prepared.test, "Survived").into_iter());
    assert!(test["0"] >= 1);
    assert!(test["1"] >= 1);

    assert_eq!(pre.prepare(&ds).unwrap().split, prepared.split);
}

#[test]
fn missing_target_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let ds = sample().drop_columns(&["Survived"]);
    let err = preprocessor(dir.path()).prepare(&ds).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { column } if column == "Survived"));
}

#[test]
fn missing_feature_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let ds = sample().drop_columns(&["Fare"]);
    let err = preprocessor(dir.path()).prepare(&ds).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { column } if column == "Fare"));
}

#[test]
fn dropping_an_absent_column_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let ds = sample().drop_columns(&["Cabin"]);
    assert!(preprocessor(dir.path()).prepare(&ds).is_ok());
}

#[test]
fn stratified_split_rejects_single_member_class() {
    let target = vec![Value::Int64(0), Value::Int64(0), Value::Int64(0), Value::Int64(1)];
    let err = stratified_split(&target, "Survived", 0.25, 42).unwrap_err();
    assert!(matches!(err, Error::InsufficientClassSamples { .. }));
}

#[test]
fn zero_variance_feature_scales_to_zero() {
    let schema = Schema::new(vec![Field::new("Parch", DataType::Int64)]);
    let rows = (0..4).map(|_| vec![Value::Int64(0)]).collect();
    let ds = DataSet::new(schema, rows);

    let fitted = FittedTransform::fit(&ds, &["Parch"], &[]).unwrap();
    let out = fitted.transform(&ds).unwrap();
    assert!(out.rows.iter().all(|r| r[0] == Value::Float64(0.0)));
}
