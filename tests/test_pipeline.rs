//! Integration test: full pipeline (load → split → encode → evaluate)

use polars::prelude::*;
use std::io::Write;
use std::path::Path;
use tabular_bench::data::{Column as TableColumn, ColumnKind, Table};
use tabular_bench::error::BenchError;
use tabular_bench::evaluation::{Scores, StrategyOutcome};
use tabular_bench::experiment::{self, ExperimentConfig};
use tabular_bench::preprocessing::{encode, OneHotEncoder, Splitter};
use tabular_bench::training::{HyperValue, StrategyConfig, StrategyKind};
use tabular_bench::utils::DatasetLoader;

/// Numerai-shaped file: id, two features, a category, the holdout flag, the label
fn numerai_csv(n: usize, holdout_category: Option<&str>) -> String {
    let mut out = String::from("id,f1,f2,c1,validation,target\n");
    for i in 0..n {
        let f1 = ((i * 37) % 100) as f64 / 100.0;
        let f2 = ((i * 13) % 17) as f64 / 17.0;
        let validation = (i % 4 == 0) as u8;
        let c1 = match holdout_category {
            Some(extra) if validation == 1 && i % 8 == 0 => extra.to_string(),
            _ => ["x", "y", "z"][i % 3].to_string(),
        };
        let mut label = f1 > 0.5;
        if i % 11 == 0 {
            label = !label;
        }
        out.push_str(&format!(
            "r{},{},{},{},{},{}\n",
            i, f1, f2, c1, validation, label as u8
        ));
    }
    out
}

fn write_fixture(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn numerai_experiment(path: &Path) -> ExperimentConfig {
    let mut config = ExperimentConfig::from_toml_str(
        r#"
        [dataset]
        identifier_columns = ["id"]

        [harness]
        cv_strategy = { type = "stratified_k_fold", n_splits = 4, shuffle = true }
        "#,
    )
    .unwrap()
    .with_data_path(path);
    config.strategies = vec![
        StrategyConfig::new(StrategyKind::LogisticRegression),
        StrategyConfig::new(StrategyKind::RandomForest)
            .with_param("n_estimators", HyperValue::Int(10)),
    ];
    config
}

#[test]
fn test_encoder_counts_per_category() {
    let values: Vec<String> = ["x", "y", "x", "x", "y", "x", "y", "x", "x", "y"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let table = Table::new(vec![
        TableColumn::numeric("f1", (0..10).map(|i| i as f64).collect()),
        TableColumn::categorical("c1", values),
    ])
    .unwrap();

    let encoded = encode(&table, "c1").unwrap();
    assert!(!encoded.contains("c1"));

    let x = encoded.column("c1_x").unwrap();
    let y = encoded.column("c1_y").unwrap();
    assert_eq!(x.kind(), ColumnKind::Indicator);
    assert_eq!(x.as_f64().unwrap().iter().sum::<f64>(), 6.0);
    assert_eq!(y.as_f64().unwrap().iter().sum::<f64>(), 4.0);

    for row in 0..10 {
        assert_eq!(x.as_f64().unwrap()[row] + y.as_f64().unwrap()[row], 1.0);
    }
}

#[test]
fn test_frame_conversion_and_shared_vocabulary() {
    let df = df!(
        "f1" => &[0.1, 0.9, 0.4, 0.7, 0.2, 0.8],
        "c1" => &["b", "a", "b", "c", "a", "b"],
        "validation" => &[0i64, 0, 0, 0, 1, 1],
        "target" => &[0i64, 1, 0, 1, 0, 1]
    )
    .unwrap();

    let table = DatasetLoader::default().table_from_frame(&df, "in-memory").unwrap();
    assert_eq!(table.column("c1").unwrap().kind(), ColumnKind::Categorical);

    let (train, holdout) = Splitter::new("validation").split(&table).unwrap();
    let encoder = OneHotEncoder::fit(&train, "c1").unwrap();
    assert_eq!(encoder.indicator_names(), vec!["c1_a", "c1_b", "c1_c"]);

    let train = encoder.transform(&train).unwrap();
    let holdout = encoder.transform(&holdout).unwrap();
    assert_eq!(train.column_names(), holdout.column_names());
    // "c" only occurs in train
    assert_eq!(holdout.column("c1_c").unwrap().as_f64().unwrap(), &[0.0, 0.0]);
}

#[test]
fn test_split_partitions_loaded_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "train.csv", &numerai_csv(40, None));

    let table = DatasetLoader::default().load(&path).unwrap();
    let (train, holdout) = Splitter::new("validation").split(&table).unwrap();

    assert_eq!(train.n_rows() + holdout.n_rows(), 40);
    assert_eq!(holdout.n_rows(), 10);
    assert!(!train.contains("validation"));
    assert!(!holdout.contains("validation"));
    assert_eq!(train.column_names(), holdout.column_names());
}

#[test]
fn test_cross_validation_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "train.csv", &numerai_csv(120, None));
    let config = numerai_experiment(&path);

    let data = experiment::prepare_cross_validation(&config).unwrap();
    assert_eq!(data.features.n_rows(), 120);
    assert_eq!(
        data.features.column_names(),
        vec!["f1", "f2", "c1_x", "c1_y", "c1_z"]
    );

    let report = experiment::run_cross_validation(&config).unwrap();
    assert_eq!(report.outcomes.len(), 2);
    for outcome in &report.outcomes {
        let scored = outcome.report().unwrap();
        match &scored.scores {
            Scores::CrossValidation { n_folds, mean, .. } => {
                assert_eq!(*n_folds, 4);
                assert!(*mean > 0.7, "{} mean {}", scored.strategy, mean);
            }
            other => panic!("unexpected scores {:?}", other),
        }
    }
}

#[test]
fn test_numeric_category_codes_are_encoded() {
    let csv = numerai_csv(60, None)
        .replace(",x,", ",0,")
        .replace(",y,", ",1,")
        .replace(",z,", ",2,");
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "codes.csv", &csv);

    let data = experiment::prepare_cross_validation(&numerai_experiment(&path)).unwrap();
    assert_eq!(
        data.features.column_names(),
        vec!["f1", "f2", "c1_0", "c1_1", "c1_2"]
    );
    let ones: f64 = data.features.column("c1_2").unwrap().as_f64().unwrap().iter().sum();
    assert_eq!(ones, 20.0);
}

#[test]
fn test_holdout_end_to_end_with_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "train.csv", &numerai_csv(120, None));
    let mut config = numerai_experiment(&path);
    config.export.train_path = Some(dir.path().join("train_v.csv"));
    config.export.holdout_path = Some(dir.path().join("test_v.csv"));

    let report = experiment::run_holdout(&config).unwrap();
    match &report.outcomes[0] {
        StrategyOutcome::Completed(scored) => match scored.scores {
            Scores::Holdout { auc, accuracy, n_train, n_holdout } => {
                assert_eq!(n_train, 90);
                assert_eq!(n_holdout, 30);
                assert!(auc > 0.7);
                assert!((0.0..=1.0).contains(&accuracy));
            }
            ref other => panic!("unexpected scores {:?}", other),
        },
        other => panic!("strategy did not complete: {:?}", other),
    }

    let exported = DatasetLoader::default()
        .load(dir.path().join("test_v.csv"))
        .unwrap();
    assert_eq!(exported.column_names()[0], "target");
    assert_eq!(exported.n_rows(), 30);
    assert!(exported.contains("c1_z"));
    assert!(exported.contains("id"));
}

#[test]
fn test_unseen_holdout_category_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "train.csv", &numerai_csv(40, Some("w")));

    let table = DatasetLoader::default().load(&path).unwrap();
    let (train, holdout) = Splitter::new("validation").split(&table).unwrap();
    let encoder = OneHotEncoder::fit(&train, "c1").unwrap();
    assert!(encoder.transform(&train).is_ok());
    assert!(matches!(
        encoder.transform(&holdout),
        Err(BenchError::SchemaMismatch(_))
    ));

    let err = experiment::run_holdout(&numerai_experiment(&path)).unwrap_err();
    assert!(matches!(err, BenchError::SchemaMismatch(_)), "got {:?}", err);
}

#[test]
fn test_missing_target_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "train.csv", "f1,c1,validation\n0.1,x,0\n0.2,y,1\n");

    let err = experiment::prepare_cross_validation(&numerai_experiment(&path)).unwrap_err();
    assert!(matches!(err, BenchError::ColumnNotFound(_)), "got {:?}", err);
}

#[test]
fn test_shipped_experiment_file_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/numerai.toml");
    let config = ExperimentConfig::from_toml_file(path).unwrap();

    assert_eq!(config.harness.cv_strategy.n_splits(), 10);
    assert_eq!(config.strategies.len(), 6);
    assert!(!config.export.is_enabled());
    config.validate().unwrap();
}
