//! Experiment files and the load → split → encode → evaluate flow

use crate::data::{Column, ColumnKind, Table};
use crate::error::{BenchError, Result};
use crate::evaluation::{BenchmarkReport, EvaluationHarness, HarnessConfig};
use crate::preprocessing::{OneHotEncoder, Splitter};
use crate::training::{default_strategies, StrategyConfig, StrategyFactory};
use crate::utils::{DataSaver, DatasetLoader, LoaderConfig};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the data lives and which columns play which role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: Option<PathBuf>,
    pub target: String,
    /// Holdout flag column
    pub validation: String,
    /// Columns to one-hot encode
    pub categorical: Vec<String>,
    #[serde(flatten)]
    pub loader: LoaderConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            target: "target".to_string(),
            validation: "validation".to_string(),
            categorical: vec!["c1".to_string()],
            loader: LoaderConfig::default(),
        }
    }
}

/// Optional dump of the encoded holdout-mode tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub train_path: Option<PathBuf>,
    pub holdout_path: Option<PathBuf>,
    pub delimiter: char,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            train_path: None,
            holdout_path: None,
            delimiter: ',',
        }
    }
}

impl ExportConfig {
    pub fn is_enabled(&self) -> bool {
        self.train_path.is_some() || self.holdout_path.is_some()
    }
}

/// A complete benchmark description, usually read from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetConfig,
    pub harness: HarnessConfig,
    pub export: ExportConfig,
    pub strategies: Vec<StrategyConfig>,
}

impl ExperimentConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!("cannot read experiment file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset.path = Some(path.into());
        self
    }

    /// Configured strategies, or the built-in list when none are given
    pub fn strategies(&self) -> Vec<StrategyConfig> {
        if self.strategies.is_empty() {
            default_strategies()
        } else {
            self.strategies.clone()
        }
    }

    pub fn factories(&self) -> Vec<Arc<dyn StrategyFactory>> {
        self.strategies()
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn StrategyFactory>)
            .collect()
    }

    /// Reject bad settings before any data is read
    pub fn validate(&self) -> Result<()> {
        self.harness.validate()?;
        if self.dataset.path.is_none() {
            return Err(BenchError::Config(
                "no dataset path; set [dataset].path or pass --data".to_string(),
            ));
        }
        if self.dataset.target == self.dataset.validation {
            return Err(BenchError::Config(format!(
                "target and validation both name column '{}'",
                self.dataset.target
            )));
        }
        for strategy in self.strategies() {
            strategy.validate()?;
        }
        Ok(())
    }

    fn data_path(&self) -> Result<&Path> {
        self.dataset
            .path
            .as_deref()
            .ok_or_else(|| BenchError::Config("no dataset path configured".to_string()))
    }

    /// Encoded columns load as text so numeric codes stay symbols
    fn load(&self) -> Result<Table> {
        let mut loader = self.dataset.loader.clone();
        for column in &self.dataset.categorical {
            if !loader.categorical_columns.contains(column) {
                loader.categorical_columns.push(column.clone());
            }
        }
        DatasetLoader::new(loader).load(self.data_path()?)
    }
}

/// Features and labels ready for cross-validation
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub features: Table,
    pub labels: Array1<f64>,
}

/// Encoded train and holdout tables sharing one vocabulary per column
#[derive(Debug, Clone)]
pub struct PreparedHoldout {
    pub train: PreparedData,
    pub holdout: PreparedData,
    pub encoders: Vec<OneHotEncoder>,
}

/// Load and encode the whole file for cross-validation
///
/// The holdout flag is dropped unused, so every row takes part in the folds.
pub fn prepare_cross_validation(config: &ExperimentConfig) -> Result<PreparedData> {
    let mut table = config.load()?;
    if table.contains(&config.dataset.validation) {
        table = table.drop_column(&config.dataset.validation)?;
    }

    let (mut features, labels) = table.split_off_label(&config.dataset.target)?;
    for column in &config.dataset.categorical {
        features = OneHotEncoder::fit(&features, column)?.transform(&features)?;
    }

    Ok(PreparedData {
        features: features.drop_kind(ColumnKind::Identifier),
        labels,
    })
}

/// Load, split on the holdout flag and encode both halves with
/// vocabularies learned from the training half only
pub fn prepare_holdout(config: &ExperimentConfig) -> Result<PreparedHoldout> {
    let table = config.load()?;
    let (train, holdout) = Splitter::new(config.dataset.validation.as_str()).split(&table)?;

    let (mut train_x, train_y) = train.split_off_label(&config.dataset.target)?;
    let (mut holdout_x, holdout_y) = holdout.split_off_label(&config.dataset.target)?;

    let mut encoders = Vec::with_capacity(config.dataset.categorical.len());
    for column in &config.dataset.categorical {
        let encoder = OneHotEncoder::fit(&train_x, column)?;
        train_x = encoder.transform(&train_x)?;
        holdout_x = encoder.transform(&holdout_x)?;
        encoders.push(encoder);
    }

    let prepared = PreparedHoldout {
        train: PreparedData {
            features: train_x,
            labels: train_y,
        },
        holdout: PreparedData {
            features: holdout_x,
            labels: holdout_y,
        },
        encoders,
    };

    if config.export.is_enabled() {
        export_holdout(&prepared, &config.dataset.target, &config.export)?;
    }

    Ok(strip_identifiers(prepared))
}

fn strip_identifiers(mut prepared: PreparedHoldout) -> PreparedHoldout {
    prepared.train.features = prepared.train.features.drop_kind(ColumnKind::Identifier);
    prepared.holdout.features = prepared.holdout.features.drop_kind(ColumnKind::Identifier);
    prepared
}

/// Write the encoded tables with the target as the first column
pub fn export_holdout(prepared: &PreparedHoldout, target: &str, export: &ExportConfig) -> Result<()> {
    let parts = [
        (&export.train_path, &prepared.train),
        (&export.holdout_path, &prepared.holdout),
    ];

    for (path, data) in parts {
        let Some(path) = path else { continue };
        let table = data
            .features
            .clone()
            .insert_column(0, Column::numeric(target, data.labels.to_vec()))?;
        DataSaver::save_csv(&table, path, export.delimiter)?;
    }
    Ok(())
}

/// Cross-validate every configured strategy
pub fn run_cross_validation(config: &ExperimentConfig) -> Result<BenchmarkReport> {
    config.validate()?;
    let data = prepare_cross_validation(config)?;
    let harness = EvaluationHarness::new(config.harness.clone())?;
    harness.run_cross_validation(&config.factories(), &data.features, &data.labels)
}

/// Holdout-evaluate every configured strategy
pub fn run_holdout(config: &ExperimentConfig) -> Result<BenchmarkReport> {
    config.validate()?;
    let data = prepare_holdout(config)?;
    let harness = EvaluationHarness::new(config.harness.clone())?;
    harness.run_holdout(
        &config.factories(),
        &data.train.features,
        &data.train.labels,
        &data.holdout.features,
        &data.holdout.labels,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ScoringMetric, StrategyKind};

    #[test]
    fn test_defaults_mirror_numerai_layout() {
        let config = ExperimentConfig::default();
        assert_eq!(config.dataset.target, "target");
        assert_eq!(config.dataset.validation, "validation");
        assert_eq!(config.dataset.categorical, vec!["c1"]);
        assert_eq!(config.strategies().len(), 10);
        assert!(!config.export.is_enabled());
        assert_eq!(config.dataset, DatasetConfig::default());
        assert_ne!(
            config.dataset.loader,
            LoaderConfig::default().with_delimiter(';')
        );
    }

    #[test]
    fn test_parse_experiment_file() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            [dataset]
            path = "data/train.csv"
            target = "label"
            categorical = ["c1", "c2"]
            delimiter = ";"

            [harness]
            scoring = "roc_auc"
            strategy_timeout_secs = 120.0

            [[strategies]]
            kind = "logistic_regression"
            preprocessor = "min_max"

            [[strategies]]
            name = "rf-10"
            kind = "random_forest"
            hyperparameters = { n_estimators = 10 }
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset.path, Some(PathBuf::from("data/train.csv")));
        assert_eq!(config.dataset.loader.delimiter, ';');
        assert_eq!(config.dataset.validation, "validation");
        assert_eq!(config.harness.scoring, ScoringMetric::RocAuc);
        assert_eq!(config.strategies.len(), 2);
        assert_eq!(config.strategies[1].kind(), StrategyKind::RandomForest);
        assert_eq!(config.strategies[1].id(), "rf-10");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_path_rejected() {
        let err = ExperimentConfig::default().validate().unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn test_unknown_hyperparameter_fails_validation() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            [dataset]
            path = "x.csv"

            [[strategies]]
            kind = "linear_svc"
            hyperparameters = { gamma = 0.1 }
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(BenchError::Config(_))));
    }
}
