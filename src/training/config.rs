//! Declarative strategy configuration

use super::decision_tree::{Criterion, MaxFeatures};
use super::extra_trees::ExtraTrees;
use super::linear_models::{LinearSvc, LogisticRegression};
use super::models::{ModelStrategy, StrategyFactory};
use super::pipeline::ScaledStrategy;
use super::random_forest::RandomForest;
use super::sgd::{SGDClassifier, SGDConfig};
use crate::error::{BenchError, Result};
use crate::preprocessing::ScalerType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Built-in classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    LogisticRegression,
    LinearSvc,
    SgdClassifier,
    RandomForest,
    ExtraTrees,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::LogisticRegression => "logistic_regression",
            StrategyKind::LinearSvc => "linear_svc",
            StrategyKind::SgdClassifier => "sgd_classifier",
            StrategyKind::RandomForest => "random_forest",
            StrategyKind::ExtraTrees => "extra_trees",
        }
    }

    /// Hyperparameter names accepted by this family
    pub fn hyperparameter_names(&self) -> &'static [&'static str] {
        match self {
            StrategyKind::LogisticRegression => {
                &["alpha", "max_iter", "tol", "learning_rate", "fit_intercept"]
            }
            StrategyKind::LinearSvc => &["C", "max_iter", "tol", "learning_rate", "fit_intercept"],
            StrategyKind::SgdClassifier => &[
                "loss",
                "learning_rate",
                "eta0",
                "alpha",
                "l1_ratio",
                "max_iter",
                "tol",
                "power_t",
                "random_state",
            ],
            StrategyKind::RandomForest | StrategyKind::ExtraTrees => &[
                "n_estimators",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "max_features",
                "bootstrap",
                "criterion",
                "random_state",
            ],
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single hyperparameter value as written in a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for HyperValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperValue::Bool(v) => write!(f, "{}", v),
            HyperValue::Int(v) => write!(f, "{}", v),
            HyperValue::Float(v) => write!(f, "{}", v),
            HyperValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Typed, checked access to a hyperparameter map
struct Params<'a> {
    kind: StrategyKind,
    values: &'a BTreeMap<String, HyperValue>,
}

impl<'a> Params<'a> {
    fn new(kind: StrategyKind, values: &'a BTreeMap<String, HyperValue>) -> Result<Self> {
        let allowed = kind.hyperparameter_names();
        if let Some(unknown) = values.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(BenchError::Config(format!(
                "{} does not accept hyperparameter '{}' (expected one of {:?})",
                kind, unknown, allowed
            )));
        }
        Ok(Self { kind, values })
    }

    fn type_error(&self, name: &str, expected: &str, got: &HyperValue) -> BenchError {
        BenchError::Config(format!(
            "{}.{} must be {}, got {}",
            self.kind, name, expected, got
        ))
    }

    fn f64(&self, name: &str, default: f64) -> Result<f64> {
        match self.values.get(name) {
            None => Ok(default),
            Some(HyperValue::Float(v)) => Ok(*v),
            Some(HyperValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(self.type_error(name, "a number", other)),
        }
    }

    fn usize(&self, name: &str, default: usize) -> Result<usize> {
        match self.values.get(name) {
            None => Ok(default),
            Some(HyperValue::Int(v)) if *v >= 0 => Ok(*v as usize),
            Some(other) => Err(self.type_error(name, "a non-negative integer", other)),
        }
    }

    fn u64(&self, name: &str, default: u64) -> Result<u64> {
        self.usize(name, default as usize).map(|v| v as u64)
    }

    /// Integer, or absent / "none" for no limit
    fn opt_usize(&self, name: &str, default: Option<usize>) -> Result<Option<usize>> {
        match self.values.get(name) {
            None => Ok(default),
            Some(HyperValue::Text(s)) if s == "none" => Ok(None),
            Some(_) => self.usize(name, 0).map(Some),
        }
    }

    fn bool(&self, name: &str, default: bool) -> Result<bool> {
        match self.values.get(name) {
            None => Ok(default),
            Some(HyperValue::Bool(v)) => Ok(*v),
            Some(other) => Err(self.type_error(name, "a boolean", other)),
        }
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr<Err = BenchError>,
    {
        match self.values.get(name) {
            None => Ok(default),
            Some(HyperValue::Text(s)) => s.parse(),
            Some(other) => Err(self.type_error(name, "a string", other)),
        }
    }

    fn max_features(&self, default: MaxFeatures) -> Result<MaxFeatures> {
        match self.values.get("max_features") {
            None => Ok(default),
            Some(HyperValue::Int(v)) if *v > 0 => Ok(MaxFeatures::Count(*v as usize)),
            Some(HyperValue::Float(f)) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
            Some(HyperValue::Text(s)) => s.parse(),
            Some(other) => Err(self.type_error(
                "max_features",
                "sqrt, log2, all, a positive integer or a fraction in (0, 1]",
                other,
            )),
        }
    }

    fn criterion(&self) -> Result<Criterion> {
        match self.values.get("criterion") {
            None => Ok(Criterion::Gini),
            Some(HyperValue::Text(s)) if s == "gini" => Ok(Criterion::Gini),
            Some(HyperValue::Text(s)) if s == "entropy" => Ok(Criterion::Entropy),
            Some(other) => Err(self.type_error("criterion", "\"gini\" or \"entropy\"", other)),
        }
    }
}

/// Serialized form of [`StrategyConfig`]
#[derive(Debug, Clone, Deserialize)]
struct RawStrategy {
    #[serde(default)]
    name: Option<String>,
    kind: StrategyKind,
    #[serde(default)]
    hyperparameters: BTreeMap<String, HyperValue>,
    #[serde(default)]
    preprocessor: Option<ScalerType>,
}

impl From<RawStrategy> for StrategyConfig {
    fn from(raw: RawStrategy) -> Self {
        let mut config = Self {
            name: raw.name,
            kind: raw.kind,
            hyperparameters: raw.hyperparameters,
            preprocessor: raw.preprocessor,
            id: String::new(),
        };
        config.refresh_id();
        config
    }
}

/// One entry of the strategy list: a classifier family, its
/// hyperparameters and an optional scaler in front of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStrategy")]
pub struct StrategyConfig {
    /// Display name; derived from the other fields when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    kind: StrategyKind,
    hyperparameters: BTreeMap<String, HyperValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preprocessor: Option<ScalerType>,
    #[serde(skip)]
    id: String,
}

impl StrategyConfig {
    pub fn new(kind: StrategyKind) -> Self {
        let mut config = Self {
            name: None,
            kind,
            hyperparameters: BTreeMap::new(),
            preprocessor: None,
            id: String::new(),
        };
        config.refresh_id();
        config
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.refresh_id();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: HyperValue) -> Self {
        self.hyperparameters.insert(name.into(), value);
        self.refresh_id();
        self
    }

    pub fn with_preprocessor(mut self, scaler: ScalerType) -> Self {
        self.preprocessor = Some(scaler);
        self.refresh_id();
        self
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn hyperparameters(&self) -> &BTreeMap<String, HyperValue> {
        &self.hyperparameters
    }

    pub fn preprocessor(&self) -> Option<ScalerType> {
        self.preprocessor
    }

    fn refresh_id(&mut self) {
        self.id = match &self.name {
            Some(name) => name.clone(),
            None => self.derived_id(),
        };
    }

    /// e.g. `min_max+logistic_regression(alpha=0.1)`
    fn derived_id(&self) -> String {
        let mut id = String::new();
        if let Some(scaler) = self.preprocessor {
            id.push_str(scaler.name());
            id.push('+');
        }
        id.push_str(self.kind.name());
        if !self.hyperparameters.is_empty() {
            let params: Vec<String> = self
                .hyperparameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            id.push('(');
            id.push_str(&params.join(", "));
            id.push(')');
        }
        id
    }

    /// Check that the strategy can be built
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    fn build_model(&self) -> Result<Box<dyn ModelStrategy>> {
        let p = Params::new(self.kind, &self.hyperparameters)?;

        let model: Box<dyn ModelStrategy> = match self.kind {
            StrategyKind::LogisticRegression => Box::new(
                LogisticRegression::new()
                    .with_alpha(p.f64("alpha", 0.01)?)
                    .with_max_iter(p.usize("max_iter", 1000)?)
                    .with_tol(p.f64("tol", 1e-6)?)
                    .with_learning_rate(p.f64("learning_rate", 0.1)?)
                    .with_fit_intercept(p.bool("fit_intercept", true)?),
            ),
            StrategyKind::LinearSvc => Box::new(
                LinearSvc::new()
                    .with_c(p.f64("C", 1.0)?)
                    .with_max_iter(p.usize("max_iter", 1000)?)
                    .with_tol(p.f64("tol", 1e-4)?)
                    .with_learning_rate(p.f64("learning_rate", 0.1)?)
                    .with_fit_intercept(p.bool("fit_intercept", true)?),
            ),
            StrategyKind::SgdClassifier => {
                let defaults = SGDConfig::default();
                Box::new(SGDClassifier::new(SGDConfig {
                    loss: p.parsed("loss", defaults.loss)?,
                    learning_rate: p.parsed("learning_rate", defaults.learning_rate)?,
                    eta0: p.f64("eta0", defaults.eta0)?,
                    alpha: p.f64("alpha", defaults.alpha)?,
                    l1_ratio: p.f64("l1_ratio", defaults.l1_ratio)?,
                    max_iter: p.usize("max_iter", defaults.max_iter)?,
                    tol: p.f64("tol", defaults.tol)?,
                    power_t: p.f64("power_t", defaults.power_t)?,
                    random_state: p.u64("random_state", defaults.random_state)?,
                }))
            }
            StrategyKind::RandomForest => Box::new(
                RandomForest::new(p.usize("n_estimators", 100)?)
                    .with_max_depth(p.opt_usize("max_depth", None)?)
                    .with_min_samples_split(p.usize("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize("min_samples_leaf", 1)?)
                    .with_max_features(p.max_features(MaxFeatures::Sqrt)?)
                    .with_bootstrap(p.bool("bootstrap", true)?)
                    .with_criterion(p.criterion()?)
                    .with_random_state(p.u64("random_state", 0)?),
            ),
            StrategyKind::ExtraTrees => Box::new(
                ExtraTrees::new(p.usize("n_estimators", 100)?)
                    .with_max_depth(p.opt_usize("max_depth", None)?)
                    .with_min_samples_split(p.usize("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize("min_samples_leaf", 1)?)
                    .with_max_features(p.max_features(MaxFeatures::Sqrt)?)
                    .with_bootstrap(p.bool("bootstrap", false)?)
                    .with_criterion(p.criterion()?)
                    .with_random_state(p.u64("random_state", 0)?),
            ),
        };

        Ok(model)
    }
}

impl StrategyFactory for StrategyConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn build(&self) -> Result<Box<dyn ModelStrategy>> {
        let model = self.build_model()?;
        Ok(match self.preprocessor {
            Some(scaler) => Box::new(ScaledStrategy::new(scaler, model)),
            None => model,
        })
    }
}

/// The classifier list benchmarked when a config names none
pub fn default_strategies() -> Vec<StrategyConfig> {
    let mut strategies = vec![
        StrategyConfig::new(StrategyKind::LogisticRegression),
        StrategyConfig::new(StrategyKind::LinearSvc)
            .with_param("tol", HyperValue::Float(0.01))
            .with_param("C", HyperValue::Float(1.0)),
        StrategyConfig::new(StrategyKind::SgdClassifier),
        StrategyConfig::new(StrategyKind::RandomForest)
            .with_param("n_estimators", HyperValue::Int(10)),
        StrategyConfig::new(StrategyKind::RandomForest)
            .with_param("n_estimators", HyperValue::Int(100)),
        StrategyConfig::new(StrategyKind::ExtraTrees)
            .with_param("n_estimators", HyperValue::Int(100))
            .with_param("random_state", HyperValue::Int(0)),
    ];

    for scaler in [
        ScalerType::MinMax,
        ScalerType::Standard,
        ScalerType::NormalizerL1,
        ScalerType::NormalizerL2,
    ] {
        strategies.push(StrategyConfig::new(StrategyKind::LogisticRegression).with_preprocessor(scaler));
    }

    strategies
}
