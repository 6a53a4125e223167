//! Model strategies and cross-validation
//!
//! Provides the pluggable classifier interface plus built-in strategies:
//! - Logistic regression and a linear SVM
//! - Stochastic Gradient Descent (SGD)
//! - Random Forests and Extra Trees
//! - Scaler + classifier pipelines

mod config;
mod models;
mod pipeline;
pub mod cross_validation;
pub mod decision_tree;
pub mod extra_trees;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
pub mod sgd;

pub use config::{default_strategies, HyperValue, StrategyConfig, StrategyKind};
pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator, DEFAULT_SEED};
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures, SplitStrategy};
pub use extra_trees::ExtraTrees;
pub use linear_models::{LinearSvc, LogisticRegression};
pub use metrics::{accuracy, roc_auc, ScoringMetric};
pub use models::{strategy_fn, FnFactory, ModelStrategy, StrategyFactory};
pub use pipeline::ScaledStrategy;
pub use random_forest::RandomForest;
pub use sgd::{LearningRateSchedule, SGDClassifier, SGDConfig, SGDLoss};
