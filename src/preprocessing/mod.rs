//! Data preparation
//!
//! - Train/holdout splitting on an indicator column
//! - One-hot encoding with an explicit, reusable vocabulary
//! - Feature scaling for model pipelines

mod scaler;
pub mod encoder;
pub mod splitter;

pub use encoder::{encode, OneHotEncoder, Vocabulary};
pub use scaler::{Scaler, ScalerType};
pub use splitter::Splitter;
