pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod pose;
pub mod recommend;
pub mod reference;
pub mod replay;
pub mod sequence;

pub use error::{PoseError, Result};
