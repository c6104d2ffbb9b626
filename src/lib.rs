pub mod artifact;
pub mod cli;
pub mod data;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod inference;
pub mod logger;
pub mod model;
pub mod report;
pub mod training;

pub use error::{Error, Result};
