use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the classifier reports to the caller.
///
/// Errors raised inside burn itself (tensor shape mismatches, a failed dataset download,
/// a dataset image that cannot be decoded while batching) are not represented here.
#[derive(Error, Debug)]
pub enum Error {
    /// No trained checkpoint at the configured path.
    #[error("Trained model not found at '{}'. Run --train first.", .path.display())]
    MissingCheckpoint { path: PathBuf },

    /// The image given for classification could not be opened or decoded.
    #[error("could not load image '{}': {source}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A dataset split directory is missing or holds no supported image file.
    #[error("no images found under '{}'", .root.display())]
    NoImages { root: PathBuf },

    /// A test split folder that has no counterpart in the training classes.
    #[error("class `{class}` under '{}' is not a training class", .root.display())]
    UnknownClass { class: String, root: PathBuf },

    /// Dataset directory walk failed.
    #[error("dataset walk failed: {0}")]
    Walk(#[from] globwalk::GlobError),

    /// Checkpoint could not be written or read back.
    #[error("checkpoint record error: {0}")]
    Recorder(String),

    /// Configuration file could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
