use std::path::{Path, PathBuf};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
};

use crate::{
    dataset::CIFAR10_CLASSES,
    error::{self, Error},
    model::{Net, NetConfig},
    training::TrainingConfig,
};

pub const DEFAULT_CHECKPOINT: &str = "cifar_net.mpk";
pub const DEFAULT_REPORT: &str = "classification_report.txt";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Extension the checkpoint recorder writes.
const CHECKPOINT_EXTENSION: &str = "mpk";

/// Files read and written by a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    checkpoint: PathBuf,
    report: PathBuf,
    data_dir: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT, DEFAULT_REPORT, DEFAULT_DATA_DIR)
    }
}

impl ArtifactPaths {
    /// The checkpoint extension is forced to the one the recorder uses.
    pub fn new(
        checkpoint: impl Into<PathBuf>,
        report: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            checkpoint: checkpoint.into().with_extension(CHECKPOINT_EXTENSION),
            report: report.into(),
            data_dir: data_dir.into(),
        }
    }

    pub fn checkpoint(&self) -> &Path {
        &self.checkpoint
    }

    /// Network shape and class names, next to the checkpoint.
    pub fn metadata(&self) -> PathBuf {
        self.checkpoint.with_extension("json")
    }

    pub fn report(&self) -> &Path {
        &self.report
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// What is needed besides the weights to rebuild and use a trained network.
#[derive(Config)]
pub struct CheckpointMetadata {
    pub model: NetConfig,
    pub classes: Vec<String>,
    pub training: TrainingConfig,
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Writes the weights and their metadata, replacing any previous checkpoint.
pub fn save<B: Backend>(
    model: Net<B>,
    metadata: &CheckpointMetadata,
    paths: &ArtifactPaths,
) -> error::Result<()> {
    if let Some(parent) = paths.checkpoint().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    model
        .save_file(paths.checkpoint(), &recorder())
        .map_err(|err| Error::Recorder(format!("{err:?}")))?;
    metadata.save(paths.metadata())?;

    log::info!("Checkpoint saved to {}", paths.checkpoint().display());
    Ok(())
}

/// Rebuilds a trained network from its checkpoint.
///
/// A checkpoint without metadata is assumed to be a 10-class CIFAR-10 network.
pub fn load<B: Backend>(
    paths: &ArtifactPaths,
    device: &B::Device,
) -> error::Result<(Net<B>, Vec<String>)> {
    let checkpoint = paths.checkpoint();
    if !checkpoint.exists() {
        return Err(Error::MissingCheckpoint {
            path: checkpoint.to_path_buf(),
        });
    }

    let (config, classes) = if paths.metadata().exists() {
        let metadata = CheckpointMetadata::load(paths.metadata())
            .map_err(|err| Error::Config(format!("{err:?}")))?;
        (metadata.model, metadata.classes)
    } else {
        log::warn!(
            "No metadata at {}, assuming CIFAR-10 classes",
            paths.metadata().display()
        );
        let classes = CIFAR10_CLASSES.iter().map(|c| c.to_string()).collect();
        (NetConfig::new(), classes)
    };

    let model = config
        .init::<B>(device)
        .load_file(checkpoint, &recorder(), device)
        .map_err(|err| Error::Recorder(format!("{err:?}")))?;

    Ok((model, classes))
}
