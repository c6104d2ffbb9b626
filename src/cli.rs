use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_core::LevelFilter;

use crate::{
    artifact::{ArtifactPaths, DEFAULT_CHECKPOINT, DEFAULT_DATA_DIR, DEFAULT_REPORT},
    dataset::DatasetKind,
};

pub const USAGE: &str = "Usage:
  --train: Train CIFAR10 classifier
  --train --dataset custom: Train custom dataset
  --test <image_path>: Classify image";

/// CIFAR10 Trainer/Tester
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Train the model
    #[arg(long)]
    pub train: bool,

    /// Path to an image to test
    #[arg(long, value_name = "IMAGE_PATH", conflicts_with = "train")]
    pub test: Option<PathBuf>,

    /// CIFAR10 or custom dataset
    #[arg(long, value_enum, default_value_t = DatasetKind::Cifar10)]
    pub dataset: DatasetKind,

    /// Trained weights, written by --train and read by --test. Saved as a burn record, so the
    /// extension is always `.mpk` (`cifar_net.pth` becomes `cifar_net.mpk`)
    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    pub checkpoint: PathBuf,

    /// Where --train writes the classification report
    #[arg(long, default_value = DEFAULT_REPORT)]
    pub report: PathBuf,

    /// Root of the datasets (`cifar10/` is downloaded here, `custom/` is read from here)
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Training configuration file (JSON), defaults are used when absent
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// level of logging details (into stderr)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Also write info-level logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// What the invocation asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Train(DatasetKind),
    Test(PathBuf),
}

impl Cli {
    /// `None` when neither `--train` nor `--test` was given.
    pub fn mode(&self) -> Option<Mode> {
        if self.train {
            Some(Mode::Train(self.dataset))
        } else {
            self.test.clone().map(Mode::Test)
        }
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.checkpoint, &self.report, &self.data_dir)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cifar-net").chain(args.iter().copied()))
    }

    #[test]
    fn no_flags_selects_no_mode() {
        let cli = parse(&[]).unwrap();

        assert_eq!(cli.mode(), None);
        assert_eq!(cli.dataset, DatasetKind::Cifar10);
    }

    #[test]
    fn train_with_custom_dataset() {
        let cli = parse(&["--train", "--dataset", "custom"]).unwrap();

        assert_eq!(cli.mode(), Some(Mode::Train(DatasetKind::Custom)));
    }

    #[test]
    fn test_takes_an_image_path() {
        let cli = parse(&["--test", "cat.png"]).unwrap();

        assert_eq!(cli.mode(), Some(Mode::Test(PathBuf::from("cat.png"))));
    }

    #[test]
    fn train_and_test_are_exclusive() {
        assert!(parse(&["--train", "--test", "cat.png"]).is_err());
    }

    #[test]
    fn unknown_dataset_is_rejected() {
        assert!(parse(&["--train", "--dataset", "imagenet"]).is_err());
    }

    #[test]
    fn checkpoint_is_stored_as_mpk() {
        let paths = parse(&["--test", "cat.png", "--checkpoint", "cifar_net.pth"])
            .unwrap()
            .paths();

        assert_eq!(paths.checkpoint(), Path::new("cifar_net.mpk"));

        let help = parse(&["--help"]).unwrap_err().to_string();
        assert!(help.contains("cifar_net.pth"), "{help}");
    }

    #[test]
    fn default_paths() {
        let paths = parse(&[]).unwrap().paths();

        assert_eq!(paths.checkpoint(), Path::new("cifar_net.mpk"));
        assert_eq!(paths.report(), Path::new("classification_report.txt"));
        assert_eq!(paths.data_dir(), Path::new("data"));
    }
}
