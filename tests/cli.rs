mod common;

use std::{path::Path, process::Command};

use burn::{backend::NdArray, config::Config};
use cifar_net::{
    artifact::{self, ArtifactPaths, CheckpointMetadata},
    model::NetConfig,
    training::TrainingConfig,
};
use image::{Rgb, RgbImage};

fn cifar_net(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cifar-net"));
    command.current_dir(dir);
    command
}

fn write_checkpoint(dir: &Path) {
    let device = Default::default();
    let paths = ArtifactPaths::new(dir.join("cifar_net.mpk"), "report.txt", "data");
    let classes = (0..10).map(|i| format!("class_{i}")).collect();
    let metadata = CheckpointMetadata::new(NetConfig::new(), classes, TrainingConfig::new());

    artifact::save(NetConfig::new().init::<NdArray>(&device), &metadata, &paths).unwrap();
}

#[test]
fn no_flags_prints_usage_and_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = cifar_net(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--test <image_path>"));
}

#[test]
fn test_without_checkpoint_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = cifar_net(dir.path())
        .args(["--test", "cat.png"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Trained model not found at 'cifar_net.mpk'. Run --train first."),
        "{stderr}"
    );
}

#[test]
fn test_on_non_image_fails_with_load_error() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path());
    std::fs::write(dir.path().join("notes.txt"), "this is not an image").unwrap();

    let output = cifar_net(dir.path())
        .args(["--test", "notes.txt"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not load image 'notes.txt'"), "{stderr}");
}

#[test]
fn test_prints_predicted_class() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path());
    RgbImage::from_pixel(32, 32, Rgb([90, 10, 200]))
        .save(dir.path().join("sample.png"))
        .unwrap();

    let output = cifar_net(dir.path())
        .args(["--test", "sample.png"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Predicted class: class_"), "{stdout}");
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn train_on_custom_dataset_writes_artifacts_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    common::write_custom_dataset(&dir.path().join("data"), 10, 2);

    let output = cifar_net(dir.path())
        .args(["--train", "--dataset", "custom"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("cifar_net.mpk").is_file());
    assert!(dir.path().join("classification_report.txt").is_file());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Finished Training"));
    assert!(stdout.contains("Accuracy of the network on the 10 test images:"));
    assert_eq!(stdout.matches("Accuracy for class:").count(), 10);
}

#[test]
fn train_prints_running_loss_every_log_interval() {
    let dir = tempfile::tempdir().unwrap();
    // 10 classes of 2 images at batch size 4: five batches per epoch.
    common::write_custom_dataset(&dir.path().join("data"), 10, 2);
    TrainingConfig::new()
        .with_num_epochs(1)
        .with_num_workers(1)
        .with_log_interval(2)
        .save(dir.path().join("training.json"))
        .unwrap();

    let output = cifar_net(dir.path())
        .args(["--train", "--dataset", "custom", "--config", "training.json"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let loss_lines = stdout
        .lines()
        .filter(|line| line.contains("loss:"))
        .collect::<Vec<_>>();

    assert_eq!(loss_lines.len(), 2, "{stdout}");
    for (line, prefix) in loss_lines.iter().zip(["[1,     2] loss: ", "[1,     4] loss: "]) {
        let value = line.strip_prefix(prefix).unwrap_or_else(|| panic!("{line}"));
        assert_eq!(value.split('.').nth(1).map(str::len), Some(3), "{line}");
        assert!(value.parse::<f64>().unwrap() >= 0.0);
    }

    let finished = stdout.find("Finished Training").unwrap();
    assert!(finished > stdout.find("[1,     4] loss:").unwrap());
}
