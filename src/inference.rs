use std::path::Path;

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::{
    artifact::{self, ArtifactPaths},
    data::{load_rgb, ClassificationBatcher, ImageItem},
    error::Result,
    model::Net,
};

/// Class name of one decoded image, through the same transform used for training.
pub fn predict<B: Backend>(
    model: &Net<B>,
    classes: &[String],
    pixels: Vec<u8>,
    device: &B::Device,
) -> String {
    let batcher = ClassificationBatcher::<B>::new(device.clone());
    let batch = batcher.batch(vec![ImageItem { pixels, label: 0 }], device);

    let predicted = model.classify(batch.images).into_scalar().elem::<i64>() as usize;

    classes
        .get(predicted)
        .cloned()
        .unwrap_or_else(|| predicted.to_string())
}

/// Loads the trained network and classifies the image at `image_path`.
pub fn infer<B: Backend>(
    paths: &ArtifactPaths,
    image_path: &Path,
    device: &B::Device,
) -> Result<String> {
    let (model, classes) = artifact::load::<B>(paths, device)?;
    let pixels = load_rgb(image_path)?;

    let class = predict(&model, &classes, pixels, device);
    log::debug!("{} classified as {class}", image_path.display());

    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifact::CheckpointMetadata,
        data::{CHANNELS, IMAGE_SIZE},
        error::Error,
        model::NetConfig,
        training::TrainingConfig,
    };
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    #[test]
    fn predict_returns_name_of_argmax() {
        let device: Device<TestBackend> = Default::default();
        let model = NetConfig::new().with_num_classes(3).init::<TestBackend>(&device);
        let classes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let pixels = vec![128; IMAGE_SIZE * IMAGE_SIZE * CHANNELS];

        let batch = ClassificationBatcher::<TestBackend>::new(device.clone()).batch(
            vec![ImageItem {
                pixels: pixels.clone(),
                label: 0,
            }],
            &device,
        );
        let expected = model.classify(batch.images).into_scalar().elem::<i64>() as usize;

        assert_eq!(predict(&model, &classes, pixels, &device), classes[expected]);
    }

    #[test]
    fn infer_classifies_an_image_file() {
        let device: Device<TestBackend> = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path().join("net.mpk"), "report.txt", "data");
        let classes = vec!["dark".to_string(), "light".to_string()];
        let config = NetConfig::new().with_num_classes(2);
        let metadata = CheckpointMetadata::new(config.clone(), classes.clone(), TrainingConfig::new());
        artifact::save(config.init::<TestBackend>(&device), &metadata, &paths).unwrap();
        let image = dir.path().join("sample.png");
        RgbImage::from_pixel(40, 40, Rgb([200, 200, 200]))
            .save(&image)
            .unwrap();

        let class = infer::<TestBackend>(&paths, &image, &device).unwrap();

        assert!(classes.contains(&class));
    }

    #[test]
    fn infer_checks_checkpoint_before_image() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path().join("missing.mpk"), "report.txt", "data");

        let result = infer::<TestBackend>(&paths, &dir.path().join("none.png"), &Default::default());

        assert!(matches!(result, Err(Error::MissingCheckpoint { .. })));
    }
}
