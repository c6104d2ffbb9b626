use std::path::Path;

use burn::{data::dataloader::batcher::Batcher, prelude::*};
use image::imageops::FilterType;

use crate::error::{Error, Result};

/// Side of the square images the network consumes.
pub const IMAGE_SIZE: usize = 32;
/// RGB.
pub const CHANNELS: usize = 3;

// Maps [0, 1] onto [-1, 1] for every channel.
const MEAN: [f32; CHANNELS] = [0.5, 0.5, 0.5];
const STD: [f32; CHANNELS] = [0.5, 0.5, 0.5];

/// Decodes an image file into `IMAGE_SIZE x IMAGE_SIZE` RGB bytes in HWC order.
///
/// Images of another size are resized with a triangle filter, any other color type is
/// converted to 8-bit RGB.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let image = image.to_rgb8();
    let side = IMAGE_SIZE as u32;
    let image = if image.dimensions() == (side, side) {
        image
    } else {
        image::imageops::resize(&image, side, side, FilterType::Triangle)
    };

    Ok(image.into_raw())
}

/// One decoded example.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageItem {
    /// `IMAGE_SIZE * IMAGE_SIZE * CHANNELS` bytes in HWC order.
    pub pixels: Vec<u8>,

    /// Class index.
    pub label: usize,
}

/// Normalizer shared by training, evaluation and inference.
#[derive(Clone, Debug)]
pub struct Normalizer<B: Backend> {
    pub mean: Tensor<B, 4>,
    pub std: Tensor<B, 4>,
}

impl<B: Backend> Normalizer<B> {
    /// Creates a new normalizer.
    pub fn new(device: &Device<B>) -> Self {
        let mean = Tensor::<B, 1>::from_floats(MEAN, device).reshape([1, CHANNELS, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(STD, device).reshape([1, CHANNELS, 1, 1]);
        Self { mean, std }
    }

    /// Normalizes a batch of images in the range [0, 1].
    ///
    /// `output = (input - mean) / std`
    pub fn normalize(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        (input - self.mean.clone()) / self.std.clone()
    }

    /// Returns a new normalizer on the given device.
    pub fn to_device(&self, device: &B::Device) -> Self {
        Self {
            mean: self.mean.clone().to_device(device),
            std: self.std.clone().to_device(device),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClassificationBatcher<B: Backend> {
    normalizer: Normalizer<B>,
}

#[derive(Clone, Debug)]
pub struct ClassificationBatch<B: Backend> {
    /// [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self {
            normalizer: Normalizer::<B>::new(&device),
        }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ClassificationBatch<B>> for ClassificationBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ClassificationBatch<B> {
        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    TensorData::from([(item.label as i64).elem::<B::IntElem>()]),
                    device,
                )
            })
            .collect();

        let images = items
            .into_iter()
            .map(|item| TensorData::new(item.pixels, Shape::new([IMAGE_SIZE, IMAGE_SIZE, CHANNELS])))
            .map(|data| {
                Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), device)
                    .swap_dims(2, 1) // [H, C, W]
                    .swap_dims(1, 0) // [C, H, W]
            })
            .map(|tensor| tensor / 255)
            .collect();

        let images = Tensor::stack(images, 0);
        let targets = Tensor::cat(targets, 0);

        let images = self.normalizer.to_device(device).normalize(images);

        ClassificationBatch { images, targets }
    }
}
