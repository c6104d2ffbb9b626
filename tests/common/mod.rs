use std::path::Path;

use image::{Rgb, RgbImage};

/// Writes `data_dir/custom/{train,test}/class_<i>/` with solid images of a class-specific color.
pub fn write_custom_dataset(data_dir: &Path, num_classes: usize, train_per_class: usize) {
    for class in 0..num_classes {
        let color = Rgb([(class * 25) as u8, 255 - (class * 25) as u8, 128]);

        for (split, count) in [("train", train_per_class), ("test", 1)] {
            let dir = data_dir
                .join("custom")
                .join(split)
                .join(format!("class_{class}"));
            std::fs::create_dir_all(&dir).unwrap();

            for i in 0..count {
                RgbImage::from_pixel(32, 32, color)
                    .save(dir.join(format!("{i}.png")))
                    .unwrap();
            }
        }
    }
}
