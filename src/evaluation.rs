use burn::{data::dataloader::DataLoader, prelude::*};

use crate::{
    data::ClassificationBatch,
    model::Net,
    report::{per_class_accuracy, ClassificationReport},
};

/// Correct predictions over a split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    /// Integer-truncated percentage, 0 when nothing was evaluated.
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            100 * self.correct / self.total
        }
    }
}

/// Predicted and true class of every evaluated image, in loader order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Predictions {
    pub predicted: Vec<usize>,
    pub targets: Vec<usize>,
}

/// Everything measured on the test split.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub accuracy: Accuracy,
    /// Percentage per class, `None` for a class without test images.
    pub per_class: Vec<Option<f64>>,
    pub report: ClassificationReport,
}

impl Evaluation {
    /// Prints the overall and per-class accuracy lines.
    pub fn print(&self) {
        println!(
            "Accuracy of the network on the {} test images: {} %",
            self.accuracy.total,
            self.accuracy.percent()
        );

        for (scores, accuracy) in self.report.classes.iter().zip(&self.per_class) {
            match accuracy {
                Some(accuracy) => {
                    println!("Accuracy for class: {:5} is {accuracy:.1} %", scores.name)
                }
                None => println!("Accuracy for class: {:5} is n/a (no test images)", scores.name),
            }
        }
    }
}

/// Counts correct predictions over one pass of the loader.
///
/// The model is expected on a backend without autodiff, so no gradient is tracked.
pub fn overall_accuracy<B: Backend>(
    model: &Net<B>,
    dataloader: &dyn DataLoader<B, ClassificationBatch<B>>,
) -> Accuracy {
    let mut accuracy = Accuracy::default();

    for batch in dataloader.iter() {
        let [batch_size] = batch.targets.dims();
        let predicted = model.classify(batch.images);
        let correct = predicted.equal(batch.targets).int().sum().into_scalar();

        accuracy.correct += correct.elem::<i64>() as usize;
        accuracy.total += batch_size;
    }

    accuracy
}

/// Collects the predicted and true class of every image over one pass of the loader.
pub fn collect_predictions<B: Backend>(
    model: &Net<B>,
    dataloader: &dyn DataLoader<B, ClassificationBatch<B>>,
) -> Predictions {
    let mut predictions = Predictions::default();

    for batch in dataloader.iter() {
        let predicted = model.classify(batch.images);

        predictions.predicted.extend(class_indices(predicted));
        predictions.targets.extend(class_indices(batch.targets));
    }

    predictions
}

/// Runs the accuracy pass, then the per-class pass that feeds the report.
pub fn evaluate<B: Backend>(
    model: &Net<B>,
    dataloader: &dyn DataLoader<B, ClassificationBatch<B>>,
    classes: &[String],
) -> Evaluation {
    let accuracy = overall_accuracy(model, dataloader);
    let predictions = collect_predictions(model, dataloader);

    log::debug!(
        "Evaluated {} images, {} correct",
        predictions.targets.len(),
        accuracy.correct
    );

    Evaluation {
        accuracy,
        per_class: per_class_accuracy(&predictions.predicted, &predictions.targets, classes.len()),
        report: ClassificationReport::new(&predictions.predicted, &predictions.targets, classes),
    }
}

pub(crate) fn class_indices<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<usize> {
    tensor
        .into_data()
        .iter::<i64>()
        .map(|class| class as usize)
        .collect()
}

/// Class names padded to five characters and joined with spaces.
pub(crate) fn label_line(indices: &[usize], classes: &[String]) -> String {
    indices
        .iter()
        .map(|&index| match classes.get(index) {
            Some(name) => format!("{name:5}"),
            None => format!("{index:5}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
