//! Classification metrics over a set of predictions.

use std::{fmt, path::Path};

/// Heading of the widest summary row, the minimum width of the name column.
const WEIGHTED_AVG: &str = "weighted avg";

/// Confusion matrix for multi-class classification.
///
/// Element [i][j] is the number of samples with true class i predicted as j.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; num_classes]; num_classes],
        }
    }

    /// Builds the matrix from parallel prediction and target slices.
    ///
    /// Pairs referring to a class outside `0..num_classes` are ignored.
    pub fn from_predictions(predicted: &[usize], targets: &[usize], num_classes: usize) -> Self {
        assert_eq!(
            predicted.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );

        let mut matrix = Self::new(num_classes);
        for (&pred, &target) in predicted.iter().zip(targets) {
            matrix.record(target, pred);
        }
        matrix
    }

    pub fn record(&mut self, target: usize, predicted: usize) {
        if let Some(count) = self
            .matrix
            .get_mut(target)
            .and_then(|row| row.get_mut(predicted))
        {
            *count += 1;
        }
    }

    pub fn num_classes(&self) -> usize {
        self.matrix.len()
    }

    pub fn get(&self, target: usize, predicted: usize) -> usize {
        self.matrix[target][predicted]
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.matrix[class][class]
    }

    /// Predicted as `class` but belonging to another one.
    pub fn false_positives(&self, class: usize) -> usize {
        (0..self.num_classes())
            .filter(|&i| i != class)
            .map(|i| self.matrix[i][class])
            .sum()
    }

    /// Belonging to `class` but predicted as another one.
    pub fn false_negatives(&self, class: usize) -> usize {
        (0..self.num_classes())
            .filter(|&j| j != class)
            .map(|j| self.matrix[class][j])
            .sum()
    }

    /// Number of samples whose true class is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.num_classes()).map(|i| self.matrix[i][i]).sum()
    }

    /// Fraction of correct predictions, 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }
}

/// Percentage of correctly classified samples for every class.
///
/// A class without any sample has no accuracy and yields `None`.
pub fn per_class_accuracy(
    predicted: &[usize],
    targets: &[usize],
    num_classes: usize,
) -> Vec<Option<f64>> {
    let matrix = ConfusionMatrix::from_predictions(predicted, targets, num_classes);

    (0..num_classes)
        .map(|class| match matrix.support(class) {
            0 => None,
            total => Some(100.0 * matrix.true_positives(class) as f64 / total as f64),
        })
        .collect()
}

/// Scores of a single class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassScores {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Precision, recall and F1 per class with their averages.
///
/// Undefined ratios (no prediction or no sample for a class) count as 0.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub total: usize,
}

impl ClassificationReport {
    pub fn new<S: AsRef<str>>(predicted: &[usize], targets: &[usize], class_names: &[S]) -> Self {
        let matrix = ConfusionMatrix::from_predictions(predicted, targets, class_names.len());

        let classes = class_names
            .iter()
            .enumerate()
            .map(|(class, name)| {
                let tp = matrix.true_positives(class);
                let precision = ratio(tp, tp + matrix.false_positives(class));
                let recall = ratio(tp, tp + matrix.false_negatives(class));
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassScores {
                    name: name.as_ref().to_string(),
                    precision,
                    recall,
                    f1,
                    support: matrix.support(class),
                }
            })
            .collect();

        Self {
            classes,
            accuracy: matrix.accuracy(),
            total: matrix.total(),
        }
    }

    /// Unweighted mean of (precision, recall, f1) over classes.
    pub fn macro_avg(&self) -> (f64, f64, f64) {
        let n = self.classes.len().max(1) as f64;
        let (p, r, f) = self.sum_scores(|_| 1.0);
        (p / n, r / n, f / n)
    }

    /// Mean of (precision, recall, f1) weighted by class support.
    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        if self.total == 0 {
            return (0.0, 0.0, 0.0);
        }
        let total = self.total as f64;
        let (p, r, f) = self.sum_scores(|scores| scores.support as f64);
        (p / total, r / total, f / total)
    }

    fn sum_scores(&self, weight: impl Fn(&ClassScores) -> f64) -> (f64, f64, f64) {
        self.classes.iter().fold((0.0, 0.0, 0.0), |(p, r, f), scores| {
            let w = weight(scores);
            (
                p + w * scores.precision,
                r + w * scores.recall,
                f + w * scores.f1,
            )
        })
    }

    /// Writes the text rendering to `path`, replacing any previous report.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|scores| scores.name.len())
            .max()
            .unwrap_or(0)
            .max(WEIGHTED_AVG.len());

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for scores in &self.classes {
            write_row(
                f,
                width,
                &scores.name,
                (scores.precision, scores.recall, scores.f1),
                scores.support,
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        write_row(f, width, "macro avg", self.macro_avg(), self.total)?;
        write_row(f, width, WEIGHTED_AVG, self.weighted_avg(), self.total)
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    width: usize,
    name: &str,
    (precision, recall, f1): (f64, f64, f64),
    support: usize,
) -> fmt::Result {
    writeln!(
        f,
        "{name:>width$}  {precision:>9.2} {recall:>9.2} {f1:>9.2} {support:>9}"
    )
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
