use std::{sync::Arc, time::Instant};

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    nn::loss::CrossEntropyLossConfig,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::{
    artifact::{self, ArtifactPaths, CheckpointMetadata},
    data::{ClassificationBatch, ClassificationBatcher},
    dataset::{DatasetKind, DatasetSplits},
    error,
    evaluation::{class_indices, evaluate, label_line, Evaluation},
    model::{Net, NetConfig},
};

#[derive(Config)]
pub struct TrainingConfig {
    #[config(
        default = "SgdConfig::new().with_momentum(Some(MomentumConfig::new().with_momentum(0.9).with_dampening(0.0)))"
    )]
    pub optimizer: SgdConfig,
    #[config(default = 2)]
    pub num_epochs: usize,
    #[config(default = 4)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 0.001)]
    pub learning_rate: f64,
    /// Number of batches averaged in each running-loss line.
    #[config(default = 2000)]
    pub log_interval: usize,
}

/// Fits a new network on the training batches with SGD and cross-entropy.
///
/// Prints the average loss of every `log_interval` consecutive batches as
/// `[epoch, batch] loss: value`.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    model_config: &NetConfig,
    dataloader: Arc<dyn DataLoader<B, ClassificationBatch<B>>>,
    device: &B::Device,
) -> Net<B> {
    B::seed(config.seed);

    let mut model = model_config.init::<B>(device);
    let mut optim = config.optimizer.init();
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let log_interval = config.log_interval.max(1);

    for epoch in 1..config.num_epochs + 1 {
        let mut running_loss = 0.0;

        for (iteration, batch) in dataloader.iter().enumerate() {
            let output = model.forward(batch.images);
            let loss = loss_fn.forward(output, batch.targets);
            running_loss += loss.clone().into_scalar().elem::<f64>();

            // Gradients for the current backward pass
            let grads = loss.backward();
            // Gradients linked to each parameter of the model.
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(config.learning_rate, model, grads);

            if (iteration + 1) % log_interval == 0 {
                println!(
                    "[{epoch}, {:5}] loss: {:.3}",
                    iteration + 1,
                    running_loss / log_interval as f64
                );
                running_loss = 0.0;
            }
        }

        log::info!("Epoch {epoch}/{} done", config.num_epochs);
    }

    println!("Finished Training");
    model
}

/// Trains on the selected dataset, checkpoints the network, reloads it and evaluates it on
/// the test split. The classification report is written to `paths.report()`.
pub fn run<B: AutodiffBackend>(
    config: TrainingConfig,
    dataset: DatasetKind,
    paths: &ArtifactPaths,
    device: B::Device,
) -> error::Result<Evaluation> {
    let DatasetSplits {
        train: dataset_train,
        test: dataset_test,
        classes,
    } = dataset.load(paths.data_dir())?;

    // Dataloaders
    let batcher_train = ClassificationBatcher::<B>::new(device.clone());
    let batcher_test = ClassificationBatcher::<B::InnerBackend>::new(device.clone());

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_test = DataLoaderBuilder::new(batcher_test)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_test);

    if let Some(batch) = dataloader_train.iter().next() {
        println!("{}", label_line(&class_indices(batch.targets), &classes));
    }

    let model_config = NetConfig::new().with_num_classes(classes.len());

    let now = Instant::now();
    let model = train(&config, &model_config, dataloader_train, &device);
    let elapsed = now.elapsed().as_secs();
    log::info!("Training completed in {}m{}s", elapsed / 60, elapsed % 60);

    let metadata = CheckpointMetadata::new(model_config, classes, config);
    artifact::save(model, &metadata, paths)?;

    // Evaluate what was written to disk, not the in-memory weights.
    let (model, classes) = artifact::load::<B::InnerBackend>(paths, &device)?;

    if let Some(batch) = dataloader_test.iter().next() {
        let predicted = class_indices(model.classify(batch.images));
        println!("GroundTruth:  {}", label_line(&class_indices(batch.targets), &classes));
        println!("Predicted:  {}", label_line(&predicted, &classes));
    }

    let evaluation = evaluate(&model, dataloader_test.as_ref(), &classes);
    evaluation.print();

    evaluation.report.write(paths.report())?;
    log::info!("Classification report written to {}", paths.report().display());

    Ok(evaluation)
}
