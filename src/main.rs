use std::process::ExitCode;

use burn::{backend::Autodiff, config::Config};
use cifar_net::{
    cli::{Cli, Mode, USAGE},
    inference, logger,
    training::{self, TrainingConfig},
    Error, Result,
};
use clap::Parser;

#[cfg(feature = "wgpu")]
type Backend = burn::backend::Wgpu;

#[cfg(all(feature = "tch-cpu", not(feature = "wgpu")))]
type Backend = burn::backend::LibTorch;

#[cfg(not(any(feature = "wgpu", feature = "tch-cpu")))]
type Backend = burn::backend::NdArray;

fn run(cli: &Cli, mode: Mode) -> Result<()> {
    let device = Default::default();
    let paths = cli.paths();

    match mode {
        Mode::Train(dataset) => {
            let config = match &cli.config {
                Some(path) => TrainingConfig::load(path)
                    .map_err(|err| Error::Config(format!("{err:?}")))?,
                None => TrainingConfig::new(),
            };
            training::run::<Autodiff<Backend>>(config, dataset, &paths, device)?;
        }
        Mode::Test(image) => {
            let class = inference::infer::<Backend>(&paths, &image, &device)?;
            println!("Predicted class: {class}");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::install_logger(cli.log_level.into(), cli.log_file.as_deref());

    let Some(mode) = cli.mode() else {
        println!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(&cli, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("{err:?}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
