use std::{ffi::OsStr, path::Path};

use tracing_core::{Level, LevelFilter};
use tracing_subscriber::{filter::filter_fn, prelude::*, registry, Layer};

/// Sends log records to stderr at `level`, and at info level to `log_file` when given.
///
/// Does nothing if a global subscriber is already installed. On success, panics are
/// logged before the previous panic hook runs.
pub fn install_logger(level: LevelFilter, log_file: Option<&Path>) {
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level);

    let file = log_file.map(|path| {
        let writer = tracing_appender::rolling::never(
            path.parent().unwrap_or_else(|| Path::new(".")),
            path.file_name().unwrap_or_else(|| OsStr::new("cifar-net.log")),
        );
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(LevelFilter::INFO)
            .with_filter(filter_fn(|m| {
                if let Some(path) = m.module_path() {
                    // The wgpu crate is logging too much, so we skip `info` level.
                    if path.starts_with("wgpu") && *m.level() >= Level::INFO {
                        return false;
                    }
                }
                true
            }))
    });

    if registry().with(stderr).with(file).try_init().is_ok() {
        update_panic_hook();
    }
}

fn update_panic_hook() {
    let hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC => {info}");
        hook(info);
    }));
}
