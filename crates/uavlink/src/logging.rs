use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer, Registry};

use crate::exit::{io_error, CliResult};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Fault and info log paths for a process started at `started`.
pub fn log_file_paths(dir: &Path, started: DateTime<Local>) -> (PathBuf, PathBuf) {
    let stamp = started.format("%Y-%m-%d-%H-%M-%S");
    (
        dir.join(format!("faults-{stamp}.log")),
        dir.join(format!("infos-{stamp}.log")),
    )
}

/// Install the global subscriber: stderr at `level`, plus fault (WARN+)
/// and info (INFO+) files under `log_dir` when given.
pub fn init_logging(format: LogFormat, level: LogLevel, log_dir: Option<&Path>) -> CliResult<()> {
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);
    let mut layers: Vec<BoxedLayer> = vec![match format {
        LogFormat::Text => stderr.with_filter(level.as_filter()).boxed(),
        LogFormat::Json => stderr.json().with_filter(level.as_filter()).boxed(),
    }];

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)
            .map_err(|err| io_error(&format!("create log dir {}", dir.display()), err))?;
        let (faults, infos) = log_file_paths(dir, Local::now());
        layers.push(file_layer(&faults, LevelFilter::WARN)?);
        layers.push(file_layer(&infos, LevelFilter::INFO)?);
    }

    let _ = tracing_subscriber::registry().with(layers).try_init();
    Ok(())
}

fn file_layer(path: &Path, filter: LevelFilter) -> CliResult<BoxedLayer> {
    let file = open_append(path)?;
    Ok(fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter)
        .boxed())
}

fn open_append(path: &Path) -> CliResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| io_error(&format!("open log file {}", path.display()), err))
}
