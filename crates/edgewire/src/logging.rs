use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

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

/// Crates whose events reach the subscriber; everything else is dropped.
pub const LOG_TARGETS: [&str; 3] = ["edgewire", "edgewire_frame", "edgewire_codec"];

/// Per-crate filter at `level`.
pub fn targets(level: LogLevel) -> Targets {
    Targets::new().with_targets(LOG_TARGETS.map(|target| (target, level.as_filter())))
}

/// Install the stderr subscriber. Codec events are emitted at `debug`/`trace`
/// under the `edgewire_frame` and `edgewire_codec` targets.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry();
    let _ = match format {
        LogFormat::Text => registry.with(layer.with_filter(targets(level))).try_init(),
        LogFormat::Json => registry
            .with(layer.json().with_filter(targets(level)))
            .try_init(),
    };
}
