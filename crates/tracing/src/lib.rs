//! Log subscriber setup shared by the statediff binaries.
//!
//! ```no_run
//! use statediff_tracing::{LayerInfo, LogFormat, StatediffTracer, Tracer};
//!
//! let stdout = LayerInfo::new(LogFormat::Terminal, "info".to_string(), String::new(), None);
//! let _guard = StatediffTracer::new().with_stdout(stdout).init()?;
//! # Ok::<(), eyre::Error>(())
//! ```

mod formatter;
mod layers;

pub use formatter::LogFormat;
pub use layers::{FileInfo, FileWorkerGuard, Layers};
pub use tracing_subscriber;

use eyre::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a global subscriber.
pub trait Tracer {
    /// Initializes the subscriber. The returned guard, if any, must be held until the
    /// process exits or buffered file logs are lost.
    fn init(self) -> Result<Option<FileWorkerGuard>>;
}

/// Settings of a single output layer.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    /// Creates a new [`LayerInfo`].
    ///
    /// `default_directive` applies when neither `RUST_LOG` nor `filters` match an event,
    /// `filters` is a comma-separated list of extra directives, and `color` is one of
    /// `always`, `auto` or `never`. `None` disables colors.
    pub fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }
}

impl Default for LayerInfo {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: LevelFilter::INFO.to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// The subscriber used by the `statediff` CLI: a stdout layer and an optional daily
/// rolling file layer.
#[derive(Debug, Clone, Default)]
pub struct StatediffTracer {
    stdout: LayerInfo,
    file: Option<(LayerInfo, FileInfo)>,
}

impl StatediffTracer {
    /// Creates a tracer logging to stdout at `info`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stdout layer settings.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }

    /// Adds a file layer.
    pub fn with_file(mut self, config: LayerInfo, file: FileInfo) -> Self {
        self.file = Some((config, file));
        self
    }
}

impl Tracer for StatediffTracer {
    fn init(self) -> Result<Option<FileWorkerGuard>> {
        let mut layers = Layers::new();

        layers.stdout(
            self.stdout.format,
            self.stdout.default_directive.parse()?,
            &self.stdout.filters,
            self.stdout.color,
        )?;

        let guard = match self.file {
            Some((config, file)) => Some(layers.file(config.format, &config.filters, file)?),
            None => None,
        };

        // a subscriber may already be installed, e.g. by a test harness
        let _ = tracing_subscriber::registry().with(layers.into_inner()).try_init();

        Ok(guard)
    }
}
