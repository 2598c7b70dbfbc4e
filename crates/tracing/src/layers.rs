use std::path::PathBuf;

use eyre::{Result, WrapErr};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{filter::Directive, EnvFilter, Layer, Registry};

use crate::LogFormat;

/// Flushes the file layer when dropped.
pub type FileWorkerGuard = WorkerGuard;

pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// The layers a subscriber is built from.
#[derive(Default)]
pub struct Layers {
    inner: Vec<BoxedLayer<Registry>>,
}

impl std::fmt::Debug for Layers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layers").field("len", &self.inner.len()).finish()
    }
}

impl Layers {
    /// Creates an empty set of layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the builder, returning the layers.
    pub fn into_inner(self) -> Vec<BoxedLayer<Registry>> {
        self.inner
    }

    /// Adds a stdout layer.
    pub fn stdout(
        &mut self,
        format: LogFormat,
        default_directive: Directive,
        filters: &str,
        color: Option<String>,
    ) -> Result<()> {
        let filter = build_env_filter(Some(default_directive), filters)?;
        self.inner.push(format.apply(filter, color, None));
        Ok(())
    }

    /// Adds a non-blocking file layer and returns the guard flushing it.
    pub fn file(&mut self, format: LogFormat, filters: &str, file: FileInfo) -> Result<FileWorkerGuard> {
        let (writer, guard) = file.create_log_writer()?;
        let filter = build_env_filter(None, filters)?;
        self.inner.push(format.apply(filter, None, Some(writer)));
        Ok(guard)
    }
}

/// Where file logs are written. Files roll over daily.
#[derive(Debug, Clone)]
pub struct FileInfo {
    dir: PathBuf,
    file_name: String,
}

impl FileInfo {
    /// Creates a new [`FileInfo`].
    pub fn new(dir: PathBuf, file_name: impl Into<String>) -> Self {
        Self { dir, file_name: file_name.into() }
    }

    fn create_log_writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.dir)
            .wrap_err_with(|| format!("failed to create log directory {}", self.dir.display()))?;
        let appender = tracing_appender::rolling::daily(&self.dir, &self.file_name);
        Ok(tracing_appender::non_blocking(appender))
    }
}

/// Builds an [`EnvFilter`] from `RUST_LOG` plus the comma-separated `directives`.
fn build_env_filter(default_directive: Option<Directive>, directives: &str) -> Result<EnvFilter> {
    let builder = match default_directive {
        Some(directive) => EnvFilter::builder().with_default_directive(directive),
        None => EnvFilter::builder(),
    };

    directives
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .try_fold(builder.from_env_lossy(), |filter, directive| {
            Ok(filter.add_directive(
                directive.parse::<Directive>().wrap_err_with(|| format!("invalid log directive '{directive}'"))?,
            ))
        })
}
