use std::fmt::{self, Display};

use clap::ValueEnum;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::layers::BoxedLayer;

/// How log records are rendered.
#[derive(Debug, Copy, Clone, ValueEnum, Eq, PartialEq)]
pub enum LogFormat {
    /// One JSON object per record
    Json,
    /// `key=value` pairs
    LogFmt,
    /// Human readable, optionally colored
    Terminal,
}

impl LogFormat {
    /// Builds a layer rendering records in this format, filtered by `filter`. Records go to
    /// `file_writer` when given and to stdout otherwise. Colors are only ever used on stdout.
    pub fn apply(
        &self,
        filter: EnvFilter,
        color: Option<String>,
        file_writer: Option<NonBlocking>,
    ) -> BoxedLayer<Registry> {
        let ansi = match (&color, &file_writer) {
            (Some(color), None) => std::env::var("RUST_LOG_STYLE")
                .map(|style| style != "never")
                .unwrap_or(color != "never"),
            _ => false,
        };
        let target = std::env::var("RUST_LOG_TARGET").map(|val| val != "0").unwrap_or(true);

        match self {
            LogFormat::Json => {
                let layer =
                    tracing_subscriber::fmt::layer().json().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
            LogFormat::LogFmt => match file_writer {
                Some(writer) => {
                    tracing_logfmt::builder().layer().with_writer(writer).with_filter(filter).boxed()
                }
                None => tracing_logfmt::layer().with_filter(filter).boxed(),
            },
            LogFormat::Terminal => {
                let layer = tracing_subscriber::fmt::layer().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::LogFmt => write!(f, "log-fmt"),
            LogFormat::Terminal => write!(f, "terminal"),
        }
    }
}
