use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use statediff_config::ConfigArgs;
use statediff_replay::ReplayArgs;
use statediff_tracing::{
    tracing_subscriber::filter::Directive, FileInfo, FileWorkerGuard, LayerInfo, LogFormat,
    StatediffTracer, Tracer,
};
use std::{
    fmt::{self, Display},
    path::PathBuf,
    str::FromStr,
};
use tracing::{level_filters::LevelFilter, Level};

#[derive(Debug, Args)]
#[clap(next_help_heading = "LOGGING")]
pub(crate) struct LogArgs {
    /// The format to use for logs written to stdout.
    #[clap(long = "log.stdout.format", value_name = "FORMAT", global = true, default_value_t = LogFormat::Terminal)]
    pub(crate) log_stdout_format: LogFormat,

    /// The filter to use for logs written to stdout.
    #[clap(long = "log.stdout.filter", value_name = "FILTER", global = true, default_value = "")]
    pub(crate) log_stdout_filter: String,

    /// The directory to write log files to. File logging is off unless set.
    #[clap(long = "log.file.directory", value_name = "PATH", global = true)]
    pub(crate) log_file_directory: Option<PathBuf>,

    /// The format to use for logs written to the log file.
    #[clap(long = "log.file.format", value_name = "FORMAT", global = true, default_value_t = LogFormat::Terminal)]
    pub(crate) log_file_format: LogFormat,

    /// The filter to use for logs written to the log file.
    #[clap(long = "log.file.filter", value_name = "FILTER", global = true, default_value = "debug")]
    pub(crate) log_file_filter: String,

    /// Sets whether or not the formatter emits ANSI terminal escape codes for colors and other
    /// text formatting.
    #[clap(
        long,
        value_name = "COLOR",
        global = true,
        default_value_t = ColorMode::Always
    )]
    pub(crate) color: ColorMode,

    /// The verbosity settings for the tracer.
    #[clap(flatten)]
    pub(crate) verbosity: Verbosity,
}

impl LogArgs {
    /// Creates a [LayerInfo] instance.
    fn layer(&self, format: LogFormat, filter: String, use_color: bool) -> LayerInfo {
        LayerInfo::new(
            format,
            self.verbosity.directive().to_string(),
            filter,
            if use_color { Some(self.color.to_string()) } else { None },
        )
    }

    /// Initializes tracing with the configured options from cli args.
    pub(crate) fn init_tracing(&self) -> eyre::Result<Option<FileWorkerGuard>> {
        let mut tracer = StatediffTracer::new();

        let stdout = self.layer(self.log_stdout_format, self.log_stdout_filter.clone(), true);
        tracer = tracer.with_stdout(stdout);

        if let Some(directory) = &self.log_file_directory {
            let file = self.layer(self.log_file_format, self.log_file_filter.clone(), false);
            tracer = tracer.with_file(file, FileInfo::new(directory.clone(), "statediff.log"));
        }

        let guard = tracer.init()?;
        Ok(guard)
    }
}

/// The color mode for the cli.
#[derive(Debug, Copy, Clone, ValueEnum, Eq, PartialEq)]
pub(crate) enum ColorMode {
    /// Colors on
    Always,
    /// Colors on when stdout is a terminal
    Auto,
    /// Colors off
    Never,
}

impl Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Always => write!(f, "always"),
            ColorMode::Auto => write!(f, "auto"),
            ColorMode::Never => write!(f, "never"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(ColorMode::Always),
            "auto" => Ok(ColorMode::Auto),
            "never" => Ok(ColorMode::Never),
            _ => Err(format!("Invalid color mode: {}", s)),
        }
    }
}

#[derive(Debug, Copy, Clone, Args)]
#[clap(next_help_heading = "DISPLAY")]
pub(crate) struct Verbosity {
    /// Set the minimum log level.
    ///
    /// (none) Errors
    /// -v     Warnings & Errors
    /// -vv    Info
    /// -vvv   Debug
    /// -vvvv  Traces (warning: very verbose!)
    #[clap(short, long, action = ArgAction::Count, global = true, verbatim_doc_comment, help_heading = "DISPLAY")]
    verbosity: u8,

    /// Silence all log output.
    #[clap(long, alias = "silent", short = 'q', global = true, help_heading = "DISPLAY")]
    quiet: bool,
}

impl Verbosity {
    /// Get the corresponding [Directive] for the given verbosity, or none if the verbosity
    /// corresponds to silent.
    pub(crate) fn directive(&self) -> Directive {
        if self.quiet {
            LevelFilter::OFF.into()
        } else {
            let level = match self.verbosity {
                0 => Level::ERROR,
                1 => Level::WARN,
                2 => Level::INFO,
                3 => Level::DEBUG,
                _ => Level::TRACE,
            };

            level.into()
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "statediff", author = "statediff contributors", version)]
pub(crate) struct Arguments {
    #[clap(subcommand)]
    pub(crate) sub: Subcommands,

    #[clap(flatten)]
    pub(crate) logs: LogArgs,
}

#[derive(Debug, Subcommand)]
#[clap(about = "statediff: minimal per-account state diffs of traced EVM executions.")]
pub(crate) enum Subcommands {
    #[clap(name = "config", about = "Display or edit your statediff CLI configuration.")]
    Config(ConfigArgs),
    #[clap(
        name = "replay",
        alias = "call-many",
        about = "Trace recorded transactions and print their state diffs."
    )]
    Replay(ReplayArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Arguments::command().debug_assert();
    }

    #[test]
    fn verbosity_levels() {
        let args = Arguments::parse_from(["statediff", "config"]);
        assert_eq!(args.logs.verbosity.directive().to_string(), "error");

        let args = Arguments::parse_from(["statediff", "-v", "config"]);
        assert_eq!(args.logs.verbosity.directive().to_string(), "warn");

        let args = Arguments::parse_from(["statediff", "-vv", "replay", "transcript.json"]);
        assert_eq!(args.logs.verbosity.directive().to_string(), "info");

        let args = Arguments::parse_from(["statediff", "-vvv", "replay", "transcript.json"]);
        assert_eq!(args.logs.verbosity.directive().to_string(), "debug");

        let args = Arguments::parse_from(["statediff", "replay", "transcript.json", "-vvvvv"]);
        assert_eq!(args.logs.verbosity.directive().to_string(), "trace");

        let args = Arguments::parse_from(["statediff", "replay", "transcript.json", "--quiet"]);
        assert_eq!(args.logs.verbosity.directive().to_string(), "off");
    }

    #[test]
    fn parses_log_file_options() {
        let args = Arguments::parse_from([
            "statediff",
            "replay",
            "transcript.json",
            "--log.file.directory",
            "/tmp/statediff",
            "--log.stdout.format",
            "json",
        ]);
        assert_eq!(args.logs.log_file_directory, Some(PathBuf::from("/tmp/statediff")));
        assert_eq!(args.logs.log_stdout_format, LogFormat::Json);
        assert!(matches!(args.sub, Subcommands::Replay(_)));
    }
}
