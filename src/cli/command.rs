use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

use vvault::process::Method;

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    about      = "Embed and recover file archives inside carrier videos",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat recoverable decode warnings as fatal errors.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Emit PROGRESS:<pct>:<msg> lines for a host process.
    #[arg(long, global = true)]
    pub machine_progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Embed files into a carrier using the selected method.
    Encode(EncodeArgs),

    /// Recover embedded files from a produced video.
    Decode(DecodeArgs),

    /// Probe a file for embedded data without extracting.
    Info(InfoArgs),

    /// AI utilities: password generation and manifest peek.
    Ai(AiArgs),
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Embedding method.
    #[arg(long, value_enum, default_value_t = MethodArg::Append)]
    pub method: MethodArg,

    /// Path for the produced video.
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Password for the archive.
    #[arg(long)]
    pub password: Option<String>,

    /// Skip the AI manifest and store a fixed placeholder (append method).
    #[arg(long)]
    pub no_ai_manifest: bool,

    /// Carrier video followed by the files to embed (datareel: files only).
    #[arg(value_name = "INPUTS", required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Embedding method.
    #[arg(long, value_enum, default_value_t = MethodArg::Append)]
    pub method: MethodArg,

    /// Directory for the recovered files.
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    /// Password for the archive.
    #[arg(long)]
    pub password: Option<String>,

    /// Produced video to decode.
    #[arg(value_name = "VIDEO")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// File to probe.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct AiArgs {
    #[command(subcommand)]
    pub task: AiTask,
}

#[derive(Debug, Subcommand)]
pub enum AiTask {
    /// Generate a 16-character password.
    Password,

    /// Read the manifest of a container video without extracting it.
    Peek {
        #[arg(value_name = "VIDEO")]
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Trailer appended after the carrier's own bytes.
    Append,
    /// Least-significant-bit embedding across frame samples.
    Steganography,
    /// Black/white visual frames carrying one bit per pixel.
    Datareel,
}

impl MethodArg {
    pub fn to_method(self) -> Method {
        match self {
            MethodArg::Append => Method::Append,
            MethodArg::Steganography => Method::Steganography,
            MethodArg::Datareel => Method::DataReel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}
