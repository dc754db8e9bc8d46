use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

mod directory;
mod source;
mod words;

/// Tools for the executive's word files, source text and directory
/// images.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Which log messages to print.  When not given, the RUST_LOG
    /// environment variable decides (and failing that, "info").
    #[clap(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a text file of words into the packed byte format.
    Pack {
        /// Text file holding whitespace-separated words; a leading 0
        /// means octal.
        input: PathBuf,
        /// File to which packed bytes are written.
        output: PathBuf,
    },
    /// Convert packed bytes into a text file, one octal word per line.
    Unpack { input: PathBuf, output: PathBuf },
    /// Print the symbols, integers and punctuation in a source file.
    Scan { input: PathBuf },
    /// Recover a Master File Directory from an image and describe it.
    ListDirectory {
        image: PathBuf,
        /// The number of tracks on the pack the directory manages.
        #[clap(long, default_value_t = exec::MfdConfiguration::default().pack_tracks)]
        pack_tracks: u64,
    },
}

/// The executive's log levels.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Silent,
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
    All,
}

impl LogLevel {
    fn filter(self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Fatal | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace | LogLevel::All => "trace",
        }
    }
}

#[derive(Debug)]
pub(crate) enum Fail {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    /// Text which could not be read as words or source.
    BadInput {
        path: PathBuf,
        position: usize,
        detail: String,
    },
    Packing(base::PackingError),
    Directory(exec::MfdError),
    Medium(exec::MediumError),
    /// We were not able to set up logging.
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::Io { path, error } => write!(f, "{}: {error}", path.display()),
            Fail::BadInput {
                path,
                position,
                detail,
            } => write!(f, "{}: at position {position}: {detail}", path.display()),
            Fail::Packing(e) => e.fmt(f),
            Fail::Directory(e) => e.fmt(f),
            Fail::Medium(e) => e.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

impl From<base::PackingError> for Fail {
    fn from(e: base::PackingError) -> Fail {
        Fail::Packing(e)
    }
}

impl From<exec::MfdError> for Fail {
    fn from(e: exec::MfdError) -> Fail {
        Fail::Directory(e)
    }
}

impl From<exec::MediumError> for Fail {
    fn from(e: exec::MediumError) -> Fail {
        Fail::Medium(e)
    }
}

pub(crate) fn read_file(path: &PathBuf) -> Result<Vec<u8>, Fail> {
    std::fs::read(path).map_err(|error| Fail::Io {
        path: path.clone(),
        error,
    })
}

pub(crate) fn write_file(path: &PathBuf, contents: &[u8]) -> Result<(), Fail> {
    std::fs::write(path, contents).map_err(|error| Fail::Io {
        path: path.clone(),
        error,
    })
}

fn init_logging(level: Option<LogLevel>) -> Result<(), Fail> {
    // See
    // https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level.filter()),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new("info")),
    };
    let filter_layer = match filter {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(())
}

fn run() -> Result<(), Fail> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    let span = span!(Level::INFO, "khx", command = ?cli.command);
    let _enter = span.enter();
    let mut stdout = std::io::stdout().lock();
    let result = match &cli.command {
        Command::Pack { input, output } => words::pack(input, output),
        Command::Unpack { input, output } => words::unpack(input, output),
        Command::Scan { input } => source::scan(input, &mut stdout),
        Command::ListDirectory { image, pack_tracks } => {
            directory::list(image, *pack_tracks, &mut stdout)
        }
    };
    if let Err(e) = &result {
        event!(Level::ERROR, "command failed: {:?}", e);
    } else {
        event!(Level::DEBUG, "command succeeded");
    }
    result
}

fn main() {
    match run() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}
