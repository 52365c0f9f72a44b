use std::{
    io::{self, IsTerminal, Read, Write},
    path::PathBuf,
    str::FromStr,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tool_call_extractor::{
    ExtractorConfig, MultiFormatExtractor, StreamState,
    observability::{LoggingConfig, init_logging},
};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "tool-call-extractor")]
#[command(about = "Extract tool calls and narration from LLM output")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Extractor config (.yaml/.yml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    #[arg(long, global = true, action = ArgAction::SetTrue)]
    log_json: bool,

    /// Also write daily-rotated logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Disable ANSI colors on stderr logs
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract from a complete text and print the result as JSON
    Extract {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },
    /// Replay the text as a stream of deltas and print each surfaced delta
    Stream {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,

        /// Characters per delta
        #[arg(long, default_value_t = 4)]
        chunk_size: usize,
    },
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ExtractorConfig> {
    match path {
        Some(path) => ExtractorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ExtractorConfig::default()),
    }
}

fn run_extract(extractor: &MultiFormatExtractor, text: &str, out: &mut impl Write) -> Result<()> {
    let result = extractor.extract(text);
    info!(calls = result.calls.len(), format = ?result.format, "Extraction finished");
    serde_json::to_writer_pretty(&mut *out, &result)?;
    writeln!(out)?;
    Ok(())
}

fn run_stream(
    extractor: &MultiFormatExtractor,
    text: &str,
    chunk_size: usize,
    out: &mut impl Write,
) -> Result<()> {
    let chunk_size = chunk_size.max(1);
    let mut state = StreamState::new();
    let mut current = String::with_capacity(text.len());

    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(chunk_size) {
        let delta: String = chunk.iter().collect();
        let previous = current.clone();
        current.push_str(&delta);

        if let Some(message) = extractor.extract_delta(&mut state, &previous, &current, &delta) {
            serde_json::to_writer(&mut *out, &message)?;
            writeln!(out)?;
        }
    }

    if let Some(message) = extractor.finish_stream(&mut state, &current) {
        serde_json::to_writer(&mut *out, &message)?;
        writeln!(out)?;
    }

    info!(calls = state.finish().len(), "Stream finished");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = Level::from_str(&cli.log_level).unwrap_or(Level::WARN);
    let _log_guard = init_logging(LoggingConfig {
        level,
        json_format: cli.log_json,
        log_dir: cli.log_dir.clone(),
        colorize: !cli.no_color && io::stderr().is_terminal(),
    });

    let config = load_config(cli.config.as_ref())?;
    let extractor = MultiFormatExtractor::from_config(&config).context("Invalid extractor config")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::Extract { file } => {
            let text = read_input(file.as_ref())?;
            run_extract(&extractor, &text, &mut out)
        }
        Command::Stream { file, chunk_size } => {
            let text = read_input(file.as_ref())?;
            run_stream(&extractor, &text, *chunk_size, &mut out)
        }
    }
}
