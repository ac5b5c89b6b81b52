use std::io::{self, Read};
use std::path::{Path, PathBuf};

use annotator::config::{ConfigError, EditorConfig};
use annotator::script::{Script, ScriptError};
use clap::Parser;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "annotator", about = "Replay an annotation gesture script and print the resulting document")]
struct Cli {
    /// Script file, or `-` for stdin.
    script: PathBuf,

    /// Print the report on one line.
    #[arg(long)]
    compact: bool,

    /// Override ANNOTATOR_HISTORY_SIZE.
    #[arg(long, env = "ANNOTATOR_HISTORY_SIZE")]
    history_size: Option<usize>,
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();

    let mut config = EditorConfig::from_env();
    if let Some(size) = cli.history_size {
        config.history_size = size;
    }
    config.validate()?;

    let source = read_script(&cli.script)?;
    let script = Script::parse(&source)?;
    tracing::info!(path = %cli.script.display(), events = script.events.len(), "replaying script");
    let report = script.run(config)?;

    let rendered = if cli.compact { serde_json::to_string(&report)? } else { serde_json::to_string_pretty(&report)? };
    println!("{rendered}");
    Ok(())
}

fn read_script(path: &Path) -> Result<String, CliError> {
    let display = path.display().to_string();
    let result = if display == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(path)
    };
    result.map_err(|source| CliError::Read { path: display, source })
}
