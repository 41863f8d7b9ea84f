//! CLI entry point for `mboxdetach`.

use std::path::PathBuf;

use clap::Parser;

use mboxdetach::config;
use mboxdetach::detach::{self, Options};
use mboxdetach::parser::date::TzTable;

#[derive(Parser)]
#[command(
    name = "mboxdetach",
    version,
    about = "Detach large attachments from MBOX archives into sibling folders, \
             leaving a placeholder note in each message"
)]
struct Cli {
    /// MBOX file, or directory containing .mbox files
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Size threshold in bytes; only strictly larger attachments are detached
    #[arg(short, long, value_name = "BYTES")]
    size: Option<u64>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let mut tz = TzTable::default();
    for (abbrev, offset_seconds) in &config.timezones {
        tz.insert(abbrev, *offset_seconds);
    }

    let options = Options {
        threshold: cli.size.unwrap_or(config.detach.size_threshold),
        tz,
    };

    detach::process_path(&cli.path, &options)?;
    Ok(())
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxdetach.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}
