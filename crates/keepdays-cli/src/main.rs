//! Keepdays CLI - keep-days retention tagging for backup archives.

use clap::Parser;
use keepdays_cli::commands;
use keepdays_cli::{Cli, Command, Config, Formatter};
use keepdays_janitor::LogSink;
use keepdays_store::SqliteBucket;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `debug` overrides `RUST_LOG`, which otherwise defaults to `info`.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run() -> keepdays_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Test events raise the log level, so read the payload first
    let payload = match &cli.command {
        Command::Handle(args) => Some(commands::read_event(args)?),
        _ => None,
    };
    let debug = cli.verbose || payload.as_ref().is_some_and(commands::is_test_event);
    init_tracing(debug);

    let config = Config::load(cli.config.as_deref())?;

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);
    let janitor = &config.janitor;

    match cli.command {
        Command::Parse(args) => commands::execute_parse(args, &formatter)?,
        Command::Key(args) => commands::execute_key(args)?,
        Command::Config => print!("{}", config.to_toml_string()?),
        Command::Watch(args) => {
            let store = SqliteBucket::new(&cli.db)?;
            commands::execute_watch(args, janitor, store, LogSink, &formatter).await?;
        }
        Command::Put(args) => {
            let mut store = SqliteBucket::new(&cli.db)?;
            commands::execute_put(args, janitor, &mut store, &formatter)?;
        }
        Command::Classify(args) => {
            let mut store = SqliteBucket::new(&cli.db)?;
            commands::execute_classify(args, janitor, &mut store, &formatter)?;
        }
        Command::Tag(args) => {
            let mut store = SqliteBucket::new(&cli.db)?;
            commands::execute_tag(args, janitor, &mut store, &mut LogSink, &formatter)?;
        }
        Command::Reconcile(args) => {
            let mut store = SqliteBucket::new(&cli.db)?;
            commands::execute_reconcile(args, janitor, &mut store, &mut LogSink, &formatter)?;
        }
        Command::Handle(_) => {
            let mut store = SqliteBucket::new(&cli.db)?;
            let payload = payload.unwrap_or_default();
            commands::execute_handle(&payload, janitor, &mut store, &mut LogSink, &formatter)?;
        }
    }

    Ok(())
}
