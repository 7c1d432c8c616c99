//! relay - dispatch client actions and download reports from the command line.

use clap::Parser;

mod app;
mod cli;
mod error;

use app::{download_action, parse_action, App};
use cli::{Cli, Commands};
use error::CliError;
use relay_core::{DispatchOptions, RelayConfig};

/// Log level for the relay crates: debug by default, trace with `-v`.
fn relay_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let relay_level = relay_level(verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive(
                format!("relay={}", relay_level)
                    .parse()
                    .expect("valid directive"),
            )
            .add_directive("reqwest=info".parse().expect("valid directive"))
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<RelayConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::load_from(path)?,
        None => RelayConfig::load()?,
    };
    if let Some(dir) = &cli.output_dir {
        config.download.output_dir = Some(dir.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    let (action, options) = match cli.command {
        Commands::Config(args) => {
            if args.init {
                let path = RelayConfig::init_default()?;
                println!("{}", path.display());
            } else {
                print!("{}", config.to_toml_string()?);
            }
            return Ok(());
        }
        Commands::Dispatch(args) => (
            parse_action(&args.action)?,
            DispatchOptions {
                clear_breadcrumbs: args.clear_breadcrumbs,
                ..Default::default()
            },
        ),
        Commands::Download(args) => (download_action(&args)?, DispatchOptions::default()),
    };

    let app = App::from_config(&config)?;
    let outcome = app.dispatch(action, options).await?;
    let rendered =
        serde_json::to_string_pretty(&outcome).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
