use aaxion::CancellationToken;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod commands;
mod progress;

use commands::{AaxionCommand, ConvertCommand, GlobalOptions};

#[derive(Parser, Debug)]
#[clap(name = "aaxion", version = env!("AAXION_VERSION"), about)]
struct AaxionArgs {
    #[clap(flatten)]
    global: GlobalOptions,

    #[clap(subcommand)]
    command: Option<AaxionCommand>,

    // Converting is the default when no subcommand is given.
    #[clap(flatten)]
    convert: ConvertCommand,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .try_from_env()
                .unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn handle_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        // wait for the first ctrl-c to stop the running job
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Ctrl-C received, stopping. Press again to force exit.");
        cancel.cancel();

        // wait for the second ctrl-c to force exit
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received again, force exit.");
            std::process::exit(1);
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = AaxionArgs::parse();
    if args.command.is_none() && args.convert.is_empty() {
        AaxionArgs::command().print_help()?;
        return Ok(());
    }

    init_logging(args.global.verbose);

    let cancel = CancellationToken::new();
    handle_ctrl_c(cancel.clone());

    let command = args
        .command
        .unwrap_or(AaxionCommand::Convert(args.convert));
    command.run(&args.global, cancel).await
}
