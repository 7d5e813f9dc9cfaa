//! SPR CLI - Command line tool for comparing school results.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "spr-cli",
    version,
    about = "School performance comparison toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: spr_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    spr_cmd::run(cli.command).await
}
