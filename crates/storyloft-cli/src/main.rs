//! storyloft-cli: command-line client for the Storyloft API
#![deny(clippy::all, clippy::pedantic)]

use clap::Parser;

use storyloft_cli::args::{Cli, Commands};
use storyloft_cli::build_client_from_cli;
use storyloft_cli::error::ClientError;
use storyloft_cli::handlers::{auth, comments, content, moderation, monitoring, points};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    let client = build_client_from_cli(&cli).await?;

    match cli.command {
        Commands::Auth(cmd) => auth::handle(&client, cmd.action).await?,
        Commands::Content(cmd) => content::handle(&client, cmd.action).await?,
        Commands::Like { kind, id } => content::like(&client, kind, id).await?,
        Commands::Comments(cmd) => comments::handle(&client, cmd.action).await?,
        Commands::Moderation(cmd) => moderation::handle(&client, cmd.action).await?,
        Commands::Points(cmd) => points::handle(&client, cmd.action).await?,
        Commands::Monitoring(cmd) => monitoring::handle(&client, cmd.action).await?,
    }

    Ok(())
}
