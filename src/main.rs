mod auth;
mod cli;
mod commands;
mod credentials;
mod error;
mod job;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("forcedata=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Auth {
            username,
            password,
            client_id,
            client_secret,
            url,
        } => commands::auth::run(username, password, client_id, client_secret, url),
        Commands::Login { file, out } => commands::login::run(file.as_deref(), out.as_deref()).await,
        Commands::Load {
            path,
            object,
            operation,
            delim,
            session,
            watch,
        } => {
            commands::load::run(
                path.as_deref(),
                object,
                *operation,
                delim,
                session.as_deref(),
                *watch,
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
