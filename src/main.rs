//! azdo-auth CLI binary entry point.

use azdo_auth::cli::{Cli, Commands};
use azdo_auth::config::AuthConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AZDO_AUTH_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    let config = match AuthConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Login(args) => azdo_auth::cli::auth::handle_login(config, args).await,
        Commands::Refresh(args) => azdo_auth::cli::auth::handle_refresh(config, args).await,
        Commands::Validate(args) => azdo_auth::cli::auth::handle_validate(config, args).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
