//! CLI entry point for azdo-auth.

pub mod auth;

use clap::{Parser, Subcommand};

/// azdo-auth CLI
#[derive(Parser, Debug)]
#[command(
    name = "azdo-auth",
    version,
    about = "Sign in to Azure DevOps and check Personal Access Tokens"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with a device code
    Login(LoginArgs),
    /// Exchange a refresh token for a new access token
    Refresh(RefreshArgs),
    /// Check which operations a Personal Access Token allows
    Validate(ValidateArgs),
}

/// Arguments for `azdo-auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Organization URL (e.g. https://dev.azure.com/contoso)
    #[arg(long, env = "AZDO_ORG_URL")]
    pub org: String,

    /// Print the obtained tokens to stdout
    #[arg(long)]
    pub print_token: bool,
}

/// Arguments for `azdo-auth refresh`.
#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Organization URL (e.g. https://dev.azure.com/contoso)
    #[arg(long, env = "AZDO_ORG_URL")]
    pub org: String,

    /// Refresh token from a previous sign-in
    #[arg(long, env = "AZDO_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: String,

    /// Print the obtained tokens to stdout
    #[arg(long)]
    pub print_token: bool,
}

/// Arguments for `azdo-auth validate`.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Organization URL (e.g. https://dev.azure.com/contoso)
    #[arg(long, env = "AZDO_ORG_URL")]
    pub org: String,

    /// Personal Access Token to check
    #[arg(long, env = "AZDO_PAT", hide_env_values = true)]
    pub pat: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
