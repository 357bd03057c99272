//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::auth::{self, AuthorizedSession, Authenticator, InstalledAppFlow};
use crate::client::ProductionMailboxClient;
use crate::composer::AutoReplyComposer;
use crate::config::Config;
use crate::credential_store::FileCredentialStore;
use crate::error::{GmailError, Result};
use crate::responder::Responder;
use crate::scheduler::{PollScheduler, TokioTimer};

#[derive(Parser, Debug)]
#[command(name = "gmail-autoresponder")]
#[command(version)]
#[command(about = "Unattended out-of-office auto-responder for Gmail", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 application credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to the persisted authorization token
    #[arg(long, default_value = "token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Authorize, resolve the dedup label and answer unread mail until stopped
    Run,

    /// Authorize with Gmail and store the token without polling
    Auth {
        /// Discard the stored token and go through consent again
        #[arg(long)]
        force: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Subcommand to execute; a bare invocation runs the responder
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

async fn authorize(cli: &Cli) -> Result<AuthorizedSession> {
    let authenticator = Authenticator::new(
        FileCredentialStore::new(&cli.token_cache),
        InstalledAppFlow::new(&cli.credentials),
    );
    authenticator.authorize().await
}

/// Authorize once, then poll the mailbox forever
pub async fn run_responder(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config).await?;

    let session = authorize(cli).await?;
    let hub = auth::connect_gmail_hub(&session).await?;
    let client = ProductionMailboxClient::with_query(
        hub,
        &config.responder.source_label,
        &config.responder.query,
    );

    let mut scheduler = PollScheduler::from_config(&config.schedule)?;
    let responder =
        Responder::bootstrap(client, AutoReplyComposer::new(), &config.responder).await?;

    responder.run_forever(&mut scheduler, &TokioTimer).await
}

/// Authorize and report which account the token belongs to
pub async fn run_auth(cli: &Cli, force: bool) -> Result<()> {
    if force && cli.token_cache.exists() {
        tokio::fs::remove_file(&cli.token_cache).await?;
        info!("Removed existing token at {:?}", cli.token_cache);
    }

    let session = authorize(cli).await?;
    let hub = auth::connect_gmail_hub(&session).await?;

    let (_, profile) = hub
        .users()
        .get_profile("me")
        .add_scope("https://www.googleapis.com/auth/gmail.readonly")
        .doit()
        .await?;

    println!("Successfully authenticated with Gmail API");
    println!("Token stored at: {:?}", cli.token_cache);
    println!(
        "Connected to account: {}",
        profile.email_address.unwrap_or_default()
    );
    Ok(())
}

/// Write the default configuration to `output`
pub async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(GmailError::ConfigError(format!(
            "Configuration file already exists at {:?}. Use --force to overwrite.",
            output
        )));
    }

    Config::create_example(output).await?;

    println!("Created example configuration file at: {:?}", output);
    println!("\nKey settings to review:");
    println!("  - responder.label_name: existing label applied to answered mail");
    println!("  - schedule.min_delay_secs / max_delay_secs: poll delay range");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bare_invocation_runs_responder() {
        let cli = Cli::try_parse_from(["gmail-autoresponder"]).unwrap();

        assert_eq!(cli.command(), Commands::Run);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.credentials, PathBuf::from("credentials.json"));
        assert_eq!(cli.token_cache, PathBuf::from("token.json"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_auth_force_flag() {
        let cli = Cli::try_parse_from(["gmail-autoresponder", "-v", "auth", "--force"]).unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.command(), Commands::Auth { force: true });
    }

    #[test]
    fn test_custom_paths() {
        let cli = Cli::try_parse_from([
            "gmail-autoresponder",
            "--token-cache",
            "/var/lib/responder/token.json",
            "--credentials",
            "/etc/responder/client.json",
            "run",
        ])
        .unwrap();

        assert_eq!(cli.token_cache, PathBuf::from("/var/lib/responder/token.json"));
        assert_eq!(cli.credentials, PathBuf::from("/etc/responder/client.json"));
        assert_eq!(cli.command(), Commands::Run);
    }

    #[tokio::test]
    async fn test_init_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        init_config(&path, false).await.unwrap();
        let second = init_config(&path, false).await;
        assert!(matches!(second, Err(GmailError::ConfigError(_))));

        init_config(&path, true).await.unwrap();
    }
}
