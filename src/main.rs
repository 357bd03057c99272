use anyhow::Result;
use clap::Parser;
use gmail_autoresponder::cli::{self, Cli, Commands};
use gmail_autoresponder::error::GmailError;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs (better performance, FIPS support)
    // On Windows, use ring (better compatibility, no NASM/CMake required)
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_autoresponder=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_autoresponder=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match cli.command() {
        Commands::Run => {
            tracing::info!("Gmail auto-responder starting...");
            cli::run_responder(&cli).await?;
        }
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");
            cli::run_auth(&cli, force).await?;
        }
        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");
            cli::init_config(&output, force).await?;
        }
    }

    Ok(())
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(gmail_err) = error.downcast_ref::<GmailError>() {
        match gmail_err {
            GmailError::AuthError(_) => {
                eprintln!("\nHint: Make sure your credentials.json file is valid.");
                eprintln!("      You can download it from Google Cloud Console.");
                eprintln!("      Try running: gmail-autoresponder auth --force");
            }
            GmailError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file and that the dedup label exists.");
                eprintln!("      Run: gmail-autoresponder init-config --force");
            }
            _ => {}
        }
    }
}
