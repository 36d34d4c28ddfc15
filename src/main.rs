//! wecom-notify - send WeCom application messages from the command line
//!
//! Loads a credential profile, obtains an access token (cached on disk
//! between runs) and sends a single text message.

mod api;
mod auth;
mod config;
mod models;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::WeComClient;
use crate::auth::{FileTokenStore, TokenProvider};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "wecom-notify")]
#[command(about = "Send a WeCom application text message", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "weixin.toml")]
    config: PathBuf,

    /// Profile name in the configuration file
    #[arg(short, long, default_value = "Dev")]
    profile: String,

    /// Message body
    #[arg(short, long, default_value = "You haven't set main message body")]
    msg: String,

    /// Recipient user ids (comma separated)
    #[arg(short, long, value_delimiter = ',', default_value = "AndrewDi")]
    users: Vec<String>,

    /// Don't read or write the access token cache
    #[arg(long)]
    nocache: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Config::load(&cli.config)?;
    let credentials = config.profile(&cli.profile)?;
    let settings = &config.settings;

    let client = WeComClient::new(&settings.api_base, settings.timeout())?;
    let store = FileTokenStore::new(settings.cache_dir()?);
    let provider =
        TokenProvider::new(store, client.clone()).with_safety_margin(settings.safety_margin());

    let token = provider
        .get_token(&cli.profile, credentials, cli.nocache)
        .await
        .context("Failed to obtain access token")?;

    tracing::info!("Sending message...");
    let resp = api::send_text(&client, &token, credentials.agent_id, &cli.users, &cli.msg).await?;
    println!("{}", resp.status.errmsg);

    Ok(())
}
