use std::path::PathBuf;

use anyhow::{Context, Result};
use bonus_vote::{Config, VotingClient};
use log::{info, warn};

const CONFIG_ENV: &str = "BONUS_VOTE_CONFIG";
const INIT_DATA_ENV: &str = "TELEGRAM_INIT_DATA";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("bonus-vote.toml"));
    let config = Config::load(&config_path)?.with_env_overrides();
    let client = VotingClient::new(&config).context("Failed to create voting client")?;

    if !client.restore().await.context("Failed to restore cached session")? {
        let init_data = std::env::var(INIT_DATA_ENV)
            .with_context(|| format!("{} is required when no cached token is valid", INIT_DATA_ENV))?;
        let user = client
            .authenticate(&init_data)
            .await
            .context("Authentication failed")?;
        info!("Signed in as {} ({:?})", user.display_name, user.role);
    }

    match client.refresh().await.context("Failed to load the current session")? {
        Some(session) => info!(
            "Session {} runs {} to {}",
            session.session_id, session.start_date, session.end_date
        ),
        None => warn!("There is no voting session right now"),
    }

    let status = client.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
