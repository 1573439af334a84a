use anyhow::{Error, Result};
use dotenvy::dotenv;
use serenity::client::ClientBuilder;
use serenity::model::gateway::GatewayIntents;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod handler;

use config::Config;
use handler::Handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    info!(
        "Watching channel {} in guild {} for results from {}",
        config.channel_id, config.guild_id, config.announcer_id
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    ClientBuilder::new(config.token.clone(), intents)
        .event_handler(Handler::new(config))
        .await?
        .start()
        .await?;

    Ok(())
}
