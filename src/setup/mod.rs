//! Defines and implements custom bot functionality.

mod config;
mod framework;

use crate::serenity;
use crate::BotError;

pub use config::Config;

/// Identifies the bot to MangaDex.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Constructs a [serenity::Client] with an initialized [reqwest::Client].
pub(super) async fn client(config: Config) -> Result<serenity::Client, BotError> {
    // Get discord token from config file
    let token = config.token()?;

    // Only slash commands and DMs are used, no privileged intents needed.
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    let intents = serenity::GatewayIntents::non_privileged();

    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config, http))
        .await?;

    Ok(client)
}

/// Deletes every global command and the dev guild's commands.
pub(super) async fn clear_commands(config: &Config) -> Result<(), BotError> {
    let http = serenity::Http::new(&config.token()?);
    let app = http.get_current_application_info().await?;
    http.set_application_id(app.id);

    tracing::info!("Deleting all global commands...");
    serenity::Command::set_global_commands(&http, vec![]).await?;

    if let Some(dev_guild) = config.dev_guild() {
        tracing::info!("Deleting all commands of guild {dev_guild}...");
        dev_guild.set_commands(&http, vec![]).await?;
    }

    tracing::info!("All commands cleared successfully.");
    Ok(())
}
