//! A discord bot that tracks manga on MangaDex and announces new chapters.

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod setup;

use poise::serenity_prelude as serenity;

use data::Data;
use error::BotError;
use setup::Config;

/// Context given to every command.
type Context<'a> = poise::Context<'a, Data, BotError>;

#[tokio::main]
async fn main() -> Result<(), BotError> {
    let config = Config::read()?;

    // Dropping the guard stops file logging.
    let _guard = log::install_tracing(&config);

    if config.clear_commands() {
        return setup::clear_commands(&config).await;
    }

    let mut client = setup::client(config).await?;
    client.start().await?;

    Ok(())
}
