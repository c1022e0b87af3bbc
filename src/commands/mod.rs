//! Bot commands.
//!
//! Every reply is ephemeral, only the user who ran a command sees it.

mod addmanga;
mod checkupdates;
mod exportmanga;
mod importmanga;
mod listmanga;
mod removemanga;
mod version;

use crate::{BotError, Data};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, BotError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        checkupdates::checkupdates(),
        version::version(),
        addmanga::addmanga(),
        removemanga::removemanga(),
        listmanga::listmanga(),
        exportmanga::exportmanga(),
        importmanga::importmanga(),
    ]
}
