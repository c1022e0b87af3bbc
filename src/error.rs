//! Error types.
//!
//! [BotError] is the error type of every command. Errors the user caused (and can fix)
//! are wrapped in [UserError] and only ever shown back to them.

use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// Top level error.
#[derive(Debug, Error)]
pub enum BotError {
    /// Expected errors, shown to the user.
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::prelude::SerenityError),

    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("MangaDex returned an unexpected response for '{path}': {reason}")]
    MangaDex { path: String, reason: String },

    #[error("Failed to access tracking list '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tracking list '{path}' is corrupted: {reason}")]
    CorruptList { path: String, reason: String },

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("Command panicked: {}", payload.as_deref().unwrap_or("no payload"))]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },
}

/// Errors caused by how a command was used.
/// The display string is sent back to the user as-is.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid MangaDex URL provided.")]
    InvalidMangaUrl,

    #[error("This manga is already being tracked.")]
    AlreadyTracked,

    #[error("This manga is not being tracked.")]
    NotTracked,

    #[error("Please provide a valid JSON file with a .json extension.")]
    NotJsonFile,

    #[error("Invalid file format. Please provide a JSON file containing an array of manga IDs.")]
    InvalidImportFormat { reason: String },

    #[error("An error occurred while importing the file. Please try again later.")]
    ImportFailed { reason: String },

    #[error("That file is too large to be a tracking list.")]
    ImportTooLarge { size: u32 },

    #[error("I couldn't send you a direct message. Please check your privacy settings.")]
    CannotDm,

    #[error("Invalid input: '{}'.", input.as_deref().unwrap_or_default())]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {} seconds.", remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },
}

impl UserError {
    /// Extra information worth logging but not showing.
    pub fn detail(&self) -> Option<&str> {
        match self {
            UserError::InvalidImportFormat { reason } | UserError::ImportFailed { reason } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

/// Errors when reading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),
}
