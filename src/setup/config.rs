//! Configuration for running this bot.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::num::NonZeroU64;
use std::path::PathBuf;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::ChannelId;
use serenity::GuildId;
use serenity::UserId;

use crate::data::ListMode;
use crate::error::ConfigError;
use crate::serenity;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Overrides `discord_token` when set.
const DISCORD_TOKEN_VAR: &str = "DISCORD_TOKEN";

/// Overrides `mangadex.token` when set.
const MANGADEX_TOKEN_VAR: &str = "MANGADEX_TOKEN";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    discord_token: String,

    /// See [MangaDexConfig]
    mangadex: MangaDexConfig,

    /// See [TrackingConfig]
    tracking: TrackingConfig,

    /// See [ScheduleConfig]
    schedule: ScheduleConfig,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,
}

impl Config {
    /// Tries to read [CONFIG_PATH] to extract a [Config].
    /// If a file doesn't exists, create the default config file and returns error.
    /// If a file exists but is empty, re-write the default values and return error.
    /// If a file exists but is incomplete, show error and don't change files.
    /// If a file exists and is complete, read file to create a config.
    pub fn read() -> Result<Config, ConfigError> {
        match std::fs::read_to_string(CONFIG_PATH) {
            Ok(content) if content.trim().is_empty() => {
                write_file(&Config::default())?;
                Err(ConfigError::InvalidConfig {
                    reason: format!("Empty config file! Rewriting {CONFIG_PATH} ..."),
                })
            }
            Ok(content) => Config::parse(&content),
            Err(file_error) if file_error.kind() == std::io::ErrorKind::NotFound => {
                write_file(&Config::default())?;
                Err(ConfigError::MissingConfig {
                    action_msg: format!("Creating {CONFIG_PATH}, fill it in and restart."),
                })
            }
            Err(file_error) => Err(ConfigError::IoError(file_error)),
        }
    }

    /// Parse a config, the error names the offending key.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let de = toml::Deserializer::new(content);
        serde_path_to_error::deserialize(de).map_err(|error| ConfigError::InvalidConfig {
            reason: error.to_string(),
        })
    }

    /// The discord token, preferring [DISCORD_TOKEN_VAR].
    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<String, ConfigError> {
        let given_token = std::env::var(DISCORD_TOKEN_VAR).unwrap_or_else(|_| self.discord_token.clone());
        let default_token = Config::default().discord_token;

        if given_token.trim().is_empty() || given_token.contains(&default_token) {
            Err(ConfigError::InvalidConfig {
                reason: "Missing discord token".to_string(),
            })
        } else {
            Ok(given_token)
        }
    }

    /// The MangaDex bearer token, preferring [MANGADEX_TOKEN_VAR].
    /// `None` means requests go out unauthenticated.
    pub fn mangadex_token(&self) -> Option<String> {
        std::env::var(MANGADEX_TOKEN_VAR)
            .ok()
            .or_else(|| self.mangadex.token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn mangadex_api_url(&self) -> &str {
        &self.mangadex.api_url
    }

    pub fn mangadex_site_url(&self) -> &str {
        &self.mangadex.site_url
    }

    /// Language of the chapter feed.
    pub fn mangadex_language(&self) -> &str {
        &self.mangadex.language
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.tracking.data_dir)
    }

    pub fn list_mode(&self) -> ListMode {
        if self.tracking.shared_list {
            ListMode::Shared
        } else {
            ListMode::PerUser
        }
    }

    /// The daily check's cron expression, `None` if disabled.
    pub fn schedule(&self) -> Option<&str> {
        self.schedule.enabled.then_some(self.schedule.cron.as_str())
    }

    /// Where the daily check posts updates of the shared list.
    pub fn update_channel(&self) -> Option<ChannelId> {
        self.schedule.channel_id
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.notify_list(&fw.options().owners)
    }

    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }

    /// Delete registered commands instead of running.
    pub fn clear_commands(&self) -> bool {
        self.dev_utils.clear_commands
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: "put_token_here".to_string(),

            mangadex: MangaDexConfig {
                api_url: "https://api.mangadex.org".to_string(),
                site_url: "https://mangadex.org".to_string(),
                token: None,
                language: "en".to_string(),
            },

            tracking: TrackingConfig {
                data_dir: "manga_data".to_string(),
                shared_list: false,
            },

            schedule: ScheduleConfig {
                enabled: true,
                cron: "0 0 12 * * *".to_string(),
                channel_id: None,
            },

            logging: LoggingConfig {
                console_debug: false,
                logs_enabled: true,
                log_dir: "logs".to_string(),
            },

            dev_utils: DevConfig {
                dev_guild: None,
                clear_commands: false,
                notifications: NotifyConfig {
                    enabled: false,
                    add_owners: true,
                    userids: vec![],
                },
            },
        }
    }
}

/// Where and how to reach MangaDex.
#[derive(Debug, Serialize, Deserialize)]
struct MangaDexConfig {
    /// Base url of the REST api.
    api_url: String,
    /// Base url used to build chapter links.
    site_url: String,
    /// Optional bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    /// Translated language to look for chapters in.
    language: String,
}

/// Where tracking lists live.
#[derive(Debug, Serialize, Deserialize)]
struct TrackingConfig {
    /// Directory holding the list files.
    data_dir: String,
    /// One list for everyone instead of one per user.
    shared_list: bool,
}

/// The daily update check.
#[derive(Debug, Serialize, Deserialize)]
struct ScheduleConfig {
    enabled: bool,
    /// 6 field cron expression (with seconds), evaluated in UTC.
    cron: String,
    /// Channel for shared list updates.
    #[serde(
        serialize_with = "serialize_opt",
        deserialize_with = "deserialize_opt_id"
    )]
    channel_id: Option<ChannelId>,
}

/// Configs for logging
#[derive(Debug, Serialize, Deserialize)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Serialize, Deserialize)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    #[serde(
        serialize_with = "serialize_opt",
        deserialize_with = "deserialize_opt_id"
    )]
    dev_guild: Option<GuildId>,
    /// Remove all registered commands and exit.
    #[serde(default)]
    clear_commands: bool,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Serialize, Deserialize)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl NotifyConfig {
    /// Construct a bug notification notify list based on the config.
    fn notify_list(&self, owners: &HashSet<UserId>) -> HashSet<UserId> {
        if !self.enabled {
            return HashSet::new();
        }

        let owners = owners.iter().filter(|_| self.add_owners);
        owners.chain(&self.userids).copied().collect()
    }
}

/// Write the given config to [CONFIG_PATH].
fn write_file(config: &Config) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidConfig {
        reason: e.to_string(),
    })?;
    std::fs::write(CONFIG_PATH, content).map_err(ConfigError::IoError)
}

/// Optional ids are written as an empty string when missing.
fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

fn deserialize_opt_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: From<NonZeroU64>,
{
    deserializer.deserialize_any(OptIdVisitor(PhantomData))
}

/// Accepts `""` (none), a numeric string or an integer.
struct OptIdVisitor<T>(PhantomData<T>);

impl<'de, T: From<NonZeroU64>> serde::de::Visitor<'de> for OptIdVisitor<T> {
    type Value = Option<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a discord id or an empty string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v.trim() {
            "" => Ok(None),
            v => {
                let num: NonZeroU64 = v.parse().map_err(|_| E::custom("not a discord id"))?;
                Ok(Some(T::from(num)))
            }
        }
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let num = u64::try_from(v)
            .ok()
            .and_then(NonZeroU64::new)
            .ok_or_else(|| E::custom("not a discord id"))?;
        Ok(Some(T::from(num)))
    }
}
