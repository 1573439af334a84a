use serenity::model::id::{ChannelId, GuildId, UserId};
use thiserror::Error;

/// User id of the Wordle application that posts the daily results.
pub const DEFAULT_ANNOUNCER_ID: u64 = 1211781489931452447;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {key}")]
    Missing { key: &'static str },
    #[error("Environment variable {key}={value} requires {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub channel_id: ChannelId,
    pub announcer_id: UserId,
    pub guild_id: GuildId,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN").ok_or(ConfigError::Missing {
            key: "DISCORD_TOKEN",
        })?;
        let channel_id = snowflake(&lookup, "WORDLE_CHANNEL_ID", None)?;
        let announcer_id = snowflake(&lookup, "WORDLE_APP_USER_ID", Some(DEFAULT_ANNOUNCER_ID))?;
        let guild_id = snowflake(&lookup, "GUILD_ID", None)?;
        Ok(Self {
            token,
            channel_id: ChannelId::new(channel_id),
            announcer_id: UserId::new(announcer_id),
            guild_id: GuildId::new(guild_id),
        })
    }
}

// Ids must be non-zero; serenity panics when constructing an id from 0.
fn snowflake<F>(lookup: &F, key: &'static str, default: Option<u64>) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return default.ok_or(ConfigError::Missing { key });
    };
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            expected: "a non-zero integer id",
        }),
    }
}
