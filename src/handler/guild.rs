use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::async_trait;
use serenity::builder::{EditRole, GetMessages};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::colour::Colour;
use serenity::model::guild::{Member, Role};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRole {
    pub id: RoleId,
    pub name: String,
}

impl From<Role> for GuildRole {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuildMember {
    pub id: UserId,
    pub name: String,
    pub global_name: Option<String>,
    pub nick: Option<String>,
    pub roles: Vec<RoleId>,
}

impl From<Member> for GuildMember {
    fn from(member: Member) -> Self {
        Self {
            id: member.user.id,
            name: member.user.name,
            global_name: member.user.global_name,
            nick: member.nick,
            roles: member.roles,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub author: UserId,
    pub content: String,
}

impl From<Message> for HistoryMessage {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            author: message.author.id,
            content: message.content,
        }
    }
}

/// What the bot needs from the configured guild and results channel.
#[async_trait]
pub trait GuildApi: Send + Sync {
    async fn roles(&self) -> Result<Vec<GuildRole>>;

    async fn create_role(&self, name: &str) -> Result<GuildRole>;

    /// Up to `limit` members ordered by id, starting after `after`.
    async fn members(&self, after: Option<UserId>, limit: u64) -> Result<Vec<GuildMember>>;

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<()>;

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<()>;

    /// Up to `limit` messages, newest first, older than `before` when given.
    async fn history(&self, before: Option<MessageId>, limit: u8) -> Result<Vec<HistoryMessage>>;
}

/// The live guild, reached through the gateway client's HTTP handle.
pub struct DiscordGuild {
    http: Arc<Http>,
    guild_id: GuildId,
    channel_id: ChannelId,
}

impl DiscordGuild {
    pub fn new(http: Arc<Http>, guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            http,
            guild_id,
            channel_id,
        }
    }
}

#[async_trait]
impl GuildApi for DiscordGuild {
    async fn roles(&self) -> Result<Vec<GuildRole>> {
        let roles = self
            .guild_id
            .roles(&self.http)
            .await
            .with_context(|| format!("Guild {} not found", self.guild_id))?;
        Ok(roles.into_values().map(GuildRole::from).collect())
    }

    async fn create_role(&self, name: &str) -> Result<GuildRole> {
        let builder = EditRole::new()
            .name(name)
            .colour(Colour::GOLD)
            .hoist(true)
            .mentionable(true);
        let role = self
            .guild_id
            .create_role(&self.http, builder)
            .await
            .with_context(|| format!("Failed to create role {name}"))?;
        Ok(role.into())
    }

    async fn members(&self, after: Option<UserId>, limit: u64) -> Result<Vec<GuildMember>> {
        let members = self
            .guild_id
            .members(&self.http, Some(limit), after)
            .await
            .with_context(|| format!("Failed to list members of guild {}", self.guild_id))?;
        Ok(members.into_iter().map(GuildMember::from).collect())
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<()> {
        self.http
            .add_member_role(self.guild_id, user, role, None)
            .await
            .with_context(|| format!("Failed to grant role {role} to {user}"))
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<()> {
        self.http
            .remove_member_role(self.guild_id, user, role, None)
            .await
            .with_context(|| format!("Failed to revoke role {role} from {user}"))
    }

    async fn history(&self, before: Option<MessageId>, limit: u8) -> Result<Vec<HistoryMessage>> {
        let mut builder = GetMessages::new().limit(limit);
        if let Some(before) = before {
            builder = builder.before(before);
        }
        let messages = self
            .channel_id
            .messages(&self.http, builder)
            .await
            .with_context(|| format!("Could not find channel with ID {}", self.channel_id))?;
        Ok(messages.into_iter().map(HistoryMessage::from).collect())
    }
}
