use anyhow::Result;
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use tracing::{debug, error, info};

use crate::config::Config;

mod guild;
mod role_sync;
mod winners;

use guild::{DiscordGuild, GuildApi};
use winners::{Winner, WinnerExtractor};

/// How far back the startup scan looks for the latest results.
const LOOKBACK_LIMIT: usize = 1000;
const HISTORY_PAGE: u8 = 100;

#[derive(Debug, Clone)]
pub enum BotEvent {
    Ready,
    MessageReceived { author: UserId, content: String },
}

pub struct Handler {
    config: Config,
    extractor: WinnerExtractor,
}

impl Handler {
    pub fn new(config: Config) -> Self {
        let extractor = WinnerExtractor::new(config.announcer_id);
        Self { config, extractor }
    }

    pub async fn dispatch<G: GuildApi + ?Sized>(&self, guild: &G, event: BotEvent) -> Result<()> {
        match event {
            BotEvent::Ready => self.on_ready(guild).await,
            BotEvent::MessageReceived { author, content } => {
                self.on_message(guild, author, &content).await
            }
        }
    }

    async fn on_ready<G: GuildApi + ?Sized>(&self, guild: &G) -> Result<()> {
        let role = role_sync::ensure_role(guild).await?;
        match self.lookback(guild).await? {
            Some(winners) => {
                info!("Found latest results with {} winners", winners.len());
                role_sync::sync_members(guild, &winners, role).await?;
            }
            None => info!("No results found in the last {} messages", LOOKBACK_LIMIT),
        }
        Ok(())
    }

    async fn on_message<G: GuildApi + ?Sized>(
        &self,
        guild: &G,
        author: UserId,
        content: &str,
    ) -> Result<()> {
        let winners = self.extractor.extract(author, content);
        if winners.is_empty() {
            return Ok(());
        }
        info!("New results with {} winners", winners.len());
        let role = role_sync::ensure_role(guild).await?;
        role_sync::sync_members(guild, &winners, role).await?;
        Ok(())
    }

    /// Newest message in the results channel that names at least one winner.
    async fn lookback<G: GuildApi + ?Sized>(&self, guild: &G) -> Result<Option<Vec<Winner>>> {
        let mut seen = 0;
        let mut before = None;
        while seen < LOOKBACK_LIMIT {
            let limit = (LOOKBACK_LIMIT - seen).min(HISTORY_PAGE as usize) as u8;
            let page = guild.history(before, limit).await?;
            if page.is_empty() {
                break;
            }
            seen += page.len();
            before = page.last().map(|message| message.id);
            for message in page {
                let winners = self.extractor.extract(message.author, &message.content);
                if !winners.is_empty() {
                    return Ok(Some(winners));
                }
            }
        }
        Ok(None)
    }

    fn guild(&self, ctx: &Context) -> DiscordGuild {
        DiscordGuild::new(ctx.http.clone(), self.config.guild_id, self.config.channel_id)
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);
        if let Err(e) = self.dispatch(&self.guild(&ctx), BotEvent::Ready).await {
            error!("Startup sync failed: {:?}", e);
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        debug!("Message from {}: {}", msg.author.name, msg.content);
        let event = BotEvent::MessageReceived {
            author: msg.author.id,
            content: msg.content,
        };
        if let Err(e) = self.dispatch(&self.guild(&ctx), event).await {
            error!("Failed to sync winners: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId};

    use super::guild::fake::{member, Call, FakeGuild};
    use super::guild::HistoryMessage;
    use super::role_sync::ROLE_NAME;
    use super::*;

    const APP: u64 = 77;

    fn handler() -> Handler {
        Handler::new(Config {
            token: "token".to_string(),
            channel_id: ChannelId::new(1),
            announcer_id: UserId::new(APP),
            guild_id: GuildId::new(2),
        })
    }

    fn message(id: u64, author: u64, content: &str) -> HistoryMessage {
        HistoryMessage {
            id: MessageId::new(id),
            author: UserId::new(author),
            content: content.to_string(),
        }
    }

    fn results(winner: u64) -> String {
        format!("yesterday's results:\n👑 5/6: <@{winner}>")
    }

    #[tokio::test]
    async fn ready_syncs_from_newest_announcement() {
        let mut guild = FakeGuild::with_members(vec![member(10, "a"), member(11, "b")]);
        guild.messages = vec![
            message(500, 3, "gg"),
            message(499, APP, &results(11)),
            message(498, APP, &results(10)),
        ];

        handler().dispatch(&guild, BotEvent::Ready).await.unwrap();

        let role = RoleId::new(900);
        assert_eq!(guild.holders(role), vec![UserId::new(11)]);
        assert_eq!(
            guild.calls(),
            vec![
                Call::CreateRole(ROLE_NAME.to_string()),
                Call::Add(UserId::new(11), role)
            ]
        );
    }

    #[tokio::test]
    async fn ready_scan_stops_at_window() {
        let mut guild = FakeGuild::with_members(vec![member(10, "a")]);
        guild.messages = (0..LOOKBACK_LIMIT as u64)
            .map(|i| message(5000 - i, 3, "chatter"))
            .chain(std::iter::once(message(1, APP, &results(10))))
            .collect();

        handler().dispatch(&guild, BotEvent::Ready).await.unwrap();

        assert_eq!(guild.calls(), vec![Call::CreateRole(ROLE_NAME.to_string())]);
    }

    #[tokio::test]
    async fn ready_finds_announcement_past_first_page() {
        let mut guild = FakeGuild::with_members(vec![member(10, "a"), member(11, "b")]);
        guild.messages = (0..150)
            .map(|i| message(5000 - i, 3, "chatter"))
            .chain(std::iter::once(message(1, APP, &results(10))))
            .collect();

        handler().dispatch(&guild, BotEvent::Ready).await.unwrap();

        assert_eq!(guild.holders(RoleId::new(900)), vec![UserId::new(10)]);
    }

    #[tokio::test]
    async fn unknown_channel_aborts_startup_before_any_mutation() {
        let mut guild = FakeGuild::with_members(vec![member(10, "a")]);
        guild.channel_unreachable = true;

        assert!(handler().dispatch(&guild, BotEvent::Ready).await.is_err());
        assert!(guild
            .calls()
            .iter()
            .all(|call| matches!(call, Call::CreateRole(_))));
        assert!(guild.holders(RoleId::new(900)).is_empty());
    }

    #[tokio::test]
    async fn ready_without_announcement_only_ensures_role() {
        let guild = FakeGuild::with_members(vec![member(10, "a")]);

        handler().dispatch(&guild, BotEvent::Ready).await.unwrap();

        assert_eq!(guild.calls(), vec![Call::CreateRole(ROLE_NAME.to_string())]);
    }

    #[tokio::test]
    async fn ordinary_messages_touch_nothing() {
        let guild = FakeGuild::with_members(vec![member(10, "a")]);
        let event = BotEvent::MessageReceived {
            author: UserId::new(3),
            content: results(10),
        };

        handler().dispatch(&guild, event).await.unwrap();

        assert!(guild.calls().is_empty());
    }

    #[tokio::test]
    async fn announcement_moves_the_role() {
        let guild = FakeGuild::with_members(vec![member(10, "a"), member(11, "b")]);
        let h = handler();
        for winner in [10, 11] {
            let event = BotEvent::MessageReceived {
                author: UserId::new(APP),
                content: results(winner),
            };
            h.dispatch(&guild, event).await.unwrap();
        }

        let role = RoleId::new(900);
        assert_eq!(guild.holders(role), vec![UserId::new(11)]);
        assert_eq!(
            guild.calls(),
            vec![
                Call::CreateRole(ROLE_NAME.to_string()),
                Call::Add(UserId::new(10), role),
                Call::Remove(UserId::new(10), role),
                Call::Add(UserId::new(11), role),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_guild_aborts_before_any_mutation() {
        let guild = FakeGuild {
            unreachable: true,
            ..Default::default()
        };
        let event = BotEvent::MessageReceived {
            author: UserId::new(APP),
            content: results(10),
        };

        assert!(handler().dispatch(&guild, event).await.is_err());
        assert!(guild.calls().is_empty());
    }
}
