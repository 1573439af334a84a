use regex::Regex;
use serenity::model::id::UserId;

use super::guild::GuildMember;

const RESULTS_MARKER: &str = "yesterday's results:";
const CROWN: &str = "👑";

/// A winner named in a results announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Winner {
    /// A proper `<@123>` mention.
    Id(UserId),
    /// A plain `@Name` that the app could not resolve to a mention.
    Name(String),
}

impl Winner {
    pub fn matches(&self, member: &GuildMember) -> bool {
        match self {
            Winner::Id(id) => *id == member.id,
            Winner::Name(name) => {
                *name == member.name
                    || member.global_name.as_deref() == Some(name.as_str())
                    || member.nick.as_deref() == Some(name.as_str())
            }
        }
    }
}

pub struct WinnerExtractor {
    announcer: UserId,
    mention_re: Regex,
    name_re: Regex,
}

impl WinnerExtractor {
    pub fn new(announcer: UserId) -> Self {
        Self {
            announcer,
            mention_re: Regex::new(r"<@(\d+)>").expect("mention pattern should compile"),
            name_re: Regex::new(r"@[^@]+").expect("name pattern should compile"),
        }
    }

    /// Returns the winners listed in a results announcement, mentions first
    /// then plain names, each in order of appearance. Anything that is not a
    /// well-formed announcement from the announcer yields an empty list.
    /// Unlike a literal `@` scan, a name that is blank after trimming is skipped.
    pub fn extract(&self, author: UserId, content: &str) -> Vec<Winner> {
        if author != self.announcer || !content.contains(RESULTS_MARKER) {
            return Vec::new();
        }
        let Some(line) = content.lines().nth(1) else {
            return Vec::new();
        };
        if !line.starts_with(CROWN) {
            return Vec::new();
        }
        let Some((_, segment)) = line.split_once(':') else {
            return Vec::new();
        };
        let segment = segment.trim();

        let mut winners: Vec<Winner> = self
            .mention_re
            .captures_iter(segment)
            .filter_map(|caps| caps[1].parse::<u64>().ok())
            .filter(|id| *id != 0)
            .map(|id| Winner::Id(UserId::new(id)))
            .collect();

        // Mentions must be gone before the name scan or `<@1>` would leak in as "1>".
        let remainder = self.mention_re.replace_all(segment, "");
        winners.extend(
            self.name_re
                .find_iter(&remainder)
                .map(|m| m.as_str()[1..].trim())
                .filter(|name| !name.is_empty())
                .map(|name| Winner::Name(name.to_string())),
        );
        winners
    }
}
