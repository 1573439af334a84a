use anyhow::Result;
use serenity::model::id::RoleId;
use tracing::{debug, info};

use super::guild::GuildApi;
use super::winners::Winner;

pub const ROLE_NAME: &str = "Wordy";

// Largest page the members endpoint will return.
const MEMBERS_PAGE: u64 = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub scanned: usize,
    pub granted: usize,
    pub revoked: usize,
}

/// Finds the winners' role by name, creating it on first use.
pub async fn ensure_role<G: GuildApi + ?Sized>(guild: &G) -> Result<RoleId> {
    let roles = guild.roles().await?;
    if let Some(existing) = roles.into_iter().find(|role| role.name == ROLE_NAME) {
        info!("Role '{}' already exists", ROLE_NAME);
        return Ok(existing.id);
    }
    let role = guild.create_role(ROLE_NAME).await?;
    info!("Created role: {}", role.name);
    Ok(role.id)
}

/// Grants `role` to every member matched by `winners` and revokes it from
/// everyone else. Members already in the right state are not touched.
pub async fn sync_members<G: GuildApi + ?Sized>(
    guild: &G,
    winners: &[Winner],
    role: RoleId,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mut after = None;
    loop {
        let page = guild.members(after, MEMBERS_PAGE).await?;
        let full = page.len() as u64 == MEMBERS_PAGE;
        after = page.last().map(|member| member.id);

        for member in page {
            report.scanned += 1;
            let is_winner = winners.iter().any(|winner| winner.matches(&member));
            let has_role = member.roles.contains(&role);
            if is_winner && !has_role {
                debug!("Granting {} to {} ({})", ROLE_NAME, member.name, member.id);
                guild.add_role(member.id, role).await?;
                report.granted += 1;
            } else if !is_winner && has_role {
                debug!("Revoking {} from {} ({})", ROLE_NAME, member.name, member.id);
                guild.remove_role(member.id, role).await?;
                report.revoked += 1;
            }
        }

        if !full {
            break;
        }
    }
    info!(
        "Synced {}: {} members scanned, {} granted, {} revoked",
        ROLE_NAME, report.scanned, report.granted, report.revoked
    );
    Ok(report)
}
