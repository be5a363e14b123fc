pub mod table;
pub mod page;

pub use page::Page;
pub use table::{forecast_table, raw_table, Table};

use serenity::builder::{CreateAttachment, CreateMessage};
use serenity::model::prelude::{GuildId, UserId};
use serenity::prelude::Context;
use tracing::debug;

/// Discord rejects message content above 2000 characters
pub const MAX_MESSAGE_LEN: usize = 2000;

/// A table as a message: inline code block when it fits, text file otherwise
pub fn table_message(heading: &str, file_stem: &str, table: &Table) -> CreateMessage {
    let rendered = table.render();
    if heading.len() + rendered.len() + 1 < MAX_MESSAGE_LEN {
        return CreateMessage::default().content(format!("{}\n{}", heading, rendered));
    }

    debug!("Table for {} has {} rows, sending as file", file_stem, table.len());
    let text = table.lines().join("\n");
    CreateMessage::default()
        .content(format!("{} ({} rows, attached)", heading, table.len()))
        .add_file(CreateAttachment::bytes(text.into_bytes(), format!("{}.txt", file_stem)))
}

/// Check whether a user holds one of `required_roles` in a guild
/// (case-insensitive). The guild owner and "Admin" holders always pass.
pub async fn check_user_roles(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
    required_roles: &[&str],
) -> Result<(), String> {
    let member = guild_id.member(&ctx.http, user_id).await.map_err(|e| {
        debug!("User {} is not a member of guild {}: {}", user_id, guild_id, e);
        "User is not a member of this guild".to_string()
    })?;

    let guild = guild_id
        .to_partial_guild(&ctx.http)
        .await
        .map_err(|e| format!("Failed to get guild: {}", e))?;

    if guild.owner_id == user_id {
        debug!("User {} owns guild {}", user_id, guild_id);
        return Ok(());
    }

    let user_roles: Vec<String> = member
        .roles
        .iter()
        .filter_map(|rid| guild.roles.get(rid))
        .map(|role| role.name.to_lowercase())
        .collect();
    debug!("User {} roles in guild {}: {:?}", user_id, guild_id, user_roles);

    let allowed = user_roles.iter().any(|r| {
        r == "admin" || required_roles.iter().any(|req| req.to_lowercase() == *r)
    });

    if !allowed {
        return Err(format!(
            "You need one of these roles to use this command: {}",
            required_roles.join(", ")
        ));
    }

    Ok(())
}
