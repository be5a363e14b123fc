use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::info;

use super::forecast_state;
use crate::utils::check_user_roles;

pub async fn execute(ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), String> {
    let state = forecast_state(ctx).await?;
    let cache = state.loader.cache();

    let embed = match args.first().map(|a| a.to_lowercase()).as_deref() {
        None | Some("list") => {
            let entries = cache.entries().await;
            let description = if entries.is_empty() {
                "No tickers loaded yet".to_string()
            } else {
                entries
                    .iter()
                    .map(|(ticker, rows)| format!("`{}` - {} rows", ticker, rows))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            CreateEmbed::default()
                .title("🗄️ Loaded Data")
                .description(description)
                .field(
                    "Window",
                    format!("{} .. {}", state.loader.window().start, state.loader.window().end),
                    false,
                )
                .color(0x00b0f4)
        }
        Some("clear") => {
            let guild_id = msg
                .guild_id
                .ok_or_else(|| "This command can only be used in a server".to_string())?;
            check_user_roles(ctx, guild_id, msg.author.id, &["Admin"]).await?;

            let dropped = cache.clear().await;
            info!("Cache cleared by {}: {} ticker(s) dropped", msg.author.id, dropped);

            CreateEmbed::default()
                .title("🗑️ Cache Cleared")
                .description(format!(
                    "Dropped {} ticker(s); the next request loads fresh data",
                    dropped
                ))
                .color(0x00ff00)
        }
        Some(other) => {
            return Err(format!("Unknown cache action '{}'. Use `$cache` or `$cache clear`", other));
        }
    };

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
