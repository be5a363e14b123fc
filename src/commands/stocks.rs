use serenity::builder::{CreateEmbed, CreateEmbedFooter, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use super::forecast_state;
use crate::models::Ticker;

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let state = forecast_state(ctx).await?;
    let cached = state.loader.cache().entries().await;

    let lines: Vec<String> = Ticker::ALL
        .iter()
        .map(|ticker| match cached.iter().find(|(t, _)| t == ticker) {
            Some((_, rows)) => format!("`{}` - loaded, {} rows", ticker, rows),
            None => format!("`{}`", ticker),
        })
        .collect();

    let embed = CreateEmbed::default()
        .title("📈 Select dataset for prediction")
        .description(lines.join("\n"))
        .footer(CreateEmbedFooter::new("Use $forecast <TICKER> [years] [rows]"))
        .color(0x00ff00);

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
