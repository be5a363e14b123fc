pub mod cache;
pub mod forecast;
pub mod help;
pub mod ping;
pub mod raw;
pub mod stocks;

use std::sync::Arc;

use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::{error, info};

use crate::{ForecastState, Forecaster};

/// Shared pipeline state from client data
pub async fn forecast_state(ctx: &Context) -> Result<Arc<ForecastState>, String> {
    let data = ctx.data.read().await;
    data.get::<Forecaster>()
        .cloned()
        .ok_or_else(|| "Forecast state not initialized".to_string())
}

pub async fn handle_message(ctx: &Context, msg: &Message) {
    if msg.author.bot {
        return;
    }

    let parts: Vec<&str> = msg.content.split_whitespace().collect();
    let Some((&command, args)) = parts.split_first() else {
        return;
    };

    let result = match command.to_lowercase().as_str() {
        "$help" => help::execute(ctx, msg).await,
        "$ping" => ping::execute(ctx, msg).await,
        "$stocks" | "$tickers" => stocks::execute(ctx, msg).await,
        "$forecast" | "$predict" => forecast::execute(ctx, msg, args).await,
        "$raw" => raw::execute(ctx, msg, args).await,
        "$cache" => cache::execute(ctx, msg, args).await,
        _ => return,
    };

    match result {
        Ok(()) => info!("Command {} from {} completed", command, msg.author.id),
        Err(e) => {
            error!("Error executing command {}: {}", command, e);

            let user_message = if e.contains("429") || e.to_lowercase().contains("rate limit") {
                "⚠️ **Rate Limited**: please try again in a moment.".to_string()
            } else if e.is_empty() {
                "❌ An error occurred while executing the command.".to_string()
            } else {
                format!("❌ {}", e)
            };

            let embed = CreateEmbed::default()
                .title("Command Error")
                .description(user_message)
                .color(0xff0000);

            let _ = msg
                .channel_id
                .send_message(ctx, CreateMessage::default().embed(embed))
                .await;
        }
    }
}
