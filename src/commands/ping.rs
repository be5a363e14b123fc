use std::time::{Duration, Instant};

use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use super::forecast_state;
use crate::BotData;

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let start_time = Instant::now();

    // Roundtrip is measured against a placeholder message
    let response = msg
        .channel_id
        .send_message(ctx, CreateMessage::default().content("📊 Calculating metrics..."))
        .await
        .map_err(|e| e.to_string())?;
    let roundtrip = start_time.elapsed().as_millis();

    let uptime = {
        let data = ctx.data.read().await;
        data.get::<BotData>()
            .map(|started| format_uptime(started.elapsed()))
            .unwrap_or_else(|| "Unknown".to_string())
    };

    let state = forecast_state(ctx).await?;
    let cached = state.loader.cache().len().await;

    response.delete(ctx).await.map_err(|e| e.to_string())?;

    let embed = CreateEmbed::default()
        .title("Pong! 🏓")
        .field("Response Roundtrip", format!("{}ms", roundtrip), true)
        .field("Uptime", uptime, true)
        .field("Cached Tickers", cached.to_string(), true)
        .field("Data Until", state.loader.window().end.to_string(), false)
        .color(0x00b0f4);

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0h 0m 0s");
        assert_eq!(format_uptime(Duration::from_secs(3723)), "1h 2m 3s");
    }
}
