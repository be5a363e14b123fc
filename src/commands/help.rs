use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::models::{DisplayRows, HorizonYears, Ticker};

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let embed = CreateEmbed::default()
        .title("📖 Stock Forecast Commands")
        .description("Daily prices since 2010 with an additive trend and seasonality forecast.")
        .color(0x00b0f4)
        .field(
            "🎯 General",
            "`$ping` - Check bot latency\n\
             `$help` - Show this help message\n\
             `$stocks` - List the tickers available for prediction",
            false,
        )
        .field(
            "📈 Forecast",
            format!(
                "`$forecast <TICKER> [years] [rows]` - Raw data, forecast tables and charts\n\
                 • years: {}-{} (default {})\n\
                 • rows: trailing raw rows to show, a multiple of {} or `all` (default)",
                HorizonYears::MIN,
                HorizonYears::MAX,
                HorizonYears::default().years(),
                DisplayRows::STEP
            ),
            false,
        )
        .field(
            "📋 Raw Data",
            "`$raw <TICKER> [rows] [page]` - Browse the loaded price table",
            false,
        )
        .field(
            "🗄️ Cache",
            "`$cache` - Show loaded tickers\n`$cache clear` - Forget loaded data (Admin)",
            false,
        )
        .field("Tickers", Ticker::symbols().join(", "), false);

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| format!("Failed to send help message: {}", e))?;

    Ok(())
}
