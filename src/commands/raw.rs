use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use super::forecast_state;
use crate::models::{DisplayRows, Ticker};
use crate::utils::{raw_table, Page};

const ROWS_PER_PAGE: usize = 20;

/// Page number as `2` or `p2`
fn parse_page(arg: &str) -> Result<usize, String> {
    let arg = arg.to_lowercase();
    arg.strip_prefix('p')
        .unwrap_or(&arg)
        .parse::<usize>()
        .map_err(|_| "Invalid page number. Use: `$raw AAPL 50 2` or `$raw AAPL 50 p2`".to_string())
}

pub async fn execute(ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), String> {
    let Some(symbol) = args.first() else {
        let help_embed = CreateEmbed::default()
            .title("📋 Raw Command")
            .description("Browse the daily price table of a ticker")
            .field("Usage", "`$raw <TICKER> [rows] [page]`", false)
            .field("Examples", "`$raw AAPL`\n`$raw MSFT 100 p3`", false)
            .color(0x00ff00);

        msg.channel_id
            .send_message(ctx, CreateMessage::default().embed(help_embed))
            .await
            .map_err(|e| e.to_string())?;
        return Ok(());
    };

    let ticker = Ticker::parse(symbol).map_err(|e| e.to_string())?;
    let display_rows = match args.get(1) {
        Some(arg) => DisplayRows::parse(arg).map_err(|e| e.to_string())?,
        None => DisplayRows::All,
    };
    let page_num = args.get(2).map(|a| parse_page(a)).transpose()?.unwrap_or(1);

    let state = forecast_state(ctx).await?;
    let series = state.loader.load(ticker).await.map_err(|e| e.to_string())?;
    let rows = series.tail(display_rows.resolve(series.len()));

    let mut page = Page::from_table(
        format!("📋 {} ({} of {} rows)", ticker, rows.len(), series.len()),
        &raw_table(rows),
        ROWS_PER_PAGE,
    );
    page.go_to(page_num);

    msg.channel_id
        .send_message(ctx, page.create_message())
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
