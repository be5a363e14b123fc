use std::sync::Arc;

use chrono::Local;
use serenity::builder::{CreateAttachment, CreateEmbed, CreateMessage, EditMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::{info, warn};

use super::forecast_state;
use crate::models::{DisplayRows, ForecastView, HorizonYears, Inputs, Ticker};
use crate::services::chart_service::{
    render_blocking, render_components_chart, render_forecast_chart, render_future_chart,
    render_raw_chart, ChartError,
};
use crate::services::pipeline_service;
use crate::utils::{forecast_table, raw_table, table_message};

fn usage_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("📈 Forecast Command")
        .description("Load daily prices since 2010, show the raw data and predict the close")
        .field("Usage", "`$forecast <TICKER> [years] [rows]`", false)
        .field(
            "Examples",
            "`$forecast AAPL` (1 year, all rows)\n\
             `$forecast GOOG 3` (3 years)\n\
             `$forecast ^BSESN 2 50` (2 years, last 50 raw rows)",
            false,
        )
        .field(
            "Arguments",
            format!(
                "• TICKER: {}\n• years: {}-{}\n\
                 • rows: `all` or a multiple of {}, at least {}",
                Ticker::symbols().join(", "),
                HorizonYears::MIN,
                HorizonYears::MAX,
                DisplayRows::STEP,
                DisplayRows::MIN
            ),
            false,
        )
        .color(0x00ff00)
}

/// Post a rendered chart, or a short note when there is too little to draw
async fn send_chart(
    ctx: &Context,
    msg: &Message,
    heading: &str,
    filename: String,
    chart: Result<Vec<u8>, ChartError>,
) -> Result<(), String> {
    let message = match chart {
        Ok(data) => CreateMessage::default()
            .content(heading)
            .add_file(CreateAttachment::bytes(data, filename)),
        Err(ChartError::NotEnoughData(points)) => {
            warn!("Skipping {}: {} point(s)", filename, points);
            CreateMessage::default().content(format!("{} (not enough data to plot)", heading))
        }
        Err(e) => return Err(e.to_string()),
    };

    msg.channel_id
        .send_message(ctx, message)
        .await
        .map_err(|e| format!("Failed to send chart: {}", e))?;
    Ok(())
}

async fn send_forecast(
    ctx: &Context,
    msg: &Message,
    view: Arc<ForecastView>,
    size: (u32, u32),
) -> Result<(), String> {
    let (width, height) = size;
    let ticker = view.ticker.symbol().trim_start_matches('^');

    msg.channel_id
        .send_message(
            ctx,
            table_message(
                &format!("**Forecast Data** ({}, last {} rows)", view.ticker, view.tail().len()),
                &format!("forecast_{}", ticker),
                &forecast_table(view.tail()),
            ),
        )
        .await
        .map_err(|e| e.to_string())?;

    let v = Arc::clone(&view);
    let chart = render_blocking(move || render_forecast_chart(&v, width, height)).await;
    send_chart(ctx, msg, "**Forecast Data**", format!("forecast_{}.png", ticker), chart).await?;

    let v = Arc::clone(&view);
    let chart = render_blocking(move || render_components_chart(&v, width, height)).await;
    let filename = format!("components_{}.png", ticker);
    send_chart(ctx, msg, "**Forecast Components**", filename, chart).await?;

    let v = Arc::clone(&view);
    let chart = render_blocking(move || render_future_chart(&v, width, height)).await;
    let heading = format!("**{}**", view.future.title());
    send_chart(ctx, msg, &heading, format!("future_{}.png", ticker), chart).await
}

pub async fn execute(ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), String> {
    if args.is_empty() {
        msg.channel_id
            .send_message(ctx, CreateMessage::default().embed(usage_embed()))
            .await
            .map_err(|e| e.to_string())?;
        return Ok(());
    }

    let inputs = Inputs::from_args(args).map_err(|e| e.to_string())?;
    let state = forecast_state(ctx).await?;
    let size = (state.config.chart_width, state.config.chart_height);
    info!("Forecast requested by {}: {:?}", msg.author.id, inputs);

    let mut loading = msg
        .channel_id
        .send_message(ctx, CreateMessage::default().content("Loading Data....."))
        .await
        .map_err(|e| e.to_string())?;

    let series = match state.loader.load(inputs.ticker).await {
        Ok(series) => series,
        Err(e) => {
            let _ = loading
                .edit(ctx, EditMessage::new().content("Loading Data....Failed"))
                .await;
            return Err(e.to_string());
        }
    };
    loading
        .edit(ctx, EditMessage::new().content("Loading Data....Done"))
        .await
        .map_err(|e| e.to_string())?;

    let _ = msg.channel_id.broadcast_typing(ctx.http.as_ref()).await;

    let today = Local::now().date_naive();
    let model = tokio::task::spawn_blocking(move || {
        pipeline_service::render(&inputs, series, today)
    })
    .await
    .map_err(|e| format!("Forecast task failed: {}", e))?;

    let raw = model.raw;
    let ticker = raw.ticker().symbol().trim_start_matches('^');
    let heading = format!(
        "**Raw Data** ({}, last {} of {} rows)",
        raw.ticker(),
        raw.rows().len(),
        raw.total_rows()
    );
    msg.channel_id
        .send_message(
            ctx,
            table_message(&heading, &format!("raw_{}", ticker), &raw_table(raw.rows())),
        )
        .await
        .map_err(|e| e.to_string())?;

    let raw_ticker = raw.ticker();
    let chart = render_blocking(move || render_raw_chart(&raw, size.0, size.1)).await;
    send_chart(ctx, msg, "**Time Series Data**", format!("raw_{}.png", ticker), chart).await?;

    match model.forecast {
        Ok(view) => send_forecast(ctx, msg, Arc::new(view), size).await,
        Err(e) => Err(format!("Forecast failed for {}: {}", raw_ticker, e)),
    }
}
