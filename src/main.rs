use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod forecast;
mod models;
mod services;
mod utils;

use api::YahooClient;
use config::Config;
use services::data_service::{DataLoader, FetchWindow, SeriesCache};

struct Handler;

struct BotData;

impl TypeMapKey for BotData {
    type Value = Instant;
}

/// Everything commands need to run the pipeline
pub struct ForecastState {
    pub loader: DataLoader<YahooClient>,
    pub config: Config,
}

struct Forecaster;

impl TypeMapKey for Forecaster {
    type Value = Arc<ForecastState>;
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        commands::handle_message(&ctx, &msg).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let filter = ["stock_forecast=debug", "serenity=warn"]
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(EnvFilter::from_default_env(), |f, d| f.add_directive(d));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting stock forecast bot...");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    // Fixed for the life of the process; cached series never see later days
    let fetch_end: NaiveDate = Local::now().date_naive();
    info!("TODAY: {}", fetch_end);

    let provider = match YahooClient::with_base_url(config.quote_base_url.clone()) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create quote client: {}", e);
            return;
        }
    };

    let cache = Arc::new(SeriesCache::new());
    let loader = DataLoader::new(provider, cache, FetchWindow::until(fetch_end));
    info!(
        "Quotes from {} ({} .. {}), charts {}x{}",
        config.quote_base_url,
        loader.window().start,
        loader.window().end,
        config.chart_width,
        config.chart_height
    );

    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILDS;

    let token = config.discord_token.clone();
    let mut client = match Client::builder(&token, intents).event_handler(Handler).await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<BotData>(Instant::now());
        data.insert::<Forecaster>(Arc::new(ForecastState { loader, config }));
    }

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }
}
