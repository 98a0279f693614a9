//! Timer and webhook entry points around one shared booking check.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    BotContext,
    booking_scraper::AvailabilityResult,
    check_error::CheckError,
    notifier::ChatId,
    status_page_scraper::format_status_row,
};

pub const WEBHOOK_PATH: &str = "/webhooks/telegram";
pub const BOT_INFO: &str =
    "Buenos Aires Spanish passport check telegram bot @spain-bsas-passport-checker";
pub const CHECK_FAILED_MESSAGE: &str = "Error al consultar citaconsular.es";
pub const CHECK_DONE_MESSAGE: &str = "Cita consultada correctamente";

const BOOKING_COMMAND: &str = "/consultarcita";
const STATUS_PAGE_COMMAND: &str = "/consultar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CheckBooking,
    CheckStatusPage,
}

impl Command {
    /// `/consultarcita` shares its prefix with `/consultar`, so it is tried first.
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.starts_with(BOOKING_COMMAND) {
            Some(Command::CheckBooking)
        } else if text.starts_with(STATUS_PAGE_COMMAND) {
            Some(Command::CheckStatusPage)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub command: Command,
    pub chat_id: ChatId,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub text: Option<String>,
    pub chat: Option<TelegramChat>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: ChatId,
}

impl TelegramUpdate {
    pub fn into_command(self) -> Option<InboundCommand> {
        let message = self.message?;
        let command = Command::from_text(message.text.as_deref()?)?;
        let chat_id = message.chat?.id;
        Some(InboundCommand { command, chat_id })
    }
}

pub async fn run_booking_check(ctx: &BotContext) -> Result<AvailabilityResult, CheckError> {
    ctx.booking_scraper
        .check(&ctx.request_client, &ctx.gate_patterns)
        .await
}

/// Timer entry: notify the default chat only when slots show up.
pub async fn run_scheduled_check(ctx: &BotContext) {
    match run_booking_check(ctx).await {
        Ok(result) if result.available => {
            info!("Slots available, notifying default chat");
            let outcome = ctx
                .notifier
                .send_message(&ctx.bot_env.default_chat_id(), &result.message)
                .await;
            if !outcome.is_success() {
                warn!("Scheduled notification not delivered: {}", outcome.body);
            }
        }
        Ok(_) => info!("No slots available"),
        Err(e) => error!("Error checking citaconsular.es: {}", e),
    }
}

pub async fn run_scheduler(ctx: Arc<BotContext>) {
    let period = ctx.bot_env.check_interval();
    info!("Checking citaconsular.es every {}s", period.as_secs());
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        run_scheduled_check(&ctx).await;
    }
}

pub fn build_router(ctx: Arc<BotContext>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(telegram_webhook).fallback(bot_info))
        .fallback(bot_info)
        .with_state(ctx)
}

async fn bot_info() -> &'static str {
    BOT_INFO
}

async fn telegram_webhook(
    State(ctx): State<Arc<BotContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "application/json");
    if !is_json {
        return bot_info().await.into_response();
    }

    let update = match serde_json::from_slice::<TelegramUpdate>(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Ignoring malformed webhook payload: {}", e);
            return bot_info().await.into_response();
        }
    };
    let Some(inbound) = update.into_command() else {
        debug!("Webhook payload carries no known command");
        return bot_info().await.into_response();
    };

    match inbound.command {
        Command::CheckBooking => reply_booking_check(&ctx, &inbound.chat_id).await,
        Command::CheckStatusPage => reply_status_page(&ctx, &inbound.chat_id).await,
    }
}

async fn reply_booking_check(ctx: &BotContext, chat_id: &ChatId) -> Response {
    match run_booking_check(ctx).await {
        Ok(result) => {
            ctx.notifier.send_message(chat_id, &result.message).await;
            (StatusCode::OK, CHECK_DONE_MESSAGE).into_response()
        }
        Err(e) => {
            error!("Error checking citaconsular.es for chat {}: {}", chat_id, e);
            ctx.notifier.send_message(chat_id, CHECK_FAILED_MESSAGE).await;
            ctx.notifier.send_message(chat_id, &e.to_string()).await;
            (StatusCode::INTERNAL_SERVER_ERROR, CHECK_FAILED_MESSAGE).into_response()
        }
    }
}

async fn reply_status_page(ctx: &BotContext, chat_id: &ChatId) -> Response {
    let row = match ctx.status_page_scraper.scrape(&ctx.request_client).await {
        Ok(row) => row,
        Err(e) => {
            warn!("Status page unavailable, replying without data: {:#}", e);
            Vec::new()
        }
    };
    let outcome = ctx
        .notifier
        .send_message(chat_id, &format_status_row(&row))
        .await;
    (outcome.status, outcome.body).into_response()
}
