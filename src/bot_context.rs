use std::sync::Arc;

use crate::{
    booking_scraper::BookingScraper,
    config::{BotEnv, GatePatterns},
    notifier::{Notifier, TelegramNotifier},
    requests::RequestClient,
    status_page_scraper::StatusPageScraper,
};

/// Everything both entry points need to run a check and report it.
pub struct BotContext {
    pub bot_env: BotEnv,
    pub gate_patterns: GatePatterns,
    pub request_client: RequestClient,
    pub booking_scraper: BookingScraper,
    pub status_page_scraper: StatusPageScraper,
    pub notifier: Arc<dyn Notifier>,
}

impl BotContext {
    pub fn new() -> anyhow::Result<Self> {
        let bot_env = BotEnv::new()?;
        let request_client = RequestClient::new()?;
        let notifier = Arc::new(TelegramNotifier::new(
            request_client.clone(),
            bot_env.telegram_api_url.clone(),
            bot_env.telegram_token.clone(),
        ));
        Self::with_notifier(bot_env, request_client, notifier)
    }

    pub fn with_notifier(
        bot_env: BotEnv,
        request_client: RequestClient,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let gate_patterns = GatePatterns::new()?;
        let booking_scraper = BookingScraper::new(bot_env.cita_consular_base_url.clone());
        let status_page_scraper = StatusPageScraper::new(bot_env.status_page_url.clone());
        Ok(BotContext {
            bot_env,
            gate_patterns,
            request_client,
            booking_scraper,
            status_page_scraper,
            notifier,
        })
    }
}
