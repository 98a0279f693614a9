use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, de::DeserializeOwned};

use crate::notifier::ChatId;

pub const DEFAULT_CITA_CONSULAR_BASE_URL: &str = "https://www.citaconsular.es";
pub const DEFAULT_STATUS_PAGE_URL: &str =
    "https://www.cgeonline.com.ar/informacion/apertura-de-citas.html";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// The env vars needed to run the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct BotEnv {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_cita_consular_base_url")]
    pub cita_consular_base_url: String,
    #[serde(default = "default_status_page_url")]
    pub status_page_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_check_interval_secs() -> u64 {
    900
}

fn default_telegram_api_url() -> String {
    DEFAULT_TELEGRAM_API_URL.to_string()
}

fn default_cita_consular_base_url() -> String {
    DEFAULT_CITA_CONSULAR_BASE_URL.to_string()
}

fn default_status_page_url() -> String {
    DEFAULT_STATUS_PAGE_URL.to_string()
}

impl BotEnv {
    pub fn new() -> anyhow::Result<Self> {
        let env = Self::load_from_env()?;
        env.validate()?;
        Ok(env)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.check_interval_secs == 0 {
            return Err(anyhow::anyhow!("CHECK_INTERVAL_SECS must be greater than zero"));
        }
        Ok(())
    }

    pub fn default_chat_id(&self) -> ChatId {
        ChatId::Text(self.telegram_chat_id.clone())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// Patterns used to pull the gate token and the session id out of the
/// widget's first response.
pub struct GatePatterns {
    pub token_regex: Regex,
    pub session_cookie_regex: Regex,
}

impl GatePatterns {
    pub fn new() -> anyhow::Result<Self> {
        let token_regex = Regex::new(r#"name="token" value="([^"]+)""#)?;
        let session_cookie_regex = Regex::new(r"PHPSESSID=([^;]+)")?;
        Ok(Self {
            token_regex,
            session_cookie_regex,
        })
    }

    pub fn extract_token(&self, html: &str) -> Option<String> {
        let caps = self.token_regex.captures(html)?;
        Some(caps.get(1)?.as_str().to_string())
    }

    /// Returns the first PHPSESSID found across all Set-Cookie values.
    pub fn extract_session_id<'a>(
        &self,
        set_cookie_values: impl IntoIterator<Item = &'a str>,
    ) -> Option<String> {
        set_cookie_values.into_iter().find_map(|value| {
            let caps = self.session_cookie_regex.captures(value)?;
            Some(caps.get(1)?.as_str().to_string())
        })
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
