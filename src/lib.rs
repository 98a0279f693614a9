mod bot_context;
mod check_error;
mod text_manipulators;

pub mod booking_scraper;
pub mod config;
pub mod dispatcher;
pub mod notifier;
pub mod requests;
pub mod status_page_scraper;

pub use bot_context::BotContext;
pub use booking_scraper::{AvailabilityResult, BookingScraper, SessionContext};
pub use check_error::CheckError;
pub use notifier::{ChatId, Notifier, SendOutcome, TelegramNotifier};
pub use status_page_scraper::{StatusPageScraper, StatusRow};
