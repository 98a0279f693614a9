use anyhow::Context;
use log::{info, warn};
use scraper::Selector;

use crate::{
    requests::RequestClient,
    text_manipulators::{contains_all, extract_text, extract_trimmed_text},
};

const TRAMITE_NAME: &str = "Pasaportes";
const RENEWAL_QUALIFIER: &str = "renovación y primera vez";
pub const NO_INFO_MESSAGE: &str = "No hay información disponible";

/// Cell texts of the passport row: tramite, last opening date, next openings.
/// Empty when the row is not on the page.
pub type StatusRow = Vec<String>;

#[derive(Debug, Clone)]
pub struct StatusPageScraper {
    pub url: String,
}

impl StatusPageScraper {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub async fn scrape(&self, client: &RequestClient) -> anyhow::Result<StatusRow> {
        info!("Scraping status page: {}", self.url);
        let html = client
            .fetch_url_body(&self.url)
            .await
            .with_context(|| format!("failed to fetch status page {}", self.url))?;
        let row = find_status_row(&html)?;
        if row.is_empty() {
            warn!("Passport row not found on {}", self.url);
        }
        Ok(row)
    }
}

/// Finds the passport renewal row in any table of the page.
///
/// The last matching row wins.
pub fn find_status_row(html: &str) -> anyhow::Result<StatusRow> {
    let row_selector = Selector::parse("table tr")
        .map_err(|e| anyhow::anyhow!("invalid row selector: {e:?}"))?;
    let cell_selector =
        Selector::parse("td").map_err(|e| anyhow::anyhow!("invalid cell selector: {e:?}"))?;

    let document = scraper::Html::parse_document(html);
    let passport_row = document
        .select(&row_selector)
        .filter(|row| contains_all(extract_text(*row).trim(), &[TRAMITE_NAME, RENEWAL_QUALIFIER]))
        .last();

    Ok(passport_row
        .map(|row| row.select(&cell_selector).map(extract_trimmed_text).collect())
        .unwrap_or_default())
}

pub fn format_status_row(row: &[String]) -> String {
    if row.is_empty() {
        return NO_INFO_MESSAGE.to_string();
    }
    let cell = |index: usize| row.get(index).map(String::as_str).unwrap_or("-");

    format!(
        "Pasaportes renovación y primera vez:\n\
         ------------------------------------\n\
         \n\
         - Ultima fecha de apertura de turnos: {}\n\
         - Proximos turnos: {}",
        cell(1),
        cell(2)
    )
}
