//! Live slot availability on the citaconsular.es booking widget.

use log::{debug, info};
use reqwest::header::COOKIE;

use crate::{
    check_error::CheckError,
    config::GatePatterns,
    requests::{RequestClient, browser_headers, set_cookie_values},
};

pub const CITA_CONSULAR_PUBLIC_KEY: &str = "298f7f17f58c0836448a99edecf16e66a";
pub const CITA_CONSULAR_WIDGET_PATH: &str =
    "/es/hosteds/widgetdefault/298f7f17f58c0836448a99edecf16e66a";
pub const CITA_CONSULAR_JSONP_PATH: &str = "/onlinebookings/main/";

const JSONP_CALLBACK: &str = "cb";
const NO_HOURS_MARKER: &str = "No hay horas disponibles";
pub const NO_SLOTS_MESSAGE: &str = "No hay citas disponibles en citaconsular.es";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub available: bool,
    pub message: String,
}

/// Gate token and session id threaded through the steps of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub csrf_token: String,
    pub session_id: String,
}

impl SessionContext {
    fn cookie_header(&self) -> String {
        format!("PHPSESSID={}", self.session_id)
    }

    /// The session to use after the gate, keeping ours if the gate issued none.
    pub fn with_rotated_session(&self, rotated: Option<String>) -> Self {
        match rotated {
            Some(session_id) => Self {
                csrf_token: self.csrf_token.clone(),
                session_id,
            },
            None => self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingScraper {
    pub base_url: String,
}

impl BookingScraper {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn widget_url(&self) -> String {
        format!("{}{}", self.base_url, CITA_CONSULAR_WIDGET_PATH)
    }

    fn gated_widget_url(&self) -> String {
        format!("{}/", self.widget_url())
    }

    fn jsonp_url(&self) -> String {
        format!("{}{}", self.base_url, CITA_CONSULAR_JSONP_PATH)
    }

    pub async fn check(
        &self,
        client: &RequestClient,
        patterns: &GatePatterns,
    ) -> Result<AvailabilityResult, CheckError> {
        let session = self.acquire_gate_token(client, patterns).await?;
        let session = self.pass_gate(client, patterns, &session).await?;
        let widget_html = self.fetch_widget_payload(client, &session).await?;
        let result = availability_from_widget(&widget_html, &self.widget_url());
        info!("citaconsular.es check finished, available: {}", result.available);
        Ok(result)
    }

    /// Step 1: load the gate page for its form token and session cookie.
    pub async fn acquire_gate_token(
        &self,
        client: &RequestClient,
        patterns: &GatePatterns,
    ) -> Result<SessionContext, CheckError> {
        let url = self.widget_url();
        debug!("Fetching gate page: {}", url);
        let response = client
            .client()
            .get(&url)
            .headers(browser_headers(&format!("{}/", self.base_url)))
            .send()
            .await?;
        let session_id = patterns.extract_session_id(set_cookie_values(response.headers()));
        let html = response.text().await?;

        session_from_gate_page(&html, session_id, patterns)
    }

    /// Step 2: post the token back. Only the session cookie of the reply matters.
    pub async fn pass_gate(
        &self,
        client: &RequestClient,
        patterns: &GatePatterns,
        session: &SessionContext,
    ) -> Result<SessionContext, CheckError> {
        let response = client
            .client()
            .post(self.gated_widget_url())
            .headers(browser_headers(&self.widget_url()))
            .header(COOKIE, session.cookie_header())
            .form(&[("token", session.csrf_token.as_str())])
            .send()
            .await?;
        let rotated = patterns.extract_session_id(set_cookie_values(response.headers()));
        // Body is discarded.
        response.text().await?;

        if rotated.is_some() {
            debug!("Gate rotated the session id");
        }
        Ok(session.with_rotated_session(rotated))
    }

    /// Step 3: fetch the JSONP payload and return the widget's inner HTML.
    pub async fn fetch_widget_payload(
        &self,
        client: &RequestClient,
        session: &SessionContext,
    ) -> Result<String, CheckError> {
        let raw = client
            .client()
            .get(self.jsonp_url())
            .query(&[
                ("callback", JSONP_CALLBACK),
                ("type", "default"),
                ("publickey", CITA_CONSULAR_PUBLIC_KEY),
                ("lang", "es"),
                ("version", "3"),
                ("src", "x"),
            ])
            .headers(browser_headers(&self.gated_widget_url()))
            .header(COOKIE, session.cookie_header())
            .send()
            .await?
            .text()
            .await?;

        if raw.is_empty() {
            return Err(CheckError::EmptyResponse {
                detail: "respuesta JSONP vacía",
            });
        }
        let widget_html = decode_jsonp_payload(&raw)?;
        if widget_html.is_empty() {
            return Err(CheckError::EmptyWidget);
        }
        Ok(widget_html)
    }
}

/// Builds the session for the next step out of the gate page body and the
/// session id found in its cookies.
pub fn session_from_gate_page(
    html: &str,
    session_id: Option<String>,
    patterns: &GatePatterns,
) -> Result<SessionContext, CheckError> {
    if html.is_empty() {
        return Err(CheckError::EmptyResponse {
            detail: "servidor devolvió respuesta vacía en paso 1",
        });
    }
    let csrf_token = patterns
        .extract_token(html)
        .ok_or(CheckError::TokenNotFound)?;
    let session_id = session_id.ok_or(CheckError::SessionCookieMissing)?;
    Ok(SessionContext {
        csrf_token,
        session_id,
    })
}

/// Unwraps `cb("<escaped html>");` into the html it carries.
///
/// The argument sits between the first `("` and the last `");` and is
/// decoded with JSON string escaping rules.
pub fn decode_jsonp_payload(raw: &str) -> Result<String, CheckError> {
    let start = raw.find("(\"").ok_or(CheckError::JsonpParse)? + 2;
    let end = raw.rfind("\");").ok_or(CheckError::JsonpParse)?;
    if end < start {
        return Err(CheckError::JsonpParse);
    }
    let escaped = &raw[start..end];
    serde_json::from_str::<String>(&format!("\"{escaped}\"")).map_err(|_| CheckError::JsonpParse)
}

pub fn availability_from_widget(widget_html: &str, widget_url: &str) -> AvailabilityResult {
    if widget_html.contains(NO_HOURS_MARKER) {
        return AvailabilityResult {
            available: false,
            message: NO_SLOTS_MESSAGE.to_string(),
        };
    }
    AvailabilityResult {
        available: true,
        message: format!("¡HAY CITAS DISPONIBLES en citaconsular.es!\n\nRevisá: {widget_url}"),
    }
}
