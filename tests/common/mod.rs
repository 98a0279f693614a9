#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cita_checker::{
    BotContext, ChatId, Notifier, SendOutcome,
    booking_scraper::{CITA_CONSULAR_JSONP_PATH, CITA_CONSULAR_WIDGET_PATH},
    config::BotEnv,
    requests::{BROWSER_UA, RequestClient},
};
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{body_string, header, method, path, query_param},
};

pub const STATUS_PAGE_PATH: &str = "/informacion/apertura-de-citas.html";
pub const DEFAULT_CHAT_ID: &str = "42";

/// Notifier double that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> SendOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        SendOutcome::sent(text)
    }
}

pub struct TestApp {
    pub upstream: MockServer,
    pub ctx: Arc<BotContext>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    /// Context whose widget host and status page both live on one mock server.
    pub async fn spawn() -> Self {
        Self::spawn_with_env(|_| {}).await
    }

    pub async fn spawn_with_env(customize: impl FnOnce(&mut BotEnv)) -> Self {
        let upstream = MockServer::start().await;
        let mut bot_env = test_env(&upstream.uri());
        customize(&mut bot_env);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = BotContext::with_notifier(
            bot_env,
            RequestClient::new().expect("Failed to build request client"),
            notifier.clone(),
        )
        .expect("Failed to build bot context");
        Self {
            upstream,
            ctx: Arc::new(ctx),
            notifier,
        }
    }

    pub fn widget_url(&self) -> String {
        widget_url(&self.upstream)
    }
}

pub fn widget_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), CITA_CONSULAR_WIDGET_PATH)
}

pub fn test_env(upstream_uri: &str) -> BotEnv {
    BotEnv {
        telegram_token: "123:test".to_string(),
        telegram_chat_id: DEFAULT_CHAT_ID.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        check_interval_secs: 60,
        telegram_api_url: "http://127.0.0.1:9".to_string(),
        cita_consular_base_url: upstream_uri.to_string(),
        status_page_url: format!("{upstream_uri}{STATUS_PAGE_PATH}"),
    }
}

/// Matches a single header value verbatim, commas included.
pub fn exact_header(
    name: &'static str,
    expected: String,
) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| {
        request
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected)
    }
}

pub fn gate_page(token: &str) -> String {
    format!(
        r#"<html><body><form method="post"><input type="hidden" name="token" value="{token}"><button>Continuar</button></form></body></html>"#
    )
}

pub async fn mount_gate_page(server: &MockServer, html: String, session_id: Option<&str>) {
    let mut response = ResponseTemplate::new(200).set_body_string(html);
    if let Some(session_id) = session_id {
        response =
            response.insert_header("set-cookie", format!("PHPSESSID={session_id}; path=/"));
    }
    Mock::given(method("GET"))
        .and(path(CITA_CONSULAR_WIDGET_PATH))
        .and(exact_header("user-agent", BROWSER_UA.to_string()))
        .and(exact_header("referer", format!("{}/", server.uri())))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_gate_pass(
    server: &MockServer,
    token: &str,
    session_id: &str,
    rotated: Option<&str>,
) {
    let mut response = ResponseTemplate::new(200).set_body_string("<html>ok</html>");
    if let Some(rotated) = rotated {
        response =
            response.insert_header("set-cookie", format!("PHPSESSID={rotated}; path=/"));
    }
    Mock::given(method("POST"))
        .and(path(format!("{CITA_CONSULAR_WIDGET_PATH}/")))
        .and(exact_header("user-agent", BROWSER_UA.to_string()))
        .and(exact_header("referer", widget_url(server)))
        .and(header("cookie", format!("PHPSESSID={session_id}").as_str()))
        .and(body_string(format!("token={token}")))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_widget_payload(server: &MockServer, session_id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(CITA_CONSULAR_JSONP_PATH))
        .and(query_param("callback", "cb"))
        .and(query_param("type", "default"))
        .and(query_param("publickey", "298f7f17f58c0836448a99edecf16e66a"))
        .and(query_param("lang", "es"))
        .and(query_param("version", "3"))
        .and(query_param("src", "x"))
        .and(exact_header("user-agent", BROWSER_UA.to_string()))
        .and(exact_header("referer", format!("{}/", widget_url(server))))
        .and(header("cookie", format!("PHPSESSID={session_id}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts a full gate sequence that ends with `jsonp_body`.
pub async fn mount_booking_flow(server: &MockServer, jsonp_body: &str) {
    mount_gate_page(server, gate_page("tok123"), Some("sess1")).await;
    mount_gate_pass(server, "tok123", "sess1", Some("sess2")).await;
    mount_widget_payload(server, "sess2", jsonp_body).await;
}

pub async fn mount_unreachable_steps(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(CITA_CONSULAR_JSONP_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

pub async fn mount_status_page(server: &MockServer, html: &str) {
    Mock::given(method("GET"))
        .and(path(STATUS_PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

/// URL of a local port nothing is listening on.
pub fn closed_local_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe port");
    let addr = listener.local_addr().expect("Failed to read probe address");
    drop(listener);
    format!("http://{addr}")
}
