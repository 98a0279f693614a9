use reqwest::{
    Client, ClientBuilder, Response,
    header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, SET_COOKIE, USER_AGENT},
    redirect::Policy,
};

pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Clone)]
pub struct RequestClient {
    client: Client,
}

impl RequestClient {
    pub fn new() -> anyhow::Result<Self> {
        // Every upstream we talk to may bounce us around; follow like a browser would.
        let client = ClientBuilder::new().redirect(Policy::limited(10)).build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn fetch_url_response(&self, url: &str) -> reqwest::Result<Response> {
        self.client.get(url).send().await
    }

    pub async fn fetch_url_body(&self, url: &str) -> reqwest::Result<String> {
        let response = self.fetch_url_response(url).await?;
        response.text().await
    }
}

/// Header set that makes our requests look like they come from a desktop
/// browser that was just on `referer`.
pub fn browser_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("es"));
    if let Ok(referer) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, referer);
    }
    headers
}

/// All Set-Cookie header values of a response, skipping non-UTF-8 ones.
pub fn set_cookie_values(headers: &HeaderMap) -> Vec<&str> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect()
}
