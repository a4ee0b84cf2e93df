use std::str::FromStr;

use anyhow::{Context, Result};
use http::{header, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

/// Headers sent with every request so the site sees an ordinary browser
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Accept-Language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("Connection", "keep-alive"),
    ("DNT", "1"),
];

/// Returns the browser-impersonation headers as a header map, ready to be
/// installed as client defaults
pub fn browser_headers() -> Result<HeaderMap> {
    let mut map = HeaderMap::new();

    for (key, value) in BROWSER_HEADERS {
        add_header(&mut map, key, value)?;
    }

    Ok(map)
}

/// A form-encoded POST, built up field by field before being handed to a
/// reqwest client
pub struct FormRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub fields: Vec<(String, String)>,
}

impl FormRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            fields: Vec::new(),
        }
    }

    /// Appends a form field, keeping insertion order
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds a per-request header on top of the client defaults
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        add_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// Serializes the fields as `application/x-www-form-urlencoded`
    pub fn encoded_body(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        for (name, value) in &self.fields {
            serializer.append_pair(name, value);
        }

        serializer.finish()
    }

    /// Turns the form into a reqwest request on the given client
    pub fn into_request(self, client: &Client) -> reqwest::RequestBuilder {
        let body = self.encoded_body();

        client
            .post(&self.url)
            .headers(self.headers)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
    }
}

fn add_header(map: &mut HeaderMap, key: &str, value: &str) -> Result<()> {
    let key = HeaderName::from_str(key).context("valid header name")?;
    let value = HeaderValue::from_str(value).context("valid header value")?;
    map.append(key, value);
    Ok(())
}
