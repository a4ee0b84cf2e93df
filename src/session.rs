use std::fmt;

use anyhow::{Context, Result};
use reqwest::{redirect, Client, StatusCode};
use tracing::debug;

use crate::{
    request_builder::{browser_headers, FormRequest},
    url_builder::URLBuilder,
};

/// Name of the cookie the login page sets with the anti-forgery token
pub const XSRF_COOKIE: &str = "_xsrf";

/// Value of the submit button on the login form
const LOGIN_ACTION: &str = "Войти";

const MAX_REDIRECTS: usize = 10;

/// Login and password for the site account
///
/// Only ever held in memory for the length of a run.
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A logged-in conversation with the job site
///
/// The session owns one HTTP client (connection pool and cookie jar) and the
/// XSRF token handed out by the login page. Dropping the session releases
/// its connections.
pub struct Session {
    urls: URLBuilder,
    client: Client,
    xsrf: Option<String>,
}

impl Session {
    /// Creates a new session against the given base URL
    ///
    /// No request is made until one of the operations is called.
    pub fn new(base_url: &str) -> Result<Self> {
        let urls = URLBuilder::from_input(base_url)?;

        let client = Client::builder()
            .default_headers(browser_headers()?)
            .cookie_store(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            urls,
            client,
            xsrf: None,
        })
    }

    pub fn base_url(&self) -> &str {
        self.urls.base()
    }

    /// Loads the login page and caches the `_xsrf` cookie it sets
    ///
    /// A page without the cookie is not an error; the token is simply absent
    /// and `None` is returned. An empty cookie value counts as absent.
    pub async fn fetch_token(&mut self) -> Result<Option<String>> {
        let url = self.urls.login();
        debug!(%url, "fetching login page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("fetch login page")?;

        self.xsrf = response
            .cookies()
            .find(|cookie| cookie.name() == XSRF_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());

        debug!(
            status = response.status().as_u16(),
            token = self.xsrf.is_some(),
            "login page loaded"
        );

        Ok(self.xsrf.clone())
    }

    /// Posts the login form
    ///
    /// Fetches the token first if none is cached yet. Success means the site
    /// answered with exactly 200; redirects that end elsewhere, client errors
    /// and server errors all count as a failed login. The response body is
    /// not inspected, so a 200 page that reports a wrong password still
    /// counts as success.
    pub async fn authenticate(&mut self, credentials: Credentials) -> Result<bool> {
        if self.xsrf.is_none() {
            self.fetch_token().await?;
        }

        let back_url = self.urls.back_url();
        let request = FormRequest::new(self.urls.login())
            .field("username", &credentials.login)
            .field("password", &credentials.password)
            .field("backUrl", &back_url)
            .field(XSRF_COOKIE, self.xsrf.as_deref().unwrap_or_default())
            .field("action", LOGIN_ACTION);

        debug!(login = %credentials.login, "posting login form");

        let response = request
            .into_request(&self.client)
            .send()
            .await
            .context("post login form")?;

        let status = response.status();
        debug!(status = status.as_u16(), "login answered");

        Ok(status == StatusCode::OK)
    }

    /// Bumps the last-modified time of one resume
    ///
    /// Requires a cached token: without one this returns `false` and makes no
    /// request. The token travels both in the cookie jar and in the
    /// `X-Xsrftoken` header, and the resume page goes in as referer; the site
    /// checks all of them.
    pub async fn update_resource(&self, resume_id: &str) -> Result<bool> {
        let Some(xsrf) = self.xsrf.as_deref() else {
            debug!(resume_id, "no token cached, skipping touch");
            return Ok(false);
        };

        let referer = self.urls.resume_page(resume_id);
        let request = FormRequest::new(self.urls.touch())
            .field("resume", resume_id)
            .field("undirectable", "true")
            .header("X-Xsrftoken", xsrf)?
            .header("X-Requested-With", "XMLHttpRequest")?
            .header("Referer", &referer)?;

        debug!(resume_id, "touching resume");

        let response = request
            .into_request(&self.client)
            .send()
            .await
            .with_context(|| format!("touch resume {}", resume_id))?;

        let status = response.status();
        debug!(resume_id, status = status.as_u16(), "touch answered");

        Ok(status == StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{
        body_string_contains, header, header_regex, method, path, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn login_page(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).insert_header("set-cookie", format!("_xsrf={}; Path=/", token))
    }

    async fn mount_login_page(server: &MockServer, token: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/account/login"))
            .and(query_param("backurl", "/"))
            .respond_with(login_page(token))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let session = Session::new("https://hh.ru/").unwrap();
        assert_eq!(session.base_url(), "https://hh.ru");
        assert_eq!(session.xsrf.as_deref(), None);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("alice", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn fetch_token_reads_xsrf_cookie() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        let mut session = Session::new(&server.uri()).unwrap();
        let token = session.fetch_token().await.unwrap();

        assert_eq!(token.as_deref(), Some("tok123"));
        assert_eq!(session.xsrf.as_deref(), Some("tok123"));
    }

    #[tokio::test]
    async fn fetch_token_without_cookie_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();

        assert_eq!(session.fetch_token().await.unwrap(), None);
        assert_eq!(session.xsrf.as_deref(), None);
    }

    #[tokio::test]
    async fn authenticate_fetches_token_exactly_once() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        let back_url = form_urlencoded::byte_serialize(format!("{}/", server.uri()).as_bytes())
            .collect::<String>();

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .and(query_param("backurl", "/"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("password=secret"))
            .and(body_string_contains(format!("backUrl={}", back_url)))
            .and(body_string_contains("_xsrf=tok123"))
            .and(body_string_contains("action="))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        let ok = session
            .authenticate(Credentials::new("alice", "secret"))
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(session.xsrf.as_deref(), Some("tok123"));
    }

    #[tokio::test]
    async fn authenticate_reuses_cached_token() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        session.fetch_token().await.unwrap();

        assert!(session
            .authenticate(Credentials::new("alice", "secret"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn authenticate_redirect_is_failure() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        let ok = session
            .authenticate(Credentials::new("alice", "wrong"))
            .await
            .unwrap();

        assert!(!ok);
    }

    #[tokio::test]
    async fn authenticate_without_token_still_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .and(body_string_contains("_xsrf=&"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        let ok = session
            .authenticate(Credentials::new("alice", "secret"))
            .await
            .unwrap();

        assert!(!ok);
    }

    #[tokio::test]
    async fn update_without_token_makes_no_request() {
        let server = MockServer::start().await;

        let session = Session::new(&server.uri()).unwrap();
        let ok = session.update_resource("abc").await.unwrap();

        assert!(!ok);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_sends_token_header_and_referer() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        Mock::given(method("POST"))
            .and(path("/applicant/resumes/touch"))
            .and(header("x-xsrftoken", "tok123"))
            .and(header("x-requested-with", "XMLHttpRequest"))
            .and(header(
                "referer",
                format!("{}/applicant/resumes/abc", server.uri()).as_str(),
            ))
            .and(body_string_contains("resume=abc"))
            .and(body_string_contains("undirectable=true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        session.fetch_token().await.unwrap();

        assert!(session.update_resource("abc").await.unwrap());
    }

    #[tokio::test]
    async fn update_non_200_is_failure() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        Mock::given(method("POST"))
            .and(path("/applicant/resumes/touch"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        session.fetch_token().await.unwrap();

        assert!(!session.update_resource("abc").await.unwrap());
    }

    #[tokio::test]
    async fn login_replays_xsrf_cookie() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .and(header_regex("cookie", "_xsrf=tok123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();

        assert!(session
            .authenticate(Credentials::new("alice", "secret"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn touch_replays_xsrf_cookie() {
        let server = MockServer::start().await;
        mount_login_page(&server, "tok123", 1).await;

        Mock::given(method("POST"))
            .and(path("/applicant/resumes/touch"))
            .and(header_regex("cookie", "_xsrf=tok123"))
            .and(header("x-xsrftoken", "tok123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(&server.uri()).unwrap();
        session.fetch_token().await.unwrap();

        assert!(session.update_resource("abc").await.unwrap());
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let mut session = Session::new("http://127.0.0.1:1").unwrap();
        let error = session.fetch_token().await.unwrap_err();
        assert_eq!(error.to_string(), "fetch login page");
    }
}
