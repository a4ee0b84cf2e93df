use anyhow::{bail, Context, Result};
use url::Url;

/// Builds the site endpoints the session talks to from a single base URL
///
/// The base URL is kept exactly as the user typed it, minus any trailing
/// slashes, so endpoint paths can be appended with a plain `format!`.
#[derive(Clone, Debug, PartialEq)]
pub struct URLBuilder {
    base: String,
}

impl URLBuilder {
    /// Creates a new URL builder from user input
    ///
    /// We accept two forms of input:
    /// - A complete URL, e.g. "https://hh.ru/"
    /// - A URL with no scheme, e.g. "hh.ru", which is assumed to be HTTPS
    pub fn from_input(input: &str) -> Result<Self> {
        let input = input.trim();

        let base = match input {
            input if input.starts_with("http://") || input.starts_with("https://") => {
                input.to_string()
            }
            "" => bail!("base URL is empty"),
            s => format!("https://{}", s),
        };

        let base = base.trim_end_matches('/').to_string();

        let parsed_url = base.parse::<Url>().context("parse base URL")?;
        parsed_url.host_str().context("base URL has no host")?;

        if parsed_url.query().is_some() || parsed_url.fragment().is_some() {
            bail!("base URL must not carry a query or fragment");
        }

        Ok(Self { base })
    }

    /// Returns the base URL without a trailing slash
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The login page, which hands out the `_xsrf` cookie on GET and accepts
    /// the credentials form on POST
    pub fn login(&self) -> String {
        format!("{}/account/login?backurl=%2F", self.base)
    }

    /// Where the site should send us after a successful login
    pub fn back_url(&self) -> String {
        format!("{}/", self.base)
    }

    pub fn touch(&self) -> String {
        format!("{}/applicant/resumes/touch", self.base)
    }

    /// The page a resume is edited from; the touch endpoint wants it as the
    /// referer
    pub fn resume_page(&self, resume_id: &str) -> String {
        format!("{}/applicant/resumes/{}", self.base, resume_id)
    }
}
