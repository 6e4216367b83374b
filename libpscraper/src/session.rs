use crate::errors::{Result, ScrapeError};
use reqwest::{header, Client, RequestBuilder};
use std::str::FromStr;
use tracing::instrument;
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// A single `key=value` cookie sent with every request of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub key: String,
    pub value: String,
}

impl Cookie {
    fn header_value(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

impl FromStr for Cookie {
    type Err = ScrapeError;

    /// Splits on the first `=`. Both sides must be non-empty.
    fn from_str(raw: &str) -> Result<Self> {
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() && !value.is_empty() => Ok(Cookie {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(ScrapeError::InvalidCookie(raw.to_string())),
        }
    }
}

/// Shared http state for a run. Built once and then only read.
#[derive(Debug, Clone)]
pub struct SessionContext {
    client: Client,
    cookie: Option<Cookie>,
}

impl SessionContext {
    pub fn new(cookie: Option<Cookie>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::ClientBuild(e.to_string()))?;
        Ok(Self { client, cookie })
    }

    pub fn cookie(&self) -> Option<&Cookie> {
        self.cookie.as_ref()
    }

    /// A GET request with the session cookie attached.
    pub fn get(&self, url: &Url) -> RequestBuilder {
        let request = self.client.get(url.as_str());
        match &self.cookie {
            Some(cookie) => request.header(header::COOKIE, cookie.header_value()),
            None => request,
        }
    }

    /// Downloads the page at `url` and returns its markup.
    #[instrument(skip(self, url), fields(url = %url))]
    pub async fn fetch_page(&self, url: &Url) -> Result<String> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::network(url.as_str(), e))?;
        if !response.status().is_success() {
            tracing::error!("Error status code received : {} |{}|", response.status(), url);
            return Err(ScrapeError::ErrorStatusCode {
                status_code: response.status().to_string(),
                url: url.to_string(),
            });
        }
        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::network(url.as_str(), e))?;
        tracing::debug!("Fetched {} bytes of markup from {}", html.len(), url);
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_splits_on_first_equals() {
        let cookie: Cookie = "sessionid=abc=def".parse().unwrap();
        assert_eq!(cookie.key, "sessionid");
        assert_eq!(cookie.value, "abc=def");
        assert_eq!(cookie.header_value(), "sessionid=abc=def");
    }

    #[test]
    fn cookie_without_value_is_rejected() {
        assert_eq!(
            "sessionid".parse::<Cookie>(),
            Err(ScrapeError::InvalidCookie("sessionid".into()))
        );
        assert!("=abc".parse::<Cookie>().is_err());
        assert!("key=".parse::<Cookie>().is_err());
    }

    #[test]
    fn request_carries_cookie_header() {
        let session = SessionContext::new(Some("token=42".parse().unwrap())).unwrap();
        let request = session
            .get(&Url::parse("http://example.com/").unwrap())
            .build()
            .unwrap();
        assert_eq!(request.headers()[header::COOKIE], "token=42");
    }

    #[test]
    fn request_without_cookie_has_no_cookie_header() {
        let session = SessionContext::new(None).unwrap();
        let request = session
            .get(&Url::parse("http://example.com/").unwrap())
            .build()
            .unwrap();
        assert!(request.headers().get(header::COOKIE).is_none());
    }
}
