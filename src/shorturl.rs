use anyhow::Context as _;
use url::Url;

use crate::config::{Config, ShortUrlCredentials};

/// Client for the YOURLS-style URL shortener. Shortening is an
/// enrichment: any failure falls back to the long url.
#[derive(Debug, Clone)]
pub struct ShortUrlClient {
    client: reqwest::Client,
    credentials: Option<ShortUrlCredentials>,
}

impl ShortUrlClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.shorturl_timeout)
            .build()
            .context("build short-url http client")?;
        Ok(Self {
            client,
            credentials: config.shortener.clone(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns the shortened form of `long_url`, or `long_url` itself
    /// when the shortener is disabled or unreachable.
    pub async fn shorten(&self, long_url: &str) -> String {
        let Some(credentials) = self.credentials.as_ref() else {
            return long_url.to_owned();
        };

        let request_url = match Self::request_url(credentials, long_url) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(?err, "build short-url request");
                return long_url.to_owned();
            }
        };

        match self.fetch(request_url).await {
            Ok(short) if !short.trim().is_empty() => short.trim().to_owned(),
            Ok(_) => long_url.to_owned(),
            Err(err) => {
                tracing::debug!(long_url, "short-url lookup failed: {err:#}");
                long_url.to_owned()
            }
        }
    }

    fn request_url(credentials: &ShortUrlCredentials, long_url: &str) -> anyhow::Result<Url> {
        let mut url = Url::parse(&credentials.site_url).context("parse shortener site url")?;
        url.query_pairs_mut()
            .append_pair("signature", &credentials.signature)
            .append_pair("action", "shorturl")
            .append_pair("format", "simple")
            .append_pair("url", long_url);
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("shortener returned {}", response.status());
        }
        response.text().await.context("read shortener response")
    }

    /// Short-url widget shown on individual records.
    pub async fn widget(&self, long_url: &str) -> String {
        let short = self.shorten(long_url).await;
        format!(
            "<p><strong>Short URL</strong>: \
             <input type='text' name='yourl' id='yourl' value=\"{}\" size='30'></p>",
            html_escape::encode_double_quoted_attribute(&short)
        )
    }
}
