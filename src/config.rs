use std::time::Duration;

/// Opaque exact-match flag markers embedded in record metadata.
///
/// These are not human-readable values; a record carries a flag only when
/// the corresponding XML node equals the token byte for byte.
#[derive(Debug, Clone)]
pub struct FlagTokens {
    pub reviewed: String,
    pub adopted: String,
    pub accessible: String,
    pub ancillary: String,
}

impl Default for FlagTokens {
    fn default() -> Self {
        Self {
            reviewed: "REVIEWED149df27a3ba8b2ddeff0d7ed1e6e54e4".to_owned(),
            adopted: "AdoptedYesa37e464dc2330136a2c7f1138cf3c7a1".to_owned(),
            accessible: "AccessYes743d2920dc2c91040a3e48d6a6e32cc3".to_owned(),
            ancillary: "ANCILLARY952a557ef465997b3acfb73fa4b609c7e61182b9".to_owned(),
        }
    }
}

/// Credentials for the YOURLS-style URL shortener.
#[derive(Debug, Clone)]
pub struct ShortUrlCredentials {
    pub site_url: String,
    pub signature: String,
}

/// Injected configuration for the catalogue view pipeline.
///
/// Everything external lives here (endpoints, sentinel tokens, asset and
/// link bases) so tests can point the pipeline at fakes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix for catalogue-internal links; empty generates relative urls.
    pub base_url: String,

    /// Base url for badge icon images.
    pub assets_base: String,

    /// Publisher name emitted in the schema.org microdata.
    pub publisher: String,

    /// Creative Commons license lookup endpoint (trailing slash expected).
    pub license_endpoint: String,

    /// Timeout for one license lookup.
    pub license_timeout: Duration,

    /// Redirect script that serves the citation PDF.
    pub citation_redirect_base: String,

    /// Host whose bare urls are treated as print-on-demand copies.
    pub print_host: String,

    /// Timeout for one short-url lookup.
    pub shorturl_timeout: Duration,

    /// Optional URL shortener; `None` disables the short-url widget.
    pub shortener: Option<ShortUrlCredentials>,

    pub flags: FlagTokens,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            assets_base: "/assets/images/".to_owned(),
            publisher: "BCcampus".to_owned(),
            license_endpoint: "https://api.creativecommons.org/rest/1.5/".to_owned(),
            license_timeout: Duration::from_secs(20),
            citation_redirect_base:
                "https://open.bccampus.ca/wp-content/opensolr/opentextbooks/redirects.php"
                    .to_owned(),
            print_host: "opentextbook.docsol.sfu.ca".to_owned(),
            shorturl_timeout: Duration::from_secs(10),
            shortener: None,
            flags: FlagTokens::default(),
        }
    }
}
