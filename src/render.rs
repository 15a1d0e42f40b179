use std::fmt::Write as _;
use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};
use url::Url;

use crate::attachment;
use crate::config::Config;
use crate::license::LicenseResolver;
use crate::metadata::{self, BookMetadata};
use crate::records::BookRecord;
use crate::shorturl::ShortUrlClient;
use crate::text;

/// Renders one book record (or a collection) into the catalogue's HTML
/// fragment with embedded schema.org/citation microdata.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: Arc<Config>,
    license: LicenseResolver,
    shortener: ShortUrlClient,
}

impl Renderer {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let license = LicenseResolver::new(&config)?;
        let shortener = ShortUrlClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            license,
            shortener,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Full record view for a single book.
    ///
    /// Enrichment failures (license text, short url, cover) degrade to
    /// placeholders or omitted sections; the core listing always renders.
    pub async fn render_one(&self, book: &BookRecord) -> String {
        let meta = metadata::extract(&book.metadata, &self.config.flags);
        let citation_pdf_url =
            attachment::citation_pdf_url(&book.attachments, &self.config.citation_redirect_base);
        let authors = text::authors_csv(book.content_owners());

        let mut html = self.structured_data(book, &meta, &citation_pdf_url);

        let _ = write!(
            html,
            "<h2 itemprop='name'>{}</h2>",
            encode_text(&book.name)
        );
        html.push_str(&self.revision_banner(&meta));
        html.push_str(&self.adaptation_banner(&meta));
        html.push_str(&self.cover_figure(&meta));

        let _ = write!(
            html,
            "<p><strong>Description</strong>: <span itemprop='description'>{}</span></p>",
            book.description
        );
        let _ = write!(
            html,
            "<p><strong>Author</strong>: <span itemprop='author copyrightHolder'>{}</span></p>",
            encode_text(&authors)
        );
        html.push_str(&self.sources_paragraph(&meta));
        html.push_str(HELP_BLOCK);
        html.push_str(&self.attachment_list(book));

        if self.shortener.enabled() {
            html.push_str(&self.shortener.widget(&book.links.view).await);
        }

        html.push_str(&self.license_footer(&meta, &authors).await);
        html
    }

    /// Record views for a whole collection, concatenated in input order.
    ///
    /// License lookups are independent, so records render concurrently;
    /// output order still matches the input sequence, not completion
    /// order.
    pub async fn render_many(&self, books: &[BookRecord]) -> String {
        let mut handles = Vec::with_capacity(books.len());
        for book in books {
            let renderer = self.clone();
            let book = book.clone();
            handles.push(tokio::spawn(
                async move { renderer.render_one(&book).await },
            ));
        }

        let mut html = String::new();
        for handle in handles {
            match handle.await {
                Ok(fragment) => html.push_str(&fragment),
                Err(err) => tracing::error!(?err, "record render task failed"),
            }
        }
        html
    }

    /// Meta/link tags not represented in the visible content.
    fn structured_data(
        &self,
        book: &BookRecord,
        meta: &BookMetadata,
        citation_pdf_url: &str,
    ) -> String {
        let mut html = String::new();

        let _ = write!(
            html,
            "<meta itemprop='publisher' content=\"{}\">\n",
            encode_double_quoted_attribute(&self.config.publisher)
        );
        html.push_str("<meta itemprop='educationalUse' content='Open textbook study'>\n");
        html.push_str("<meta itemprop='audience' content='student'>\n");
        html.push_str("<meta itemprop='interactivityType' content='mixed'>\n");
        html.push_str("<meta itemprop='learningResourceType' content='textbook'>\n");
        html.push_str("<meta itemprop='typicalAgeRange' content='17+'>\n");
        let _ = write!(
            html,
            "<meta itemprop='educationalAlignment' content=\"{}\">\n",
            encode_double_quoted_attribute(&subject_csv(meta))
        );
        let _ = write!(
            html,
            "<meta itemprop='inLanguage' content=\"{}\">\n",
            encode_double_quoted_attribute(&meta.language)
        );
        let _ = write!(
            html,
            "<meta name='citation_title' content=\"{}\">\n",
            encode_double_quoted_attribute(&meta.title)
        );
        let _ = write!(
            html,
            "<meta name='citation_language' content=\"{}\">\n",
            encode_double_quoted_attribute(&meta.language)
        );
        for level in [&meta.subject_class_level1, &meta.subject_class_level2] {
            let _ = write!(
                html,
                "<meta name='citation_keywords' content=\"{}\">\n",
                encode_double_quoted_attribute(level.as_deref().unwrap_or_default())
            );
        }
        let _ = write!(
            html,
            "<meta name='citation_pdf_url' content=\"{}\">\n",
            encode_double_quoted_attribute(citation_pdf_url)
        );

        // citation authors: surname only when the name is comma-formed
        for owner in book.content_owners() {
            let author = owner
                .name
                .split_once(',')
                .map(|(surname, _)| surname)
                .unwrap_or(owner.name.as_str());
            let _ = write!(
                html,
                "<meta name='citation_author' content=\"{}\">\n",
                encode_double_quoted_attribute(author)
            );
        }

        let published = text::display_date(&book.created_date, "%Y/%m/%d");
        let _ = write!(
            html,
            "<meta name='citation_online_date' content=\"{published}\">\n"
        );
        let _ = write!(
            html,
            "<meta name='citation_publication_date' content=\"{published}\">\n"
        );
        let _ = write!(
            html,
            "<meta itemprop='datePublished' content=\"{}\">\n",
            encode_double_quoted_attribute(&book.created_date)
        );
        let _ = write!(
            html,
            "<meta itemprop='dateModified' content=\"{}\">\n",
            encode_double_quoted_attribute(&book.modified_date)
        );
        let _ = write!(
            html,
            "<meta itemprop='url' content=\"{}\">\n",
            encode_double_quoted_attribute(&book.links.view)
        );

        html
    }

    fn revision_banner(&self, meta: &BookMetadata) -> String {
        let Some(raw) = meta.date_revision.as_deref() else {
            return String::new();
        };
        // only announce revisions that are still upcoming
        let Some(revision_at) = text::parse_timestamp(raw) else {
            return String::new();
        };
        if revision_at <= chrono::Utc::now() {
            return String::new();
        }

        format!(
            "<h4 class=\"alert alert-info\">Good news! An updated and revised version of this \
             textbook will be available in {}</h4>",
            text::display_date(raw, "%B %-d, %Y")
        )
    }

    fn adaptation_banner(&self, meta: &BookMetadata) -> String {
        let Some(adaptation) = meta.adaptation.as_deref() else {
            return String::new();
        };
        format!(
            "<h4 class='alert alert-success'>Good news! This book has been updated and revised. \
             An adaptation of this book can be found here: {}</h4>",
            trim_source_list(&format_url(adaptation))
        )
    }

    fn cover_figure(&self, meta: &BookMetadata) -> String {
        let Some(cover) = meta.cover.as_ref() else {
            return String::new();
        };
        // protocol-relative so the page scheme decides
        let src = if let Some(rest) = cover.url.strip_prefix("http://") {
            format!("//{rest}")
        } else {
            cover.url.clone()
        };

        format!(
            "<figure class='pull-right cover'>\
             <img itemprop='image' class='img-polaroid' src=\"{}\" alt='textbook cover image' \
             width='151px' height='196px' />\
             <figcaption><small class='muted copyright-notice'>{}</small></figcaption></figure>",
            encode_double_quoted_attribute(&src),
            encode_text(&cover.copyright)
        )
    }

    fn sources_paragraph(&self, meta: &BookMetadata) -> String {
        if meta.sources.is_empty() {
            return String::new();
        }

        let mut sources = String::new();
        for source in &meta.sources {
            sources.push_str(&format_url(source));
        }

        format!(
            "<p><strong>Original source:</strong> {}</p>",
            trim_source_list(&sources)
        )
    }

    fn attachment_list(&self, book: &BookRecord) -> String {
        let mut html = String::from("<h3>Open Textbook(s):</h3><ol>");

        let ordered = attachment::reorder(&book.attachments, &self.config.print_host);
        for item in &ordered {
            let file_size = text::file_size_label(item.size);
            let badge = attachment::badge(&item.description, &self.config.assets_base);
            let tracking = format!(
                "_paq.push(['trackEvent','exportFiles','{}','{}']);",
                book.name.replace('\'', "\\'"),
                badge.kind
            );

            let _ = write!(
                html,
                "<link itemprop='bookFormat' href='http://schema.org/EBook'>\
                 <li itemprop='offers' itemscope itemtype='http://schema.org/Offer'>\
                 <meta itemprop='price' content='$0.00'>\
                 <link itemprop='availability' href='http://schema.org/InStock'>\
                 <a class='btn btn-default btn-sm' role='button' onclick=\"{}\" href=\"{}\" \
                 title=\"{}\">{}</a> {} {}</li>",
                encode_double_quoted_attribute(&tracking),
                encode_double_quoted_attribute(&item.links.view),
                encode_double_quoted_attribute(&item.description),
                badge.html,
                encode_text(&item.description),
                file_size
            );
        }

        html.push_str("</ol>");
        html
    }

    async fn license_footer(&self, meta: &BookMetadata, authors: &str) -> String {
        match self
            .license
            .resolve(&meta.rights, authors, &meta.title, meta.locale())
            .await
        {
            Ok(attribution) => attribution,
            // last-resort display value: the raw license string, never blank
            Err(_) => encode_text(&meta.rights).into_owned(),
        }
    }
}

const HELP_BLOCK: &str = "<p><strong>Adoption (faculty): </strong>\
<a href='/adoption-of-an-open-textbook/'>Contact us if you are using this textbook in your \
course <i class='glyphicon glyphicon-book'></i></a></p>\
<p><strong>Adaptations: </strong>\
<a href='/open-textbook-101/adapting-an-open-textbook/'>Support for adapting an open textbook\
<i class='glyphicon glyphicon-book'></i></a></p>\
<p><strong>Need help? </strong>Visit our <a href='https://open.bccampus.ca/help/'>Help page</a> \
for FAQ and helpdesk assistance.</p>\
<p><strong>Accessibility: </strong>Textbooks flagged as accessible meet the criteria noted on \
the <a href='https://opentextbc.ca/accessibilitytoolkit/back-matter/appendix-checklist-for-accessibility-toolkit/'>\
Accessibility Checklist.<i class='glyphicon glyphicon-book'></i></a></p>";

/// Hyperlink when the value parses as an absolute url (labelled with its
/// host), literal text otherwise. Callers trim the trailing separator.
pub(crate) fn format_url(source: &str) -> String {
    match Url::parse(source) {
        Ok(url) if url.host_str().is_some() => format!(
            "<a itemprop='isBasedOnUrl' href=\"{}\">{} </a>",
            encode_double_quoted_attribute(source),
            url.host_str().unwrap_or_default()
        ),
        _ => format!(
            "<span itemprop='isBasedOnUrl'>{}</span>, ",
            encode_text(source)
        ),
    }
}

fn trim_source_list(sources: &str) -> &str {
    sources.trim_end_matches([',', ' '])
}

fn subject_csv(meta: &BookMetadata) -> String {
    let mut csv = String::new();
    if let Some(level1) = meta.subject_class_level1.as_deref() {
        csv.push_str(level1);
    }
    if let Some(level2) = meta.subject_class_level2.as_deref() {
        let _ = write!(csv, ", {level2}");
    }
    if let Some(level3) = meta.subject_class_level3.as_deref() {
        let _ = write!(csv, ", {level3}");
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Cover;

    #[test]
    fn format_url_links_absolute_urls_by_host() {
        let html = format_url("https://original.example.org/book/12");
        assert!(html.contains("href=\"https://original.example.org/book/12\""));
        assert!(html.contains(">original.example.org </a>"));
    }

    #[test]
    fn format_url_renders_plain_text_literally() {
        let html = format_url("print archive, shelf 9");
        assert_eq!(
            html,
            "<span itemprop='isBasedOnUrl'>print archive, shelf 9</span>, "
        );
    }

    #[test]
    fn sources_paragraph_trims_the_trailing_separator() {
        let renderer = Renderer::new(Config::default()).expect("renderer");
        let meta = BookMetadata {
            sources: vec!["plain text source".to_owned()],
            ..BookMetadata::default()
        };
        let html = renderer.sources_paragraph(&meta);
        assert!(html.ends_with("plain text source</span></p>"));
    }

    #[test]
    fn cover_figure_is_protocol_relative() {
        let renderer = Renderer::new(Config::default()).expect("renderer");
        let meta = BookMetadata {
            cover: Some(Cover {
                url: "http://images.example.ca/cover.jpg".to_owned(),
                copyright: "(c) Someone".to_owned(),
            }),
            ..BookMetadata::default()
        };
        let html = renderer.cover_figure(&meta);
        assert!(html.contains("src=\"//images.example.ca/cover.jpg\""));
        assert!(html.contains("(c) Someone"));
    }

    #[test]
    fn revision_banner_only_for_future_dates() {
        let renderer = Renderer::new(Config::default()).expect("renderer");

        let future = BookMetadata {
            date_revision: Some("2126-11-01T00:00:00".to_owned()),
            ..BookMetadata::default()
        };
        assert!(
            renderer
                .revision_banner(&future)
                .contains("November 1, 2126")
        );

        let past = BookMetadata {
            date_revision: Some("2016-11-01T00:00:00".to_owned()),
            ..BookMetadata::default()
        };
        assert_eq!(renderer.revision_banner(&past), "");
    }

    #[test]
    fn subject_csv_joins_present_levels() {
        let meta = BookMetadata {
            subject_class_level1: Some("Sciences".to_owned()),
            subject_class_level2: Some("Physics".to_owned()),
            ..BookMetadata::default()
        };
        assert_eq!(subject_csv(&meta), "Sciences, Physics");
    }
}
