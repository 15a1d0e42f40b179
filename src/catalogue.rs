use std::fmt::Write as _;
use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};
use uuid::Uuid;

use crate::config::Config;
use crate::metadata;
use crate::records::{BookRecord, RequestArgs};
use crate::text;

const PAGE_SIZE: usize = 10;
const DESCRIPTION_LIMIT: usize = 500;

/// The four filtered listings backed by sentinel-token flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Reviewed,
    Adopted,
    Accessible,
    Ancillary,
}

impl ListKind {
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "reviewed" => Some(Self::Reviewed),
            "adopted" => Some(Self::Adopted),
            "accessible" => Some(Self::Accessible),
            "ancillary" => Some(Self::Ancillary),
            _ => None,
        }
    }

    fn token<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            Self::Reviewed => &config.flags.reviewed,
            Self::Adopted => &config.flags.adopted,
            Self::Accessible => &config.flags.accessible,
            Self::Ancillary => &config.flags.ancillary,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Reviewed => "reviewed",
            Self::Adopted => "adopted",
            Self::Accessible => "accessible",
            Self::Ancillary => "ancillary",
        }
    }
}

/// Orchestrates listing views over a fetched collection of book records
/// and the current request arguments.
#[derive(Debug, Clone)]
pub struct Catalogue {
    config: Arc<Config>,
    books: Vec<BookRecord>,
    args: RequestArgs,
}

impl Catalogue {
    pub fn new(config: Arc<Config>, books: Vec<BookRecord>, args: RequestArgs) -> Self {
        Self {
            config,
            books,
            args,
        }
    }

    pub fn size(&self) -> usize {
        self.books.len()
    }

    /// Search box pre-filled with the current term, plus a result count
    /// or a no-results notice.
    pub fn search_form(&self) -> String {
        let mut html = format!(
            "<fieldset name='solr' class='pull-right'>\
             <form class='form-search form-inline' action='' method='get'>\
             <input type='text' class='input-small' name='search' id='solrSearchTerm' \
             value=\"{}\"/> \
             <button type='submit' formaction='' class='btn' name='solrSearchSubmit' \
             id='solrSearchSubmit'>Search</button>\
             <input type='hidden' name='contributor' value=\"{}\"/>\
             <input type='hidden' name='subject' value=\"{}\"/>\
             </form></fieldset>",
            encode_double_quoted_attribute(&text::sanitize(self.args.search())),
            encode_double_quoted_attribute(self.args.contributor()),
            encode_double_quoted_attribute(self.args.subject()),
        );

        if self.size() > 0 {
            let _ = write!(html, "<h5>Available results: {}</h5>", self.size());
        } else {
            html.push_str(
                "<h5>Available: <span style='color:red;'>sorry, your search returned no \
                 results</span></h5>",
            );
        }
        html
    }

    /// Paginated listing starting at `start`.
    ///
    /// A present search term bypasses pagination and lists everything;
    /// otherwise the page is capped at ten records, with the cap shrunk
    /// to the remainder near the end (floored to one so the final record
    /// stays reachable).
    pub fn display_books(&self, start: usize) -> String {
        let mut limit = PAGE_SIZE;
        let remaining = self.size().saturating_sub(start);
        if remaining < PAGE_SIZE {
            limit = remaining.max(1);
        }

        let mut html = self.search_form();
        if self.args.search().is_empty() {
            html.push_str(&self.page_links(start));
            html.push_str(&self.display_by_subject(start, limit));
        } else {
            html.push_str(&self.display_by_subject(0, 0));
        }
        html
    }

    /// Windowed listing: `limit == 0` lists everything in an ordered
    /// list, otherwise `limit` entries from `start` in an unordered one.
    pub fn display_by_subject(&self, start: usize, limit: usize) -> String {
        if start > self.size() {
            return "<p>That's it, no more records</p>".to_owned();
        }

        // a start equal to the total still shows the last record
        let mut index = if start == self.size() && start > 0 {
            start - 1
        } else {
            start
        };

        let ordered = limit == 0;
        let limit = if ordered { self.size() } else { limit };

        let mut html = if ordered {
            String::from("<ol>")
        } else {
            String::from("<ul class='no-bullets'>")
        };

        let mut rendered = 0;
        while rendered < limit && index < self.size() {
            html.push_str(&self.list_entry(&self.books[index]));
            index += 1;
            rendered += 1;
        }

        html.push_str(if ordered { "</ol>" } else { "</ul>" });
        html
    }

    /// Count line plus an ordered list of all records carrying the
    /// sentinel token for `kind`, sorted naturally by title.
    pub fn display_titles_by_type(&self, kind: ListKind) -> String {
        let token = kind.token(&self.config);
        let mut matches: Vec<(&str, Uuid)> = self
            .books
            .iter()
            .filter(|book| book.metadata.contains(token))
            .map(|book| (book.name.as_str(), book.uuid))
            .collect();
        matches.sort_by(|a, b| text::natural_cmp(a.0, b.0));

        let count = matches.len();
        let mut html = match kind {
            ListKind::Ancillary => format!(
                "<p>There are currently {count} textbooks with ancillary resources.</p>"
            ),
            ListKind::Accessible => format!(
                "<p>There are currently {count} accessible textbooks. Accessible textbooks \
                 must meet the criteria noted on the \
                 <a href='https://opentextbc.ca/accessibilitytoolkit/back-matter/appendix-checklist-for-accessibility-toolkit/'>\
                 Accessibility Checklist.</a></p>"
            ),
            _ => format!(
                "<p>There are currently {count} {} textbooks.</p>",
                kind.label()
            ),
        };

        html.push_str("<ol>");
        for (name, uuid) in matches {
            let _ = write!(
                html,
                "<li><a href='?uuid={uuid}'>{}</a></li>",
                encode_text(name)
            );
        }
        html.push_str("</ol>");
        html
    }

    /// Numbered page links, one per ten-result page, current page bolded.
    /// Nothing is emitted when the whole result set fits on one page.
    fn page_links(&self, start: usize) -> String {
        let pages = self.size() / PAGE_SIZE;
        if pages == 0 || self.size() == PAGE_SIZE {
            return String::new();
        }

        // snap the current position to its page boundary
        let current = (start / PAGE_SIZE) * PAGE_SIZE;

        let mut html = String::from("<p>");
        for page in 0..=pages {
            let by_ten = page * PAGE_SIZE;
            if by_ten == current {
                let _ = write!(html, "<strong>{by_ten}</strong> | ");
            } else {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("start", &by_ten.to_string())
                    .append_pair("subject", self.args.subject())
                    .append_pair("contributor", self.args.contributor())
                    .append_pair("searchTerm", self.args.search())
                    .append_pair("keyword", self.args.keyword())
                    .finish();
                let _ = write!(html, "<a href='?{query}'>{by_ten}</a> | ");
            }
        }
        let _ = write!(html, " <em>{} available results</em></p>", self.size());
        html
    }

    fn list_entry(&self, book: &BookRecord) -> String {
        let link = self.record_link(book.uuid);
        let badges = self.flag_badges(&book.metadata);
        let authors = text::authors_csv(book.content_owners());
        let date = text::display_date(&book.modified_date, "%b %-d, %Y");

        let mut html = String::from("<li>");
        let _ = write!(
            html,
            "<h4><a href=\"{}\">{}</a></h4> <h4>{badges} </h4>",
            encode_double_quoted_attribute(&link),
            encode_text(&book.name)
        );
        let _ = write!(html, "<strong>Author(s):</strong> {}<br>", encode_text(&authors));
        let _ = write!(html, "<strong>Date:</strong> {date}");
        let _ = write!(
            html,
            "<p><strong>Description:</strong> {}</p>",
            self.describe(book)
        );
        html.push_str("</li>");
        html
    }

    /// Long descriptions are cut at 499 characters with a read-more link
    /// back to the full record.
    fn describe(&self, book: &BookRecord) -> String {
        if book.description.chars().count() <= DESCRIPTION_LIMIT {
            return book.description.clone();
        }

        let truncated: String = book.description.chars().take(DESCRIPTION_LIMIT - 1).collect();
        format!(
            "{truncated}<a href=\"{}\">...[more]</a>",
            encode_double_quoted_attribute(&self.record_link(book.uuid))
        )
    }

    fn record_link(&self, uuid: Uuid) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("uuid", &uuid.to_string())
            .append_pair("contributor", self.args.contributor())
            .append_pair("keyword", self.args.keyword())
            .append_pair("subject", self.args.subject())
            .finish();
        format!("{}?{query}", self.config.base_url)
    }

    /// Inline check-mark badges for whichever flags the record carries.
    fn flag_badges(&self, metadata_xml: &str) -> String {
        let meta = metadata::extract(metadata_xml, &self.config.flags);
        let mut html = String::new();

        for (set, lists, label) in [
            (meta.reviewed, "reviewed", "Faculty reviewed"),
            (meta.adopted, "adopted", "Adopted"),
            (meta.accessible, "accessible", "Accessible"),
            (meta.ancillary, "ancillary", "Ancillary Resources"),
        ] {
            if set {
                let _ = write!(
                    html,
                    " <i class='glyphicon glyphicon-check'></i> \
                     <small><a href='?lists={lists}'>{label}</a></small> "
                );
            }
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlagTokens;
    use crate::records::{ContentOwner, Drm, DrmOptions, Links};

    fn book(name: &str, description: &str, metadata: &str) -> BookRecord {
        BookRecord {
            uuid: Uuid::new_v4(),
            name: name.to_owned(),
            description: description.to_owned(),
            created_date: "2016-01-01T00:00:00".to_owned(),
            modified_date: "2016-05-31T00:00:00".to_owned(),
            metadata: metadata.to_owned(),
            attachments: Vec::new(),
            drm: Drm {
                options: DrmOptions {
                    content_owners: vec![ContentOwner {
                        name: "Jane Doe [jdoe23]".to_owned(),
                    }],
                },
            },
            links: Links::default(),
        }
    }

    fn catalogue_of(count: usize) -> Catalogue {
        let books = (0..count)
            .map(|idx| book(&format!("Book {idx:02}"), "short description", "<xml/>"))
            .collect();
        Catalogue::new(
            Arc::new(Config::default()),
            books,
            RequestArgs::default(),
        )
    }

    fn entry_count(html: &str) -> usize {
        html.matches("<h4><a href=").count()
    }

    #[test]
    fn near_the_end_the_page_shrinks_to_the_remainder() {
        let catalogue = catalogue_of(23);
        let html = catalogue.display_books(20);
        assert_eq!(entry_count(&html), 3);
        assert!(html.contains("<strong>20</strong>"));
        assert!(html.contains(">0</a>"));
        assert!(html.contains(">10</a>"));
    }

    #[test]
    fn start_equal_to_total_still_shows_the_last_record() {
        let catalogue = catalogue_of(23);
        let html = catalogue.display_books(23);
        assert_eq!(entry_count(&html), 1);
        assert!(html.contains("Book 22"));
    }

    #[test]
    fn start_beyond_total_reports_no_more_records() {
        let catalogue = catalogue_of(23);
        let html = catalogue.display_by_subject(24, 10);
        assert_eq!(html, "<p>That's it, no more records</p>");
    }

    #[test]
    fn a_search_term_bypasses_pagination() {
        let mut catalogue = catalogue_of(23);
        catalogue.args.search = Some("physics".to_owned());
        let html = catalogue.display_books(0);
        assert_eq!(entry_count(&html), 23);
        assert!(html.contains("<ol>"));
        assert!(!html.contains("available results</em>"));
    }

    #[test]
    fn ten_or_fewer_results_render_no_page_links() {
        let catalogue = catalogue_of(10);
        let html = catalogue.display_books(0);
        assert!(!html.contains("available results</em>"));
    }

    #[test]
    fn empty_result_set_shows_the_no_results_notice() {
        let catalogue = catalogue_of(0);
        let html = catalogue.search_form();
        assert!(html.contains("sorry, your search returned no results"));
    }

    #[test]
    fn long_descriptions_truncate_with_a_read_more_link() {
        let long = "d".repeat(520);
        let catalogue = Catalogue::new(
            Arc::new(Config::default()),
            vec![book("Long", &long, "<xml/>")],
            RequestArgs::default(),
        );
        let html = catalogue.display_by_subject(0, 1);
        assert!(html.contains(&"d".repeat(499)));
        assert!(!html.contains(&"d".repeat(500)));
        assert!(html.contains("...[more]"));
    }

    #[test]
    fn descriptions_at_the_limit_render_in_full() {
        let exact = "d".repeat(500);
        let catalogue = Catalogue::new(
            Arc::new(Config::default()),
            vec![book("Exact", &exact, "<xml/>")],
            RequestArgs::default(),
        );
        let html = catalogue.display_by_subject(0, 1);
        assert!(html.contains(&exact));
        assert!(!html.contains("...[more]"));
    }

    #[test]
    fn titles_by_type_filters_and_sorts_naturally() {
        let flags = FlagTokens::default();
        let tagged = |name: &str| {
            book(
                name,
                "desc",
                &format!("<xml><item><reviewed>{}</reviewed></item></xml>", flags.reviewed),
            )
        };
        let catalogue = Catalogue::new(
            Arc::new(Config::default()),
            vec![
                tagged("Chapter 10 Guide"),
                book("Untagged", "desc", "<xml/>"),
                tagged("Chapter 2 Guide"),
            ],
            RequestArgs::default(),
        );

        let html = catalogue.display_titles_by_type(ListKind::Reviewed);
        assert!(html.contains("There are currently 2 reviewed textbooks."));
        let two = html.find("Chapter 2 Guide").expect("chapter 2");
        let ten = html.find("Chapter 10 Guide").expect("chapter 10");
        assert!(two < ten);
        assert!(!html.contains("Untagged"));
    }

    #[test]
    fn flag_badges_render_for_matching_sentinels_only() {
        let flags = FlagTokens::default();
        let xml = format!(
            "<xml><item><reviewed>{}</reviewed><adopted>not-the-token</adopted></item></xml>",
            flags.reviewed
        );
        let catalogue = catalogue_of(0);
        let badges = catalogue.flag_badges(&xml);
        assert!(badges.contains("Faculty reviewed"));
        assert!(!badges.contains(">Adopted<"));
    }
}
