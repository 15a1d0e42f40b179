use url::Url;

use crate::records::Attachment;

/// Display badge for one attachment: button markup plus the download-type
/// tag used in tracking events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub html: String,
    pub kind: &'static str,
}

/// Everything after (and including) the first dot of the filename,
/// lowercased; or the synthetic `.print` type for bare urls hosted on the
/// print-on-demand domain.
pub fn file_type(attachment: &Attachment, print_host: &str) -> String {
    let mut file_type = attachment
        .filename
        .as_deref()
        .and_then(|name| name.find('.').map(|idx| name[idx..].to_ascii_lowercase()))
        .unwrap_or_default();

    if let Some(raw) = attachment.url.as_deref()
        && let Ok(url) = Url::parse(raw)
        && url.host_str() == Some(print_host)
    {
        file_type = ".print".to_owned();
    }

    file_type
}

/// Ordinal display rank for an attachment. Unmatched types get the lowest
/// rank and therefore sort to the front; this mirrors the catalogue's
/// long-standing ordering and is kept on purpose.
pub fn rank(attachment: &Attachment, print_host: &str) -> u8 {
    match file_type(attachment, print_host).as_str() {
        ".pdf" => 1,
        ".epub" => 2,
        ".mobi" => 3,
        ".print" => 4,
        ".xml" => 5,
        "._vanilla.xml" => 6,
        ".html" => 7,
        ".tex" => 8,
        ".odt" => 9,
        ".docx" => 10,
        ".doc" => 11,
        ".rtf" => 12,
        "._3.epub" => 13,
        ".hpub" => 14,
        ".zip" => 15,
        _ => 0,
    }
}

/// Stable-sorts attachments by rank ascending. Ties keep input order, so
/// sorting an already-sorted list is a no-op.
pub fn reorder(attachments: &[Attachment], print_host: &str) -> Vec<Attachment> {
    let mut ordered = attachments.to_vec();
    ordered.sort_by_key(|attachment| rank(attachment, print_host));
    ordered
}

fn download_badge(assets_base: &str, icon: &str, label: &str, kind: &'static str) -> Badge {
    Badge {
        html: format!(
            "<i class='glyphicon glyphicon-download'></i> \
             <span class='small-for-mobile'>DOWNLOAD</span> \
             <img src='{assets_base}{icon}' alt='{label} file. This icon is licensed under a \
             Creative Commons Attribution 3.0 License. Copyright Yusuke Kamiyamane.'/>"
        ),
        kind,
    }
}

/// Picks the badge for an attachment description.
///
/// The rules run in a fixed order and each later match overwrites the
/// earlier one, so the last matching rule wins: a description containing
/// both "doc" and "pdf" resolves to pdf. The website fallback is assigned
/// first, before any extension rule has run. Reordering this list changes
/// observable output.
pub fn badge(description: &str, assets_base: &str) -> Badge {
    let haystack = description.to_ascii_lowercase();
    let contains = |needle: &str| haystack.contains(needle);

    let mut result = if contains("print copy") {
        Badge {
            html: "PRINT <i class='glyphicon glyphicon-print'></i>".to_owned(),
            kind: "print",
        }
    } else {
        Badge {
            html: format!(
                "<i class='glyphicon glyphicon-globe'></i> WEBSITE \
                 <img src='{assets_base}document-code.png' alt='External website. This icon is \
                 licensed under a Creative Commons Attribution 3.0 License. Copyright Yusuke \
                 Kamiyamane.'/>"
            ),
            kind: "url",
        }
    };

    if contains(".zip") || contains(".tbz") {
        result = download_badge(assets_base, "document-zipper.png", "ZIP", "zip");
    }
    if contains(".doc") || contains(".rtf") {
        result = download_badge(assets_base, "document-word.png", "WORD", "doc");
    }
    if contains(".pdf") {
        result = download_badge(assets_base, "document-pdf.png", "PDF", "pdf");
    }
    if contains(".epub") {
        result = download_badge(assets_base, "document-epub.png", "EPUB", "epub");
    }
    if contains(".mobi") {
        result = download_badge(assets_base, "document-mobi.png", "MOBI", "mobi");
    }
    if contains(".xml") {
        result = download_badge(assets_base, "document-xml.png", "XML", "xml");
    }
    if contains(".odt") {
        result = download_badge(assets_base, "document.png", "ODT", "odt");
    }
    if contains(".hpub") {
        result = download_badge(assets_base, "document.png", "HPUB", "hpub");
    }
    if contains(".html") {
        result = download_badge(assets_base, "document-code.png", "XHTML", "html");
    }
    if contains(".tex") {
        result = download_badge(assets_base, "document-tex.png", "TEX", "tex");
    }

    result
}

/// Scans attachments for a PDF file and rewrites its view link into a
/// redirect-service url carrying the record and attachment uuids.
///
/// View links look like
/// `https://host/bcc/items/{uuid}/1/?attachment.uuid={a_uuid}`; the record
/// uuid is the third path segment and the attachment uuid is whatever
/// follows the first `=` of the query. Returns an empty string when no
/// PDF attachment qualifies; the citation meta tag is emitted either way.
pub fn citation_pdf_url(attachments: &[Attachment], redirect_base: &str) -> String {
    let mut redirect_url = String::new();

    for attachment in attachments {
        if attachment.kind != "file" {
            continue;
        }
        let Some(filename) = attachment.filename.as_deref() else {
            continue;
        };
        let file_type = filename
            .find('.')
            .map(|idx| &filename[idx..])
            .unwrap_or_default();
        if file_type != ".pdf" || attachment.links.view.is_empty() {
            continue;
        }

        let Ok(link) = Url::parse(&attachment.links.view) else {
            continue;
        };

        // leading slash makes the uuid the fourth piece when split on '/'
        let Some(uuid) = link.path().split('/').nth(3) else {
            continue;
        };
        let attachment_uuid = link
            .query()
            .and_then(|query| query.split_once('='))
            .map(|(_, value)| value)
            .unwrap_or_default();

        redirect_url = format!("{redirect_base}?uuid={uuid}&attachment.uuid={attachment_uuid}");
    }

    redirect_url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Links;

    const PRINT_HOST: &str = "opentextbook.docsol.sfu.ca";
    const ASSETS: &str = "/assets/images/";

    fn file(filename: &str) -> Attachment {
        Attachment {
            kind: "file".to_owned(),
            filename: Some(filename.to_owned()),
            url: None,
            description: filename.to_owned(),
            size: None,
            links: Links::default(),
        }
    }

    fn external(url: &str) -> Attachment {
        Attachment {
            kind: "url".to_owned(),
            filename: None,
            url: Some(url.to_owned()),
            description: url.to_owned(),
            size: None,
            links: Links::default(),
        }
    }

    #[test]
    fn rank_follows_the_fixed_table() {
        assert_eq!(rank(&file("book.pdf"), PRINT_HOST), 1);
        assert_eq!(rank(&file("book.epub"), PRINT_HOST), 2);
        assert_eq!(rank(&file("book.zip"), PRINT_HOST), 15);
        assert_eq!(rank(&file("book._vanilla.xml"), PRINT_HOST), 6);
    }

    #[test]
    fn unknown_types_rank_first() {
        assert_eq!(rank(&file("book.unknown"), PRINT_HOST), 0);
        let ordered = reorder(&[file("a.pdf"), file("b.unknown")], PRINT_HOST);
        assert_eq!(ordered[0].filename.as_deref(), Some("b.unknown"));
    }

    #[test]
    fn print_on_demand_host_gets_the_synthetic_print_type() {
        let attachment = external("https://opentextbook.docsol.sfu.ca/orders/42");
        assert_eq!(file_type(&attachment, PRINT_HOST), ".print");
        assert_eq!(rank(&attachment, PRINT_HOST), 4);
    }

    #[test]
    fn extension_is_taken_from_the_first_dot() {
        assert_eq!(file_type(&file("Book.PDF"), PRINT_HOST), ".pdf");
        // multi-dot names fall through to the unmatched rank
        assert_eq!(rank(&file("book.en.pdf"), PRINT_HOST), 0);
    }

    #[test]
    fn reorder_is_idempotent() {
        let input = vec![file("a.zip"), file("b.pdf"), file("c.epub"), file("d.pdf")];
        let once = reorder(&input, PRINT_HOST);
        let twice = reorder(&once, PRINT_HOST);
        let names = |items: &[Attachment]| {
            items
                .iter()
                .filter_map(|a| a.filename.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&once), vec!["b.pdf", "d.pdf", "c.epub", "a.zip"]);
        assert_eq!(names(&once), names(&twice));
    }

    #[test]
    fn badge_last_match_wins() {
        // ".doc" and ".pdf" both match; pdf is checked later and wins
        assert_eq!(badge("manual.doc.pdf", ASSETS).kind, "pdf");
        // ".tex" is checked last and beats everything
        assert_eq!(badge("notes.pdf plus source.tex", ASSETS).kind, "tex");
    }

    #[test]
    fn badge_fallbacks() {
        assert_eq!(badge("Buy a print copy", ASSETS).kind, "print");
        assert_eq!(badge("external pressbooks site", ASSETS).kind, "url");
        // print copy phrase loses to a later extension rule
        assert_eq!(badge("print copy order form.pdf", ASSETS).kind, "pdf");
    }

    #[test]
    fn badge_docx_resolves_to_doc() {
        assert_eq!(badge("chapter.docx", ASSETS).kind, "doc");
    }

    #[test]
    fn citation_pdf_url_rewrites_the_view_link() {
        let mut attachment = file("book.pdf");
        attachment.links.view =
            "https://solr.example.ca/bcc/items/70fa0825-d41b-4519-975b-71bc2ea1f704/1/?attachment.uuid=99ab345f-1e11-4f46-a038-ef2b3f3d5477"
                .to_owned();

        let url = citation_pdf_url(&[attachment], "https://example.org/redirects.php");
        assert_eq!(
            url,
            "https://example.org/redirects.php?uuid=70fa0825-d41b-4519-975b-71bc2ea1f704&attachment.uuid=99ab345f-1e11-4f46-a038-ef2b3f3d5477"
        );
    }

    #[test]
    fn citation_pdf_url_empty_without_pdf() {
        assert_eq!(
            citation_pdf_url(&[file("book.epub")], "https://example.org/r.php"),
            ""
        );
    }
}
