use quick_xml::Reader;
use quick_xml::events::Event;

use crate::config::FlagTokens;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cover {
    pub url: String,
    pub copyright: String,
}

/// Typed fields pulled out of a record's embedded metadata XML.
///
/// Extraction never fails: malformed documents are logged and yield the
/// default (empty) value, so rendering degrades to omitting the optional
/// sections instead of losing the whole page.
#[derive(Debug, Clone, Default)]
pub struct BookMetadata {
    pub cover: Option<Cover>,
    pub date_revision: Option<String>,
    /// Adaptation source text, present only when the adaptation flag
    /// attribute is set.
    pub adaptation: Option<String>,
    pub sources: Vec<String>,
    pub subject_class_level1: Option<String>,
    pub subject_class_level2: Option<String>,
    pub subject_class_level3: Option<String>,
    pub reviewed: bool,
    pub adopted: bool,
    pub accessible: bool,
    pub ancillary: bool,
    /// LOM general title, used for citations and the license lookup.
    pub title: String,
    /// LOM language value, e.g. `en-CA`.
    pub language: String,
    /// Raw license description from LOM rights.
    pub rights: String,
}

impl BookMetadata {
    /// Two-letter locale for the license lookup.
    pub fn locale(&self) -> &str {
        let end = self
            .language
            .char_indices()
            .nth(2)
            .map_or(self.language.len(), |(idx, _)| idx);
        &self.language[..end]
    }
}

/// Extracts typed fields from a metadata document.
///
/// The walk is tolerant: unknown elements are skipped, flag values are an
/// opaque equality check against the configured sentinel tokens (any
/// mismatch means the flag is absent, never an error), and a syntax error
/// aborts the walk with a logged diagnostic and empty fields.
pub fn extract(xml: &str, flags: &FlagTokens) -> BookMetadata {
    if xml.trim().is_empty() {
        return BookMetadata::default();
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = BookMetadata::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut cover_copyright = String::new();
    let mut adaptation_flag = false;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

                if element_is(&stack, &name, &["item", "cover"]) {
                    cover_copyright = attribute_value(&start, b"copyright");
                } else if element_is(&stack, &name, &["item", "adaptation"]) {
                    adaptation_flag = is_truthy(&attribute_value(&start, b"value"));
                }

                stack.push(name);
                text.clear();
            }
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(chunk) => text.push_str(&chunk),
                Err(err) => log_diagnostic(xml, reader.buffer_position() as usize, &err),
            },
            Ok(Event::End(_)) => {
                assign_field(
                    &mut meta,
                    &stack,
                    &text,
                    flags,
                    &cover_copyright,
                    adaptation_flag,
                );
                stack.pop();
                text.clear();
            }
            Ok(_) => {}
            Err(err) => {
                log_diagnostic(xml, reader.buffer_position() as usize, &err);
                return BookMetadata::default();
            }
        }
    }

    meta
}

fn assign_field(
    meta: &mut BookMetadata,
    stack: &[String],
    text: &str,
    flags: &FlagTokens,
    cover_copyright: &str,
    adaptation_flag: bool,
) {
    if path_is(stack, &["item", "cover"]) {
        if !text.is_empty() {
            meta.cover = Some(Cover {
                url: text.to_owned(),
                copyright: cover_copyright.to_owned(),
            });
        }
    } else if path_is(stack, &["item", "daterevision"]) {
        if meta.date_revision.is_none() && !text.is_empty() {
            meta.date_revision = Some(text.to_owned());
        }
    } else if path_is(stack, &["item", "adaptation", "source"]) {
        if adaptation_flag && meta.adaptation.is_none() && !text.is_empty() {
            meta.adaptation = Some(text.to_owned());
        }
    } else if path_is(stack, &["item", "source"]) {
        meta.sources.push(text.to_owned());
    } else if path_is(stack, &["item", "subject_class_level1"]) {
        set_if_empty(&mut meta.subject_class_level1, text);
    } else if path_is(stack, &["item", "subject_class_level2"]) {
        set_if_empty(&mut meta.subject_class_level2, text);
    } else if path_is(stack, &["item", "subject_class_level3"]) {
        set_if_empty(&mut meta.subject_class_level3, text);
    } else if path_is(stack, &["item", "reviewed"]) {
        meta.reviewed = text == flags.reviewed;
    } else if path_is(stack, &["item", "adopted"]) {
        meta.adopted = text == flags.adopted;
    } else if path_is(stack, &["item", "accessibility"]) {
        meta.accessible = text == flags.accessible;
    } else if path_is(stack, &["item", "ancillary"]) {
        meta.ancillary = text == flags.ancillary;
    } else if path_is(stack, &["lom", "general", "title"]) {
        if meta.title.is_empty() {
            meta.title = text.to_owned();
        }
    } else if path_is(stack, &["lom", "general", "language"]) {
        if meta.language.is_empty() {
            meta.language = text.to_owned();
        }
    } else if path_is(stack, &["lom", "rights", "description"]) {
        if meta.rights.is_empty() {
            meta.rights = text.to_owned();
        }
    }
}

/// Matches the element path below the document root, whatever the root
/// element is called.
fn path_is(stack: &[String], pattern: &[&str]) -> bool {
    stack.len() == pattern.len() + 1
        && stack[1..]
            .iter()
            .zip(pattern)
            .all(|(name, expected)| name == expected)
}

fn element_is(stack: &[String], name: &str, pattern: &[&str]) -> bool {
    let Some((last, parents)) = pattern.split_last() else {
        return false;
    };
    name == *last && path_is(stack, parents)
}

fn set_if_empty(slot: &mut Option<String>, text: &str) {
    if slot.is_none() && !text.is_empty() {
        *slot = Some(text.to_owned());
    }
}

fn attribute_value(start: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> String {
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr
                .unescape_value()
                .map(|value| value.into_owned())
                .unwrap_or_default();
        }
    }
    String::new()
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Logs one parse diagnostic with line/column context, mirroring the
/// shape the repository's operators grep for.
pub(crate) fn log_diagnostic(source: &str, offset: usize, err: &dyn std::fmt::Display) {
    let (line, column) = position_of(source, offset);
    let context = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
    tracing::warn!(
        line,
        column,
        severity = "error",
        context,
        "xml parse diagnostic: {err}"
    );
}

fn position_of(source: &str, offset: usize) -> (usize, usize) {
    let clamped = offset.min(source.len());
    let prefix = &source[..clamped];
    let line = prefix.bytes().filter(|b| *b == b'\n').count() + 1;
    let column = clamped - prefix.rfind('\n').map_or(0, |idx| idx + 1) + 1;
    (line, column)
}
