use std::cmp::Ordering;

use crate::records::ContentOwner;

/// Comma-joins content-owner names for display.
///
/// Names sometimes carry an internal username in brackets
/// (`"Jane Doe [jdoe23]"`); the bracketed part is stripped. A bracket in
/// the very first position is left alone, matching the upstream data
/// convention where such names are not username-suffixed.
pub fn authors_csv(owners: &[ContentOwner]) -> String {
    let mut parts = Vec::with_capacity(owners.len());
    for owner in owners {
        let name = match owner.name.find('[') {
            Some(idx) if idx > 0 => owner.name[..idx].trim_end(),
            _ => owner.name.as_str(),
        };
        parts.push(name);
    }
    parts.join(", ")
}

/// Formats an attachment size in megabytes: `"(0.5 MB)"` below 1 MB
/// (two-decimal rounding), `"(2 MB)"` at or above (integer truncation).
/// Zero or absent sizes yield an empty string.
pub fn file_size_label(size: Option<u64>) -> String {
    let Some(bytes) = size else {
        return String::new();
    };
    if bytes == 0 {
        return String::new();
    }

    let megabytes = bytes as f64 / 1_000_000.0;
    if megabytes <= 1.0 {
        let rounded = (megabytes * 100.0).round() / 100.0;
        format!("({rounded} MB)")
    } else {
        format!("({} MB)", megabytes as u64)
    }
}

/// Trims incoming query-parameter values and strips double quotes and
/// tag-like segments before they are echoed into markup.
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for ch in value.trim().chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '"' => {}
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Parses the timestamp shapes the repository emits (RFC 3339, bare
/// datetime, bare date).
pub fn parse_timestamp(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&chrono::Utc));
    }
    if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.and_utc());
    }
    if let Some(prefix) = raw.get(..10)
        && let Ok(parsed) = chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Formats a repository timestamp for display; unparseable input is
/// shown raw rather than dropped.
pub fn display_date(raw: &str, pattern: &str) -> String {
    match parse_timestamp(raw) {
        Some(parsed) => parsed.format(pattern).to_string(),
        None => raw.to_owned(),
    }
}

/// Natural, case-insensitive ordering: digit runs compare numerically, so
/// `"Chapter 2"` sorts before `"Chapter 10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(lc), Some(rc)) => {
                if lc.is_ascii_digit() && rc.is_ascii_digit() {
                    let lnum = take_number(&mut left);
                    let rnum = take_number(&mut right);
                    match lnum.cmp(&rnum) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    let lc = lc.to_ascii_lowercase();
                    let rc = rc.to_ascii_lowercase();
                    match lc.cmp(&rc) {
                        Ordering::Equal => {
                            left.next();
                            right.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut value: u64 = 0;
    while let Some(ch) = chars.peek().copied() {
        let Some(digit) = ch.to_digit(10) else {
            break;
        };
        value = value.saturating_mul(10).saturating_add(u64::from(digit));
        chars.next();
    }
    value
}
