//! Text and time helpers shared by every adapter.

use chrono::DateTime;
use html_escape::decode_html_entities;

/// Maximum description length, in characters.
pub const DESCRIPTION_LIMIT: usize = 100;

/// Remove markup tags, decode entities and collapse whitespace.
pub fn strip_markup(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    collapse_whitespace(&decode_html_entities(&text))
}

/// Cut `input` to at most `limit` characters.
pub fn truncate_chars(input: &str, limit: usize) -> String {
    match input.char_indices().nth(limit) {
        Some((byte_pos, _)) => input[..byte_pos].to_string(),
        None => input.to_string(),
    }
}

/// Markup-free description no longer than [`DESCRIPTION_LIMIT`].
pub fn clean_description(input: &str) -> String {
    truncate_chars(&strip_markup(input), DESCRIPTION_LIMIT)
        .trim_end()
        .to_string()
}

/// Display title, or `None` when nothing printable is left.
pub fn clean_title(input: &str) -> Option<String> {
    let title = collapse_whitespace(&decode_html_entities(input));
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

pub fn seconds_to_millis(secs: f64) -> Option<i64> {
    if secs.is_finite() && secs >= 0.0 {
        Some((secs * 1000.0) as i64)
    } else {
        None
    }
}

/// Parse RFC 3339 or RFC 2822 dates into epoch milliseconds.
pub fn parse_date_millis(input: &str) -> Option<i64> {
    let input = input.trim();
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_rfc2822(input))
        .map(|dt| dt.timestamp_millis())
        .ok()
}

/// Fall back to the fetch time for missing or pre-epoch values.
pub fn sanitize_timestamp(millis: Option<i64>, fetched_at: i64) -> i64 {
    match millis {
        Some(ms) if ms >= 0 => ms,
        _ => fetched_at,
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("<p>Hello <b>world</b></p>\n<br/>again"),
            "Hello world again"
        );
        assert_eq!(strip_markup("Fish &amp; chips"), "Fish & chips");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "数据".repeat(80);
        let cut = truncate_chars(&text, DESCRIPTION_LIMIT);
        assert_eq!(cut.chars().count(), DESCRIPTION_LIMIT);
        assert_eq!(truncate_chars("short", DESCRIPTION_LIMIT), "short");
    }

    #[test]
    fn test_clean_description_strips_before_truncating() {
        let body = format!("<div class=\"{}\">text</div>", "x".repeat(200));
        assert_eq!(clean_description(&body), "text");

        let long = format!("<p>{}</p>", "a".repeat(300));
        assert_eq!(clean_description(&long).chars().count(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  Rust &amp; Go \n"), Some("Rust & Go".into()));
        assert_eq!(clean_title("   "), None);
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(
            parse_date_millis("2024-01-01T00:00:00Z"),
            Some(1_704_067_200_000)
        );
        assert_eq!(
            parse_date_millis("Mon, 01 Jan 2024 00:00:00 GMT"),
            Some(1_704_067_200_000)
        );
        assert_eq!(
            parse_date_millis("2024-01-01T08:00:00.000+08:00"),
            Some(1_704_067_200_000)
        );
        assert_eq!(parse_date_millis("yesterday"), None);
    }

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis(1_704_067_200.0), Some(1_704_067_200_000));
        assert_eq!(seconds_to_millis(-1.0), None);
        assert_eq!(seconds_to_millis(f64::NAN), None);
    }

    #[test]
    fn test_sanitize_timestamp() {
        assert_eq!(sanitize_timestamp(Some(5), 100), 5);
        assert_eq!(sanitize_timestamp(Some(-5), 100), 100);
        assert_eq!(sanitize_timestamp(None, 100), 100);
    }
}
