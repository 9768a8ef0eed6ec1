use super::result::ProbeBody;

/// Text bodies longer than this many characters are cut.
pub const MAX_TEXT_CHARS: usize = 500;

pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Decode a response body.
///
/// JSON content types are parsed as JSON. Anything else is kept as text,
/// unless its first non-whitespace character is `{` or `[` and it parses as
/// JSON. Text that fails to parse stays text and is truncated.
pub fn decode(content_type: Option<&str>, text: String) -> ProbeBody {
    let declared_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if declared_json || looks_like_json(&text) {
        match serde_json::from_str(&text) {
            Ok(value) => return ProbeBody::Json(value),
            Err(e) => tracing::debug!(
                error = %e,
                declared_json,
                "body is not valid JSON, keeping text"
            ),
        }
    }

    ProbeBody::Text(truncate(text, MAX_TEXT_CHARS))
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// Keep the first `max` characters and append [`TRUNCATION_MARKER`].
pub fn truncate(text: String, max: usize) -> String {
    truncate_with(text, max, TRUNCATION_MARKER)
}

/// Keep the first `max` characters and append `marker` if anything was cut.
pub fn truncate_with(text: String, max: usize, marker: &str) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{marker}", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_content_type_is_parsed() {
        let body = decode(Some("application/json; charset=utf-8"), r#"{"status":"ok"}"#.into());
        assert_eq!(body, ProbeBody::Json(json!({"status": "ok"})));
    }

    #[test]
    fn json_looking_text_is_parsed() {
        let body = decode(Some("text/plain"), "  [1, 2, 3]".into());
        assert_eq!(body, ProbeBody::Json(json!([1, 2, 3])));
    }

    #[test]
    fn only_first_character_is_checked() {
        // A valid JSON string literal is not attempted.
        let body = decode(None, r#""quoted""#.into());
        assert_eq!(body, ProbeBody::Text(r#""quoted""#.into()));
    }

    #[test]
    fn broken_json_falls_back_to_text() {
        let body = decode(Some("text/html"), "{not json".into());
        assert_eq!(body, ProbeBody::Text("{not json".into()));
    }

    #[test]
    fn broken_json_with_json_content_type_falls_back_to_text() {
        let body = decode(Some("application/json"), "oops".into());
        assert_eq!(body, ProbeBody::Text("oops".into()));
    }

    #[test]
    fn text_of_600_chars_is_truncated_to_500_plus_marker() {
        let body = decode(Some("text/plain"), "a".repeat(600));
        let ProbeBody::Text(text) = body else {
            panic!("expected text body");
        };
        assert_eq!(text, format!("{}{}", "a".repeat(500), TRUNCATION_MARKER));
    }

    #[test]
    fn text_of_exactly_500_chars_is_kept() {
        let body = decode(None, "b".repeat(500));
        assert_eq!(body, ProbeBody::Text("b".repeat(500)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(501);
        let truncated = truncate(text, 500);
        assert_eq!(truncated.chars().count(), 500 + TRUNCATION_MARKER.chars().count());
        assert!(truncated.starts_with(&"é".repeat(500)));
    }

    #[test]
    fn large_json_is_not_truncated() {
        let items: Vec<u32> = (0..400).collect();
        let text = serde_json::to_string(&items).unwrap();
        assert!(text.len() > MAX_TEXT_CHARS);
        assert_eq!(decode(None, text), ProbeBody::Json(json!(items)));
    }
}
