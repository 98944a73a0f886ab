//! Shareable join links carrying a room code in the `room` query parameter.

use crate::config::ROOM_CODE_LENGTH;

/// True for a syntactically valid room code.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LENGTH
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Build a join link for `code` on top of `base`.
pub fn join_url(base: &str, code: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}room={code}")
}

/// Extract a valid room code from a URL's query string, if present.
/// Lowercase input is accepted and normalized.
pub fn room_code_from_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let (_, query) = without_fragment.split_once('?')?;

    for pair in query.split('&') {
        if let Some(raw) = pair.strip_prefix("room=") {
            let code = raw.trim().to_uppercase();
            if is_valid_code(&code) {
                return Some(code);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_roundtrip() {
        let url = join_url("https://example.org/play", "AB12CD");
        assert_eq!(url, "https://example.org/play?room=AB12CD");
        assert_eq!(room_code_from_url(&url), Some("AB12CD".to_string()));
    }

    #[test]
    fn test_join_url_appends_to_existing_query() {
        let url = join_url("https://example.org/play?lang=en", "AB12CD");
        assert_eq!(url, "https://example.org/play?lang=en&room=AB12CD");
        assert_eq!(room_code_from_url(&url), Some("AB12CD".to_string()));
    }

    #[test]
    fn test_code_is_normalized_to_uppercase() {
        assert_eq!(
            room_code_from_url("https://x.org/?room=ab12cd"),
            Some("AB12CD".to_string())
        );
    }

    #[test]
    fn test_fragment_is_ignored() {
        assert_eq!(
            room_code_from_url("https://x.org/?room=AB12CD#lobby"),
            Some("AB12CD".to_string())
        );
    }

    #[test]
    fn test_missing_or_malformed_codes_rejected() {
        assert_eq!(room_code_from_url("https://x.org/"), None);
        assert_eq!(room_code_from_url("https://x.org/?other=1"), None);
        assert_eq!(room_code_from_url("https://x.org/?room=SHORT"), None);
        assert_eq!(room_code_from_url("https://x.org/?room=TOOLONG1"), None);
        assert_eq!(room_code_from_url("https://x.org/?room=AB-2CD"), None);
    }

    #[test]
    fn test_is_valid_code() {
        assert!(is_valid_code("AB12CD"));
        assert!(is_valid_code("ZZZZZZ"));
        assert!(!is_valid_code("ab12cd"));
        assert!(!is_valid_code("AB12C"));
        assert!(!is_valid_code("AB12CDE"));
    }
}
