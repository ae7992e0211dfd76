//! Keeps response bodies from flooding debug logs.
//!
//! Contact records carry addresses, phone numbers and e-mail addresses, so
//! bodies are cut to a short prefix before they are logged.

/// Maximum number of bytes of a body that reaches the log.
const TRUNCATE_LIMIT: usize = 256;

/// Largest char boundary at or below `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

/// Truncate a body for logging, appending the original length when cut.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        return s.to_string();
    }
    let end = floor_char_boundary(s, TRUNCATE_LIMIT);
    format!("{}... [truncated, total {} bytes]", &s[..end], s.len())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn short_body_unchanged() {
        assert_eq!(truncate_for_log(r#"{"data":[]}"#), r#"{"data":[]}"#);
    }

    #[test]
    fn long_body_cut_with_length() {
        let body = "x".repeat(TRUNCATE_LIMIT + 10);
        let out = truncate_for_log(&body);
        assert!(out.starts_with(&"x".repeat(TRUNCATE_LIMIT)));
        assert!(out.ends_with(&format!("total {} bytes]", TRUNCATE_LIMIT + 10)));
    }

    #[test]
    fn never_splits_multibyte_chars() {
        let body = "é".repeat(TRUNCATE_LIMIT);
        let out = truncate_for_log(&body);
        assert!(out.contains("... [truncated"));
        assert!(out.is_char_boundary(out.find("...").unwrap_or(0)));
    }
}
