//! Utility functions for notification channels

/// Maximum length of a response body quoted in errors and logs
pub const MAX_BODY_LENGTH: usize = 4000;

/// Truncate a string to the specified maximum length
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    // Back up to a char boundary so multibyte content cannot panic the slice
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 5), "hello... [truncated]");
    }

    #[test]
    fn test_truncate_string_multibyte() {
        // 3-byte chars; cutting at 4 must back up to the boundary at 3
        assert_eq!(truncate_string("日本語", 4), "日... [truncated]");
    }
}
