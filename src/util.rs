//! Shared utilities for the trendsmith codebase

use std::fmt;

/// A string wrapper that masks its contents in Debug/Display output.
/// Prevents accidental logging of API keys and other secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Intentionally access the raw secret value (for headers, URLs, etc.)
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for SecretString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
/// Used to keep raw oracle output in logs readable.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

/// Character count (not bytes) of a trimmed string.
pub fn char_len(text: &str) -> usize {
    text.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_hides_in_debug() {
        let secret = SecretString::new("my-api-key-123".to_string());
        let debug_output = format!("{:?}", secret);
        assert_eq!(debug_output, "***");
        assert!(!debug_output.contains("my-api-key"));
    }

    #[test]
    fn test_secret_string_hides_in_display() {
        let secret = SecretString::new("my-api-key-123".to_string());
        assert_eq!(format!("{}", secret), "***");
    }

    #[test]
    fn test_secret_string_expose_returns_value() {
        let secret: SecretString = "test-key".to_string().into();
        assert_eq!(secret.expose(), "test-key");
        assert!(secret == "test-key");
    }

    #[test]
    fn test_secret_string_blank_is_empty() {
        assert!(SecretString::new("   ".to_string()).is_empty());
        assert!(!SecretString::new("k".to_string()).is_empty());
    }

    #[test]
    fn test_preview_short_text_untouched() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn test_preview_cuts_on_char_boundary() {
        assert_eq!(preview("héllo wörld", 5), "héllo…");
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(char_len("  ok "), 2);
        assert_eq!(char_len("café"), 4);
    }
}
