//! Uploaded file content sanitization.

use super::rules::RuleSet;
use super::DEFAULT_FILE_MAX_CHARS;

/// Bound and clean uploaded text before it is forwarded into a prompt.
///
/// Keeps the first `max_length` characters and removes null bytes and
/// control characters. Callers with no limit of their own use
/// [`sanitize_file_content_default`].
/// Tab, line feed and carriage return survive so a résumé keeps its line
/// structure; this is stricter than nothing and looser than
/// [`sanitize_prompt_input`](super::sanitize_prompt_input), which also drops
/// tab and carriage return. No trimming is done.
///
/// ```
/// use trust_boundary::security::{sanitize_file_content, DEFAULT_FILE_MAX_CHARS};
///
/// assert_eq!(sanitize_file_content("Hello\x00World", DEFAULT_FILE_MAX_CHARS), "HelloWorld");
/// assert_eq!(sanitize_file_content(&"a".repeat(100_000), 50_000).len(), 50_000);
/// ```
#[must_use]
pub fn sanitize_file_content(content: &str, max_length: usize) -> String {
    if content.is_empty() {
        return String::new();
    }
    RuleSet::file_content(max_length).apply(content)
}

/// [`sanitize_file_content`] with the default limit of
/// [`DEFAULT_FILE_MAX_CHARS`](super::DEFAULT_FILE_MAX_CHARS) characters.
///
/// ```
/// use trust_boundary::security::sanitize_file_content_default;
///
/// assert_eq!(sanitize_file_content_default(&"a".repeat(60_000)).len(), 50_000);
/// ```
#[must_use]
pub fn sanitize_file_content_default(content: &str) -> String {
    sanitize_file_content(content, DEFAULT_FILE_MAX_CHARS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_limits_length() {
        let input = "a".repeat(100_000);
        assert_eq!(sanitize_file_content(&input, 50_000).chars().count(), 50_000);
    }

    #[test]
    fn test_default_limit() {
        let input = "b".repeat(DEFAULT_FILE_MAX_CHARS + 10);
        assert_eq!(
            sanitize_file_content(&input, DEFAULT_FILE_MAX_CHARS).chars().count(),
            DEFAULT_FILE_MAX_CHARS
        );
    }

    #[test]
    fn test_default_companion_uses_default_limit() {
        let input = format!("{}\x00tail", "c".repeat(DEFAULT_FILE_MAX_CHARS - 2));
        let result = sanitize_file_content_default(&input);
        assert_eq!(result.chars().count(), DEFAULT_FILE_MAX_CHARS - 1);
        assert!(result.ends_with("cct"));
        assert_eq!(result, sanitize_file_content(&input, DEFAULT_FILE_MAX_CHARS));
        assert_eq!(sanitize_file_content_default(""), "");
    }

    #[test]
    fn test_removes_null_bytes() {
        assert_eq!(
            sanitize_file_content("Hello\x00World", DEFAULT_FILE_MAX_CHARS),
            "HelloWorld"
        );
    }

    #[test]
    fn test_keeps_line_structure() {
        let resume = "Name:\tAda\r\nSkills:\n  - Rust\n\n\n\nEnd";
        assert_eq!(sanitize_file_content(resume, DEFAULT_FILE_MAX_CHARS), resume);
    }

    #[test]
    fn test_removes_other_controls() {
        assert_eq!(
            sanitize_file_content("a\x01b\x08c\x0Bd\x0Ce\x0Ef\x1Fg\x7Fh", DEFAULT_FILE_MAX_CHARS),
            "abcdefgh"
        );
    }

    #[test]
    fn test_does_not_trim() {
        assert_eq!(sanitize_file_content("  x  ", 10), "  x  ");
    }

    #[test]
    fn test_zero_limit() {
        assert_eq!(sanitize_file_content("anything", 0), "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_file_content("", DEFAULT_FILE_MAX_CHARS), "");
    }

    proptest! {
        #[test]
        fn prop_length_bounded(s in "\\PC{0,300}", max in 0usize..200) {
            prop_assert!(sanitize_file_content(&s, max).chars().count() <= max);
        }

        #[test]
        fn prop_only_line_structure_controls(s in "[\\x00-\\x7F]{0,200}") {
            let result = sanitize_file_content(&s, DEFAULT_FILE_MAX_CHARS);
            prop_assert!(result
                .chars()
                .all(|c| matches!(c, '\t' | '\n' | '\r') || !(c < ' ' || c == '\x7F')));
        }
    }
}
