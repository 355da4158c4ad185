//! Display sanitization.
//!
//! [`sanitize_for_display`] is a second layer behind a rendering path that
//! already escapes text. It removes the two most common script vectors and
//! nothing else: it does not parse markup, and it leaves entities, other
//! tags and unquoted attributes alone. A renderer that injects raw markup
//! must escape with [`escape_html`] instead of relying on it.

use std::sync::LazyLock;

use super::rules::RuleSet;

static DISPLAY_RULES: LazyLock<RuleSet> = LazyLock::new(RuleSet::display);

/// Remove `<script>...</script>` blocks and quoted `on<event>=` attributes.
///
/// Matching is case-insensitive and script blocks may span lines. The rules
/// are re-applied until nothing changes, so the result is stable under a
/// second call. Input still changing after
/// [`DISPLAY_MAX_PASSES`](super::DISPLAY_MAX_PASSES) passes is nested
/// deeper than any real markup and is returned HTML-escaped instead.
///
/// # Example
///
/// ```
/// use trust_boundary::security::sanitize_for_display;
///
/// assert_eq!(
///     sanitize_for_display("Hello <script>alert(1)</script> World"),
///     "Hello  World"
/// );
/// assert_eq!(sanitize_for_display(r#"<div onclick="x()">hi</div>"#), "<div >hi</div>");
/// ```
#[must_use]
pub fn sanitize_for_display(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    DISPLAY_RULES.apply(text)
}

/// Escape the five HTML-significant characters.
///
/// ```
/// use trust_boundary::security::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
///     "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;");
/// ```
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn test_removes_script_tags() {
        let result = sanitize_for_display(r#"Hello <script>alert("XSS")</script> World"#);
        assert!(!result.contains("<script>"));
        assert_eq!(result, "Hello  World");
    }

    #[test]
    fn test_removes_multiline_mixed_case_script() {
        let input = "a<SCRIPT type=\"text/javascript\">\nsteal();\n</Script>b";
        assert_eq!(sanitize_for_display(input), "ab");
    }

    #[test]
    fn test_script_removal_is_non_greedy() {
        let input = "<script>a()</script>keep<script>b()</script>";
        assert_eq!(sanitize_for_display(input), "keep");
    }

    #[test]
    fn test_unclosed_script_left_for_renderer() {
        let input = "<script>never closed";
        assert_eq!(sanitize_for_display(input), input);
    }

    #[test_case(r#"<div onclick="alert()">Click me</div>"# ; "double quoted")]
    #[test_case("<img src=x onerror='steal()'>" ; "single quoted")]
    #[test_case(r#"<body ONLOAD = "boot()">"# ; "upper case spaced")]
    fn test_removes_event_handlers(input: &str) {
        let result = sanitize_for_display(input);
        let lower = result.to_lowercase();
        assert!(!lower.contains("onclick="));
        assert!(!lower.contains("onerror="));
        assert!(!lower.contains("onload"));
    }

    #[test]
    fn test_keeps_ordinary_markup() {
        let input = "<p class=\"note\">Tell me about <b>yourself</b></p>";
        assert_eq!(sanitize_for_display(input), input);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_for_display(""), "");
    }

    #[test_case("<scr<script></script>ipt>alert(1)</script>" ; "nested script")]
    #[test_case(r#"<a onclick="x" onmouseover='y()'>"# ; "adjacent handlers")]
    #[test_case("<script>x</script><script>y</script>" ; "adjacent scripts")]
    fn test_idempotent_on_malicious_input(input: &str) {
        let once = sanitize_for_display(input);
        assert_eq!(sanitize_for_display(&once), once);
        assert!(!once.to_lowercase().contains("<script>"));
    }

    #[test]
    fn test_escape_html_plain_text() {
        assert_eq!(escape_html("plain"), "plain");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn test_escape_html_neutralizes_script() {
        let escaped = escape_html("<script>alert(1)</script>");
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
    }

    #[test]
    fn test_deeply_nested_script_is_escaped_in_linear_time() {
        let depth = 50_000;
        let input = format!(
            "{}<script></script>{}",
            "<SCR".repeat(depth),
            "ipt></script>".repeat(depth)
        );

        let started = std::time::Instant::now();
        let once = sanitize_for_display(&input);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        assert!(!once.contains('<'));
        assert!(!once.to_lowercase().contains("script>"));
        assert_eq!(sanitize_for_display(&once), once);
    }

    proptest! {
        #[test]
        fn prop_idempotent(s in "[<>/a-z =\"'()]{0,120}") {
            let once = sanitize_for_display(&s);
            prop_assert_eq!(sanitize_for_display(&once), once);
        }
    }
}
