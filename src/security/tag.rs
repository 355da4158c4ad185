//! Skill tag sanitization.

use std::sync::LazyLock;

use super::rules::RuleSet;
use super::MAX_SKILL_TAG_CHARS;

static TAG_RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet::skill_tag(MAX_SKILL_TAG_CHARS));

/// Restrict a free-text tag to ASCII letters, digits, whitespace, `-` and `.`.
///
/// The filtered tag is cut to [`MAX_SKILL_TAG_CHARS`] characters and then
/// trimmed, so tags can serve as storage and filter keys without carrying
/// markup or query punctuation.
///
/// ```
/// use trust_boundary::security::sanitize_skill_tag;
///
/// assert_eq!(sanitize_skill_tag("Kubernetes@#$%"), "Kubernetes");
/// assert_eq!(sanitize_skill_tag("Node.js v20.1"), "Node.js v20.1");
/// ```
#[must_use]
pub fn sanitize_skill_tag(tag: &str) -> String {
    if tag.is_empty() {
        return String::new();
    }
    TAG_RULES.apply(tag)
}
