//! Email shape validation.

use std::sync::LazyLock;

use regex::Regex;

/// `local@domain.tld`, each part free of whitespace and `@`.
#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile"));

/// Check that `value` looks like an email address.
///
/// Permissive on purpose: good enough to catch typos in a login form, far
/// from RFC 5322, and no statement about deliverability.
///
/// ```
/// use trust_boundary::security::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(!is_valid_email("user@"));
/// assert!(!is_valid_email("@example.com"));
/// ```
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}
