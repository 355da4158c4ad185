//! Input sanitization at the trust boundary.
//!
//! Untrusted text and numbers from forms, uploads and pasted blocks pass
//! through these functions before they reach an LLM prompt template or the
//! DOM:
//! - [`sanitize_prompt_input`] strips control characters, excess newlines and
//!   known prompt-injection phrasings
//! - [`sanitize_for_display`] strips `<script>` blocks and inline event handlers
//! - [`is_valid_email`] checks address shape for login and signup forms
//! - [`sanitize_file_content`] bounds and cleans uploaded résumé text
//! - [`sanitize_number`] coerces and clamps numeric form values
//! - [`sanitize_skill_tag`] restricts tags to a safe character set
//!
//! None of these functions fail. Malformed input is absorbed into a safe
//! default: an empty string, `None`, or `false`. Callers holding an
//! `Option<&str>` pass `value.unwrap_or_default()`.
//!
//! All lengths count Unicode scalar values, never bytes.

mod display;
mod email;
mod file;
mod number;
mod prompt;
mod rules;
mod tag;

pub use display::{escape_html, sanitize_for_display};
pub use email::is_valid_email;
pub use file::{sanitize_file_content, sanitize_file_content_default};
pub use number::{sanitize_number, NumericInput};
pub use prompt::{detect_prompt_injection, sanitize_prompt_input};
pub use rules::{
    truncate_chars, Charset, ControlChars, Denylist, Pattern, Rule, RuleHit, RuleInfo, RuleKind,
    RuleSet, SanitizeReport, DISPLAY_MAX_PASSES, PROMPT_INJECTION_PATTERNS,
};
pub use tag::sanitize_skill_tag;

/// Maximum length of text interpolated into a prompt.
pub const MAX_PROMPT_INPUT_CHARS: usize = 10_000;

/// Longest run of consecutive newlines kept in prompt text.
pub const MAX_CONSECUTIVE_NEWLINES: usize = 2;

/// Default maximum length of uploaded file content.
pub const DEFAULT_FILE_MAX_CHARS: usize = 50_000;

/// Maximum length of a skill tag.
pub const MAX_SKILL_TAG_CHARS: usize = 50;
