//! Numeric input coercion and clamping.

use std::fmt;

/// A numeric form value before coercion: either already a number or text.
///
/// Text coerces as follows:
/// - surrounding whitespace is ignored
/// - decimal literals with optional sign, fraction and exponent parse
///   (`"123"`, `"-1.5"`, `"+.5"`, `"1e3"`), as do `"inf"` and `"infinity"`
/// - empty text, hex, digit separators, units (`"12px"`) and words are
///   not numbers
///
/// Any `NaN`, whether passed in directly or spelled `"NaN"`, is not a number.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    /// A native number.
    Number(f64),
    /// Text from a form field.
    Text(String),
}

impl NumericInput {
    /// Coerce to a finite-or-infinite number; `None` for not-a-number.
    #[must_use]
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        (!value.is_nan()).then_some(value)
    }
}

impl fmt::Display for NumericInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for NumericInput {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

macro_rules! numeric_input_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for NumericInput {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn from(value: $t) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

numeric_input_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for NumericInput {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

/// Coerce `value` to a number and clamp it into `[min, max]`.
///
/// Returns `None` when `value` is not a number. A value below `min` becomes
/// `min`; otherwise a value above `max` becomes `max`. Either bound may be
/// omitted.
///
/// ```
/// use trust_boundary::security::sanitize_number;
///
/// assert_eq!(sanitize_number("123", None, None), Some(123.0));
/// assert_eq!(sanitize_number(5, Some(10.0), Some(20.0)), Some(10.0));
/// assert_eq!(sanitize_number(25, Some(10.0), Some(20.0)), Some(20.0));
/// assert_eq!(sanitize_number("abc", None, None), None);
/// ```
#[must_use]
pub fn sanitize_number(
    value: impl Into<NumericInput>,
    min: Option<f64>,
    max: Option<f64>,
) -> Option<f64> {
    let num = value.into().coerce()?;
    if let Some(min) = min {
        if num < min {
            return Some(min);
        }
    }
    if let Some(max) = max {
        if num > max {
            return Some(max);
        }
    }
    Some(num)
}
