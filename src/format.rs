//! Token <-> value conversion.
//!
//! The binder only talks to the [`FormatConverter`] trait. [`DefaultConverter`]
//! covers the field kinds of [`FieldKind`]; callers with bespoke encodings
//! (packed decimals, EBCDIC dates, ...) plug their own converter into
//! [`FixedLengthFormat::with_converter`](crate::FixedLengthFormat::with_converter).

use crate::error::FormatError;
use crate::value::{FieldKind, Value};
use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use std::fmt::{self, Write as _};

/// Default chrono pattern for `date` fields.
pub const DEFAULT_DATE_PATTERN: &str = "%Y%m%d";

/// Languages whose locales write `1.234,56`.
const COMMA_DECIMAL_LANGUAGES: &[&str] = &[
    "cs", "da", "de", "es", "fi", "fr", "it", "lt", "lv", "nb", "nl", "pl", "pt", "ru", "sv", "tr",
];

/// Everything a converter needs to know about one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattingOptions {
    pub kind: FieldKind,
    /// chrono pattern for dates.
    pub pattern: Option<String>,
    /// Digits after the decimal separator.
    pub precision: Option<u32>,
    /// The token carries no separator; the last `precision` digits are decimals.
    pub implied_decimal: bool,
    pub decimal_separator: Option<char>,
    pub grouping_separator: Option<char>,
    pub locale: Option<String>,
}

impl FormattingOptions {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Decimal and grouping separators: explicit settings first, then the locale.
    pub fn separators(&self) -> (char, Option<char>) {
        let (locale_decimal, locale_grouping) = match self.language() {
            Some(lang) if COMMA_DECIMAL_LANGUAGES.contains(&lang.as_str()) => (',', Some('.')),
            Some(lang) if lang == "en" => ('.', Some(',')),
            _ => ('.', None),
        };
        (
            self.decimal_separator.unwrap_or(locale_decimal),
            self.grouping_separator.or(locale_grouping),
        )
    }

    fn language(&self) -> Option<String> {
        let locale = self.locale.as_deref()?;
        locale
            .split(['_', '-'])
            .next()
            .filter(|lang| !lang.is_empty())
            .map(str::to_ascii_lowercase)
    }

    fn date_pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(DEFAULT_DATE_PATTERN)
    }
}

/// True when every specifier of the chrono `pattern` is recognised.
pub fn is_valid_date_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Converts a token string to a typed value and back.
pub trait FormatConverter: Send + Sync + fmt::Debug {
    fn parse(&self, token: &str, options: &FormattingOptions) -> Result<Value, FormatError>;

    fn format(&self, value: &Value, options: &FormattingOptions) -> Result<String, FormatError>;
}

/// Converter for the built-in field kinds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConverter;

fn parse_error(token: &str, kind: FieldKind, reason: impl ToString) -> FormatError {
    FormatError::Parse {
        token: token.to_string(),
        kind,
        reason: reason.to_string(),
    }
}

impl DefaultConverter {
    fn parse_double(token: &str, options: &FormattingOptions) -> Result<f64, FormatError> {
        let (decimal, grouping) = options.separators();
        let mut digits: String = token
            .trim()
            .chars()
            .filter(|c| Some(*c) != grouping)
            .collect();
        if decimal != '.' {
            digits = digits.replace(decimal, ".");
        }
        let value: f64 = digits
            .parse()
            .map_err(|e| parse_error(token, FieldKind::Double, e))?;
        match options.precision {
            Some(precision) if options.implied_decimal => {
                Ok(value / 10f64.powi(precision as i32))
            }
            _ => Ok(value),
        }
    }

    fn format_double(value: f64, options: &FormattingOptions) -> String {
        let text = match options.precision {
            Some(precision) if options.implied_decimal => {
                format!("{:.0}", value * 10f64.powi(precision as i32))
            }
            Some(precision) => format!("{:.*}", precision as usize, value),
            None => value.to_string(),
        };
        let (decimal, _) = options.separators();
        if decimal == '.' {
            text
        } else {
            text.replace('.', &decimal.to_string())
        }
    }
}

impl FormatConverter for DefaultConverter {
    fn parse(&self, token: &str, options: &FormattingOptions) -> Result<Value, FormatError> {
        let kind = options.kind;
        match kind {
            FieldKind::Text => Ok(Value::Text(token.to_string())),
            FieldKind::Char => token
                .chars()
                .next()
                .map(Value::Char)
                .ok_or_else(|| parse_error(token, kind, "empty token")),
            FieldKind::Bool => match token.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "y" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "n" | "no" => Ok(Value::Bool(false)),
                _ => Err(parse_error(token, kind, "expected true/false, 1/0 or Y/N")),
            },
            FieldKind::Int => token
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|e| parse_error(token, kind, e)),
            FieldKind::Long => token
                .trim()
                .parse::<i64>()
                .map(Value::Long)
                .map_err(|e| parse_error(token, kind, e)),
            FieldKind::Double => Self::parse_double(token, options).map(Value::Double),
            FieldKind::Date => NaiveDate::parse_from_str(token.trim(), options.date_pattern())
                .map(Value::Date)
                .map_err(|e| parse_error(token, kind, e)),
        }
    }

    fn format(&self, value: &Value, options: &FormattingOptions) -> Result<String, FormatError> {
        let mismatch = || FormatError::KindMismatch {
            expected: options.kind,
            actual: value.kind_name(),
        };
        match (options.kind, value) {
            (_, Value::Null) => Ok(String::new()),
            (FieldKind::Text, Value::Text(s)) => Ok(s.clone()),
            (FieldKind::Char, Value::Char(c)) => Ok(c.to_string()),
            (FieldKind::Bool, Value::Bool(b)) => Ok(b.to_string()),
            (FieldKind::Int | FieldKind::Long, Value::Int(v)) => Ok(v.to_string()),
            (FieldKind::Long, Value::Long(v)) => Ok(v.to_string()),
            (FieldKind::Double, Value::Double(v)) => Ok(Self::format_double(*v, options)),
            (FieldKind::Date, Value::Date(d)) => {
                let pattern = options.date_pattern();
                let mut out = String::new();
                write!(out, "{}", d.format(pattern)).map_err(|_| FormatError::Pattern {
                    pattern: pattern.to_string(),
                })?;
                Ok(out)
            }
            _ => Err(mismatch()),
        }
    }
}
