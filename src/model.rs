//! Model definitions: the explicit registration surface for record types.
//!
//! A record type is a [`RecordDef`]: its positional [`FieldDef`]s, the
//! [`LinkDef`]s and [`OneToManyDef`]s that pull other record types into the
//! same line, and optionally the [`LayoutDef`] governing the file. Record
//! types are collected in a [`ModelRegistry`] and compiled per root type by
//! [`RecordSchema::compile`](crate::RecordSchema::compile).
//!
//! ```
//! use fixedlen_rs::{Align, FieldDef, FieldKind, LayoutDef, ModelRegistry, RecordDef};
//!
//! let mut registry = ModelRegistry::new();
//! registry
//!     .register(
//!         RecordDef::new("Payment")
//!             .field(FieldDef::new("account", 1).length(10).required(true))
//!             .field(FieldDef::new("amount", 11).length(8).kind(FieldKind::Long).align(Align::Right))
//!             .layout(LayoutDef::new().length(18)),
//!     )
//!     .unwrap();
//! assert!(registry.get("Payment").is_some());
//! ```

use crate::error::{BindError, Result};
use crate::format::FormattingOptions;
use crate::value::{FieldKind, Value};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Which side of a fixed-length slot holds the data.
///
/// `Right` aligned data is padded (and trimmed) on the left, `Left` aligned
/// data on the right, `Both` on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[serde(alias = "L")]
    Left,
    #[serde(alias = "R")]
    Right,
    #[default]
    #[serde(alias = "B")]
    Both,
}

/// Callback applied to a converted, non-null value.
pub type TransformFn = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// A named post-conversion callback.
#[derive(Clone)]
pub struct Transform {
    name: String,
    func: TransformFn,
}

impl Transform {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub(crate) fn from_fn(name: impl Into<String>, func: TransformFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: Value) -> std::result::Result<Value, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").field("name", &self.name).finish()
    }
}

/// One positional column of a record type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    /// 1-based column; unique across all record types bound on one line.
    pub position: usize,
    /// Fixed width; 0 means the width comes from `delimiter` or `length_ref`.
    pub length: usize,
    pub delimiter: Option<String>,
    /// Position of an integral field whose bound value is this field's width.
    pub length_ref: Option<usize>,
    pub required: bool,
    pub default_value: Option<String>,
    /// Overrides the layout padding character.
    pub padding_char: Option<char>,
    pub align: Align,
    pub trim: bool,
    /// Truncate over-long values when writing instead of failing.
    pub clip: bool,
    pub kind: FieldKind,
    /// Empty tokens bind to `Null` instead of the kind's sentinel.
    pub nullable: bool,
    pub pattern: Option<String>,
    pub precision: Option<u32>,
    pub implied_decimal: bool,
    pub decimal_separator: Option<char>,
    pub grouping_separator: Option<char>,
    pub transform: Option<Transform>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
            length: 0,
            delimiter: None,
            length_ref: None,
            required: false,
            default_value: None,
            padding_char: None,
            align: Align::Both,
            trim: false,
            clip: false,
            kind: FieldKind::Text,
            nullable: false,
            pattern: None,
            precision: None,
            implied_decimal: false,
            decimal_separator: None,
            grouping_separator: None,
            transform: None,
        }
    }

    #[must_use]
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    #[must_use]
    pub fn length_ref(mut self, position: usize) -> Self {
        self.length_ref = Some(position);
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn padding_char(mut self, c: char) -> Self {
        self.padding_char = Some(c);
        self
    }

    #[must_use]
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    #[must_use]
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    #[must_use]
    pub fn clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    #[must_use]
    pub fn implied_decimal(mut self, implied: bool) -> Self {
        self.implied_decimal = implied;
        self
    }

    #[must_use]
    pub fn separators(mut self, decimal: Option<char>, grouping: Option<char>) -> Self {
        self.decimal_separator = decimal;
        self.grouping_separator = grouping;
        self
    }

    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Converter options for this field under `locale`.
    pub fn formatting_options(&self, locale: Option<&str>) -> FormattingOptions {
        FormattingOptions {
            kind: self.kind,
            pattern: self.pattern.clone(),
            precision: self.precision,
            implied_decimal: self.implied_decimal,
            decimal_separator: self.decimal_separator,
            grouping_separator: self.grouping_separator,
            locale: locale.map(str::to_string),
        }
    }
}

/// A field that points at the instance of another record type on the same line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    pub field: String,
    pub target: String,
}

/// A collection field whose elements are instances of another record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToManyDef {
    pub field: String,
    pub element: String,
}

/// File-level settings declared by one record type of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDef {
    /// Expected record length; 0 disables the check.
    pub length: usize,
    /// Record terminator for writing: `WINDOWS`, `UNIX`, `MAC` or a literal.
    pub crlf: String,
    /// Literal line separator for reading; empty means natural line breaks.
    pub eol: String,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub skip_header: bool,
    pub skip_footer: bool,
    pub padding_char: char,
    pub ignore_trailing_chars: bool,
    pub ignore_missing_chars: bool,
}

impl Default for LayoutDef {
    fn default() -> Self {
        Self {
            length: 0,
            crlf: "WINDOWS".to_string(),
            eol: String::new(),
            header: None,
            footer: None,
            skip_header: false,
            skip_footer: false,
            padding_char: ' ',
            ignore_trailing_chars: false,
            ignore_missing_chars: false,
        }
    }
}

impl LayoutDef {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn crlf(mut self, crlf: impl Into<String>) -> Self {
        self.crlf = crlf.into();
        self
    }

    #[must_use]
    pub fn eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = eol.into();
        self
    }

    #[must_use]
    pub fn header(mut self, record: impl Into<String>) -> Self {
        self.header = Some(record.into());
        self
    }

    #[must_use]
    pub fn footer(mut self, record: impl Into<String>) -> Self {
        self.footer = Some(record.into());
        self
    }

    #[must_use]
    pub fn skip_header(mut self, skip: bool) -> Self {
        self.skip_header = skip;
        self
    }

    #[must_use]
    pub fn skip_footer(mut self, skip: bool) -> Self {
        self.skip_footer = skip;
        self
    }

    #[must_use]
    pub fn padding_char(mut self, c: char) -> Self {
        self.padding_char = c;
        self
    }

    #[must_use]
    pub fn ignore_trailing_chars(mut self, ignore: bool) -> Self {
        self.ignore_trailing_chars = ignore;
        self
    }

    #[must_use]
    pub fn ignore_missing_chars(mut self, ignore: bool) -> Self {
        self.ignore_missing_chars = ignore;
        self
    }
}

/// A record shape.
#[derive(Debug, Clone)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub links: Vec<LinkDef>,
    pub one_to_many: Vec<OneToManyDef>,
    pub layout: Option<LayoutDef>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            links: Vec::new(),
            one_to_many: Vec::new(),
            layout: None,
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn link(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.links.push(LinkDef {
            field: field.into(),
            target: target.into(),
        });
        self
    }

    #[must_use]
    pub fn one_to_many(mut self, field: impl Into<String>, element: impl Into<String>) -> Self {
        self.one_to_many.push(OneToManyDef {
            field: field.into(),
            element: element.into(),
        });
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: LayoutDef) -> Self {
        self.layout = Some(layout);
        self
    }
}

/// All record types known to an application, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    records: Vec<RecordDef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record type. Names must be unique.
    pub fn register(&mut self, record: RecordDef) -> Result<&mut Self> {
        if self.get(&record.name).is_some() {
            return Err(BindError::DuplicateType(record.name));
        }
        self.records.push(record);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RecordDef> {
        self.records.iter().find(|r| r.name == name)
    }

    pub(crate) fn require(&self, name: &str) -> Result<&RecordDef> {
        self.get(name)
            .ok_or_else(|| BindError::UnknownType(name.to_string()))
    }

    /// The first registered record type.
    pub fn first(&self) -> Option<&RecordDef> {
        self.records.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordDef> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
