//! TOML model files.
//!
//! A model file lists record types as `[[record]]` tables:
//!
//! ```toml
//! [[record]]
//! name = "Payment"
//!
//! [record.layout]
//! length = 18
//! crlf = "UNIX"
//!
//! [[record.field]]
//! name = "account"
//! pos = 1
//! length = 10
//! required = true
//!
//! [[record.field]]
//! name = "amount"
//! pos = 11
//! length = 8
//! kind = "long"
//! align = "R"
//! padding_char = "0"
//! ```
//!
//! Transforms are referenced by name and resolved against a
//! [`TransformRegistry`] when the file is loaded.

use crate::error::{BindError, Result};
use crate::model::{Align, FieldDef, LayoutDef, ModelRegistry, RecordDef, Transform, TransformFn};
use crate::value::{FieldKind, Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default, rename = "record")]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordEntry {
    name: String,
    #[serde(default, rename = "field")]
    fields: Vec<FieldEntry>,
    #[serde(default, rename = "link")]
    links: Vec<LinkEntry>,
    #[serde(default)]
    one_to_many: Vec<OneToManyEntry>,
    layout: Option<LayoutEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    name: String,
    #[serde(alias = "position")]
    pos: usize,
    #[serde(default)]
    length: usize,
    delimiter: Option<String>,
    length_ref: Option<usize>,
    #[serde(default)]
    required: bool,
    default_value: Option<String>,
    padding_char: Option<char>,
    #[serde(default)]
    align: Align,
    #[serde(default)]
    trim: bool,
    #[serde(default)]
    clip: bool,
    #[serde(default)]
    kind: FieldKind,
    #[serde(default)]
    nullable: bool,
    pattern: Option<String>,
    precision: Option<u32>,
    #[serde(default)]
    implied_decimal: bool,
    decimal_separator: Option<char>,
    grouping_separator: Option<char>,
    transform: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkEntry {
    field: String,
    target: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OneToManyEntry {
    field: String,
    #[serde(default)]
    element: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutEntry {
    #[serde(default)]
    length: usize,
    crlf: Option<String>,
    eol: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    #[serde(default)]
    skip_header: bool,
    #[serde(default)]
    skip_footer: bool,
    padding_char: Option<char>,
    #[serde(default)]
    ignore_trailing_chars: bool,
    #[serde(default)]
    ignore_missing_chars: bool,
}

/// Named transform callbacks available to model files.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `upper`, `lower` and `trim`, which act on text
    /// values and pass everything else through.
    pub fn with_builtins() -> Self {
        Self::new()
            .register("upper", |v| Ok(map_text(v, |s| s.to_uppercase())))
            .register("lower", |v| Ok(map_text(v, |s| s.to_lowercase())))
            .register("trim", |v| Ok(map_text(v, |s| s.trim().to_string())))
    }

    #[must_use]
    pub fn register(
        mut self,
        name: impl Into<String>,
        func: impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.transforms.insert(name.into(), Arc::new(func));
        self
    }

    /// Looks `name` up as given, then by its last `.`-separated segment, so
    /// qualified names like `com.acme.Upper` match a registered `Upper`.
    pub fn resolve(&self, name: &str) -> Result<Transform> {
        let short = name.rsplit('.').next().unwrap_or(name);
        self.transforms
            .get(name)
            .or_else(|| self.transforms.get(short))
            .map(|func| Transform::from_fn(name, Arc::clone(func)))
            .ok_or_else(|| BindError::UnknownTransform(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry").field("names", &names).finish()
    }
}

fn map_text(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Text(s) => Value::Text(f(&s)),
        other => other,
    }
}

/// Parses a TOML model and registers its record types in file order.
pub fn load_model(text: &str, transforms: &TransformRegistry) -> Result<ModelRegistry> {
    let file: ModelFile = toml::from_str(text)?;
    let mut registry = ModelRegistry::new();
    for entry in file.records {
        registry.register(record_def(entry, transforms)?)?;
    }
    debug!(records = registry.len(), "model loaded");
    Ok(registry)
}

pub fn load_model_file(path: impl AsRef<Path>, transforms: &TransformRegistry) -> Result<ModelRegistry> {
    let text = fs::read_to_string(path)?;
    load_model(&text, transforms)
}

fn record_def(entry: RecordEntry, transforms: &TransformRegistry) -> Result<RecordDef> {
    let mut record = RecordDef::new(entry.name);
    for field in entry.fields {
        record = record.field(field_def(field, transforms)?);
    }
    for link in entry.links {
        record = record.link(link.field, link.target);
    }
    for many in entry.one_to_many {
        record = record.one_to_many(many.field, many.element);
    }
    if let Some(layout) = entry.layout {
        record = record.layout(layout_def(layout));
    }
    Ok(record)
}

fn field_def(entry: FieldEntry, transforms: &TransformRegistry) -> Result<FieldDef> {
    let transform = entry
        .transform
        .as_deref()
        .map(|name| transforms.resolve(name))
        .transpose()?;
    Ok(FieldDef {
        name: entry.name,
        position: entry.pos,
        length: entry.length,
        delimiter: entry.delimiter,
        length_ref: entry.length_ref,
        required: entry.required,
        default_value: entry.default_value,
        padding_char: entry.padding_char,
        align: entry.align,
        trim: entry.trim,
        clip: entry.clip,
        kind: entry.kind,
        nullable: entry.nullable,
        pattern: entry.pattern,
        precision: entry.precision,
        implied_decimal: entry.implied_decimal,
        decimal_separator: entry.decimal_separator,
        grouping_separator: entry.grouping_separator,
        transform,
    })
}

fn layout_def(entry: LayoutEntry) -> LayoutDef {
    let defaults = LayoutDef::default();
    LayoutDef {
        length: entry.length,
        crlf: entry.crlf.unwrap_or(defaults.crlf),
        eol: entry.eol.unwrap_or(defaults.eol),
        header: entry.header,
        footer: entry.footer,
        skip_header: entry.skip_header,
        skip_footer: entry.skip_footer,
        padding_char: entry.padding_char.unwrap_or(defaults.padding_char),
        ignore_trailing_chars: entry.ignore_trailing_chars,
        ignore_missing_chars: entry.ignore_missing_chars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unmarshal::FixedLengthFormat;

    const MODEL: &str = r#"
[[record]]
name = "Order"
link = [{ field = "client", target = "Client" }]

[record.layout]
length = 12
crlf = "UNIX"

[[record.field]]
name = "id"
pos = 1
length = 4
kind = "int"
align = "R"
padding_char = "0"

[[record]]
name = "Client"

[[record.field]]
name = "name"
position = 5
length = 8
trim = true
transform = "upper"
"#;

    #[test]
    fn test_load_model() {
        let registry = load_model(MODEL, &TransformRegistry::with_builtins()).unwrap();
        assert_eq!(registry.len(), 2);

        let order = registry.get("Order").unwrap();
        assert_eq!(order.fields[0].kind, FieldKind::Int);
        assert_eq!(order.fields[0].align, Align::Right);
        assert_eq!(order.fields[0].padding_char, Some('0'));
        assert_eq!(order.links[0].target, "Client");

        let layout = order.layout.as_ref().unwrap();
        assert_eq!(layout.length, 12);
        assert_eq!(layout.crlf, "UNIX");
        assert_eq!(layout.padding_char, ' ');

        let client = registry.get("Client").unwrap();
        assert_eq!(client.fields[0].position, 5);
        assert_eq!(client.fields[0].transform.as_ref().map(Transform::name), Some("upper"));
    }

    #[test]
    fn test_loaded_model_binds() {
        let registry = load_model(MODEL, &TransformRegistry::with_builtins()).unwrap();
        let format = FixedLengthFormat::new(&registry, "Order").unwrap();
        let result = format.unmarshal_str("0042acme    \n").unwrap();
        let record = &result.entries[0];
        assert_eq!(record.root().get("id"), Some(&Value::Int(42)));
        assert_eq!(record.linked("client").and_then(|c| c.text("name")), Some("ACME"));
    }

    #[test]
    fn test_unknown_transform() {
        let err = load_model(MODEL, &TransformRegistry::new()).unwrap_err();
        assert!(matches!(err, BindError::UnknownTransform(ref name) if name == "upper"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_qualified_transform_name() {
        let transforms = TransformRegistry::new().register("Upper", |v| Ok(v));
        let transform = transforms.resolve("com.acme.Upper").unwrap();
        assert_eq!(transform.name(), "com.acme.Upper");
        assert!(transforms.resolve("com.acme.Lower").is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = load_model("[[record]]\nname = \"A\"\ncolour = \"red\"\n", &TransformRegistry::new())
            .unwrap_err();
        assert!(matches!(err, BindError::ModelFile(_)));
    }

    #[test]
    fn test_one_to_many_without_element() {
        let text = "[[record]]\nname = \"A\"\none_to_many = [{ field = \"items\" }]\n";
        let registry = load_model(text, &TransformRegistry::new()).unwrap();
        let err = FixedLengthFormat::new(&registry, "A").unwrap_err();
        assert!(matches!(err, BindError::MissingElementType { .. }));
    }

    #[test]
    fn test_load_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        std::fs::write(&path, MODEL).unwrap();
        let registry = load_model_file(&path, &TransformRegistry::with_builtins()).unwrap();
        assert_eq!(registry.first().map(|r| r.name.as_str()), Some("Order"));

        let missing = load_model_file(dir.path().join("nope.toml"), &TransformRegistry::new());
        assert!(matches!(missing, Err(BindError::Io(_))));
    }

    #[test]
    fn test_builtins() {
        let transforms = TransformRegistry::with_builtins();
        assert_eq!(transforms.len(), 3);
        let trim = transforms.resolve("trim").unwrap();
        assert_eq!(trim.apply(Value::from("  x ")).unwrap(), Value::from("x"));
        assert_eq!(trim.apply(Value::Int(3)).unwrap(), Value::Int(3));
        assert!(format!("{transforms:?}").contains("lower"));
    }
}
