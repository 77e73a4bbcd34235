//! Stream-level binding: header, body records and footer.
//!
//! Lines are read with one line of lookahead so the last non-blank line can
//! be routed to the footer without knowing the input size up front.

use crate::error::{BindError, Result};
use crate::format::{DefaultConverter, FormatConverter};
use crate::instance::Record;
use crate::model::ModelRegistry;
use crate::schema::RecordSchema;
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};

/// Header, footer and body records of one input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BindResult {
    pub header: Option<Record>,
    pub footer: Option<Record>,
    pub entries: Vec<Record>,
}

/// Maps a bound [`Record`] onto an application type.
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(record.clone())
    }
}

/// [`BindResult`] mapped onto application types.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResult<E, H, F> {
    pub header: Option<H>,
    pub footer: Option<F>,
    pub entries: Vec<E>,
}

impl BindResult {
    pub fn into_typed<E, H, F>(&self) -> Result<TypedResult<E, H, F>>
    where
        E: FromRecord,
        H: FromRecord,
        F: FromRecord,
    {
        Ok(TypedResult {
            header: self.header.as_ref().map(H::from_record).transpose()?,
            footer: self.footer.as_ref().map(F::from_record).transpose()?,
            entries: self
                .entries
                .iter()
                .map(E::from_record)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Yields non-blank lines with their 1-based source line numbers.
struct LineScanner<'a> {
    lines: Box<dyn Iterator<Item = &'a str> + 'a>,
    count: usize,
}

impl<'a> LineScanner<'a> {
    fn new(input: &'a str, eol: Option<&'a str>) -> Self {
        let lines: Box<dyn Iterator<Item = &'a str> + 'a> = match eol {
            Some(eol) => Box::new(input.split(eol)),
            None => Box::new(input.lines()),
        };
        Self { lines, count: 0 }
    }

    fn next_non_blank(&mut self) -> Option<(usize, &'a str)> {
        for line in self.lines.by_ref() {
            self.count += 1;
            if !line.trim().is_empty() {
                return Some((self.count, line));
            }
        }
        None
    }
}

/// A compiled fixed-length data format for one root record type, with its
/// header and footer record types when the layout declares them.
///
/// Compilation happens once in [`FixedLengthFormat::new`]; the format is
/// then immutable and may be shared between threads.
#[derive(Debug, Clone)]
pub struct FixedLengthFormat {
    body: RecordSchema,
    header: Option<RecordSchema>,
    footer: Option<RecordSchema>,
    converter: Arc<dyn FormatConverter>,
    locale: Option<String>,
}

impl FixedLengthFormat {
    pub fn new(registry: &ModelRegistry, root: &str) -> Result<Self> {
        let body = RecordSchema::compile(registry, root)?;
        let header = body
            .layout()
            .header()
            .map(|name| RecordSchema::compile(registry, name))
            .transpose()?;
        let footer = body
            .layout()
            .footer()
            .map(|name| RecordSchema::compile(registry, name))
            .transpose()?;
        Ok(Self {
            body,
            header,
            footer,
            converter: Arc::new(DefaultConverter),
            locale: None,
        })
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn FormatConverter>) -> Self {
        self.converter = converter;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn body(&self) -> &RecordSchema {
        &self.body
    }

    pub fn header(&self) -> Option<&RecordSchema> {
        self.header.as_ref()
    }

    pub fn footer(&self) -> Option<&RecordSchema> {
        self.footer.as_ref()
    }

    pub fn converter(&self) -> &dyn FormatConverter {
        self.converter.as_ref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Reads `reader` to the end and binds it. The reader is consumed and
    /// dropped on every path.
    pub fn unmarshal<R: Read>(&self, mut reader: R) -> Result<BindResult> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        drop(reader);
        let text = String::from_utf8(bytes)?;
        self.unmarshal_str(&text)
    }

    pub fn unmarshal_str(&self, input: &str) -> Result<BindResult> {
        let layout = self.body.layout();
        let mut scanner = LineScanner::new(input, layout.eol());
        let mut result = BindResult::default();

        if layout.has_header() {
            if let Some((line_number, line)) = scanner.next_non_blank() {
                match &self.header {
                    Some(schema) if !layout.skip_header() => {
                        result.header = Some(self.bind(schema, line, line_number)?);
                    }
                    _ => debug!(line = line_number, "header skipped"),
                }
            }
        }

        let mut current = scanner.next_non_blank();
        let mut next = match current {
            Some(_) => scanner.next_non_blank(),
            None => None,
        };

        while let (Some((line_number, line)), Some(_)) = (current, next) {
            result.entries.push(self.bind(&self.body, line, line_number)?);
            current = next;
            next = scanner.next_non_blank();
        }

        if let Some((line_number, line)) = current {
            if layout.has_footer() {
                match &self.footer {
                    Some(schema) if !layout.skip_footer() => {
                        result.footer = Some(self.bind(schema, line, line_number)?);
                    }
                    _ => debug!(line = line_number, "footer skipped"),
                }
            } else {
                result.entries.push(self.bind(&self.body, line, line_number)?);
            }
        }

        if result.entries.is_empty() {
            return Err(BindError::NoRecords);
        }

        info!(
            root = self.body.root_name(),
            entries = result.entries.len(),
            header = result.header.is_some(),
            footer = result.footer.is_some(),
            lines = scanner.count,
            "fixed-length input bound"
        );
        Ok(result)
    }

    fn bind(&self, schema: &RecordSchema, line: &str, line_number: usize) -> Result<Record> {
        schema.bind_line(line, line_number, self.converter.as_ref(), self.locale.as_deref())
    }
}
