//! Writing bound records back to fixed-length text.

use crate::descriptor::{Extent, FieldDescriptor};
use crate::error::{BindError, Result};
use crate::format::FormatConverter;
use crate::instance::Record;
use crate::model::Align;
use crate::schema::RecordSchema;
use crate::unmarshal::{BindResult, FixedLengthFormat};
use crate::value::Value;
use tracing::debug;

impl FixedLengthFormat {
    /// Writes header, entries and footer, each terminated by the layout's
    /// record terminator.
    pub fn marshal(&self, result: &BindResult) -> Result<String> {
        let crlf = self.body().layout().crlf();
        let mut out = String::new();
        let mut line_number = 0;

        let mut emit = |schema: &RecordSchema, record: &Record| -> Result<()> {
            line_number += 1;
            let line = write_record(schema, record, self.converter(), self.locale(), line_number)?;
            out.push_str(&line);
            out.push_str(crlf);
            Ok(())
        };

        if let (Some(schema), Some(header)) = (self.header(), &result.header) {
            emit(schema, header)?;
        }
        for entry in &result.entries {
            emit(self.body(), entry)?;
        }
        if let (Some(schema), Some(footer)) = (self.footer(), &result.footer) {
            emit(schema, footer)?;
        }

        debug!(lines = line_number, "fixed-length output written");
        Ok(out)
    }
}

/// Formats one record against `schema`, fields in position order.
pub fn write_record(
    schema: &RecordSchema,
    record: &Record,
    converter: &dyn FormatConverter,
    locale: Option<&str>,
    line_number: usize,
) -> Result<String> {
    let layout = schema.layout();
    let mut line = String::new();
    let mut column = 1usize;

    for descriptor in schema.table().iter() {
        while column < descriptor.position() {
            line.push(layout.padding_char());
            column += 1;
        }

        let text = field_text(descriptor, record, converter, locale)?;
        let written = match descriptor.extent() {
            Extent::Fixed(length) => {
                pad_to(descriptor, &text, *length, layout.padding_char())?
            }
            Extent::Delimited(delimiter) => format!("{text}{delimiter}"),
            Extent::Referenced { .. } => text,
        };
        column += written.chars().count();
        line.push_str(&written);
    }

    let expected = layout.record_length();
    let actual = line.chars().count();
    if expected > 0 && actual < expected {
        line.extend(std::iter::repeat_n(layout.padding_char(), expected - actual));
    } else if expected > 0 && actual > expected {
        let excess: String = line.chars().skip(expected).collect();
        if excess.chars().any(|c| c != layout.padding_char()) {
            return Err(BindError::RecordLength {
                expected,
                actual,
                line: line_number,
            });
        }
        line = line.chars().take(expected).collect();
    }
    Ok(line)
}

fn field_text(
    descriptor: &FieldDescriptor,
    record: &Record,
    converter: &dyn FormatConverter,
    locale: Option<&str>,
) -> Result<String> {
    let def = descriptor.def();
    let value = record
        .graph()
        .get(descriptor.owner())
        .and_then(|i| i.get(descriptor.name()))
        .cloned()
        .unwrap_or(Value::Null);

    if value.is_unset(def.kind) {
        return Ok(def.default_value.clone().unwrap_or_default());
    }
    converter
        .format(&value, &def.formatting_options(locale))
        .map_err(|source| BindError::Format {
            record: descriptor.record().to_string(),
            field: descriptor.name().to_string(),
            position: descriptor.position(),
            source,
        })
}

fn pad_to(descriptor: &FieldDescriptor, text: &str, length: usize, layout_pad: char) -> Result<String> {
    let actual = text.chars().count();
    if actual > length {
        if descriptor.def().clip {
            return Ok(text.chars().take(length).collect());
        }
        return Err(BindError::FieldTooLong {
            record: descriptor.record().to_string(),
            field: descriptor.name().to_string(),
            length,
            actual,
        });
    }
    let padding: String = std::iter::repeat_n(descriptor.padding_char(layout_pad), length - actual).collect();
    Ok(match descriptor.align() {
        Align::Right => format!("{padding}{text}"),
        Align::Left | Align::Both => format!("{text}{padding}"),
    })
}
