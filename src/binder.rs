//! Binding of one fixed-length line onto an instance graph.
//!
//! Fields are visited in ascending position. A 1-based character offset
//! tracks the next unread column; a field declared further right makes the
//! offset skip ahead, so gaps between fields are never bound.

use crate::descriptor::{Extent, FieldDescriptor, FieldDescriptorTable};
use crate::error::{BindError, Result};
use crate::format::FormatConverter;
use crate::instance::{InstanceGraph, TypeKey};
use crate::layout::RecordLayout;
use crate::model::Align;
use crate::value::Value;
use tracing::{debug, trace};

/// Outcome of a successful bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindStats {
    /// Offset one past the last consumed character.
    pub end_offset: usize,
    pub bound_fields: usize,
}

/// Strips `pad` from the side(s) of `token` opposite to its alignment.
pub fn trim_padding(token: &str, pad: char, align: Align) -> &str {
    match align {
        Align::Right => token.trim_start_matches(pad),
        Align::Left => token.trim_end_matches(pad),
        Align::Both => token.trim_matches(pad),
    }
}

/// Binds lines against one descriptor table and layout.
#[derive(Debug, Clone, Copy)]
pub struct RecordBinder<'a> {
    table: &'a FieldDescriptorTable,
    layout: &'a RecordLayout,
    converter: &'a dyn FormatConverter,
    locale: Option<&'a str>,
}

impl<'a> RecordBinder<'a> {
    pub fn new(
        table: &'a FieldDescriptorTable,
        layout: &'a RecordLayout,
        converter: &'a dyn FormatConverter,
        locale: Option<&'a str>,
    ) -> Self {
        Self {
            table,
            layout,
            converter,
            locale,
        }
    }

    /// Binds `line` into `graph`. On error the graph is left partially
    /// filled and must be discarded.
    pub fn bind(&self, line: &str, graph: &mut InstanceGraph, line_number: usize) -> Result<BindStats> {
        let chars: Vec<char> = line.chars().collect();
        let mut offset = 1usize;
        let mut bound = 0usize;
        let mut mandatory_seen = 0usize;

        for descriptor in self.table.iter() {
            let position = descriptor.position();

            let length = match descriptor.extent() {
                Extent::Fixed(length) => Some(*length),
                Extent::Referenced { position: at, owner, field } => {
                    Some(referenced_length(graph, descriptor, *at, *owner, field, line_number)?)
                }
                Extent::Delimited(_) => None,
            };

            if position > offset {
                debug!(skip = position - offset, position, "skipping ahead");
                offset = position;
            }

            let token: String = match (length, descriptor.extent()) {
                (Some(length), _) if length > 0 => {
                    let Some(next) = offset.checked_add(length) else {
                        return Err(BindError::InvalidLengthValue {
                            record: descriptor.record().to_string(),
                            field: descriptor.name().to_string(),
                            length_ref: match descriptor.extent() {
                                Extent::Referenced { position: at, .. } => *at,
                                _ => position,
                            },
                            line: line_number,
                        });
                    };
                    let token = if chars.len() < offset {
                        String::new()
                    } else {
                        let end = (next - 1).min(chars.len());
                        chars[offset - 1..end].iter().collect()
                    };
                    offset = next;
                    token
                }
                (None, Extent::Delimited(delimiter)) => {
                    let rest: String = chars.get(offset - 1..).unwrap_or_default().iter().collect();
                    let Some(at) = rest.find(delimiter.as_str()) else {
                        return Err(BindError::DelimiterNotFound {
                            record: descriptor.record().to_string(),
                            field: descriptor.name().to_string(),
                            position,
                            delimiter: delimiter.clone(),
                            line: line_number,
                        });
                    };
                    let token = rest[..at].to_string();
                    offset += token.chars().count() + delimiter.chars().count();
                    token
                }
                // zero-width field
                _ => String::new(),
            };

            let def = descriptor.def();
            let mut token = if def.trim {
                let pad = descriptor.padding_char(self.layout.padding_char());
                trim_padding(&token, pad, def.align).to_string()
            } else {
                token
            };

            if def.required {
                mandatory_seen += 1;
                if token.is_empty() {
                    return Err(BindError::MandatoryFieldEmpty {
                        record: descriptor.record().to_string(),
                        field: descriptor.name().to_string(),
                        position,
                        line: line_number,
                    });
                }
            }

            trace!(position, offset, token = %token, record = descriptor.record(), field = descriptor.name(), "token");

            if token.is_empty() {
                if let Some(default) = &def.default_value {
                    token = default.clone();
                }
            }

            let value = self.convert(descriptor, &token, line_number)?;
            let value = match &def.transform {
                Some(transform) if !value.is_null() => {
                    transform.apply(value).map_err(|message| BindError::Transform {
                        record: descriptor.record().to_string(),
                        field: descriptor.name().to_string(),
                        position,
                        line: line_number,
                        transform: transform.name().to_string(),
                        message,
                    })?
                }
                _ => value,
            };

            if let Some(instance) = graph.get_mut(descriptor.owner()) {
                instance.set(descriptor.name(), value);
                bound += 1;
            }
        }

        if offset <= chars.len() && !self.layout.ignore_trailing_chars() {
            let rest: String = chars[offset - 1..].iter().collect();
            if !rest.trim().is_empty() {
                return Err(BindError::TrailingCharacters { line: line_number });
            }
        }

        debug!(bound, mandatory_seen, line = line_number, "record bound");

        if bound < self.table.total() {
            return Err(BindError::FieldsMissing { line: line_number });
        }
        if mandatory_seen < self.table.mandatory_count() {
            return Err(BindError::MandatoryFieldsMissing { line: line_number });
        }

        Ok(BindStats {
            end_offset: offset,
            bound_fields: bound,
        })
    }

    fn convert(&self, descriptor: &FieldDescriptor, token: &str, line_number: usize) -> Result<Value> {
        let def = descriptor.def();
        if token.is_empty() {
            return Ok(if def.nullable {
                Value::Null
            } else {
                def.kind.zero()
            });
        }
        let options = def.formatting_options(self.locale);
        self.converter
            .parse(token, &options)
            .map_err(|source| BindError::Conversion {
                record: descriptor.record().to_string(),
                field: descriptor.name().to_string(),
                position: descriptor.position(),
                line: line_number,
                source,
            })
    }
}

fn referenced_length(
    graph: &InstanceGraph,
    descriptor: &FieldDescriptor,
    at: usize,
    owner: TypeKey,
    field: &str,
    line_number: usize,
) -> Result<usize> {
    graph
        .get(owner)
        .and_then(|i| i.get(field))
        .and_then(Value::as_i64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| BindError::InvalidLengthValue {
            record: descriptor.record().to_string(),
            field: descriptor.name().to_string(),
            length_ref: at,
            line: line_number,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DefaultConverter;
    use crate::model::{FieldDef, LayoutDef, RecordDef, Transform};
    use crate::value::FieldKind;

    struct Fixture {
        types: Vec<String>,
        table: FieldDescriptorTable,
        layout: RecordLayout,
    }

    impl Fixture {
        fn new(records: Vec<RecordDef>) -> Self {
            let refs: Vec<&RecordDef> = records.iter().collect();
            Self {
                types: records.iter().map(|r| r.name.clone()).collect(),
                table: FieldDescriptorTable::build(&refs).unwrap(),
                layout: RecordLayout::build(&refs).unwrap(),
            }
        }

        fn single(fields: Vec<FieldDef>, layout: LayoutDef) -> Self {
            let record = fields
                .into_iter()
                .fold(RecordDef::new("Rec"), RecordDef::field)
                .layout(layout);
            Self::new(vec![record])
        }

        fn bind(&self, line: &str) -> Result<(InstanceGraph, BindStats)> {
            let mut graph = InstanceGraph::new(&self.types);
            let binder = RecordBinder::new(&self.table, &self.layout, &DefaultConverter, None);
            let stats = binder.bind(line, &mut graph, 1)?;
            Ok((graph, stats))
        }
    }

    fn text<'g>(graph: &'g InstanceGraph, field: &str) -> &'g str {
        graph.find("Rec").and_then(|i| i.text(field)).unwrap()
    }

    #[test]
    fn test_trim_by_alignment() {
        assert_eq!(trim_padding("AND....", '.', Align::Right), "AND....");
        assert_eq!(trim_padding(".....AND", '.', Align::Right), "AND");
        assert_eq!(trim_padding("AND....", '.', Align::Left), "AND");
        assert_eq!(trim_padding(".....AND", '.', Align::Left), ".....AND");
        assert_eq!(trim_padding("..AND..", '.', Align::Both), "AND");
    }

    #[test]
    fn test_huge_referenced_lengths_fail_instead_of_overflowing() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("len1", 1).length(19).kind(FieldKind::Long),
                FieldDef::new("len2", 20).length(19).kind(FieldKind::Long),
                FieldDef::new("data1", 39).length_ref(1),
                FieldDef::new("data2", 40).length_ref(20),
            ],
            LayoutDef::new(),
        );
        let err = fx.bind("92233720368547758079223372036854775807AB").unwrap_err();
        match err {
            BindError::InvalidLengthValue { field, length_ref, line, .. } => {
                assert_eq!(field, "data2");
                assert_eq!(length_ref, 20);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fixed_fields_offsets_sum() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("a", 1).length(3),
                FieldDef::new("b", 4).length(2),
                FieldDef::new("c", 6).length(5),
            ],
            LayoutDef::new(),
        );
        let (graph, stats) = fx.bind("ABCDEFGHIJ").unwrap();
        assert_eq!(stats.end_offset, 1 + 3 + 2 + 5);
        assert_eq!(stats.bound_fields, 3);
        assert_eq!(text(&graph, "a"), "ABC");
        assert_eq!(text(&graph, "b"), "DE");
        assert_eq!(text(&graph, "c"), "FGHIJ");
    }

    #[test]
    fn test_trim_uses_descriptor_padding_over_layout() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("a", 1).length(7).trim(true).padding_char('.').align(Align::Left),
                FieldDef::new("b", 8).length(5).trim(true),
            ],
            LayoutDef::new().padding_char('*'),
        );
        let (graph, _) = fx.bind("AND....**IS*").unwrap();
        assert_eq!(text(&graph, "a"), "AND");
        assert_eq!(text(&graph, "b"), "IS");
    }

    #[test]
    fn test_untrimmed_token_keeps_padding() {
        let fx = Fixture::single(vec![FieldDef::new("a", 1).length(5)], LayoutDef::new());
        let (graph, _) = fx.bind("THIS.").unwrap();
        assert_eq!(text(&graph, "a"), "THIS.");
    }

    #[test]
    fn test_gap_is_skipped() {
        let fx = Fixture::single(
            vec![FieldDef::new("a", 1).length(2), FieldDef::new("b", 6).length(2)],
            LayoutDef::new(),
        );
        let (graph, stats) = fx.bind("AB---CD").unwrap();
        assert_eq!(text(&graph, "a"), "AB");
        assert_eq!(text(&graph, "b"), "CD");
        assert_eq!(stats.end_offset, 8);
    }

    #[test]
    fn test_short_line_truncates_and_empties() {
        let fx = Fixture::single(
            vec![FieldDef::new("a", 1).length(4), FieldDef::new("b", 5).length(4)],
            LayoutDef::new(),
        );
        let (graph, _) = fx.bind("ABC").unwrap();
        assert_eq!(text(&graph, "a"), "ABC");
        assert_eq!(text(&graph, "b"), "");
    }

    #[test]
    fn test_short_line_fails_mandatory_field() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("a", 1).length(4),
                FieldDef::new("b", 5).length(4).required(true),
            ],
            LayoutDef::new(),
        );
        let err = fx.bind("ABCD").unwrap_err();
        match err {
            BindError::MandatoryFieldEmpty { field, position, line, .. } => {
                assert_eq!(field, "b");
                assert_eq!(position, 5);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_padding_only_mandatory_field_fails_after_trim() {
        let fx = Fixture::single(
            vec![FieldDef::new("a", 1).length(4).required(true).trim(true)],
            LayoutDef::new(),
        );
        assert!(matches!(fx.bind("    "), Err(BindError::MandatoryFieldEmpty { .. })));
    }

    #[test]
    fn test_delimited_field() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("name", 1).delimiter(";"),
                FieldDef::new("code", 2).length(3),
            ],
            LayoutDef::new(),
        );
        let (graph, stats) = fx.bind("SMITH;ABC").unwrap();
        assert_eq!(text(&graph, "name"), "SMITH");
        assert_eq!(text(&graph, "code"), "ABC");
        assert_eq!(stats.end_offset, 10);
    }

    #[test]
    fn test_missing_delimiter_fails() {
        let fx = Fixture::single(vec![FieldDef::new("name", 1).delimiter(";")], LayoutDef::new());
        assert!(matches!(fx.bind("SMITH"), Err(BindError::DelimiterNotFound { .. })));
    }

    #[test]
    fn test_length_ref_drives_width() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("len", 1).length(2).kind(FieldKind::Int),
                FieldDef::new("data", 3).length_ref(1),
                FieldDef::new("tail", 4).length(2),
            ],
            LayoutDef::new(),
        );
        let (graph, _) = fx.bind("03ABCXY").unwrap();
        assert_eq!(text(&graph, "data"), "ABC");
        assert_eq!(text(&graph, "tail"), "XY");

        let (graph, _) = fx.bind("05ABCXY").unwrap();
        assert_eq!(text(&graph, "data"), "ABCXY");
        assert_eq!(text(&graph, "tail"), "");
    }

    #[test]
    fn test_length_ref_without_value_fails() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("len", 1).length(2).trim(true).kind(FieldKind::Int).nullable(true),
                FieldDef::new("data", 3).length_ref(1),
            ],
            LayoutDef::new(),
        );
        assert!(matches!(fx.bind("  ABC"), Err(BindError::InvalidLengthValue { .. })));
    }

    #[test]
    fn test_default_value_substitution() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("code", 1).length(3).trim(true).default_value("XXX"),
                FieldDef::new("qty", 4).length(3).trim(true).kind(FieldKind::Int).default_value("1"),
            ],
            LayoutDef::new(),
        );
        let (graph, _) = fx.bind("      ").unwrap();
        let rec = graph.find("Rec").unwrap();
        assert_eq!(rec.text("code"), Some("XXX"));
        assert_eq!(rec.get("qty"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_empty_tokens_bind_sentinels() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("n", 1).length(3).trim(true).kind(FieldKind::Int),
                FieldDef::new("s", 4).length(3).trim(true),
                FieldDef::new("d", 7).length(8).trim(true).kind(FieldKind::Date),
                FieldDef::new("o", 15).length(3).trim(true).kind(FieldKind::Long).nullable(true),
            ],
            LayoutDef::new(),
        );
        let (graph, _) = fx.bind(&" ".repeat(17)).unwrap();
        let rec = graph.find("Rec").unwrap();
        assert_eq!(rec.get("n"), Some(&Value::Int(i32::MIN)));
        assert_eq!(rec.get("s"), Some(&Value::Text(String::new())));
        assert_eq!(rec.get("d"), Some(&Value::Null));
        assert_eq!(rec.get("o"), Some(&Value::Null));
    }

    #[test]
    fn test_conversion_error_carries_context() {
        let fx = Fixture::single(
            vec![
                FieldDef::new("a", 1).length(2),
                FieldDef::new("n", 3).length(3).kind(FieldKind::Int),
            ],
            LayoutDef::new(),
        );
        let mut graph = InstanceGraph::new(&fx.types);
        let binder = RecordBinder::new(&fx.table, &fx.layout, &DefaultConverter, None);
        let err = binder.bind("AB1X3", &mut graph, 42).unwrap_err();
        match err {
            BindError::Conversion { field, position, line, record, .. } => {
                assert_eq!(record, "Rec");
                assert_eq!(field, "n");
                assert_eq!(position, 3);
                assert_eq!(line, 42);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_trailing_characters() {
        let fields = vec![FieldDef::new("a", 1).length(3)];
        let strict = Fixture::single(fields.clone(), LayoutDef::new());
        assert!(matches!(strict.bind("ABCDEF"), Err(BindError::TrailingCharacters { .. })));
        assert!(strict.bind("ABC   ").is_ok());

        let lenient = Fixture::single(fields, LayoutDef::new().ignore_trailing_chars(true));
        let (graph, _) = lenient.bind("ABCDEF").unwrap();
        assert_eq!(text(&graph, "a"), "ABC");
    }

    #[test]
    fn test_transform_applied_to_non_null() {
        let upper = Transform::new("upper", |v| match v {
            Value::Text(s) => Ok(Value::Text(s.to_uppercase())),
            other => Ok(other),
        });
        let failing = Transform::new("reject", |_| Err("rejected".to_string()));
        let fx = Fixture::single(
            vec![
                FieldDef::new("a", 1).length(3).transform(upper),
                FieldDef::new("b", 4)
                    .length(2)
                    .trim(true)
                    .kind(FieldKind::Date)
                    .nullable(true)
                    .transform(failing),
            ],
            LayoutDef::new(),
        );
        let (graph, _) = fx.bind("and  ").unwrap();
        assert_eq!(text(&graph, "a"), "AND");
        assert_eq!(graph.find("Rec").unwrap().get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_transform_failure_is_data_error() {
        let failing = Transform::new("reject", |_| Err("rejected".to_string()));
        let fx = Fixture::single(vec![FieldDef::new("a", 1).length(3).transform(failing)], LayoutDef::new());
        let err = fx.bind("abc").unwrap_err();
        assert!(err.is_data());
        assert!(matches!(err, BindError::Transform { ref transform, .. } if transform == "reject"));
    }

    #[test]
    fn test_fields_of_linked_types_land_on_their_instance() {
        let fx = Fixture::new(vec![
            RecordDef::new("Rec")
                .field(FieldDef::new("id", 1).length(3))
                .link("client", "Client"),
            RecordDef::new("Client").field(FieldDef::new("name", 4).length(4)),
        ]);
        let (graph, _) = fx.bind("007ACME").unwrap();
        assert_eq!(graph.find("Rec").and_then(|i| i.text("id")), Some("007"));
        assert_eq!(graph.find("Client").and_then(|i| i.text("name")), Some("ACME"));
    }

    #[test]
    fn test_same_line_binds_to_equal_graphs() {
        let fx = Fixture::single(
            vec![FieldDef::new("a", 1).length(3), FieldDef::new("n", 4).length(2).kind(FieldKind::Int)],
            LayoutDef::new(),
        );
        let (first, _) = fx.bind("ABC12").unwrap();
        let (second, _) = fx.bind("ABC12").unwrap();
        assert_eq!(first, second);
    }
}
