//! The position-ordered field table of a compiled root type.

use crate::error::{BindError, Result};
use crate::format::is_valid_date_pattern;
use crate::instance::TypeKey;
use crate::model::{Align, FieldDef, RecordDef};
use crate::value::FieldKind;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// How a field's width is determined at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extent {
    Fixed(usize),
    Delimited(String),
    /// Width is the integral value already bound at `position`.
    Referenced { position: usize, owner: TypeKey, field: String },
}

/// One column of the table.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    owner: TypeKey,
    record: String,
    extent: Extent,
    def: FieldDef,
}

impl FieldDescriptor {
    /// Record type declaring this field.
    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn position(&self) -> usize {
        self.def.position
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn kind(&self) -> FieldKind {
        self.def.kind
    }

    pub fn align(&self) -> Align {
        self.def.align
    }

    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    /// Descriptor override, else the layout padding character.
    pub fn padding_char(&self, layout_default: char) -> char {
        self.def.padding_char.unwrap_or(layout_default)
    }
}

/// A field wired to another instance of the same graph after binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkField {
    pub field: String,
    pub target: TypeKey,
    pub target_name: String,
    pub collection: bool,
}

/// All positional fields of the participating types, keyed by position.
#[derive(Debug, Clone, Default)]
pub struct FieldDescriptorTable {
    descriptors: BTreeMap<usize, FieldDescriptor>,
    links: BTreeMap<TypeKey, Vec<LinkField>>,
    mandatory: usize,
    optional: usize,
}

impl FieldDescriptorTable {
    /// Builds the table for `types`; index `i` of the slice becomes `TypeKey(i)`.
    pub fn build(types: &[&RecordDef]) -> Result<Self> {
        let keys: HashMap<&str, TypeKey> = types
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), TypeKey(i)))
            .collect();
        let mut table = Self::default();

        for (index, record) in types.iter().enumerate() {
            let owner = TypeKey(index);
            for field in &record.fields {
                table.insert(owner, record, field)?;
            }

            let mut links = Vec::new();
            for link in &record.links {
                let target = lookup(&keys, &link.target)?;
                debug!(record = %record.name, field = %link.field, "link field collected");
                links.push(LinkField {
                    field: link.field.clone(),
                    target,
                    target_name: link.target.clone(),
                    collection: false,
                });
            }
            for many in &record.one_to_many {
                let target = lookup(&keys, &many.element)?;
                links.push(LinkField {
                    field: many.field.clone(),
                    target,
                    target_name: many.element.clone(),
                    collection: true,
                });
            }
            if !links.is_empty() {
                table.links.insert(owner, links);
            }
        }

        table.resolve_length_refs()?;

        debug!(
            mandatory = table.mandatory,
            optional = table.optional,
            total = table.total(),
            "field descriptor table built"
        );
        Ok(table)
    }

    fn insert(&mut self, owner: TypeKey, record: &RecordDef, field: &FieldDef) -> Result<()> {
        if field.position == 0 {
            return Err(BindError::InvalidPosition {
                record: record.name.clone(),
                field: field.name.clone(),
            });
        }

        if let Some(pattern) = field.pattern.as_deref()
            && field.kind == FieldKind::Date
            && !is_valid_date_pattern(pattern)
        {
            return Err(BindError::InvalidPattern {
                record: record.name.clone(),
                field: field.name.clone(),
                pattern: pattern.to_string(),
            });
        }

        let delimiter = field.delimiter.as_deref().filter(|d| !d.is_empty());
        let declared = [field.length > 0, delimiter.is_some(), field.length_ref.is_some()];
        if declared.iter().filter(|d| **d).count() != 1 || field.length_ref == Some(0) {
            return Err(BindError::InvalidFieldLength {
                record: record.name.clone(),
                field: field.name.clone(),
                position: field.position,
            });
        }

        let extent = match (delimiter, field.length_ref) {
            (Some(d), _) => Extent::Delimited(d.to_string()),
            // Resolved once every type has been inserted.
            (None, Some(position)) => Extent::Referenced {
                position,
                owner,
                field: String::new(),
            },
            (None, None) => Extent::Fixed(field.length),
        };

        if let Some(existing) = self.descriptors.get(&field.position) {
            return Err(BindError::DuplicatePosition {
                position: field.position,
                first: format!("{}.{}", existing.record, existing.name()),
                second: format!("{}.{}", record.name, field.name),
            });
        }

        debug!(record = %record.name, field = %field.name, position = field.position, "field descriptor");
        if field.required {
            self.mandatory += 1;
        } else {
            self.optional += 1;
        }
        self.descriptors.insert(
            field.position,
            FieldDescriptor {
                owner,
                record: record.name.clone(),
                extent,
                def: field.clone(),
            },
        );
        Ok(())
    }

    fn resolve_length_refs(&mut self) -> Result<()> {
        let targets: HashMap<usize, (TypeKey, String, FieldKind)> = self
            .descriptors
            .iter()
            .map(|(pos, d)| (*pos, (d.owner, d.def.name.clone(), d.def.kind)))
            .collect();

        for descriptor in self.descriptors.values_mut() {
            let Extent::Referenced { position, .. } = descriptor.extent else {
                continue;
            };
            let invalid = |reason: &'static str| BindError::InvalidLengthRef {
                record: descriptor.record.clone(),
                field: descriptor.def.name.clone(),
                length_ref: position,
                reason,
            };
            let Some((owner, field, kind)) = targets.get(&position) else {
                return Err(invalid("is not declared"));
            };
            if position >= descriptor.def.position {
                return Err(invalid("is not bound before it"));
            }
            if !kind.is_integral() {
                return Err(invalid("is not an integral field"));
            }
            descriptor.extent = Extent::Referenced {
                position,
                owner: *owner,
                field: field.clone(),
            };
        }
        Ok(())
    }

    /// Descriptors in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptors.values()
    }

    pub fn get(&self, position: usize) -> Option<&FieldDescriptor> {
        self.descriptors.get(&position)
    }

    /// Link fields grouped by declaring type.
    pub fn links(&self) -> &BTreeMap<TypeKey, Vec<LinkField>> {
        &self.links
    }

    pub fn mandatory_count(&self) -> usize {
        self.mandatory
    }

    pub fn optional_count(&self) -> usize {
        self.optional
    }

    pub fn total(&self) -> usize {
        self.mandatory + self.optional
    }
}

fn lookup(keys: &HashMap<&str, TypeKey>, name: &str) -> Result<TypeKey> {
    keys.get(name)
        .copied()
        .ok_or_else(|| BindError::UnknownType(name.to_string()))
}
