//! A root record type compiled for binding.

use crate::binder::RecordBinder;
use crate::descriptor::FieldDescriptorTable;
use crate::error::{BindError, Result};
use crate::format::FormatConverter;
use crate::instance::{InstanceGraph, Record, TypeKey};
use crate::layout::RecordLayout;
use crate::linker;
use crate::loader;
use crate::model::ModelRegistry;
use std::borrow::Cow;
use tracing::debug;

/// Participating types, descriptor table and layout of one root type.
///
/// Built once and read-only afterwards; every bound line gets its own
/// [`InstanceGraph`].
#[derive(Debug, Clone)]
pub struct RecordSchema {
    types: Vec<String>,
    table: FieldDescriptorTable,
    layout: RecordLayout,
}

impl RecordSchema {
    pub fn compile(registry: &ModelRegistry, root: &str) -> Result<Self> {
        let types = loader::discover(registry, root)?;
        let table = FieldDescriptorTable::build(&types)?;
        let layout = RecordLayout::build(&types)?;
        debug!(root, types = types.len(), fields = table.total(), "record schema compiled");
        Ok(Self {
            types: types.iter().map(|r| r.name.clone()).collect(),
            table,
            layout,
        })
    }

    pub fn root_name(&self) -> &str {
        &self.types[0]
    }

    pub fn root(&self) -> TypeKey {
        TypeKey(0)
    }

    /// Participating record types in [`TypeKey`] order.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn table(&self) -> &FieldDescriptorTable {
        &self.table
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Fresh, empty instances of every participating type.
    pub fn new_graph(&self) -> InstanceGraph {
        InstanceGraph::new(&self.types)
    }

    /// Applies the record-length rules of the layout to `line`.
    pub fn check_length<'l>(&self, line: &'l str, line_number: usize) -> Result<Cow<'l, str>> {
        let expected = self.layout.record_length();
        if expected == 0 {
            return Ok(Cow::Borrowed(line));
        }
        let mut line = Cow::Borrowed(line);
        let mut actual = line.chars().count();
        if self.layout.ignore_trailing_chars() && actual > expected {
            line = Cow::Owned(line.chars().take(expected).collect());
            actual = expected;
        }
        if (actual < expected && !self.layout.ignore_missing_chars()) || actual > expected {
            return Err(BindError::RecordLength {
                expected,
                actual,
                line: line_number,
            });
        }
        Ok(line)
    }

    /// Length check, bind and link of one line.
    pub fn bind_line(
        &self,
        line: &str,
        line_number: usize,
        converter: &dyn FormatConverter,
        locale: Option<&str>,
    ) -> Result<Record> {
        let line = self.check_length(line, line_number)?;
        let mut graph = self.new_graph();
        RecordBinder::new(&self.table, &self.layout, converter, locale).bind(
            &line,
            &mut graph,
            line_number,
        )?;
        linker::link(&self.table, &mut graph)?;
        Ok(Record::new(graph, self.root(), line_number))
    }
}
