//! Discovery of the record types bound together on one line.

use crate::error::{BindError, Result};
use crate::model::{ModelRegistry, RecordDef};
use std::collections::HashSet;
use tracing::debug;

/// Collects `root` and every record type reachable from it through link and
/// one-to-many relations, root first, in discovery order.
///
/// A type reached a second time is not descended into again, so links back
/// to an ancestor are harmless.
pub fn discover<'a>(registry: &'a ModelRegistry, root: &str) -> Result<Vec<&'a RecordDef>> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    visit(registry, root, &mut visited, &mut found)?;
    debug!(
        root,
        types = ?found.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "discovered participating record types"
    );
    Ok(found)
}

fn visit<'a>(
    registry: &'a ModelRegistry,
    name: &str,
    visited: &mut HashSet<String>,
    found: &mut Vec<&'a RecordDef>,
) -> Result<()> {
    if !visited.insert(name.to_string()) {
        return Ok(());
    }
    let record = registry.require(name)?;
    found.push(record);

    for link in &record.links {
        debug!(record = %record.name, field = %link.field, target = %link.target, "record linked");
        visit(registry, &link.target, visited, found)?;
    }

    for many in &record.one_to_many {
        if many.element.is_empty() {
            return Err(BindError::MissingElementType {
                record: record.name.clone(),
                field: many.field.clone(),
            });
        }
        debug!(record = %record.name, field = %many.field, element = %many.element, "record linked (one-to-many)");
        visit(registry, &many.element, visited, found)?;
    }

    Ok(())
}
