//! Post-bind wiring of link and one-to-many fields.

use crate::descriptor::FieldDescriptorTable;
use crate::error::{BindError, Result};
use crate::instance::InstanceGraph;

/// Points every link field of `table` at its target instance in `graph`.
///
/// One-to-many fields receive the single element instance bound on the line.
pub fn link(table: &FieldDescriptorTable, graph: &mut InstanceGraph) -> Result<()> {
    for (owner, links) in table.links() {
        for link in links {
            if graph.get(link.target).is_none() {
                return Err(BindError::LinkTargetMissing {
                    record: graph
                        .get(*owner)
                        .map(|i| i.record().to_string())
                        .unwrap_or_default(),
                    field: link.field.clone(),
                    target: link.target_name.clone(),
                });
            }
            let Some(instance) = graph.get_mut(*owner) else {
                continue;
            };
            if link.collection {
                instance.set_collection(link.field.as_str(), vec![link.target]);
            } else {
                instance.set_link(link.field.as_str(), link.target);
            }
        }
    }
    Ok(())
}
