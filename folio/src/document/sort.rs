use super::{Document, NodeId};
use crate::error::Result;
use crate::field::Field;
use crate::schema::TypeSlot;

impl Document {
    /// Order fields and persons by the declaration order of their types in
    /// the node's element type, groups likewise. Values of undeclared types
    /// keep their relative order and go last. Untyped nodes are left alone.
    pub fn sort_fields_by_schema(&mut self, id: NodeId) -> Result<()> {
        let Some(element) = self.element_type(id)? else {
            return Ok(());
        };
        let field_order = element.fields.clone();
        let group_order = element.groups.clone();

        let node = self.node_mut(id)?;
        sort_by_slots(&mut node.fields, &field_order, |f| &f.type_name);
        sort_by_slots(&mut node.persons, &field_order, |p| &p.type_name);
        sort_by_slots(&mut node.groups, &group_order, |g| &g.type_name);
        Ok(())
    }

    /// Order fields and persons by type name. Equal names keep their order.
    pub fn sort_fields_alphabetically(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        node.fields.sort_by(by_type_name);
        node.persons.sort_by(by_type_name);
        node.groups.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(())
    }

    /// [`Document::sort_fields_by_schema`] on every node of both trees.
    pub fn sort_all_by_schema(&mut self) -> Result<()> {
        for id in self.tree_nodes()? {
            self.sort_fields_by_schema(id)?;
        }
        Ok(())
    }

    /// [`Document::sort_fields_alphabetically`] on every node of both trees.
    pub fn sort_all_alphabetically(&mut self) -> Result<()> {
        for id in self.tree_nodes()? {
            self.sort_fields_alphabetically(id)?;
        }
        Ok(())
    }

    fn tree_nodes(&self) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        for root in [self.logical_root, self.physical_root].into_iter().flatten() {
            ids.extend(self.subtree(root)?);
        }
        Ok(ids)
    }
}

fn by_type_name(a: &Field, b: &Field) -> std::cmp::Ordering {
    a.type_name.cmp(&b.type_name)
}

fn sort_by_slots<T>(values: &mut [T], slots: &[TypeSlot], type_name: impl Fn(&T) -> &String) {
    values.sort_by_key(|v| {
        slots
            .iter()
            .position(|slot| &slot.type_name == type_name(v))
            .unwrap_or(slots.len())
    });
}
