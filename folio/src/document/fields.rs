use super::{Document, NodeId};
use crate::error::{FolioError, Result};
use crate::field::{Field, FieldGroup};
use crate::schema::{is_hidden, Cardinality, FieldType, GroupType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Field,
    Group,
}

impl Document {
    /// Cardinality governing another instance of `type_name` on a node.
    /// Hidden types are unbounded.
    fn admission(&self, id: NodeId, type_name: &str, kind: SlotKind) -> Result<Cardinality> {
        let element = self.required_type(id)?;
        if is_hidden(type_name) {
            return Ok(Cardinality::Any);
        }
        let rule = match kind {
            SlotKind::Field => element.field_rule(type_name),
            SlotKind::Group => element.group_rule(type_name),
        };
        match (rule, kind) {
            (Some(rule), _) => Ok(rule.cardinality),
            (None, SlotKind::Field) => {
                log::error!(
                    "Field type '{}' is not allowed for element type '{}'",
                    type_name,
                    element.name
                );
                Err(FolioError::FieldTypeNotAllowed {
                    field: type_name.to_string(),
                    element: element.name.clone(),
                })
            }
            (None, SlotKind::Group) => {
                log::error!(
                    "Field group type '{}' is not allowed for element type '{}'",
                    type_name,
                    element.name
                );
                Err(FolioError::GroupTypeNotAllowed {
                    group: type_name.to_string(),
                    element: element.name.clone(),
                })
            }
        }
    }

    /// Whether removing one instance of `type_name` would drop the node below
    /// the floor of a mandatory type.
    fn below_floor_after_removal(&self, id: NodeId, type_name: &str, kind: SlotKind) -> Result<bool> {
        if is_hidden(type_name) {
            return Ok(false);
        }
        let Some(element) = self.element_type(id)? else {
            return Ok(false);
        };
        let rule = match kind {
            SlotKind::Field => element.field_rule(type_name),
            SlotKind::Group => element.group_rule(type_name),
        };
        let mandatory = rule.is_some_and(|r| r.cardinality.is_mandatory());
        Ok(mandatory && self.count_of_type(id, type_name)? <= 1)
    }

    /// Attach a field. Person values are routed to [`Document::add_person`].
    ///
    /// Returns `Ok(false)` without attaching when the type is already at its
    /// cap of one.
    pub fn add_field(&mut self, id: NodeId, field: Field) -> Result<bool> {
        if field.is_person() {
            return self.add_person(id, field);
        }
        let cardinality = self.admission(id, &field.type_name, SlotKind::Field)?;
        let existing = self.count_of_type(id, &field.type_name)?;
        if !cardinality.admits(existing) {
            log::debug!(
                "Not adding field '{}' to {id}: cardinality {cardinality} reached",
                field.type_name
            );
            return Ok(false);
        }
        self.node_mut(id)?.fields.push(field);
        Ok(true)
    }

    /// Convenience for attaching a simple field by type name.
    pub fn add_field_value(&mut self, id: NodeId, type_name: &str, value: &str) -> Result<bool> {
        self.add_field(id, Field::simple(type_name, value))
    }

    /// Remove the first field equal to `field`. Without `force`, the last
    /// instance of a mandatory type is kept and `Ok(false)` returned.
    pub fn remove_field(&mut self, id: NodeId, field: &Field, force: bool) -> Result<bool> {
        let Some(index) = self.node(id)?.fields.iter().position(|f| f == field) else {
            log::warn!("Field '{}' not found on {id}", field.type_name);
            return Ok(false);
        };
        if !force && self.below_floor_after_removal(id, &field.type_name, SlotKind::Field)? {
            log::debug!(
                "Not removing last mandatory field '{}' from {id}",
                field.type_name
            );
            return Ok(false);
        }
        self.node_mut(id)?.fields.remove(index);
        Ok(true)
    }

    /// Attach a person field under the same rules as [`Document::add_field`].
    pub fn add_person(&mut self, id: NodeId, person: Field) -> Result<bool> {
        check_person(&person)?;
        let cardinality = self.admission(id, &person.type_name, SlotKind::Field)?;
        let existing = self.count_of_type(id, &person.type_name)?;
        if !cardinality.admits(existing) {
            log::debug!(
                "Not adding person '{}' to {id}: cardinality {cardinality} reached",
                person.type_name
            );
            return Ok(false);
        }
        self.node_mut(id)?.persons.push(person);
        Ok(true)
    }

    pub fn remove_person(&mut self, id: NodeId, person: &Field, force: bool) -> Result<bool> {
        check_person(person)?;
        let Some(index) = self.node(id)?.persons.iter().position(|p| p == person) else {
            log::warn!("Person '{}' not found on {id}", person.type_name);
            return Ok(false);
        };
        if !force && self.below_floor_after_removal(id, &person.type_name, SlotKind::Field)? {
            log::debug!(
                "Not removing last mandatory person '{}' from {id}",
                person.type_name
            );
            return Ok(false);
        }
        self.node_mut(id)?.persons.remove(index);
        Ok(true)
    }

    pub fn add_group(&mut self, id: NodeId, group: FieldGroup) -> Result<bool> {
        let cardinality = self.admission(id, &group.type_name, SlotKind::Group)?;
        let existing = self.count_of_type(id, &group.type_name)?;
        if !cardinality.admits(existing) {
            log::debug!(
                "Not adding field group '{}' to {id}: cardinality {cardinality} reached",
                group.type_name
            );
            return Ok(false);
        }
        self.node_mut(id)?.groups.push(group);
        Ok(true)
    }

    pub fn remove_group(&mut self, id: NodeId, group: &FieldGroup, force: bool) -> Result<bool> {
        let Some(index) = self.node(id)?.groups.iter().position(|g| g == group) else {
            log::warn!("Field group '{}' not found on {id}", group.type_name);
            return Ok(false);
        };
        if !force && self.below_floor_after_removal(id, &group.type_name, SlotKind::Group)? {
            log::debug!(
                "Not removing last mandatory field group '{}' from {id}",
                group.type_name
            );
            return Ok(false);
        }
        self.node_mut(id)?.groups.remove(index);
        Ok(true)
    }

    /// Replace the field at `index` with a value of the same type. The floor
    /// and cap are unaffected, so neither is checked.
    pub fn change_field(&mut self, id: NodeId, index: usize, new_field: Field) -> Result<bool> {
        let node = self.node_mut(id)?;
        match node.fields.get_mut(index) {
            Some(old) if old.type_name == new_field.type_name && !new_field.is_person() => {
                *old = new_field;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Fields, persons and groups on a node sharing a type name.
    pub fn count_of_type(&self, id: NodeId, type_name: &str) -> Result<usize> {
        Ok(self.node(id)?.count_of_type(type_name))
    }

    pub fn fields_by_type(&self, id: NodeId, type_name: &str) -> Result<Vec<&Field>> {
        Ok(self
            .node(id)?
            .fields
            .iter()
            .filter(|f| f.type_name == type_name)
            .collect())
    }

    pub fn persons_by_type(&self, id: NodeId, type_name: &str) -> Result<Vec<&Field>> {
        Ok(self
            .node(id)?
            .persons
            .iter()
            .filter(|p| p.type_name == type_name)
            .collect())
    }

    pub fn groups_by_type(&self, id: NodeId, type_name: &str) -> Result<Vec<&FieldGroup>> {
        Ok(self
            .node(id)?
            .groups
            .iter()
            .filter(|g| g.type_name == type_name)
            .collect())
    }

    /// Fields whose type is marked as identifier in the registry.
    pub fn identifier_fields(&self, id: NodeId) -> Result<Vec<&Field>> {
        Ok(self
            .node(id)?
            .fields
            .iter()
            .filter(|f| self.registry.is_identifier(&f.type_name))
            .collect())
    }

    /// Whether one instance of a field type could be removed without force.
    pub fn can_field_be_removed(&self, id: NodeId, type_name: &str) -> Result<bool> {
        Ok(!self.below_floor_after_removal(id, type_name, SlotKind::Field)?)
    }

    pub fn can_group_be_removed(&self, id: NodeId, type_name: &str) -> Result<bool> {
        Ok(!self.below_floor_after_removal(id, type_name, SlotKind::Group)?)
    }

    /// Field types declared by the node's element type that still accept
    /// another instance, hidden types included.
    pub fn possible_field_types(&self, id: NodeId) -> Result<Vec<&FieldType>> {
        self.open_field_types(id, true)
    }

    /// Like [`Document::possible_field_types`] without hidden types: what a
    /// user may add.
    pub fn addable_field_types(&self, id: NodeId) -> Result<Vec<&FieldType>> {
        self.open_field_types(id, false)
    }

    fn open_field_types(&self, id: NodeId, include_hidden: bool) -> Result<Vec<&FieldType>> {
        let Some(element) = self.element_type(id)? else {
            return Ok(Vec::new());
        };
        let node = self.node(id)?;
        Ok(element
            .fields
            .iter()
            .filter(|slot| include_hidden || !is_hidden(&slot.type_name))
            .filter(|slot| slot.rule.cardinality.admits(node.count_of_type(&slot.type_name)))
            .filter_map(|slot| self.registry.field_type_by_name(&slot.type_name))
            .collect())
    }

    pub fn possible_group_types(&self, id: NodeId) -> Result<Vec<&GroupType>> {
        self.open_group_types(id, true)
    }

    pub fn addable_group_types(&self, id: NodeId) -> Result<Vec<&GroupType>> {
        self.open_group_types(id, false)
    }

    fn open_group_types(&self, id: NodeId, include_hidden: bool) -> Result<Vec<&GroupType>> {
        let Some(element) = self.element_type(id)? else {
            return Ok(Vec::new());
        };
        let node = self.node(id)?;
        Ok(element
            .groups
            .iter()
            .filter(|slot| include_hidden || !is_hidden(&slot.type_name))
            .filter(|slot| slot.rule.cardinality.admits(node.count_of_type(&slot.type_name)))
            .filter_map(|slot| self.registry.group_type_by_name(&slot.type_name))
            .collect())
    }

    /// Default-display field types the node has no instance of yet.
    pub fn missing_default_display_fields(&self, id: NodeId) -> Result<Vec<&FieldType>> {
        let Some(element) = self.element_type(id)? else {
            return Ok(Vec::new());
        };
        let node = self.node(id)?;
        Ok(element
            .default_display_fields()
            .filter(|slot| node.count_of_type(&slot.type_name) == 0)
            .filter_map(|slot| self.registry.field_type_by_name(&slot.type_name))
            .collect())
    }

    pub fn missing_default_display_groups(&self, id: NodeId) -> Result<Vec<&GroupType>> {
        let Some(element) = self.element_type(id)? else {
            return Ok(Vec::new());
        };
        let node = self.node(id)?;
        Ok(element
            .default_display_groups()
            .filter(|slot| node.count_of_type(&slot.type_name) == 0)
            .filter_map(|slot| self.registry.group_type_by_name(&slot.type_name))
            .collect())
    }

    /// Drop persons without any name or institution, fields without a value
    /// and groups none of whose members has a value.
    pub fn delete_unused(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        let before = node.fields.len() + node.persons.len() + node.groups.len();
        node.persons.retain(Field::has_value);
        node.fields.retain(Field::has_value);
        node.groups.retain(FieldGroup::has_any_value);
        let after = node.fields.len() + node.persons.len() + node.groups.len();
        if before != after {
            log::debug!("Deleted {} unused value(s) from {id}", before - after);
        }
        Ok(())
    }
}

fn check_person(person: &Field) -> Result<()> {
    if person.type_name.is_empty() {
        return Err(FolioError::IncompletePerson(
            "person has no field type".to_string(),
        ));
    }
    if !person.is_person() {
        return Err(FolioError::IncompletePerson(format!(
            "'{}' carries no person name",
            person.type_name
        )));
    }
    Ok(())
}
