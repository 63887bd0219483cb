use std::collections::HashSet;

use crate::types::{FieldDefinition, FieldMap, SchemaDocument};

/// Grid columns: everything not explicitly hidden.
#[must_use]
pub fn grid_visible(def: &FieldDefinition) -> bool {
    !def.table.hidden
}

/// Entry form fields: everything not explicitly marked non-addable.
#[must_use]
pub fn form_visible(def: &FieldDefinition) -> bool {
    def.addable
}

/// Every field, hidden or not. Used by the schema manager listing.
#[must_use]
pub fn all_fields(_def: &FieldDefinition) -> bool {
    true
}

/// Ordered, filtered field keys for one presentation context.
///
/// Keys named by `order_hint` come first, in hint order; every other
/// visible field follows in definition order. Hint keys that are unknown,
/// invisible or repeated are skipped.
#[must_use]
pub fn project<F>(fields: &FieldMap, order_hint: &[String], is_visible: F) -> Vec<String>
where
    F: Fn(&FieldDefinition) -> bool,
{
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(fields.len());

    for key in order_hint {
        if let Some(def) = fields.get(key)
            && is_visible(def)
            && seen.insert(key.as_str())
        {
            keys.push(key.clone());
        }
    }
    for (key, def) in fields.iter() {
        if is_visible(def) && seen.insert(key) {
            keys.push(key.to_string());
        }
    }
    keys
}

impl SchemaDocument {
    #[must_use]
    pub fn grid_keys(&self) -> Vec<String> {
        project(self.fields(), &self.ui.order, grid_visible)
    }

    #[must_use]
    pub fn form_keys(&self) -> Vec<String> {
        project(self.fields(), &self.ui.order, form_visible)
    }
}
