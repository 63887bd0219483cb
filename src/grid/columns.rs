use crate::types::{ComponentType, FieldDefinition, FixedEdge, SchemaDocument};

/// Inline editor shown when a row enters edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Text,
    Number,
    TextArea,
    Select,
    Checkbox,
    Date,
    Time,
    DateTime,
    Email,
    Phone,
    Url,
    Password,
    Radio,
    /// File and image values can only be changed through the full form.
    FullFormOnly,
}

impl From<ComponentType> for EditorKind {
    fn from(component: ComponentType) -> Self {
        match component {
            ComponentType::Text => EditorKind::Text,
            ComponentType::Number => EditorKind::Number,
            ComponentType::TextArea => EditorKind::TextArea,
            ComponentType::Dropdown => EditorKind::Select,
            ComponentType::Checkbox => EditorKind::Checkbox,
            ComponentType::Date => EditorKind::Date,
            ComponentType::Time => EditorKind::Time,
            ComponentType::DateTime => EditorKind::DateTime,
            ComponentType::Email => EditorKind::Email,
            ComponentType::Phone => EditorKind::Phone,
            ComponentType::Url => EditorKind::Url,
            ComponentType::Password => EditorKind::Password,
            ComponentType::Radio => EditorKind::Radio,
            ComponentType::File | ComponentType::Image => EditorKind::FullFormOnly,
        }
    }
}

/// Presentation of one grid column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub key: String,
    pub title: String,
    pub width: Option<u32>,
    pub fixed: Option<FixedEdge>,
    pub ellipsis: bool,
    pub sortable: bool,
    pub filterable: bool,
    pub editor: EditorKind,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(key: &str, def: &FieldDefinition) -> Self {
        Self {
            key: key.to_string(),
            title: def.display_title(key).to_string(),
            width: def.table.width,
            fixed: def.table.fixed,
            ellipsis: def.table.ellipsis,
            sortable: def.table.sortable,
            filterable: def.table.filterable,
            editor: def.component().into(),
        }
    }
}

/// The user's column arrangement (column selector): which grid-visible
/// fields are shown, and in what order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnLayout {
    shown: Vec<String>,
    /// Projection the arrangement was last reconciled against.
    baseline: Vec<String>,
}

impl ColumnLayout {
    #[must_use]
    pub fn from_schema(schema: &SchemaDocument) -> Self {
        let keys = schema.grid_keys();
        Self {
            shown: keys.clone(),
            baseline: keys,
        }
    }

    #[must_use]
    pub fn shown(&self) -> &[String] {
        &self.shown
    }

    #[must_use]
    pub fn is_shown(&self, key: &str) -> bool {
        self.shown.iter().any(|k| k == key)
    }

    /// Schema fields not currently shown, in schema display order.
    #[must_use]
    pub fn hidden_columns(&self, schema: &SchemaDocument) -> Vec<String> {
        crate::schema::project(schema.fields(), &schema.ui.order, |_| true)
            .into_iter()
            .filter(|key| !self.is_shown(key))
            .collect()
    }

    pub fn hide(&mut self, key: &str) -> bool {
        let before = self.shown.len();
        self.shown.retain(|k| k != key);
        before != self.shown.len()
    }

    /// Appends a schema field to the shown columns.
    pub fn show(&mut self, schema: &SchemaDocument, key: &str) -> bool {
        if self.is_shown(key) || schema.field(key).is_none() {
            return false;
        }
        self.shown.push(key.to_string());
        true
    }

    /// Moves the column at `from` to index `to` (drag and drop).
    pub fn move_column(&mut self, from: usize, to: usize) -> bool {
        if from >= self.shown.len() || to >= self.shown.len() {
            return false;
        }
        let key = self.shown.remove(from);
        self.shown.insert(to, key);
        true
    }

    /// Carries the arrangement over to a changed schema. Shown columns keep
    /// their relative order as long as they still exist and are still
    /// grid-visible; columns new to the projection are appended; columns
    /// the user hid stay hidden.
    pub fn reconcile(&mut self, schema: &SchemaDocument) {
        let projected = schema.grid_keys();
        self.shown.retain(|key| projected.contains(key));
        for key in &projected {
            if !self.baseline.contains(key) && !self.shown.contains(key) {
                self.shown.push(key.clone());
            }
        }
        self.baseline = projected;
    }

    #[must_use]
    pub fn specs(&self, schema: &SchemaDocument) -> Vec<ColumnSpec> {
        self.shown
            .iter()
            .filter_map(|key| schema.field(key).map(|def| ColumnSpec::new(key, def)))
            .collect()
    }
}
