use crate::error::{Error, Result};
use crate::types::{FormValues, RawValue, Record, SchemaDocument};

#[derive(Debug, Clone, PartialEq)]
struct EditingRow {
    record_id: String,
    draft: FormValues,
}

/// Row edit state machine: at most one row is in editing at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditState {
    editing: Option<EditingRow>,
}

impl EditState {
    /// Puts `record` into editing with its current field values as the
    /// draft. Repeating the call for the row already in editing keeps the
    /// draft; any other row is rejected.
    pub fn begin(&mut self, record: &Record) -> Result<()> {
        match &self.editing {
            Some(row) if row.record_id == record.id => Ok(()),
            Some(row) => Err(Error::EditInProgress {
                record_id: row.record_id.clone(),
            }),
            None => {
                self.editing = Some(EditingRow {
                    record_id: record.id.clone(),
                    draft: record.values(),
                });
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_ref().map(|row| row.record_id.as_str())
    }

    #[must_use]
    pub fn is_editing(&self, record_id: &str) -> bool {
        self.editing_id() == Some(record_id)
    }

    #[must_use]
    pub fn draft(&self) -> Option<&FormValues> {
        self.editing.as_ref().map(|row| &row.draft)
    }

    /// Updates one draft value. Only keys declared by `schema` are accepted.
    pub fn set(&mut self, schema: &SchemaDocument, key: &str, value: RawValue) -> Result<()> {
        let Some(row) = self.editing.as_mut() else {
            return Err(Error::Validation("No row is being edited".to_string()));
        };
        if !schema.fields().contains_key(key) {
            return Err(Error::Validation(format!("Field '{key}' does not exist")));
        }
        row.draft.insert(key.to_string(), value);
        Ok(())
    }

    /// Leaves editing without writing. Returns the id of the row that was
    /// being edited.
    pub fn cancel(&mut self) -> Option<String> {
        self.editing.take().map(|row| row.record_id)
    }

    /// Drops draft entries for keys the schema no longer declares.
    pub fn retain_schema_keys(&mut self, schema: &SchemaDocument) {
        if let Some(row) = self.editing.as_mut() {
            row.draft.retain(|key, _| schema.fields().contains_key(key));
        }
    }
}
