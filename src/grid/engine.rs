use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::columns::{ColumnLayout, ColumnSpec};
use super::form::FormSession;
use super::query::{self, GridQuery, Page, SortDirection, SortSpec};
use super::render::{OptionLookup, render_cell_or_placeholder};
use super::state::EditState;
use super::write::{validate_required, write_update};
use crate::error::{Error, Result};
use crate::export::{ExportFile, ExportFormat, ExportTable, encode};
use crate::i18n::Locale;
use crate::schema::options::{ResolvedOptions, resolve_options, resolve_options_until_cancelled};
use crate::store::{DocumentStore, Snapshot, Subscription};
use crate::types::{EffectiveOptions, FormValues, RawValue, Record, SchemaDocument};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Handle for one activated cell editor. Cancelled when the cell is
/// deactivated or another cell is activated.
#[derive(Debug, Clone)]
pub struct CellActivation {
    pub record_id: String,
    pub key: String,
    token: CancellationToken,
}

impl CellActivation {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// Data side of an editable grid over one record type.
///
/// Holds the latest record snapshot and the user's view state (columns,
/// query, page, row being edited). Rendering is left to the caller.
pub struct GridEngine {
    store: Arc<dyn DocumentStore>,
    schema: SchemaDocument,
    records: Vec<Record>,
    load_error: Option<String>,
    layout: ColumnLayout,
    query: GridQuery,
    page: usize,
    page_size: usize,
    edit: EditState,
    active_cell: Option<CancellationToken>,
    lookup: OptionLookup,
    locale: Locale,
}

impl GridEngine {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, schema: SchemaDocument, locale: Locale) -> Self {
        Self {
            store,
            layout: ColumnLayout::from_schema(&schema),
            lookup: OptionLookup::from_schema(&schema),
            schema,
            records: Vec::new(),
            load_error: None,
            query: GridQuery::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            edit: EditState::default(),
            active_cell: None,
            locale,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn record(&self, record_id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == record_id)
    }

    /// Message of the last failed push, cleared by the next good one.
    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub fn query(&self) -> &GridQuery {
        &self.query
    }

    #[must_use]
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut ColumnLayout {
        &mut self.layout
    }

    #[must_use]
    pub fn lookup(&self) -> &OptionLookup {
        &self.lookup
    }

    pub async fn subscribe(&self) -> Result<Subscription> {
        self.store.subscribe(&self.schema.record_type).await
    }

    /// Waits for the next push on `subscription` and applies it. Returns
    /// false once the subscription has ended.
    pub async fn sync(&mut self, subscription: &mut Subscription) -> bool {
        match subscription.next().await {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    /// Replaces the local record set with a pushed snapshot. An error push
    /// keeps the previous records and is reported through
    /// [`GridEngine::load_error`].
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Data(documents) => {
                self.records = documents.iter().map(Record::from_document).collect();
                self.load_error = None;
                if let Some(id) = self.edit.editing_id()
                    && self.record(id).is_none()
                {
                    info!("Row {} left the result set, cancelling its edit", id);
                    self.edit.cancel();
                }
                debug!(
                    "Applied snapshot of {} records for '{}'",
                    self.records.len(),
                    self.schema.record_type
                );
            }
            Snapshot::Error(message) => {
                warn!(
                    "Subscription to '{}' failed: {}",
                    self.schema.record_type, message
                );
                self.load_error = Some(message);
            }
        }
    }

    /// Swaps in a changed schema. Column arrangement is reconciled, option
    /// lookups are reseeded, and filters, sort and draft entries for
    /// removed fields are dropped.
    pub fn apply_schema(&mut self, schema: SchemaDocument) {
        self.layout.reconcile(&schema);
        self.lookup = OptionLookup::from_schema(&schema);
        self.query
            .filters
            .retain(|key, _| schema.fields().contains_key(key));
        if let Some(sort) = &self.query.sort
            && !schema.fields().contains_key(&sort.key)
        {
            self.query.sort = None;
        }
        self.edit.retain_schema_keys(&schema);
        self.schema = schema;
    }

    #[must_use]
    pub fn columns(&self) -> Vec<ColumnSpec> {
        self.layout.specs(&self.schema)
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.query.search = term.into();
        self.page = 1;
    }

    /// Sets the accepted values of one column's filter; an empty list
    /// clears it. Only filterable columns can be filtered.
    pub fn set_filter(&mut self, key: &str, values: Vec<String>) -> Result<()> {
        let def = self.schema.field(key).ok_or_else(|| unknown_column(key))?;
        if !def.table.filterable {
            return Err(Error::Validation(format!("Column '{key}' is not filterable")));
        }
        if values.is_empty() {
            self.query.filters.remove(key);
        } else {
            self.query.filters.insert(key.to_string(), values);
        }
        self.page = 1;
        Ok(())
    }

    pub fn set_sort(&mut self, key: &str, direction: SortDirection) -> Result<()> {
        let def = self.schema.field(key).ok_or_else(|| unknown_column(key))?;
        if !def.table.sortable {
            return Err(Error::Validation(format!("Column '{key}' is not sortable")));
        }
        self.query.sort = Some(SortSpec {
            key: key.to_string(),
            direction,
        });
        Ok(())
    }

    pub fn clear_sort(&mut self) {
        self.query.sort = None;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Rows passing search and filters, sorted, across all pages.
    #[must_use]
    pub fn filtered_records(&self) -> Vec<&Record> {
        query::apply(&self.records, self.layout.shown(), &self.query)
    }

    #[must_use]
    pub fn current_page(&self) -> Page<&Record> {
        query::paginate(self.filtered_records(), self.page, self.page_size)
    }

    /// Display text of every shown column of `record`.
    #[must_use]
    pub fn render_row(&self, record: &Record) -> Vec<String> {
        self.layout
            .shown()
            .iter()
            .map(|key| match self.schema.field(key) {
                Some(def) => render_cell_or_placeholder(
                    record.get(key),
                    def,
                    self.lookup.get(key),
                    self.locale,
                ),
                None => super::render::EMPTY_CELL.to_string(),
            })
            .collect()
    }

    pub fn begin_edit(&mut self, record_id: &str) -> Result<()> {
        let record = self
            .records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or(Error::NotFound)?;
        self.edit.begin(record)?;
        debug!("Editing row {}", record_id);
        Ok(())
    }

    #[must_use]
    pub fn editing_id(&self) -> Option<&str> {
        self.edit.editing_id()
    }

    #[must_use]
    pub fn draft(&self) -> Option<&FormValues> {
        self.edit.draft()
    }

    pub fn set_draft_value(&mut self, key: &str, value: RawValue) -> Result<()> {
        self.edit.set(&self.schema, key, value)
    }

    /// Writes the row being edited. On any failure the row stays in
    /// editing with its draft intact.
    pub async fn save_edit(&mut self) -> Result<Record> {
        let (Some(record_id), Some(draft)) = (self.edit.editing_id(), self.edit.draft()) else {
            return Err(Error::Validation("No row is being edited".to_string()));
        };
        let existing = self.record(record_id).ok_or(Error::NotFound)?;
        validate_required(&self.schema, draft, self.layout.shown(), self.locale)?;
        let saved = write_update(self.store.as_ref(), &self.schema, existing, draft).await?;

        self.edit.cancel();
        if let Some(slot) = self.records.iter_mut().find(|r| r.id == saved.id) {
            *slot = saved.clone();
        }
        Ok(saved)
    }

    /// Leaves editing without writing anything.
    pub fn cancel_edit(&mut self) {
        if let Some(id) = self.edit.cancel() {
            debug!("Cancelled edit of row {}", id);
        }
    }

    /// Activates the editor of one cell, cancelling the previously active
    /// one.
    pub fn activate_cell(&mut self, record_id: &str, key: &str) -> Result<CellActivation> {
        if self.schema.field(key).is_none() {
            return Err(unknown_column(key));
        }
        self.deactivate_cell();
        let token = CancellationToken::new();
        self.active_cell = Some(token.clone());
        Ok(CellActivation {
            record_id: record_id.to_string(),
            key: key.to_string(),
            token,
        })
    }

    pub fn deactivate_cell(&mut self) {
        if let Some(token) = self.active_cell.take() {
            token.cancel();
        }
    }

    /// Resolution of the activated cell's option list. The returned future
    /// owns everything it needs, so the engine stays usable while it runs;
    /// it yields `None` if the activation is cancelled first.
    pub fn resolve_cell_options(
        &self,
        activation: &CellActivation,
    ) -> impl Future<Output = Option<ResolvedOptions>> + Send + use<> {
        let def = self.schema.field(&activation.key).cloned();
        let store = Arc::clone(&self.store);
        let token = activation.token.clone();
        let locale = self.locale;
        async move {
            let def = def?;
            resolve_options_until_cancelled(&def, store.as_ref(), locale, &token).await
        }
    }

    /// Records resolved options for label rendering, unless the activation
    /// they belong to has been cancelled since.
    pub fn apply_cell_options(&mut self, activation: &CellActivation, resolved: ResolvedOptions) -> bool {
        if !activation.is_active() {
            debug!("Dropping options for deactivated cell '{}'", activation.key);
            return false;
        }
        self.lookup.insert(activation.key.clone(), resolved.options);
        true
    }

    /// Fetches every dynamic option list of the shown columns so their
    /// cells render labels. Returns the warnings of failed fetches.
    pub async fn preload_options(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        for key in self.layout.shown().to_vec() {
            let Some(def) = self.schema.field(&key) else {
                continue;
            };
            if !matches!(def.effective_options(), EffectiveOptions::Dynamic(_)) {
                continue;
            }
            let resolved = resolve_options(def, self.store.as_ref(), self.locale).await;
            if let Some(warning) = resolved.warning {
                warnings.push(warning);
            }
            self.lookup.insert(key, resolved.options);
        }
        warnings
    }

    #[must_use]
    pub fn open_create(&self) -> FormSession {
        FormSession::open_create(&self.schema, self.locale)
    }

    pub fn open_edit(&self, record_id: &str) -> Result<FormSession> {
        let record = self.record(record_id).ok_or(Error::NotFound)?;
        Ok(FormSession::open_edit(&self.schema, record, self.locale))
    }

    /// Hard delete by id.
    pub async fn delete(&mut self, record_id: &str) -> Result<bool> {
        let deleted = self
            .store
            .delete(&self.schema.record_type, record_id)
            .await?;
        if deleted {
            info!("Deleted record {} from '{}'", record_id, self.schema.record_type);
            if self.edit.is_editing(record_id) {
                self.edit.cancel();
            }
            self.records.retain(|r| r.id != record_id);
        }
        Ok(deleted)
    }

    /// Filtered rows over the shown columns, rendered as in the grid.
    /// Cells that cannot be rendered come out as the placeholder.
    #[must_use]
    pub fn export_table(&self) -> ExportTable {
        ExportTable {
            headers: self.columns().into_iter().map(|c| c.title).collect(),
            rows: self
                .filtered_records()
                .into_iter()
                .map(|record| self.render_row(record))
                .collect(),
        }
    }

    pub fn export(&self, format: ExportFormat) -> Result<ExportFile> {
        let table = self.export_table();
        let bytes = encode(&table, format)?;
        info!(
            "Exported {} rows of '{}' as {}",
            table.rows.len(),
            self.schema.record_type,
            format
        );
        Ok(ExportFile {
            file_name: format.file_name(&self.schema.record_type),
            mime_type: format.mime_type(),
            bytes,
        })
    }
}

fn unknown_column(key: &str) -> Error {
    Error::Validation(format!("Field '{key}' does not exist"))
}
