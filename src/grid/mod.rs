//! Grid Engine: the data side of an editable, schema-driven table.
//!
//! A [`GridEngine`] follows one record type through a store subscription
//! and layers the user's view on top of the latest snapshot: column
//! arrangement, search, filters, sort and pagination. Rows are edited one
//! at a time; full create/edit forms go through [`FormSession`].

mod columns;
mod engine;
mod form;
mod query;
mod render;
mod state;
mod write;

pub use columns::{ColumnLayout, ColumnSpec, EditorKind};
pub use engine::{CellActivation, DEFAULT_PAGE_SIZE, GridEngine};
pub use form::{FormMode, FormSchema, FormSession};
pub use query::{GridQuery, Page, SortDirection, SortSpec, apply as apply_query, paginate};
pub use render::{EMPTY_CELL, OptionLookup, render_cell, render_cell_or_placeholder};
pub use state::EditState;
pub use write::{validate_required, write_create, write_update};
