//! Schema-side logic: projections, option resolution, structural edits,
//! authoring and persistence of schema documents.

pub mod authoring;
pub mod mutator;
pub mod options;
pub mod projection;
mod repository;

pub use mutator::{
    FieldDraft, FieldSummary, OptionDraft, add_or_update_field, apply_draft, delete_field,
    field_listing, rename_field, reorder_fields,
};
pub use options::{LiveFetch, ResolvedOptions, resolve_options, resolve_options_until_cancelled};
pub use projection::{form_visible, grid_visible, project};
pub use repository::{SchemaRepository, SchemaUpdate, SchemaWatch};
