//! # Schemagrid
//!
//! Schema-driven data grids and entry forms over a document store, usable
//! both as a library and through the `schemagrid` operator binary.
//!
//! A record type is described by a [`types::SchemaDocument`]: a JSON
//! Schema body plus a presentation overlay. From it the crate derives the
//! grid columns and form fields ([`schema::project`]), resolves option
//! lists ([`schema::resolve_options`]), applies structural edits
//! ([`schema::mutator`]), coerces submitted values ([`record::normalize`])
//! and drives an editable grid over live store snapshots
//! ([`grid::GridEngine`]).
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! schemagrid = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use schemagrid::grid::GridEngine;
//! use schemagrid::i18n::Locale;
//! use schemagrid::schema::SchemaRepository;
//! use schemagrid::store::{DocumentStore, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::new("./data/schemagrid.db")?);
//! store.initialize().await?;
//! let schema = SchemaRepository::new(store.clone()).get("contacts").await?;
//!
//! let mut grid = GridEngine::new(store, schema, Locale::En);
//! let mut subscription = grid.subscribe().await?;
//! while grid.sync(&mut subscription).await {
//!     for record in grid.current_page().rows {
//!         println!("{:?}", grid.render_row(record));
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod i18n;
pub mod record;
pub mod schema;
pub mod store;
pub mod types;
pub mod validation;
