use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::export::ExportFormat;

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// List record types
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a record type's schema document
    Show {
        /// Record type (picked interactively if omitted)
        record_type: Option<String>,

        /// Output the stored document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a record type from schema files, or from the default template
    Create {
        record_type: String,

        /// Display title (defaults to the record type name)
        #[arg(long)]
        title: Option<String>,

        /// JSON or YAML file holding the schema body
        #[arg(long)]
        schema: Option<PathBuf>,

        /// JSON or YAML file holding the ui overlay
        #[arg(long)]
        ui: Option<PathBuf>,
    },

    /// Replace the schema body and ui overlay of an existing record type
    Replace {
        record_type: String,

        #[arg(long)]
        title: Option<String>,

        /// JSON or YAML file holding the schema body
        #[arg(long)]
        schema: PathBuf,

        /// JSON or YAML file holding the ui overlay (cleared if omitted)
        #[arg(long)]
        ui: Option<PathBuf>,
    },

    /// Create record types from every schema file matching a glob pattern
    Import {
        /// Glob pattern; each file's stem names its record type
        pattern: String,
    },

    /// Delete a record type's schema (its records are kept)
    Delete {
        record_type: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Column editor flags. Omitted flags keep the field's current setting.
#[derive(Args, Debug, Default, Clone)]
pub struct FieldArgs {
    #[arg(long)]
    pub title: Option<String>,

    /// Value type: string, number, integer, boolean, array, object
    #[arg(long = "type")]
    pub type_name: Option<String>,

    /// String format: email, uri, date, date-time, time, tel
    #[arg(long)]
    pub format: Option<String>,

    #[arg(long)]
    pub required: Option<bool>,

    /// Whether the field appears in the entry form
    #[arg(long)]
    pub addable: Option<bool>,

    /// Default value, converted to the value type
    #[arg(long)]
    pub default: Option<String>,

    #[arg(long)]
    pub width: Option<u32>,

    /// Pin the column: left, right or none
    #[arg(long)]
    pub fixed: Option<String>,

    #[arg(long)]
    pub ellipsis: Option<bool>,

    #[arg(long)]
    pub sortable: Option<bool>,

    #[arg(long)]
    pub filterable: Option<bool>,

    /// Hide the column from the grid
    #[arg(long)]
    pub hidden: Option<bool>,

    /// Editor component: text, number, textarea, dropdown, checkbox, date,
    /// time, datetime, email, phone, url, password, radio, file, image
    #[arg(long)]
    pub component: Option<String>,

    /// Static option as label=value (repeatable)
    #[arg(long = "option")]
    pub options: Vec<String>,

    /// Record type supplying dynamic options
    #[arg(long)]
    pub source_table: Option<String>,

    /// Field of the source records shown as the option label
    #[arg(long)]
    pub label_field: Option<String>,

    /// Field of the source records stored as the option value
    #[arg(long)]
    pub value_field: Option<String>,
}

#[derive(Subcommand)]
pub enum FieldCommands {
    /// Add a field
    Add {
        record_type: String,
        key: String,

        #[command(flatten)]
        field: FieldArgs,
    },

    /// Change an existing field's settings
    Update {
        record_type: String,
        key: String,

        #[command(flatten)]
        field: FieldArgs,
    },

    /// Rename a field in place
    Rename {
        record_type: String,
        old_key: String,
        new_key: String,
    },

    /// Remove a field (stored values are kept)
    Remove {
        record_type: String,
        key: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Set the display order hint
    Reorder {
        record_type: String,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// List every field, hidden ones included
    List {
        record_type: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Search and filter flags shared by listing and export.
#[derive(Args, Debug, Default, Clone)]
pub struct QueryArgs {
    /// Case-insensitive text matched against every shown column
    #[arg(long)]
    pub search: Option<String>,

    /// Column filter as column=value (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Sort by a sortable column
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// List records, one page at a time
    List {
        record_type: String,

        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        page_size: Option<usize>,

        /// Output the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a record
    Add {
        record_type: String,

        /// Field value as key=value (repeatable)
        #[arg(long = "set")]
        values: Vec<String>,

        /// JSON or YAML file with field values
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Edit fields of a record in place
    Edit {
        record_type: String,
        id: String,

        /// Field value as key=value (repeatable)
        #[arg(long = "set", required = true)]
        values: Vec<String>,
    },

    /// Delete a record
    Delete {
        record_type: String,
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show the options a dropdown or radio field offers
    Options { record_type: String, field: String },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub record_type: String,

    /// csv or xlsx
    #[arg(long, default_value = "xlsx")]
    pub format: ExportFormat,

    /// Directory the file is written to
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    #[command(flatten)]
    pub query: QueryArgs,
}
