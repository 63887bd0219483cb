mod record;
mod schema;
mod value;

pub use record::{META_KEYS, Record, is_meta_key};
pub use schema::{
    ComponentType, DynamicSource, EffectiveOptions, FieldDefinition, FieldMap, FieldType,
    FixedEdge, OptionSource, SchemaDocument, SelectOption, StringFormat, TablePresentation,
    TableSchema, UiSchema,
};
pub(crate) use schema::properties_value;
pub use value::{
    FormValues, RawValue, display_value, format_timestamp, iso_string, number_from_f64,
    number_to_string, parse_temporal, parse_timestamp,
};
