use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::i18n::Locale;
use crate::store::{Document, DocumentStore};
use crate::types::{
    DynamicSource, EffectiveOptions, FieldDefinition, SelectOption, display_value,
    number_from_f64,
};

/// Source of live records for dynamic option lists.
#[async_trait]
pub trait LiveFetch: Send + Sync {
    async fn fetch(&self, record_type: &str) -> Result<Vec<Document>>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> LiveFetch for T {
    async fn fetch(&self, record_type: &str) -> Result<Vec<Document>> {
        self.list(record_type).await
    }
}

/// Options offered for a field. A failed live fetch yields an empty list
/// plus a warning; editing stays possible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedOptions {
    pub options: Vec<SelectOption>,
    pub warning: Option<String>,
}

impl ResolvedOptions {
    fn ready(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            warning: None,
        }
    }

    /// Label for a stored value.
    #[must_use]
    pub fn label_for(&self, value: &Value) -> Option<&str> {
        label_for(&self.options, value)
    }
}

/// Option lookup shared by cell rendering and the resolver.
#[must_use]
pub fn label_for<'a>(options: &'a [SelectOption], value: &Value) -> Option<&'a str> {
    options
        .iter()
        .find(|option| values_match(&option.value, value))
        .map(|option| option.label.as_str())
}

// Numbers compare numerically, everything else by its string form, so a
// stored 2 matches an option value "2".
fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => display_value(a) == display_value(b),
    }
}

/// Options that need no store access (inline enum or static list), or
/// `None` when the field draws on a dynamic source or declares nothing.
#[must_use]
pub fn static_options(def: &FieldDefinition) -> Option<Vec<SelectOption>> {
    let options = match def.effective_options() {
        EffectiveOptions::Inline(values) => values
            .iter()
            .map(|value| SelectOption::new(display_value(value), value.clone()))
            .collect(),
        EffectiveOptions::Static(options) => options.to_vec(),
        EffectiveOptions::Dynamic(_) | EffectiveOptions::None => return None,
    };
    Some(coerce_values(def, options))
}

/// Resolves the option list of a dropdown or radio field.
///
/// Priority is inline enum, then static list, then dynamic source; only the
/// dynamic case touches `fetch`.
pub async fn resolve_options<F>(def: &FieldDefinition, fetch: &F, locale: Locale) -> ResolvedOptions
where
    F: LiveFetch + ?Sized,
{
    if let Some(options) = static_options(def) {
        return ResolvedOptions::ready(options);
    }
    let EffectiveOptions::Dynamic(source) = def.effective_options() else {
        return ResolvedOptions::default();
    };
    match fetch.fetch(&source.source_record_type).await {
        Ok(records) => {
            let options = dynamic_options(source, &records, locale);
            ResolvedOptions::ready(coerce_values(def, options))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load options from '{}': {}",
                source.source_record_type,
                e
            );
            ResolvedOptions {
                options: Vec::new(),
                warning: Some(locale.messages().load_failed.to_string()),
            }
        }
    }
}

/// Like [`resolve_options`], but yields `None` if `token` is cancelled
/// before the result is ready. A result that lands after cancellation is
/// discarded.
pub async fn resolve_options_until_cancelled<F>(
    def: &FieldDefinition,
    fetch: &F,
    locale: Locale,
    token: &CancellationToken,
) -> Option<ResolvedOptions>
where
    F: LiveFetch + ?Sized,
{
    let resolved = tokio::select! {
        _ = token.cancelled() => None,
        resolved = resolve_options(def, fetch, locale) => Some(resolved),
    };
    if resolved.is_none() || token.is_cancelled() {
        tracing::debug!("Discarding option resolution for a deactivated cell");
        return None;
    }
    resolved
}

fn dynamic_options(source: &DynamicSource, records: &[Document], locale: Locale) -> Vec<SelectOption> {
    records
        .iter()
        .map(|record| {
            let label = match record.data.get(&source.label_field) {
                None | Some(Value::Null) => locale.messages().no_label.to_string(),
                Some(value) => display_value(value),
            };
            let value = match record.data.get(&source.value_field) {
                None | Some(Value::Null) => Value::String(record.id.clone()),
                Some(value) => value.clone(),
            };
            SelectOption { label, value }
        })
        .collect()
}

fn coerce_values(def: &FieldDefinition, mut options: Vec<SelectOption>) -> Vec<SelectOption> {
    if !def.field_type.is_numeric() {
        return options;
    }
    for option in &mut options {
        if let Value::String(text) = &option.value
            && let Some(number) = text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(number_from_f64)
        {
            option.value = Value::Number(number);
        }
    }
    options
}
