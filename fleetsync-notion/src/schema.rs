//! Required columns of a tracking database and how to make them exist.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use fleetsync_core::ApiError;

use crate::client::NotionClient;

/// Column type of a database property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    Url,
    Number,
    Date,
    RichText,
    MultiSelect(&'static [&'static str]),
}

impl PropertyKind {
    /// Property definition as sent in a database PATCH.
    pub fn definition(&self) -> Value {
        match self {
            PropertyKind::Title => json!({ "title": {} }),
            PropertyKind::Url => json!({ "url": {} }),
            PropertyKind::Number => json!({ "number": {} }),
            PropertyKind::Date => json!({ "date": {} }),
            PropertyKind::RichText => json!({ "rich_text": {} }),
            PropertyKind::MultiSelect(options) => {
                let options: Vec<Value> = options.iter().map(|o| json!({ "name": o })).collect();
                json!({ "multi_select": { "options": options } })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredProperty {
    pub name: &'static str,
    pub kind: PropertyKind,
}

impl RequiredProperty {
    pub const fn new(name: &'static str, kind: PropertyKind) -> Self {
        Self { name, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// PATCH every required property, whether or not it exists.
    Force,
    /// Read the database first and PATCH only absent properties.
    MissingOnly,
}

/// Definitions for `required`, keyed by property name.
pub fn schema_patch<'a, I>(required: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a RequiredProperty>,
{
    required
        .into_iter()
        .map(|p| (p.name.to_string(), p.kind.definition()))
        .collect()
}

/// Required properties whose name is not in `existing`, in declaration order.
pub fn missing_properties<'a>(
    required: &'a [RequiredProperty],
    existing: &BTreeSet<String>,
) -> Vec<&'a RequiredProperty> {
    required
        .iter()
        .filter(|p| !existing.contains(p.name))
        .collect()
}

/// Bring the database schema in line with `required`.
///
/// Returns the names that were patched (empty when nothing was missing).
pub fn reconcile_schema(
    client: &NotionClient,
    required: &[RequiredProperty],
    mode: SchemaMode,
) -> Result<Vec<String>, ApiError> {
    let to_patch: Vec<&RequiredProperty> = match mode {
        SchemaMode::Force => required.iter().collect(),
        SchemaMode::MissingOnly => {
            let existing = client.retrieve_database()?;
            missing_properties(required, &existing)
        }
    };

    if to_patch.is_empty() {
        tracing::debug!(database = client.database_id(), "schema already complete");
        return Ok(Vec::new());
    }

    let patch = schema_patch(to_patch.iter().copied());
    client.update_schema(&patch)?;
    Ok(to_patch.iter().map(|p| p.name.to_string()).collect())
}
