//! Notion REST client bound to a single database.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use fleetsync_core::{ApiError, HttpClient, NotionSettings};

use crate::props::Properties;

const SERVICE: &str = "notion";

/// Rewrite a bare 32-character hex id into Notion's dashed 8-4-4-4-12 form.
///
/// Anything else (already dashed, wrong length, non-hex) is returned trimmed
/// and otherwise untouched; Notion reports a bad id better than we can.
pub fn format_database_id(raw: &str) -> String {
    let id = raw.trim();
    if id.len() != 32 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return id.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    )
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    http: HttpClient,
    api_url: String,
    api_key: String,
    version: String,
    database_id: String,
}

#[derive(Deserialize)]
struct DatabaseObject {
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageObject>,
}

#[derive(Deserialize)]
struct PageObject {
    id: String,
}

impl NotionClient {
    pub fn new(settings: &NotionSettings, database_id: &str) -> Self {
        Self {
            http: HttpClient::new(SERVICE),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            version: settings.version.clone(),
            database_id: format_database_id(database_id),
        }
    }

    /// Dashed id of the database this client writes to.
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.http
            .request(method, &format!("{}/{path}", self.api_url))
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Notion-Version", &self.version)
            .set("Content-Type", "application/json")
    }

    /// Names of the properties (columns) the database currently defines.
    pub fn retrieve_database(&self) -> Result<BTreeSet<String>, ApiError> {
        let path = format!("databases/{}", self.database_id);
        let response = self.http.call(self.request("GET", &path))?;
        let database: DatabaseObject = self.http.read_json(response)?;
        Ok(database.properties.keys().cloned().collect())
    }

    /// PATCH the database with property definitions.
    pub fn update_schema(&self, properties: &Map<String, Value>) -> Result<(), ApiError> {
        let path = format!("databases/{}", self.database_id);
        self.http.send_json(
            self.request("PATCH", &path),
            &json!({ "properties": properties }),
        )?;
        tracing::info!(database = %self.database_id, columns = properties.len(), "database schema updated");
        Ok(())
    }

    /// Ids of pages whose title property equals `value`, in Notion's order.
    pub fn query_by_title(&self, property: &str, value: &str) -> Result<Vec<String>, ApiError> {
        let path = format!("databases/{}/query", self.database_id);
        let body = json!({
            "filter": {
                "property": property,
                "title": { "equals": value }
            }
        });
        let response = self.http.send_json(self.request("POST", &path), &body)?;
        let parsed: QueryResponse = self.http.read_json(response)?;
        Ok(parsed.results.into_iter().map(|page| page.id).collect())
    }

    /// Create a page in the database; returns the new page id.
    pub fn create_page(&self, properties: &Properties) -> Result<String, ApiError> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
        });
        let response = self.http.send_json(self.request("POST", "pages"), &body)?;
        let page: PageObject = self.http.read_json(response)?;
        Ok(page.id)
    }

    /// Overwrite the given properties of an existing page.
    pub fn update_page(&self, page_id: &str, properties: &Properties) -> Result<(), ApiError> {
        let path = format!("pages/{page_id}");
        self.http.send_json(
            self.request("PATCH", &path),
            &json!({ "properties": properties }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0123456789abcdef0123456789ABCDEF", "01234567-89ab-cdef-0123-456789ABCDEF")]
    #[case("  0123456789abcdef0123456789abcdef\n", "01234567-89ab-cdef-0123-456789abcdef")]
    #[case("01234567-89ab-cdef-0123-456789abcdef", "01234567-89ab-cdef-0123-456789abcdef")]
    #[case("short", "short")]
    #[case("zz23456789abcdef0123456789abcdef", "zz23456789abcdef0123456789abcdef")]
    fn database_ids(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_database_id(raw), expected);
    }
}
