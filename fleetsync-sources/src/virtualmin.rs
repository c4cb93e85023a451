//! Virtualmin remote API (`remote.cgi`): domains hosted on the live server.
//!
//! `list-domains` with `json=1` does not return structured domains; it wraps
//! the CLI's tabular text, one `{ "name": "<row>" }` per output line:
//!
//! ```text
//! Domain                 Username   Description
//! ---------------------- ---------- ------------
//! acme.example           acme       Acme Ltd
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use fleetsync_core::{ApiError, HttpClient, VirtualminSettings};

const SERVICE: &str = "virtualmin";
const HEADER_TOKEN: &str = "Domain";
const RULE_MARKER: &str = "----";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DomainTable {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Vec<DomainRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DomainRow {
    #[serde(default)]
    pub name: Option<String>,
}

/// A domain served from the live server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveDomain {
    pub domain: String,
    /// `https://<domain>`, the form MainWP registers sites under.
    pub url: String,
}

impl LiveDomain {
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        let url = format!("https://{domain}");
        Self { domain, url }
    }
}

/// Extract domain names from the tabular rows, in table order.
///
/// Skips blank rows, the `----` rule under the header, and the `Domain`
/// header itself; keeps only the first column of each remaining row.
pub fn parse_domains(table: &DomainTable) -> Vec<LiveDomain> {
    table
        .data
        .iter()
        .filter_map(|row| row.name.as_deref())
        .filter(|name| !name.trim().is_empty() && !name.contains(RULE_MARKER))
        .filter_map(|name| name.split_whitespace().next())
        .filter(|domain| *domain != HEADER_TOKEN)
        .map(LiveDomain::new)
        .collect()
}

#[derive(Debug, Clone)]
pub struct VirtualminClient {
    http: HttpClient,
    url: String,
    authorization: String,
}

impl VirtualminClient {
    pub fn new(settings: &VirtualminSettings) -> Result<Self, ApiError> {
        let http = if settings.accept_invalid_certs {
            HttpClient::insecure(SERVICE)?
        } else {
            HttpClient::new(SERVICE)
        };
        let credentials = STANDARD.encode(format!("{}:{}", settings.username, settings.password));
        Ok(Self {
            http,
            url: settings.url.clone(),
            authorization: format!("Basic {credentials}"),
        })
    }

    /// Raw `list-domains` output.
    pub fn fetch_domain_table(&self) -> Result<DomainTable, ApiError> {
        let request = self
            .http
            .request("GET", &self.url)
            .query("program", "list-domains")
            .query("json", "1")
            .set("Authorization", &self.authorization);
        let response = self.http.call(request)?;
        let table: DomainTable = self.http.read_json(response)?;

        if table.status.as_deref() == Some("failure") {
            return Err(ApiError::Rejected {
                service: SERVICE,
                message: table
                    .error
                    .unwrap_or_else(|| "list-domains failed without a message".to_string()),
            });
        }
        Ok(table)
    }

    /// Domains hosted on the server.
    pub fn list_domains(&self) -> Result<Vec<LiveDomain>, ApiError> {
        let table = self.fetch_domain_table()?;
        let domains = parse_domains(&table);
        tracing::info!(rows = table.data.len(), domains = domains.len(), "listed live domains");
        Ok(domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[Option<&str>]) -> DomainTable {
        DomainTable {
            status: Some("success".into()),
            error: None,
            data: rows
                .iter()
                .map(|r| DomainRow {
                    name: r.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn parses_tabular_rows() {
        let table = table(&[
            Some("Domain                         Username   Description"),
            Some("------------------------------ ---------- -----------"),
            Some("acme.example                   acme       Acme Ltd"),
            Some("shop.acme.example              acme       Shop"),
            Some(""),
            Some("   "),
            None,
            Some("beta.example\tbeta\tBeta"),
        ]);
        let domains: Vec<String> = parse_domains(&table)
            .into_iter()
            .map(|d| d.domain)
            .collect();
        assert_eq!(domains, vec!["acme.example", "shop.acme.example", "beta.example"]);
    }

    #[test]
    fn live_domain_builds_https_url() {
        let domain = LiveDomain::new("acme.example");
        assert_eq!(domain.url, "https://acme.example");
    }

    #[test]
    fn leading_whitespace_does_not_hide_the_domain() {
        let table = table(&[Some("   indented.example   user")]);
        assert_eq!(parse_domains(&table)[0].domain, "indented.example");
    }

    #[test]
    fn empty_table_is_empty() {
        assert!(parse_domains(&DomainTable::default()).is_empty());
    }
}
