//! # fleetsync-notion
//!
//! Notion used as a tracking table: a database whose pages are keyed by
//! their title property.
//!
//! - [`client`]: REST calls (`/databases`, `/pages`)
//! - [`props`]: page property value builders
//! - [`schema`]: required-column definitions and reconciliation
//! - [`upsert`]: update-or-create by title

pub mod client;
pub mod props;
pub mod schema;
pub mod upsert;

pub use client::{format_database_id, NotionClient};
pub use props::Properties;
pub use schema::{missing_properties, reconcile_schema, PropertyKind, RequiredProperty, SchemaMode};
pub use upsert::{upsert_by_title, UpsertResult};
