//! Resource abstraction layer
//!
//! This module provides a data-driven approach to managing Uptime API
//! objects. Resource definitions are loaded from JSON files at compile time,
//! allowing new resource types to be added without code changes.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource and data source definitions
//! - [`mapping`] - Converts between Terraform state and API payloads
//! - [`crud`] - Generic create/read/update/delete calls
//! - [`import`] - Composite import IDs for nested resources
//! - [`data_source`] - Paginated lookup by attribute value
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `common.json` - Shared nested blocks and attribute groups
//! - `monitors.json` - Monitors, heartbeats and their groups
//! - `policies.json` - Escalation policies, severities, on-call calendars
//! - `status_pages.json` - Status pages, sections and resources
//! - `integrations.json` - Email, webhook and third-party integrations
//! - `catalog.json` - Metadata and catalog relations
//!
//! # Example
//!
//! ```ignore
//! use crate::resource::{crud, get_resource};
//!
//! async fn create_monitor(client: &ApiClient, config: &Map<String, Value>) -> anyhow::Result<()> {
//!     let def = get_resource("betteruptime_monitor").unwrap();
//!     let state = crud::create(client, def, config).await?;
//!     Ok(())
//! }
//! ```

pub mod crud;
pub mod data_source;
pub mod import;
pub mod mapping;
mod registry;

pub use registry::*;
