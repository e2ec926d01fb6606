//! Uptime API interaction module
//!
//! This module provides the core functionality for talking to the Better
//! Stack Uptime REST API: authentication, the HTTP client, error types and
//! pagination.
//!
//! # Module Structure
//!
//! - [`auth`] - API token resolution
//! - [`client`] - Main API client for making requests against the base URL
//! - [`error`] - Typed API errors and diagnostic formatting
//! - [`http`] - HTTP utilities for REST API calls
//! - [`pagination`] - Following `pagination.next` links across pages
//!
//! # Example
//!
//! ```ignore
//! use crate::api::{client::ApiClient, pagination::fetch_all};
//!
//! async fn example(client: &ApiClient) -> anyhow::Result<()> {
//!     let monitors = fetch_all(client, "/api/v2/monitors").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod pagination;

pub use client::ApiClient;
pub use error::{format_api_error, is_not_found, ApiError};
