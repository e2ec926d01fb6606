//! Terraform provider for Better Stack Uptime
//!
//! Translates resource configuration into calls against the Uptime REST
//! API and API objects back into Terraform state.

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod server;

/// Version injected at compile time via PROVIDER_VERSION env var (set by
/// the release build), or the crate version for local builds.
pub const VERSION: &str = match option_env!("PROVIDER_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
