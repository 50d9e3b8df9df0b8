//! AzureStack resource provider core.
//!
//! Maps declarative resource and data source definitions onto the AzureStack
//! Resource Manager API for the Key Vault and Network services.
//!
//! - [`azure`] - ARM and Key Vault data-plane plumbing, tokens, `az` CLI
//! - [`clients`] - the [`Client`](clients::Client) handed to every handler
//! - [`config`] - provider configuration, feature flags and API versions
//! - [`error`] - crate error type
//! - [`ids`] - typed resource identifiers
//! - [`locks`] - named lock table
//! - [`models`] - ARM wire structs
//! - [`poll`] - wait for a resource to reach a state
//! - [`provider`] - registry and CRUD entrypoints
//! - [`retry`] - bounded retry of transient failures
//! - [`schema`] - attribute model and handler traits
//! - [`services`] - Key Vault and Network resources
//! - [`timeouts`] - per-operation deadlines

pub mod azure;
pub mod clients;
pub mod config;
pub mod error;
pub mod ids;
pub mod locks;
pub mod models;
pub mod poll;
pub mod provider;
pub mod retry;
pub mod schema;
pub mod services;
pub mod timeouts;

pub use clients::Client;
pub use error::{Error, Result};
pub use provider::Provider;
