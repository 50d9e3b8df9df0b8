//! Azure Stack control-plane and data-plane interaction.
//!
//! This module handles all Azure-related operations:
//! - [`arm`] - Resource Manager requests and long running operations
//! - [`auth`] - Bearer tokens from the Azure CLI or a service principal
//! - [`cli`] - Command execution for Azure CLI
//! - [`environment`] - Endpoint discovery from the metadata host
//! - [`http`] - Shared request pipeline and ARM error decoding
//! - [`keyvault_data`] - Key Vault secrets and keys
//! - [`list`] - Paginated listings

pub mod arm;
pub mod auth;
pub mod cli;
pub mod environment;
pub mod http;
pub mod keyvault_data;
pub mod list;

// Re-export public types and functions
pub use arm::ArmClient;
pub use auth::{AzureCliToken, ClientSecretToken, StaticToken, TokenSource};
pub use cli::run;
pub use environment::Environment;
pub use keyvault_data::KeyVaultDataClient;
pub use list::{list_all, list_resources_by_type, GenericResource};
