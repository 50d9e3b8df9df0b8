//! Attribute model and the handler traits every resource implements.
//!
//! - [`attribute`] - [`Schema`]/[`Attribute`] declarations and config validation
//! - [`common`] - `location`, `resource_group_name` and `tags` attributes
//! - [`resource_data`] - [`ResourceData`], the attribute values of one instance
//! - [`validate`] - reusable attribute validators

mod attribute;
pub mod common;
mod resource_data;
pub mod validate;

pub use attribute::{Attribute, Elem, Schema, ValidateFn, ValueType};
pub use resource_data::ResourceData;

use crate::clients::Client;
use crate::error::Result;
use crate::timeouts::Timeouts;
use async_trait::async_trait;

/// A managed resource: schema plus CRUD handlers.
#[async_trait]
pub trait Resource: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    async fn create(&self, client: &Client, d: &mut ResourceData) -> Result<()>;

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()>;

    async fn update(&self, client: &Client, d: &mut ResourceData) -> Result<()>;

    async fn delete(&self, client: &Client, d: &mut ResourceData) -> Result<()>;

    /// Reject ids this resource cannot import. Passthrough by default.
    fn validate_import_id(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    /// Prepare `d` for the read that follows an import.
    async fn import(&self, _client: &Client, d: &mut ResourceData) -> Result<()> {
        self.validate_import_id(d.id())
    }
}

/// A read-only lookup of an existing object.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    async fn read(&self, client: &Client, d: &mut ResourceData) -> Result<()>;
}
