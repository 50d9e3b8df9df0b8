//! Resource and data source registry plus the CRUD entrypoints.
//!
//! Every entrypoint validates the attributes against the handler's schema,
//! fills in defaults, and turns the `timeouts` block into the deadline of the
//! operation before calling the handler. Results are returned as state maps;
//! `None` means the remote object is gone.

use crate::clients::Client;
use crate::error::{Error, Result};
use crate::schema::{DataSource, Resource, ResourceData, Schema};
use crate::services::{supported_services, ServiceRegistration};
use crate::timeouts::Timeouts;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type State = Map<String, Value>;

pub struct Provider {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
}

impl Provider {
    /// Provider with every built-in service registered.
    pub fn new() -> Result<Self> {
        Self::from_services(supported_services())
    }

    pub fn from_services(services: Vec<Box<dyn ServiceRegistration>>) -> Result<Self> {
        let mut resources = BTreeMap::new();
        let mut data_sources = BTreeMap::new();

        for service in services {
            log::debug!("[DEBUG] Registering Resources for {:?}..", service.name());
            for resource in service.supported_resources() {
                let name = resource.resource_type();
                if resources.insert(name, resource).is_some() {
                    return Err(Error::Config(format!(
                        "an existing Resource exists for {name:?} (service {:?})",
                        service.name()
                    )));
                }
            }

            log::debug!("[DEBUG] Registering Data Sources for {:?}..", service.name());
            for data_source in service.supported_data_sources() {
                let name = data_source.resource_type();
                if data_sources.insert(name, data_source).is_some() {
                    return Err(Error::Config(format!(
                        "an existing Data Source exists for {name:?} (service {:?})",
                        service.name()
                    )));
                }
            }
        }

        Ok(Provider {
            resources,
            data_sources,
        })
    }

    pub fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| Error::Validation(format!("unsupported resource type {resource_type:?}")))
    }

    pub fn data_source(&self, resource_type: &str) -> Result<&Arc<dyn DataSource>> {
        self.data_sources
            .get(resource_type)
            .ok_or_else(|| Error::Validation(format!("unsupported data source type {resource_type:?}")))
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    /// Every registered schema, keyed by type name.
    pub fn schemas(&self) -> Result<Value> {
        let mut resources = Map::new();
        for (name, resource) in &self.resources {
            resources.insert(name.to_string(), serde_json::to_value(resource.schema())?);
        }
        let mut data_sources = Map::new();
        for (name, data_source) in &self.data_sources {
            data_sources.insert(name.to_string(), serde_json::to_value(data_source.schema())?);
        }
        Ok(json!({
            "resources": resources,
            "data_sources": data_sources,
        }))
    }

    pub async fn create(&self, client: &Client, resource_type: &str, config: State) -> Result<Option<State>> {
        let resource = self.resource(resource_type)?;
        let (config, timeouts) = prepare(&resource.schema(), resource.timeouts(), config)?;

        let mut d = ResourceData::new(config).with_timeouts(timeouts);
        resource.create(client, &mut d).await?;
        Ok(d.state())
    }

    pub async fn read(&self, client: &Client, resource_type: &str, id: &str, state: State) -> Result<Option<State>> {
        let resource = self.resource(resource_type)?;
        let (state, timeouts) = split_timeouts(resource.timeouts(), state)?;

        let mut d = ResourceData::from_state(id, state, Map::new()).with_timeouts(timeouts);
        resource.read(client, &mut d).await?;
        Ok(d.state())
    }

    pub async fn update(
        &self,
        client: &Client,
        resource_type: &str,
        id: &str,
        state: State,
        config: State,
    ) -> Result<Option<State>> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();
        let (config, timeouts) = prepare(&schema, resource.timeouts(), config)?;

        let changed_force_new: Vec<&str> = schema
            .attributes
            .iter()
            .filter(|(_, attribute)| attribute.force_new)
            .map(|(name, _)| *name)
            .filter(|name| {
                let old = state.get(*name).filter(|v| !v.is_null());
                let new = config.get(*name).filter(|v| !v.is_null());
                new.is_some() && old.is_some() && old != new
            })
            .collect();
        if !changed_force_new.is_empty() {
            return Err(Error::Validation(format!(
                "{resource_type}: changing {changed_force_new:?} requires replacing the resource"
            )));
        }

        let mut d = ResourceData::from_state(id, state, config).with_timeouts(timeouts);
        resource.update(client, &mut d).await?;
        Ok(d.state())
    }

    pub async fn delete(&self, client: &Client, resource_type: &str, id: &str, state: State) -> Result<()> {
        let resource = self.resource(resource_type)?;
        let (state, timeouts) = split_timeouts(resource.timeouts(), state)?;

        let mut d = ResourceData::from_state(id, state, Map::new()).with_timeouts(timeouts);
        resource.delete(client, &mut d).await
    }

    /// Import `id` and read it into a fresh state.
    pub async fn import(&self, client: &Client, resource_type: &str, id: &str) -> Result<State> {
        let resource = self.resource(resource_type)?;
        resource.validate_import_id(id)?;

        let mut d = ResourceData::from_id(id).with_timeouts(resource.timeouts());
        resource.import(client, &mut d).await?;
        resource.read(client, &mut d).await?;
        d.state().ok_or_else(|| {
            Error::Validation(format!(
                "Cannot import non-existent remote object {id:?} ({resource_type})"
            ))
        })
    }

    pub async fn read_data_source(&self, client: &Client, resource_type: &str, config: State) -> Result<State> {
        let data_source = self.data_source(resource_type)?;
        let (config, timeouts) = prepare(&data_source.schema(), data_source.timeouts(), config)?;

        let mut d = ResourceData::new(config).with_timeouts(timeouts);
        data_source.read(client, &mut d).await?;
        d.state()
            .ok_or_else(|| Error::Validation(format!("{resource_type}: data source did not set an id")))
    }
}

/// Validate, apply defaults and split off the `timeouts` block.
fn prepare(schema: &Schema, defaults: Timeouts, mut attributes: State) -> Result<(State, Timeouts)> {
    schema.validate(&attributes)?;
    schema.apply_defaults(&mut attributes);
    split_timeouts(defaults, attributes)
}

fn split_timeouts(defaults: Timeouts, mut attributes: State) -> Result<(State, Timeouts)> {
    attributes.remove("id");
    let block = attributes.remove("timeouts");
    let timeouts = defaults.with_overrides(block.as_ref())?;
    Ok((attributes, timeouts))
}
