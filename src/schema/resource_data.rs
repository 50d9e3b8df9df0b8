use crate::error::Result;
use crate::timeouts::{OperationContext, Timeouts};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Attribute values of one resource instance during a CRUD call.
///
/// `attributes` holds the configuration merged over the prior state; `prior`
/// is the state before the call (absent for new resources) and drives
/// [`ResourceData::has_change`]. Clearing the id marks the resource as gone.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
    prior: Option<Map<String, Value>>,
    new_resource: bool,
    timeouts: Timeouts,
}

impl ResourceData {
    /// A resource about to be created from `config`.
    pub fn new(config: Map<String, Value>) -> Self {
        ResourceData {
            id: String::new(),
            attributes: config,
            prior: None,
            new_resource: true,
            timeouts: Timeouts::default(),
        }
    }

    /// An existing resource; `config` is applied over `state`.
    pub fn from_state(id: impl Into<String>, state: Map<String, Value>, config: Map<String, Value>) -> Self {
        let mut attributes = state.clone();
        for (key, value) in config {
            attributes.insert(key, value);
        }
        ResourceData {
            id: id.into(),
            attributes,
            prior: Some(state),
            new_resource: false,
            timeouts: Timeouts::default(),
        }
    }

    /// Only the id is known, as for import.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self::from_state(id, Map::new(), Map::new())
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_new_resource(&self) -> bool {
        self.new_resource
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn create_context(&self) -> OperationContext {
        OperationContext::for_create(&self.timeouts)
    }

    pub fn read_context(&self) -> OperationContext {
        OperationContext::for_read(&self.timeouts)
    }

    pub fn update_context(&self) -> OperationContext {
        OperationContext::for_update(&self.timeouts)
    }

    pub fn delete_context(&self) -> OperationContext {
        OperationContext::for_delete(&self.timeouts)
    }

    pub fn create_update_context(&self) -> OperationContext {
        OperationContext::for_create_update(&self.timeouts, self.new_resource)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    /// The value when it is set to something other than its zero value.
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !is_zero(v))
    }

    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or_default()
    }

    pub fn get_list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_strings(&self, key: &str) -> Vec<String> {
        self.get_list(key)
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn has_change(&self, key: &str) -> bool {
        match &self.prior {
            None => self.get_ok(key).is_some(),
            Some(prior) => {
                let old = prior.get(key).filter(|v| !v.is_null());
                old != self.get(key)
            }
        }
    }

    pub fn has_changes(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has_change(k))
    }

    /// Previous value of `key` and its value now.
    pub fn get_change(&self, key: &str) -> (Option<&Value>, Option<&Value>) {
        let old = self
            .prior
            .as_ref()
            .and_then(|p| p.get(key))
            .filter(|v| !v.is_null());
        (old, self.get(key))
    }

    /// Decode all attributes into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let value = Value::Object(self.attributes.clone());
        Ok(serde_path_to_error::deserialize(value)?)
    }

    /// Merge the fields of a typed model into the attributes.
    pub fn encode<T: Serialize>(&mut self, model: &T) -> Result<()> {
        if let Value::Object(fields) = serde_json::to_value(model)? {
            for (key, value) in fields {
                self.attributes.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Resulting state, or `None` once the id has been cleared.
    pub fn state(&self) -> Option<Map<String, Value>> {
        if self.id.is_empty() {
            return None;
        }
        let mut state = self.attributes.clone();
        state.insert("id".to_string(), Value::String(self.id.clone()));
        Some(state)
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_getters_default_to_zero() {
        let d = ResourceData::new(map(json!({"name": "a", "count": 3, "on": true, "list": ["x"]})));
        assert_eq!(d.get_str("name"), "a");
        assert_eq!(d.get_str("missing"), "");
        assert_eq!(d.get_i64("count"), 3);
        assert!(d.get_bool("on"));
        assert_eq!(d.get_strings("list"), vec!["x"]);
        assert!(d.get_list("missing").is_empty());
        assert!(d.is_new_resource());
    }

    #[test]
    fn test_has_change() {
        let d = ResourceData::from_state(
            "id1",
            map(json!({"value": "old", "tags": {"a": "b"}})),
            map(json!({"value": "new", "tags": {"a": "b"}})),
        );
        assert!(d.has_change("value"));
        assert!(!d.has_change("tags"));
        assert!(d.has_changes(&["tags", "value"]));
        assert_eq!(d.get_change("value"), (Some(&json!("old")), Some(&json!("new"))));
    }

    #[test]
    fn test_decode_reports_path() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Model {
            name: String,
            count: i64,
        }
        let d = ResourceData::new(map(json!({"name": "a", "count": "three"})));
        let err = d.decode::<Model>().unwrap_err().to_string();
        assert!(err.contains("count"), "{err}");
    }

    #[test]
    fn test_state_cleared_without_id() {
        let mut d = ResourceData::from_id("abc");
        d.set("name", "x");
        assert_eq!(d.state().unwrap().get("id"), Some(&json!("abc")));
        d.set_id("");
        assert!(d.state().is_none());
    }
}
