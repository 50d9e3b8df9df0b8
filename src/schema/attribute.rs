use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Validation hook: value and attribute path in, message out.
pub type ValidateFn = Arc<dyn Fn(&Value, &str) -> std::result::Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Bool,
    Int,
    List,
    Set,
    Map,
}

impl ValueType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Bool => value.is_boolean(),
            ValueType::Int => value.is_i64() || value.is_u64(),
            ValueType::List | ValueType::Set => value.is_array(),
            ValueType::Map => value.is_object(),
        }
    }
}

/// Element of a list, set or map attribute.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Elem {
    Attribute(Box<Attribute>),
    Block(Schema),
}

#[derive(Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub computed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Elem>,
    #[serde(skip)]
    pub validate: Option<ValidateFn>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("value_type", &self.value_type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("elem", &self.elem)
            .finish_non_exhaustive()
    }
}

impl Attribute {
    fn with_type(value_type: ValueType) -> Self {
        Attribute {
            value_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            max_items: None,
            min_items: None,
            elem: None,
            validate: None,
        }
    }

    pub fn required(value_type: ValueType) -> Self {
        Attribute {
            required: true,
            ..Self::with_type(value_type)
        }
    }

    pub fn optional(value_type: ValueType) -> Self {
        Attribute {
            optional: true,
            ..Self::with_type(value_type)
        }
    }

    pub fn computed(value_type: ValueType) -> Self {
        Attribute {
            computed: true,
            ..Self::with_type(value_type)
        }
    }

    /// Optional and computed: the API fills it in when not configured.
    pub fn optional_computed(value_type: ValueType) -> Self {
        Attribute {
            optional: true,
            computed: true,
            ..Self::with_type(value_type)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    /// Primitive elements of a list/set/map.
    pub fn elem(mut self, elem: Attribute) -> Self {
        self.elem = Some(Elem::Attribute(Box::new(elem)));
        self
    }

    /// Nested block elements.
    pub fn block(mut self, schema: Schema) -> Self {
        self.elem = Some(Elem::Block(schema));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &str) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    fn check(&self, path: &str, value: &Value, errors: &mut Vec<String>) {
        if value.is_null() {
            return;
        }
        if !self.value_type.matches(value) {
            errors.push(format!("{path}: expected type {:?}, got {value}", self.value_type));
            return;
        }
        if let Some(validate) = &self.validate {
            if let Err(message) = validate(value, path) {
                errors.push(message);
            }
        }
        if let Value::Array(items) = value {
            if let Some(max) = self.max_items {
                if items.len() > max {
                    errors.push(format!(
                        "{path}: attribute supports {max} item(s) maximum, config has {}",
                        items.len()
                    ));
                }
            }
            if let Some(min) = self.min_items {
                if items.len() < min {
                    errors.push(format!(
                        "{path}: attribute supports {min} item(s) minimum, config has {}",
                        items.len()
                    ));
                }
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}.{i}");
                match &self.elem {
                    Some(Elem::Block(schema)) => match item {
                        Value::Object(map) => schema.collect_errors(&format!("{item_path}."), map, errors),
                        _ => errors.push(format!("{item_path}: expected a block")),
                    },
                    Some(Elem::Attribute(elem)) => elem.check(&item_path, item, errors),
                    None => {}
                }
            }
            return;
        }
        if let (Value::Object(map), Some(Elem::Attribute(elem))) = (value, &self.elem) {
            for (key, item) in map {
                elem.check(&format!("{path}.{key}"), item, errors);
            }
        }
    }
}

/// Attribute declarations of one resource, data source or nested block.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    pub attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Check configured attributes, collecting every problem into one error.
    pub fn validate(&self, attributes: &Map<String, Value>) -> Result<()> {
        let mut errors = Vec::new();
        self.collect_errors("", attributes, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }

    fn collect_errors(&self, prefix: &str, attributes: &Map<String, Value>, errors: &mut Vec<String>) {
        for (key, value) in attributes {
            if prefix.is_empty() && (key == "id" || key == "timeouts") {
                continue;
            }
            match self.attributes.get(key.as_str()) {
                Some(attribute) => attribute.check(&format!("{prefix}{key}"), value, errors),
                None => errors.push(format!("{prefix}{key}: An argument named {key:?} is not expected here")),
            }
        }
        for (key, attribute) in &self.attributes {
            if attribute.required && attributes.get(*key).map_or(true, Value::is_null) {
                errors.push(format!("{prefix}{key}: The argument {key:?} is required, but no definition was found"));
            }
        }
    }

    /// Default values for unset optional attributes, top level only.
    pub fn apply_defaults(&self, attributes: &mut Map<String, Value>) {
        for (key, attribute) in &self.attributes {
            if let Some(default) = &attribute.default {
                if attributes.get(*key).map_or(true, Value::is_null) {
                    attributes.insert(key.to_string(), default.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .attr("name", Attribute::required(ValueType::String).force_new())
            .attr("enabled", Attribute::optional(ValueType::Bool).default(true))
            .attr(
                "tags",
                Attribute::optional(ValueType::Map).elem(Attribute::optional(ValueType::String)),
            )
            .attr(
                "bgp_settings",
                Attribute::optional(ValueType::List).max_items(1).block(
                    Schema::new().attr("asn", Attribute::required(ValueType::Int).validate(|v, path| {
                        match v.as_i64() {
                            Some(n) if n > 0 => Ok(()),
                            _ => Err(format!("{path} must be positive")),
                        }
                    })),
                ),
            )
    }

    #[test]
    fn test_valid_config() {
        let config = json!({"name": "a", "tags": {"env": "test"}, "bgp_settings": [{"asn": 65000}]});
        assert!(schema().validate(config.as_object().unwrap()).is_ok());
    }

    #[test]
    fn test_errors_are_collected() {
        let config = json!({"unknown": 1, "enabled": "yes", "bgp_settings": [{"asn": -1}, {"asn": 2}]});
        let err = schema().validate(config.as_object().unwrap()).unwrap_err().to_string();
        assert!(err.contains("unknown: An argument named"), "{err}");
        assert!(err.contains("enabled: expected type Bool"), "{err}");
        assert!(err.contains("1 item(s) maximum"), "{err}");
        assert!(err.contains("bgp_settings.0.asn must be positive"), "{err}");
        assert!(err.contains("name: The argument \"name\" is required"), "{err}");
    }

    #[test]
    fn test_defaults() {
        let mut config = json!({"name": "a"}).as_object().unwrap().clone();
        schema().apply_defaults(&mut config);
        assert_eq!(config.get("enabled"), Some(&json!(true)));
    }

    #[test]
    fn test_schema_serializes() {
        let value = serde_json::to_value(schema()).unwrap();
        assert_eq!(value["name"]["type"], json!("string"));
        assert_eq!(value["name"]["force_new"], json!(true));
        assert_eq!(value["bgp_settings"]["elem"]["block"]["asn"]["required"], json!(true));
    }

    #[test]
    fn test_list_attribute_validator_runs() {
        let schema = Schema::new().attr(
            "address_space",
            Attribute::required(ValueType::List)
                .elem(Attribute::optional(ValueType::String))
                .validate(|v, path| match v.as_array() {
                    Some(items) if items.is_empty() => Err(format!("{path} must not be empty")),
                    _ => Ok(()),
                }),
        );
        let err = schema
            .validate(json!({"address_space": []}).as_object().unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("address_space must not be empty"), "{err}");
        assert!(schema
            .validate(json!({"address_space": ["10.0.0.0/16"]}).as_object().unwrap())
            .is_ok());
    }
}
