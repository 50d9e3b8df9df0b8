//! Attributes shared by most resources.

use super::validate;
use super::{Attribute, ValueType};
use crate::models::validate_tags;

pub fn location() -> Attribute {
    Attribute::required(ValueType::String)
        .force_new()
        .validate(validate::string_is_not_empty)
}

pub fn location_computed() -> Attribute {
    Attribute::computed(ValueType::String)
}

pub fn resource_group_name() -> Attribute {
    Attribute::required(ValueType::String)
        .force_new()
        .validate(validate::resource_group_name)
}

/// Lookup key of a data source.
pub fn resource_group_name_for_data_source() -> Attribute {
    Attribute::required(ValueType::String).validate(validate::resource_group_name)
}

pub fn tags() -> Attribute {
    Attribute::optional(ValueType::Map)
        .elem(Attribute::optional(ValueType::String))
        .validate(validate_tags)
}

pub fn tags_computed() -> Attribute {
    Attribute::computed(ValueType::Map).elem(Attribute::computed(ValueType::String))
}

pub fn computed_string() -> Attribute {
    Attribute::computed(ValueType::String)
}

pub fn computed_bool() -> Attribute {
    Attribute::computed(ValueType::Bool)
}

pub fn computed_int() -> Attribute {
    Attribute::computed(ValueType::Int)
}

pub fn computed_strings() -> Attribute {
    Attribute::computed(ValueType::List).elem(Attribute::computed(ValueType::String))
}

pub fn optional_strings() -> Attribute {
    Attribute::optional(ValueType::List).elem(Attribute::optional(ValueType::String))
}
