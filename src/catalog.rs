use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
}

impl ParamType {
    /// Tag for a live value, decided once when the value enters the tree.
    pub fn of(value: &Value) -> ParamType {
        match value {
            Value::Object(_) => ParamType::Object,
            Value::Number(_) => ParamType::Number,
            Value::Bool(_) => ParamType::Boolean,
            _ => ParamType::String,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        *self == ParamType::of(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Path,
    Body,
    Header,
}

impl Default for ParamLocation {
    fn default() -> Self {
        ParamLocation::Body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Fetch,
    Payment,
    Validate,
    Other,
}

impl Default for EndpointKind {
    fn default() -> Self {
        EndpointKind::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }

    pub fn has_body(&self) -> bool {
        !matches!(self, Method::GET)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub location: ParamLocation,
    #[serde(default = "default_editable")]
    pub editable: bool,
}

fn default_editable() -> bool {
    true
}

impl ParameterDescriptor {
    /// Child descriptors for an object-typed parameter, derived from the
    /// shape of its default value. One level per call; callers recurse.
    pub fn children(&self) -> Vec<ParameterDescriptor> {
        let Some(Value::Object(map)) = self.default_value.as_ref() else {
            return Vec::new();
        };
        map.iter()
            .map(|(name, value)| ParameterDescriptor {
                name: name.clone(),
                param_type: ParamType::of(value),
                required: false,
                description: format!("{} (nested under {})", name, self.name),
                default_value: Some(value.clone()),
                location: ParamLocation::Body,
                editable: true,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub method: Method,
    pub url: String,
    #[serde(default)]
    pub kind: EndpointKind,
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default)]
    pub default_payload: Map<String, Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

static ENDPOINT_CATALOG: Lazy<Vec<EndpointDescriptor>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/catalog.json"));
    serde_json::from_str(raw).expect("catalog.json must be valid JSON")
});

static ENDPOINT_MAP: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    ENDPOINT_CATALOG
        .iter()
        .enumerate()
        .map(|(index, endpoint)| (endpoint.id.clone(), index))
        .collect()
});

pub fn endpoint_catalog() -> &'static [EndpointDescriptor] {
    &ENDPOINT_CATALOG
}

pub fn endpoint_by_id(id: &str) -> Option<&'static EndpointDescriptor> {
    ENDPOINT_MAP.get(id).map(|index| &ENDPOINT_CATALOG[*index])
}
