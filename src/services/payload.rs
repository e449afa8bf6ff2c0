use crate::catalog::{EndpointDescriptor, ParamType};
use crate::errors::SandboxError;
use crate::services::identity::SessionIdentity;
use crate::utils::data_path::{get_path, set_path};
use serde_json::{Map, Value};

/// Which side of the dual representation an edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    Form,
    Text,
}

impl EditOrigin {
    fn opposite(self) -> EditOrigin {
        match self {
            EditOrigin::Form => EditOrigin::Text,
            EditOrigin::Text => EditOrigin::Form,
        }
    }
}

/// One authoritative nested value tree per selected endpoint, kept in sync
/// with its JSON-text view in both directions.
///
/// Synchronization policy: a structured edit always regenerates the text; a
/// text edit that fails to parse leaves the tree untouched (the text buffer
/// keeps the user's input). While a sync from one origin is in flight, edits
/// arriving from the opposite origin are dropped rather than applied, so the
/// two views can never feed each other in a loop.
pub struct PayloadEditor {
    tree: Value,
    text: String,
    in_flight: Option<EditOrigin>,
}

impl PayloadEditor {
    /// Default tree for an endpoint: a deep copy of `default_payload`,
    /// then every declared parameter seeded with its own default, an empty
    /// mapping for object params, or an empty string. Nothing in the result
    /// shares structure with the catalog.
    pub fn initialize(endpoint: &EndpointDescriptor) -> Self {
        let mut tree = Value::Object(endpoint.default_payload.clone());
        if let Value::Object(map) = &mut tree {
            for param in &endpoint.parameters {
                if map.contains_key(&param.name) {
                    continue;
                }
                let seeded = match (&param.default_value, param.param_type) {
                    (Some(default), _) => default.clone(),
                    (None, ParamType::Object) => Value::Object(Map::new()),
                    (None, _) => Value::String(String::new()),
                };
                map.insert(param.name.clone(), seeded);
            }
        }
        let text = to_json_text(&tree);
        Self {
            tree,
            text,
            in_flight: None,
        }
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        get_path(&self.tree, path)
    }

    /// Marks a sync from `origin` as in flight. Returns false (and leaves
    /// the editor unchanged) when the opposite origin is already syncing.
    pub fn begin_sync(&mut self, origin: EditOrigin) -> bool {
        match self.in_flight {
            Some(active) if active == origin.opposite() => false,
            _ => {
                self.in_flight = Some(origin);
                true
            }
        }
    }

    pub fn finish_sync(&mut self) {
        self.in_flight = None;
    }

    /// Structured field edit. Returns Ok(false) when the edit was dropped by
    /// the single-flight guard, Ok(true) when the tree and text were updated.
    pub fn apply_form_edit(&mut self, path: &[&str], value: Value) -> Result<bool, SandboxError> {
        if self.in_flight == Some(EditOrigin::Text) {
            return Ok(false);
        }
        self.tree = set_path(&self.tree, path, value)?;
        self.regenerate_text();
        Ok(true)
    }

    /// Free-text edit. The text buffer always takes the input; the tree is
    /// only replaced when the input parses. A parse failure retains the
    /// previous tree and surfaces the underlying message.
    pub fn apply_text_edit(&mut self, text: &str) -> Result<bool, SandboxError> {
        if self.in_flight == Some(EditOrigin::Form) {
            return Ok(false);
        }
        self.text = text.to_string();
        self.tree = from_json_text(text)?;
        Ok(true)
    }

    /// Overlays the session identity fields at the front of the payload,
    /// leaving every other entry (and its relative order) untouched.
    pub fn apply_identity(&mut self, identity: &SessionIdentity) {
        let existing = match &self.tree {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let mut merged = Map::new();
        merged.insert(
            "refId".to_string(),
            Value::String(identity.reference_id.clone()),
        );
        merged.insert(
            "timeStamp".to_string(),
            Value::String(identity.timestamp.clone()),
        );
        merged.insert(
            "agentId".to_string(),
            Value::String(identity.agent_id.clone()),
        );
        merged.insert(
            "deviceDetails".to_string(),
            Value::Object(identity.device_fingerprint.clone()),
        );
        for (key, value) in existing {
            if !merged.contains_key(&key) {
                merged.insert(key, value);
            }
        }
        self.tree = Value::Object(merged);
        self.regenerate_text();
    }

    fn regenerate_text(&mut self) {
        self.text = to_json_text(&self.tree);
    }
}

/// Canonical pretty serialization: 2-space indentation, insertion key order.
pub fn to_json_text(tree: &Value) -> String {
    serde_json::to_string_pretty(tree).unwrap_or_else(|_| "{}".to_string())
}

/// Parses text into an authoritative tree. Blank input means an empty
/// mapping; anything that is not a JSON object is rejected.
pub fn from_json_text(text: &str) -> Result<Value, SandboxError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let parsed: Value = serde_json::from_str(trimmed)
        .map_err(|err| SandboxError::parse(err.to_string()))?;
    if !parsed.is_object() {
        return Err(SandboxError::parse("Payload must be a JSON object"));
    }
    Ok(parsed)
}
