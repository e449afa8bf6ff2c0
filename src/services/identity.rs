use crate::constants::reference;
use chrono::{Datelike, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Web,
    Mobile,
    Agent,
}

impl ChannelType {
    pub const ALL: [ChannelType; 3] = [ChannelType::Web, ChannelType::Mobile, ChannelType::Agent];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Web => "web",
            ChannelType::Mobile => "mobile",
            ChannelType::Agent => "agent",
        }
    }

    pub fn parse(raw: &str) -> Option<ChannelType> {
        match raw.trim().to_lowercase().as_str() {
            "web" => Some(ChannelType::Web),
            "mobile" => Some(ChannelType::Mobile),
            "agent" => Some(ChannelType::Agent),
            _ => None,
        }
    }
}

/// Ambient session state. Replaced wholesale on channel switch, never
/// persisted past the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub channel: ChannelType,
    pub reference_id: String,
    pub timestamp: String,
    pub agent_id: String,
    pub device_fingerprint: Map<String, Value>,
}

pub trait IdentityProvider: Send + Sync {
    fn identity(&self, channel: ChannelType) -> SessionIdentity;
}

/// Fixture identities with one hardcoded device fingerprint per channel.
pub struct StubIdentityProvider;

impl IdentityProvider for StubIdentityProvider {
    fn identity(&self, channel: ChannelType) -> SessionIdentity {
        let (agent_id, device_fingerprint) = match channel {
            ChannelType::Web => (
                "SBX01WEB524833871",
                serde_json::json!({
                    "MAC": "04-D9-C8-64-5E-3F",
                    "IP": "122.160.88.102",
                }),
            ),
            ChannelType::Mobile => (
                "SBX01MOB521569135",
                serde_json::json!({
                    "APP": "Sandbox",
                    "OS": "Android",
                    "IP": "122.15.121.179",
                    "IMEI": "332264829646596",
                }),
            ),
            ChannelType::Agent => (
                "SBX01AGT515743404",
                serde_json::json!({
                    "TERMINAL_ID": "212122",
                    "MOBILE": "9120226043",
                    "GEOCODE": "12.9667,77.5667",
                    "POSTAL_CODE": "221303",
                }),
            ),
        };
        let device_fingerprint = match device_fingerprint {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        SessionIdentity {
            channel,
            reference_id: payload_reference_id(),
            timestamp: chrono::Local::now().to_rfc3339(),
            agent_id: agent_id.to_string(),
            device_fingerprint,
        }
    }
}

/// 27 random uppercase alphanumerics, the Julian date (last year digit plus
/// zero-padded day of year) and HHMM, truncated to 35 characters.
pub fn generate_reference_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(reference::MAX_LENGTH);
    for _ in 0..reference::RANDOM_LENGTH {
        let index = rng.gen_range(0..reference::ALPHANUMERIC.len());
        id.push(reference::ALPHANUMERIC[index] as char);
    }
    let now = chrono::Local::now();
    let year_digit = now.year() % 10;
    id.push_str(&format!("{}{:03}", year_digit, now.ordinal()));
    id.push_str(&format!("{:02}{:02}", now.hour(), now.minute()));
    id.truncate(reference::MAX_LENGTH);
    id
}

/// Payload form of the reference id: fixed prefix plus characters 3..35 of a
/// freshly generated id.
pub fn payload_reference_id() -> String {
    let generated = generate_reference_id();
    let tail: String = generated
        .chars()
        .skip(reference::PAYLOAD_PREFIX.len())
        .take(reference::MAX_LENGTH - reference::PAYLOAD_PREFIX.len())
        .collect();
    format!("{}{}", reference::PAYLOAD_PREFIX, tail)
}
