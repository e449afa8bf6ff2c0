use crate::catalog::{EndpointDescriptor, EndpointKind, ParamLocation};
use crate::constants::{network, url_template};
use crate::errors::{SandboxError, SandboxErrorKind};
use crate::services::identity::{ChannelType, IdentityProvider, SessionIdentity};
use crate::services::logger::Logger;
use crate::services::token_store::TokenStore;
use crate::utils::data_path::get_path;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ServerError,
    TransportFailure,
    InvalidPayload,
}

/// Normalized result of one execution. Created once per request, immutable;
/// a status of 0 means the request never produced an HTTP response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    pub http_status: u16,
    pub status_text: String,
    pub body: Value,
    pub duration_ms: u64,
    pub timestamp_iso: String,
    pub kind: OutcomeKind,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// Fully-specified outbound request, ready to dispatch.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub url: String,
    pub method: reqwest::Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

pub struct SandboxManager {
    logger: Logger,
    token_store: Arc<TokenStore>,
    identity_provider: Arc<dyn IdentityProvider>,
    client: reqwest::Client,
    in_flight: AtomicBool,
}

impl SandboxManager {
    pub fn new(
        logger: Logger,
        token_store: Arc<TokenStore>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, SandboxError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(network::TIMEOUT_REQUEST_MS))
            .build()
            .map_err(|err| SandboxError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger,
            token_store,
            identity_provider,
            client,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn session(&self, channel: ChannelType) -> SessionIdentity {
        self.identity_provider.identity(channel)
    }

    /// Builds the outbound request from the endpoint descriptor, the current
    /// parameter tree and the ambient session state. No network I/O.
    pub fn plan_request(
        &self,
        endpoint: &EndpointDescriptor,
        tree: &Value,
        body_text: Option<&str>,
        identity: &SessionIdentity,
    ) -> Result<RequestPlan, SandboxError> {
        let mut url_text = endpoint.url.clone();
        if matches!(endpoint.kind, EndpointKind::Fetch | EndpointKind::Payment) {
            url_text = url_text.replace(
                url_template::CHANNEL_PLACEHOLDER,
                identity.channel.as_str(),
            );
        }

        // Each path parameter contributes its own current value, falling
        // back to its declared default when the value is empty or absent.
        for param in &endpoint.parameters {
            if param.location != ParamLocation::Path {
                continue;
            }
            let current = get_path(tree, &[param.name.as_str()])
                .map(stringify_param)
                .filter(|segment| !segment.is_empty());
            let segment = current.or_else(|| {
                param
                    .default_value
                    .as_ref()
                    .map(stringify_param)
                    .filter(|segment| !segment.is_empty())
            });
            if let Some(segment) = segment {
                url_text.push('/');
                url_text.push_str(&segment);
            }
        }

        let mut url = Url::parse(&url_text).map_err(|err| {
            SandboxError::invalid_params(format!("Endpoint URL is invalid: {}", err))
                .with_details(serde_json::json!({"url": url_text}))
        })?;

        // Query parameters in schema order; empty values are omitted.
        {
            let mut pairs = url.query_pairs_mut();
            for param in &endpoint.parameters {
                if param.location != ParamLocation::Query {
                    continue;
                }
                let Some(value) = get_path(tree, &[param.name.as_str()]) else {
                    continue;
                };
                let rendered = stringify_param(value);
                if rendered.is_empty() {
                    continue;
                }
                pairs.append_pair(&param.name, &rendered);
            }
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &endpoint.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                SandboxError::invalid_params(format!("Invalid header name: {}", name))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                SandboxError::invalid_params(format!("Invalid header value for {}", name))
            })?;
            headers.insert(header_name, header_value);
        }
        // Header parameters follow the endpoint's fixed headers, in schema
        // order; empty values are omitted like query parameters.
        for param in &endpoint.parameters {
            if param.location != ParamLocation::Header {
                continue;
            }
            let Some(value) = get_path(tree, &[param.name.as_str()]) else {
                continue;
            };
            let rendered = stringify_param(value);
            if rendered.is_empty() {
                continue;
            }
            let header_name = HeaderName::from_bytes(param.name.as_bytes()).map_err(|_| {
                SandboxError::invalid_params(format!("Invalid header name: {}", param.name))
            })?;
            let header_value = HeaderValue::from_str(&rendered).map_err(|_| {
                SandboxError::invalid_params(format!("Invalid header value for {}", param.name))
            })?;
            headers.insert(header_name, header_value);
        }
        if let Some(token) = self.token_store.get(identity.channel) {
            let bearer = format!("Bearer {}", token);
            let header_value = HeaderValue::from_str(&bearer)
                .map_err(|_| SandboxError::internal("Bearer token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, header_value);
        }

        let body = if endpoint.method.has_body() {
            let raw = body_text.unwrap_or("").trim();
            if raw.is_empty() {
                None
            } else {
                serde_json::from_str::<Value>(raw).map_err(|err| {
                    SandboxError::invalid_payload(format!("Payload is not valid JSON: {}", err))
                })?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(raw.to_string())
            }
        } else {
            None
        };

        Ok(RequestPlan {
            url: url.to_string(),
            method: endpoint.method.to_reqwest(),
            headers,
            body,
        })
    }

    /// Executes one request and normalizes every outcome path. The only
    /// errors that escape are a rejected re-entrant call and a malformed
    /// endpoint definition; everything else ends in a `RequestOutcome`.
    pub async fn execute(
        &self,
        endpoint: &EndpointDescriptor,
        tree: &Value,
        body_text: Option<&str>,
        identity: &SessionIdentity,
    ) -> Result<RequestOutcome, SandboxError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(SandboxError::busy("A request is already in flight"));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let started = Instant::now();
        let plan = match self.plan_request(endpoint, tree, body_text, identity) {
            Ok(plan) => plan,
            Err(err) if err.kind == SandboxErrorKind::InvalidPayload => {
                self.logger.warn(
                    "Payload rejected before send",
                    Some(&serde_json::json!({"endpoint": endpoint.id})),
                );
                return Ok(finish_outcome(
                    0,
                    err.message.clone(),
                    Value::Null,
                    OutcomeKind::InvalidPayload,
                    started,
                ));
            }
            Err(err) => return Err(err),
        };

        let mut request = self
            .client
            .request(plan.method.clone(), plan.url.clone())
            .headers(plan.headers);
        if let Some(body) = plan.body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                self.logger.warn(
                    "Transport failure",
                    Some(&serde_json::json!({"url": plan.url, "error": err.to_string()})),
                );
                return Ok(finish_outcome(
                    0,
                    err.to_string(),
                    Value::Null,
                    OutcomeKind::TransportFailure,
                    started,
                ));
            }
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let raw_body = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                return Ok(finish_outcome(
                    0,
                    err.to_string(),
                    Value::Null,
                    OutcomeKind::TransportFailure,
                    started,
                ));
            }
        };

        let body = if content_type.contains("application/json") {
            serde_json::from_str(&raw_body).unwrap_or(Value::String(raw_body))
        } else {
            Value::String(raw_body)
        };

        let kind = if status.is_success() {
            OutcomeKind::Success
        } else {
            OutcomeKind::ServerError
        };
        let outcome = finish_outcome(status.as_u16(), status_text, body, kind, started);
        self.logger.info(
            "Request completed",
            Some(&serde_json::json!({
                "endpoint": endpoint.id,
                "method": endpoint.method.as_str(),
                "status": outcome.http_status,
                "duration_ms": outcome.duration_ms,
            })),
        );
        Ok(outcome)
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn finish_outcome(
    http_status: u16,
    status_text: String,
    body: Value,
    kind: OutcomeKind,
    started: Instant,
) -> RequestOutcome {
    RequestOutcome {
        http_status,
        status_text,
        body,
        duration_ms: started.elapsed().as_millis() as u64,
        timestamp_iso: chrono::Utc::now().to_rfc3339(),
        kind,
    }
}

fn stringify_param(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(num) => num.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Best-effort human reason for a failed outcome: the first string-valued
/// leaf under `payload.errors[0].reason`, else the top-level `message`.
pub fn failure_reason(body: &Value) -> Option<String> {
    let reason = body
        .get("payload")
        .and_then(|payload| payload.get("errors"))
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.get("reason"));
    if let Some(reason) = reason {
        if let Some(text) = first_string_leaf(reason) {
            return Some(text.to_string());
        }
    }
    body.get("message")
        .and_then(|message| message.as_str())
        .map(|text| text.to_string())
}

fn first_string_leaf(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text),
        Value::Object(map) => map.values().find_map(first_string_leaf),
        Value::Array(items) => items.iter().find_map(first_string_leaf),
        _ => None,
    }
}
