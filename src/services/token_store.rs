use crate::constants::network;
use crate::errors::SandboxError;
use crate::services::identity::ChannelType;
use crate::services::logger::Logger;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Bearer tokens keyed by initiating channel. Written by the bootstrap flow,
/// read by the request builder.
pub struct TokenStore {
    tokens: Mutex<HashMap<ChannelType, String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, channel: ChannelType, token: String) {
        if let Ok(mut guard) = self.tokens.lock() {
            guard.insert(channel, token);
        }
    }

    pub fn get(&self, channel: ChannelType) -> Option<String> {
        let guard = self.tokens.lock().ok()?;
        guard.get(&channel).cloned()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ChannelCredentials {
    pub channel: ChannelType,
    pub client_key: String,
    pub client_secret: String,
    pub scopes: String,
}

const SHARED_SCOPES: &str = "read_bills read_plans read_regions bill_validate \
read_operators read_transactions read_billers create_transactions";

/// The three fixed credential sets exchanged for bearer tokens at startup.
pub fn default_credentials() -> Vec<ChannelCredentials> {
    let channel_scopes = |suffix: &str| format!("{} get_bill_{} pay_bill_{}", SHARED_SCOPES, suffix, suffix);
    vec![
        ChannelCredentials {
            channel: ChannelType::Web,
            client_key: "9f2c41d0-5a17-4e88-9b3c-0d61f2a84c10".to_string(),
            client_secret: "sandbox-web-secret".to_string(),
            scopes: channel_scopes("web"),
        },
        ChannelCredentials {
            channel: ChannelType::Mobile,
            client_key: "4b7e8a92-1c3d-4f56-8a09-7e2b5c4d1e33".to_string(),
            client_secret: "sandbox-mobile-secret".to_string(),
            scopes: channel_scopes("mobile"),
        },
        ChannelCredentials {
            channel: ChannelType::Agent,
            client_key: "d1a6f3b8-9e24-47c1-b5d0-3f8a6c2e9b57".to_string(),
            client_secret: "sandbox-agent-secret".to_string(),
            scopes: channel_scopes("agent"),
        },
    ]
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn acquire(&self, credentials: &ChannelCredentials) -> Result<String, SandboxError>;
}

/// Exchanges client credentials for a bearer token against the auth endpoint.
pub struct TokenClient {
    logger: Logger,
    client: reqwest::Client,
    auth_url: String,
}

impl TokenClient {
    pub fn new(logger: Logger) -> Result<Self, SandboxError> {
        let auth_url = std::env::var("SANDBOX_AUTH_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| network::TOKEN_ENDPOINT.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(network::TIMEOUT_TOKEN_MS))
            .build()
            .map_err(|err| SandboxError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger,
            client,
            auth_url,
        })
    }
}

#[async_trait]
impl TokenSource for TokenClient {
    async fn acquire(&self, credentials: &ChannelCredentials) -> Result<String, SandboxError> {
        let body = serde_json::json!({
            "clientKey": credentials.client_key,
            "clientSecret": credentials.client_secret,
            "scopes": credentials.scopes,
        });
        let response = self
            .client
            .post(&self.auth_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| SandboxError::internal(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SandboxError::internal(format!(
                "Token request failed ({})",
                status.as_u16()
            ))
            .with_details(serde_json::json!({
                "channel": credentials.channel.as_str(),
                "status": status.as_u16(),
            })));
        }
        let payload: Value = response
            .json()
            .await
            .map_err(|_| SandboxError::internal("Token response is not valid JSON"))?;
        let token = payload
            .get("access_token")
            .and_then(|value| value.as_str())
            .unwrap_or("")
            .to_string();
        if token.is_empty() {
            return Err(SandboxError::internal("Token response has no access_token"));
        }
        self.logger.debug(
            "Acquired bearer token",
            Some(&serde_json::json!({"channel": credentials.channel.as_str()})),
        );
        Ok(token)
    }
}

/// Startup token acquisition. Individual failures are logged and skipped so
/// that one unreachable channel never blocks the sandbox.
pub async fn bootstrap_tokens(
    source: &dyn TokenSource,
    store: &TokenStore,
    credentials: &[ChannelCredentials],
    logger: &Logger,
) {
    for entry in credentials {
        match source.acquire(entry).await {
            Ok(token) => store.set(entry.channel, token),
            Err(err) => logger.warn(
                "Token acquisition failed",
                Some(&serde_json::json!({
                    "channel": entry.channel.as_str(),
                    "error": err.message,
                })),
            ),
        }
    }
}
