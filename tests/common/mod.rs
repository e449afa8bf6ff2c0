use once_cell::sync::Lazy;
use tokio::sync::Mutex;

/// Serializes tests that mutate process environment variables.
pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
