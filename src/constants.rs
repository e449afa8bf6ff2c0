pub mod network {
    pub const TIMEOUT_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_TOKEN_MS: u64 = 15_000;
    pub const TOKEN_ENDPOINT: &str = "https://auth.example.test/v1/auth/token";
}

pub mod url_template {
    pub const CHANNEL_PLACEHOLDER: &str = "{channel}";
}

pub mod reference {
    pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    pub const RANDOM_LENGTH: usize = 27;
    pub const MAX_LENGTH: usize = 35;
    pub const PAYLOAD_PREFIX: &str = "PLU";
}
