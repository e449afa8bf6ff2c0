pub mod identity;
pub mod logger;
pub mod payload;
pub mod token_store;
