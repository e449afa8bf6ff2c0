mod sandbox_error;

pub use sandbox_error::{SandboxError, SandboxErrorKind};
