//! Agora support libraries
//!
//! Re-exports the workspace crates under one name for applications that
//! want all of them.

pub use agora_cache as cache;
pub use agora_common as common;
pub use paginator;
pub use verify_code;

pub use agora_common::{AppEnv, AppSettings};
