pub mod access;
pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use access::{Access, AccessLevel, AllowAll, DenyAll};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use module::Module;
pub use types::{ListParams, ListResult, merge_patch, new_id, now_rfc3339};
