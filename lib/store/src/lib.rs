pub mod doc;

pub use doc::{DocStore, kv_err};
