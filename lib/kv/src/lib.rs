pub mod error;
pub mod redb;
pub mod traits;
pub mod watch;

pub use error::KVError;
pub use redb::RedbStore;
pub use traits::KVStore;
pub use watch::WatchedKV;
