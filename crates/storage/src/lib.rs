pub mod error;
mod models;
mod path;
pub mod store;

pub use crate::models::{HashKind, RemoteEntry};
pub use crate::path::validate_name;
#[cfg(feature = "mock")]
pub use crate::store::MockStore;
pub use crate::store::RemoteStore;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn RemoteStore + Send + Sync>;
