//! Infrastructure layer: persistence, local key-value state, configuration
//! and the application services built on them.

pub mod config;
pub mod error;
pub mod kv;
pub mod services;
pub mod store;


pub use config::{ConfigError, InventoryConfig};
pub use error::{ErrorKind, ServiceError};
pub use kv::{InMemoryKeyValueStore, JsonFileStore, KeyValueStore, KvError};
pub use services::{ApprovalService, LotService, NotificationService, ReadNotifications};
pub use store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StoreError};
