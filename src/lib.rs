pub mod blocking;
pub mod config;
pub mod detection;
pub mod error;
pub mod handler;
pub mod models;
pub mod output;
pub mod store;

// Re-export commonly used types
pub use blocking::IpSetReconciler;
pub use config::{Config, ConfigError, TargetConfig};
pub use detection::extract_attacker_address;
pub use error::{BlockError, ErrorKind};
pub use handler::InvocationHandler;
pub use models::{BlockOutcome, DetectionEvent, InvocationResult, Scope};
pub use store::{HttpIpSetStore, InMemoryIpSetStore, IpSetStore, StoreError};
