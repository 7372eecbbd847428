//! Infrastructure layer: configuration and network bindings.

pub mod config;
pub mod network;

pub use config::{load_config, ClientConfig, ConfigError, Mode};
pub use network::{ClientNetworkError, NetworkEvent, PollClient, PushClient};
