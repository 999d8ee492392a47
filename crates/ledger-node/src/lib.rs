pub mod api;
pub mod background;
pub mod config;
pub mod peers;

pub use api::{router, ApiError};
pub use background::spawn_resolver;
pub use config::Args;
pub use peers::HttpPeers;
