pub mod client;
pub mod config;
pub mod error;
pub mod postprocess;
pub mod prompt;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod wire;
