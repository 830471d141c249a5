mod client;
mod config;

pub use client::RelayClient;
pub use config::ClientConfig;
