//! Infrastructure layer: the TCP transport and TOML settings.

pub mod config;
pub mod network;
