//! Configuration loading and construction of the injected pipeline clients.

pub mod bootstrap;
pub mod config;
pub mod secret;

pub use config::Config;
pub use secret::Secret;
