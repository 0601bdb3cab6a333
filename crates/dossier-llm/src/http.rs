//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create a shared HTTP client with standard dossier configuration.
///
/// Config: 30s connect timeout, 120s request timeout, rustls TLS,
/// `dossier/{version}` user-agent, redirect limit 10.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialised.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("dossier/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}
