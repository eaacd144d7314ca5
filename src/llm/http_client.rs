use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for model calls. The whole-request timeout is the
/// externally imposed deadline on a judge call; hitting it surfaces as a
/// request error like any other transport failure.
pub fn build_provider_client_with_timeout(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!(%error, "falling back to default provider HTTP client");
            Client::new()
        })
}
