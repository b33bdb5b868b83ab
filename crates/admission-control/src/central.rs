//! Control-plane client abstraction for testability.
//!
//! The [`CentralConnector`] trait opens a client for an endpoint, and the
//! resulting [`ImageResolver`] scans images that are missing from the cache.
//! Production wiring without a transport uses [`OfflineConnector`], while
//! tests use a mock connector.
//!
//! ```text
//! ┌──────────────────┐
//! │ AdmissionManager │
//! └────────┬─────────┘
//!          │ connect(endpoint) on settings change
//!          ▼
//!   ┌──────────────────┐
//!   │ CentralConnector │ (trait)
//!   └────────┬─────────┘
//!            ▼
//!   ┌───────────────┐
//!   │ ImageResolver │ scan_image / close
//!   └───────────────┘
//! ```

use std::future::Future;

use kubeward_core::workload::{Container, Image};

use crate::error::AdmissionError;

/// Client for one control-plane endpoint.
///
/// The manager shares a client across concurrent reviews through an `Arc`
/// and closes it on a spawned task once the endpoint changes.
pub trait ImageResolver: Send + Sync + 'static {
    /// Fetches image metadata (including scan results) for a container image.
    ///
    /// # Errors
    ///
    /// Returns `AdmissionError::Connection` if the control plane cannot be reached.
    fn scan_image(
        &self,
        container: &Container,
    ) -> impl Future<Output = Result<Image, AdmissionError>> + Send;

    /// Releases the connection. Must be idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Opens control-plane clients.
pub trait CentralConnector: Send + Sync + 'static {
    /// Client type produced by [`connect`](Self::connect).
    type Client: ImageResolver;

    /// Connects to the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AdmissionError::Connection` when the endpoint is unreachable.
    /// The manager logs the failure and keeps serving without inline scans.
    fn connect(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Self::Client, AdmissionError>> + Send;
}

/// Connector for deployments without a control-plane transport.
///
/// Every connection attempt fails, so reviews run without inline scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineConnector;

/// Resolver that never reaches a control plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineResolver;

impl ImageResolver for OfflineResolver {
    async fn scan_image(&self, container: &Container) -> Result<Image, AdmissionError> {
        Err(AdmissionError::Connection(format!(
            "no control-plane transport available to scan '{}'",
            container.image.full_name
        )))
    }

    async fn close(&self) {}
}

impl CentralConnector for OfflineConnector {
    type Client = OfflineResolver;

    async fn connect(&self, endpoint: &str) -> Result<OfflineResolver, AdmissionError> {
        Err(AdmissionError::Connection(format!(
            "no control-plane transport available for endpoint '{endpoint}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use kubeward_core::workload::ImageName;

    use super::*;

    #[tokio::test]
    async fn offline_connector_always_fails() {
        let err = OfflineConnector.connect("central:443").await.unwrap_err();
        assert!(matches!(err, AdmissionError::Connection(ref msg) if msg.contains("central:443")));
    }

    #[tokio::test]
    async fn offline_resolver_reports_image() {
        let (image, _) = ImageName::parse("nginx:1.25").unwrap();
        let container = Container {
            name: "web".to_owned(),
            image,
            image_digest: None,
            privileged: false,
        };
        let err = OfflineResolver.scan_image(&container).await.unwrap_err();
        assert!(err.to_string().contains("docker.io/library/nginx:1.25"));
        OfflineResolver.close().await;
    }
}
