//! One-shot admission review evaluation.
//!
//! Backs the `review` subcommand: builds a private admission manager,
//! applies a settings snapshot, evaluates one `AdmissionReview` and
//! returns the response review.

use std::time::Duration;

use anyhow::{Context, Result};

use kubeward_admission::{
    AdmissionControlConfig, AdmissionManagerBuilder, AdmissionRequest, AdmissionReview,
    AdmissionSettings, OfflineConnector,
};
use kubeward_core::config::KubewardConfig;
use kubeward_core::pipeline::Pipeline;

/// How long to wait for the settings watcher to publish the state.
const SETTINGS_APPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Evaluate `review` against `settings` and return the response review.
///
/// Alerts raised by the review are logged at `warn`.
///
/// # Errors
///
/// - The review carries no request
/// - The settings are not applied in time
/// - The review itself fails (decode or detection error)
pub async fn evaluate_review(
    config: &KubewardConfig,
    settings: AdmissionSettings,
    review: AdmissionReview,
) -> Result<AdmissionReview> {
    let request: AdmissionRequest = review
        .try_into()
        .context("admission review has no request")?;

    let (mut manager, alert_rx) = AdmissionManagerBuilder::new()
        .config(AdmissionControlConfig::from_core(&config.admission))
        .connector(OfflineConnector)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build admission manager: {}", e))?;

    manager
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start admission control: {}", e))?;

    let result = async {
        let mut state_rx = manager.subscribe();
        manager
            .settings_sender()
            .send(Some(settings))
            .await
            .map_err(|_| anyhow::anyhow!("admission settings watcher is not running"))?;
        tokio::time::timeout(SETTINGS_APPLY_TIMEOUT, state_rx.changed())
            .await
            .context("timed out waiting for admission settings")?
            .context("admission settings watcher stopped")?;

        manager
            .handle_review(&request)
            .await
            .map_err(|e| anyhow::anyhow!("admission review failed: {}", e))
    }
    .await;

    if let Err(e) = manager.stop().await {
        tracing::warn!(error = %e, "failed to stop admission control");
    }

    if let Some(mut alert_rx) = alert_rx {
        while let Ok(batch) = alert_rx.try_recv() {
            for alert in &batch.alerts {
                tracing::warn!(
                    request_uid = batch.request_uid.as_deref().unwrap_or(""),
                    policy = %alert.policy.name,
                    "{}",
                    alert
                );
            }
        }
    }

    let response = result?;
    tracing::info!(
        uid = %response.uid,
        allowed = response.allowed,
        "admission review evaluated"
    );
    Ok(response.into_review())
}
