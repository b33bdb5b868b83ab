//! Orchestrator integration tests.
//!
//! Tests the full flow: config -> admission manager build -> start with
//! settings file -> health check -> settings reload -> shutdown.

use std::path::Path;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use kubeward_admission::AdmissionSettings;
use kubeward_core::config::KubewardConfig;
use kubeward_core::types::{LifecycleStage, Policy, PolicyGroup, PolicySection};
use kubeward_daemon::orchestrator::Orchestrator;

fn config_with_settings(settings_path: &str) -> KubewardConfig {
    let toml_str = format!(
        r#"
[general]
log_level = "info"
log_format = "json"

[admission]
enabled = true
namespace = "stackrox"
settings_path = "{settings_path}"

[metrics]
enabled = false
"#
    );
    KubewardConfig::parse(&toml_str).expect("failed to parse test config")
}

fn tag_policy() -> Policy {
    let mut policy = Policy::new("tag", "Latest tag");
    policy.lifecycle_stages = vec![LifecycleStage::Deploy];
    policy.policy_sections = vec![PolicySection {
        section_name: String::new(),
        policy_groups: vec![PolicyGroup {
            field_name: "Image Tag".to_owned(),
            boolean_operator: Default::default(),
            negate: false,
            values: vec!["latest".to_owned()],
        }],
    }];
    policy
}

fn write_settings(path: &Path, timestamp: i64) {
    let mut settings = AdmissionSettings::new(Utc.timestamp_opt(timestamp, 0).single().unwrap());
    settings.enforced_deploy_time_policies = vec![tag_policy()];
    std::fs::write(path, serde_json::to_string(&settings).unwrap()).unwrap();
}

async fn wait_for_timestamp(orchestrator: &Orchestrator, timestamp: i64) {
    let expected = Utc.timestamp_opt(timestamp, 0).single().unwrap();
    let mut rx = orchestrator.admission().unwrap().subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|state| state.as_ref().is_some_and(|s| s.timestamp == expected)),
    )
    .await
    .expect("settings were not applied in time")
    .unwrap();
}

#[tokio::test]
async fn test_build_with_admission_disabled() {
    let mut config = config_with_settings("");
    config.admission.enabled = false;

    let mut orchestrator = Orchestrator::build_from_config(config).unwrap();
    assert!(orchestrator.admission().is_none());

    orchestrator.start().await.unwrap();
    assert!(!orchestrator.reload_settings().await.unwrap());

    let health = orchestrator.health().await;
    assert!(health.status.is_healthy());
    assert!(!health.modules[0].enabled);
    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = config_with_settings("");
    config.general.log_level = "loud".to_owned();
    assert!(Orchestrator::build_from_config(config).is_err());
}

#[tokio::test]
async fn test_build_from_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = Orchestrator::build(&dir.path().join("missing.toml")).await;
    assert!(result.is_err());
}

#[tokio::test]
#[serial_test::serial]
async fn test_build_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kubeward.toml");
    std::fs::write(
        &path,
        "[admission]\nenabled = true\nnamespace = \"kubeward\"\nsettings_path = \"\"\n",
    )
    .unwrap();

    let orchestrator = Orchestrator::build(&path).await.unwrap();
    assert_eq!(orchestrator.config().admission.namespace, "kubeward");
    assert_eq!(orchestrator.admission().unwrap().state_name(), "initialized");
}

#[tokio::test]
async fn test_start_applies_settings_file() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("settings.json");
    write_settings(&settings_path, 100);

    let mut orchestrator =
        Orchestrator::build_from_config(config_with_settings(settings_path.to_str().unwrap()))
            .unwrap();
    orchestrator.start().await.unwrap();
    wait_for_timestamp(&orchestrator, 100).await;

    let health = orchestrator.health().await;
    assert!(health.status.is_healthy(), "status: {}", health.status);
    assert_eq!(health.policy_count, 1);

    orchestrator.shutdown().await.unwrap();
    let health = orchestrator.health().await;
    assert!(health.status.is_unhealthy());
    assert_eq!(orchestrator.admission().unwrap().state_name(), "stopped");
}

#[tokio::test]
#[serial_test::serial]
async fn test_env_override_supplies_settings_path() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("settings.json");
    write_settings(&settings_path, 100);
    let config_path = dir.path().join("kubeward.toml");
    std::fs::write(&config_path, "[admission]\nsettings_path = \"\"\n").unwrap();

    let original = std::env::var("KUBEWARD_ADMISSION_SETTINGS_PATH").ok();
    // SAFETY: serial_test serializes every test that touches the environment.
    unsafe {
        std::env::set_var("KUBEWARD_ADMISSION_SETTINGS_PATH", &settings_path);
    }
    let built = Orchestrator::build(&config_path).await;
    unsafe {
        match original {
            Some(val) => std::env::set_var("KUBEWARD_ADMISSION_SETTINGS_PATH", val),
            None => std::env::remove_var("KUBEWARD_ADMISSION_SETTINGS_PATH"),
        }
    }

    let mut orchestrator = built.unwrap();
    orchestrator.start().await.unwrap();
    wait_for_timestamp(&orchestrator, 100).await;
    assert_eq!(orchestrator.health().await.policy_count, 1);
    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_without_settings_is_degraded() {
    let mut orchestrator = Orchestrator::build_from_config(config_with_settings("")).unwrap();
    orchestrator.start().await.unwrap();

    let health = orchestrator.health().await;
    assert!(health.status.is_degraded(), "status: {}", health.status);
    assert_eq!(health.policy_count, 0);
    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_fails_on_missing_settings_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");

    let mut orchestrator =
        Orchestrator::build_from_config(config_with_settings(missing.to_str().unwrap())).unwrap();
    let err = orchestrator.start().await.unwrap_err();
    assert!(err.to_string().contains("failed to load admission settings"));
    assert_eq!(orchestrator.admission().unwrap().state_name(), "stopped");
}

#[tokio::test]
async fn test_reload_applies_newer_settings() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("settings.json");
    write_settings(&settings_path, 100);

    let mut orchestrator =
        Orchestrator::build_from_config(config_with_settings(settings_path.to_str().unwrap()))
            .unwrap();
    orchestrator.start().await.unwrap();
    wait_for_timestamp(&orchestrator, 100).await;

    write_settings(&settings_path, 200);
    assert!(orchestrator.reload_settings().await.unwrap());
    wait_for_timestamp(&orchestrator, 200).await;

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_run_until_stops_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("settings.json");
    write_settings(&settings_path, 100);

    let mut orchestrator =
        Orchestrator::build_from_config(config_with_settings(settings_path.to_str().unwrap()))
            .unwrap();
    orchestrator
        .run_until(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok("test")
        })
        .await
        .unwrap();

    assert_eq!(orchestrator.admission().unwrap().state_name(), "stopped");
}

#[tokio::test]
async fn test_run_until_propagates_signal_error() {
    let mut orchestrator = Orchestrator::build_from_config(config_with_settings("")).unwrap();
    let result = orchestrator
        .run_until(async { Err(anyhow::anyhow!("signal handler failed")) })
        .await;
    assert!(result.is_err());
    assert_eq!(orchestrator.admission().unwrap().state_name(), "stopped");
}
