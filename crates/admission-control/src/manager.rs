//! 어드미션 매니저 -- 설정 감시, 상태 교체, 어드미션 결정
//!
//! [`AdmissionManager`]는 core의 [`Pipeline`] trait을 구현하여
//! `kubeward-daemon`에서 start/stop/health_check 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! Option<AdmissionSettings> ──mpsc──> SettingsWatcher (단일 태스크)
//!                                          │ build state
//!                                          ▼
//!                              watch::Sender::send_replace
//!                                          │
//!              ┌───────────────────────────┼──────────────────┐
//!              ▼                           ▼                  ▼
//!   AdmissionHandle::handle_review   subscribe() 관찰자   detect_runtime_process
//!              │
//!              └── AlertBatch ──mpsc──> downstream
//! ```
//!
//! 리뷰는 시작 시점의 상태 스냅샷(`Arc`) 하나만 사용하며, 유일한 대기 지점은
//! 인라인 이미지 스캔 대기입니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kubeward_core::error::{KubewardError, PipelineError};
use kubeward_core::event::{AlertBatch, MODULE_ADMISSION_CONTROL, MODULE_RUNTIME_DETECTION};
use kubeward_core::metrics as m;
use kubeward_core::pipeline::{HealthStatus, Pipeline};
use kubeward_core::types::Alert;
use kubeward_core::workload::{Deployment, Image, ProcessIndicator};
use kubeward_policy::{
    DeployTimeDetector, PolicyVersionMigrator, RuntimeDetector, is_missing_scan_policy,
};

use crate::bypass::{BypassReason, BypassRules};
use crate::central::{CentralConnector, ImageResolver};
use crate::config::AdmissionControlConfig;
use crate::decode::decode_deployment;
use crate::error::AdmissionError;
use crate::image_cache::ImageCache;
use crate::lru::CacheStats;
use crate::message::{BREAK_GLASS_ANNOTATION, render_rejection};
use crate::review::{self, AdmissionRequest, AdmissionResponse, RequestExt};
use crate::settings::AdmissionSettings;
use crate::state::{AdmissionState, build_policy_set};

/// 현재 상태 스냅샷. `None`이면 비활성 상태입니다.
pub type StateSnapshot<R> = Option<Arc<AdmissionState<R>>>;

/// 매니저 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerState {
    Initialized,
    Running,
    Stopped,
}

/// 리뷰 태스크와 설정 감시 태스크가 공유하는 부분
struct Shared<C: CentralConnector> {
    connector: C,
    own_namespace: String,
    max_scan_timeout_secs: u64,
    migrator: PolicyVersionMigrator,
    state_tx: watch::Sender<StateSnapshot<C::Client>>,
    image_cache: Arc<ImageCache>,
    alert_tx: mpsc::Sender<AlertBatch>,
}

fn bypassed(request: &AdmissionRequest, reason: BypassReason) -> AdmissionResponse {
    metrics::counter!(m::ADMISSION_BYPASSED_TOTAL, m::LABEL_REASON => reason.as_str()).increment(1);
    debug!(
        uid = %request.uid,
        namespace = %request.namespace(),
        name = %request.name,
        reason = %reason,
        "admission request bypassed"
    );
    review::pass(request)
}

/// 배포 시점 탐지. 차단 알림이 있으면 다른 정책의 평가 실패와 무관하게 알림을 반환하고,
/// 차단 알림 없이 실패한 정책이 있으면 결정 에러로 전파합니다.
fn detect(
    detector: &DeployTimeDetector,
    deployment: &Deployment,
    images: &[Option<Image>],
) -> Result<Vec<Alert>, AdmissionError> {
    let detections = detector.detect(deployment, images);
    match detections.error {
        Some(e) if !has_blocking_alert(&detections.alerts) => {
            Err(AdmissionError::detection(e, deployment))
        }
        _ => Ok(detections.alerts),
    }
}

/// "이미지 미스캔" 외의 알림이 있는지 확인합니다.
fn has_blocking_alert(alerts: &[Alert]) -> bool {
    alerts.iter().any(|alert| !is_missing_scan_policy(&alert.policy))
}

/// 동시 리뷰용 핸들
///
/// 복제 비용이 낮으며, 웹훅 핸들러마다 하나씩 나눠 가질 수 있습니다.
pub struct AdmissionHandle<C: CentralConnector> {
    shared: Arc<Shared<C>>,
}

impl<C: CentralConnector> Clone for AdmissionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: CentralConnector> AdmissionHandle<C> {
    /// 현재 상태 스냅샷
    pub fn current_state(&self) -> StateSnapshot<C::Client> {
        self.shared.state_tx.borrow().clone()
    }

    /// 상태 변경을 구독합니다.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot<C::Client>> {
        self.shared.state_tx.subscribe()
    }

    /// 이미지 캐시 통계
    pub fn image_cache_stats(&self) -> CacheStats {
        self.shared.image_cache.stats()
    }

    /// 어드미션 요청을 평가합니다.
    ///
    /// # Errors
    ///
    /// - 설정이 없으면 `AdmissionError::Disabled`
    /// - 객체 디코딩/변환 실패 시 `Decode` / `Conversion`
    /// - 정책 평가 실패 시 `Detection`
    pub async fn handle_review(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionResponse, AdmissionError> {
        let started = Instant::now();
        let result = self.review(request).await;
        metrics::histogram!(m::ADMISSION_REVIEW_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let decision = match &result {
            Ok(response) if response.allowed => "allowed",
            Ok(_) => "denied",
            Err(_) => "error",
        };
        metrics::counter!(m::ADMISSION_REVIEWS_TOTAL, m::LABEL_DECISION => decision).increment(1);
        result
    }

    async fn review(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, AdmissionError> {
        let state = self.current_state().ok_or(AdmissionError::Disabled)?;

        let bypass = state
            .bypass
            .check(request, state.deploy_detector.is_some());
        let detector = match (bypass, state.deploy_detector.as_ref()) {
            (None, Some(detector)) => detector,
            (reason, _) => {
                return Ok(bypassed(request, reason.unwrap_or(BypassReason::NoDetector)));
            }
        };

        let Some(deployment) = decode_deployment(request)? else {
            return Ok(bypassed(request, BypassReason::Owned));
        };

        if !state.cluster_config.disable_bypass
            && deployment.annotations.contains_key(BREAK_GLASS_ANNOTATION)
        {
            warn!(
                namespace = %deployment.namespace,
                name = %deployment.name,
                kind = %deployment.kind,
                user = %request.username(),
                "break-glass annotation present, admitting without policy evaluation"
            );
            return Ok(bypassed(request, BypassReason::BreakGlass));
        }

        let mut images: Vec<Option<Image>> = deployment
            .containers
            .iter()
            .map(|c| self.shared.image_cache.get(c).map(|entry| entry.image.clone()))
            .collect();
        let mut alerts = detect(detector, &deployment, &images)?;

        let mut scan_attempted = false;
        if !has_blocking_alert(&alerts)
            && images.iter().any(Option::is_none)
            && state.can_scan_inline()
            && let Some(client) = &state.client
        {
            scan_attempted = true;
            let timeout = state.scan_timeout(self.shared.max_scan_timeout_secs);
            alerts = self
                .wait_for_scans(client, timeout, detector, &deployment, &mut images, alerts)
                .await?;
        }

        let response = if alerts.is_empty() {
            review::pass(request)
        } else if !scan_attempted && !has_blocking_alert(&alerts) {
            debug!(
                namespace = %deployment.namespace,
                name = %deployment.name,
                "only missing-scan alerts without an inline scan, admitting"
            );
            review::pass(request)
        } else {
            info!(
                namespace = %deployment.namespace,
                name = %deployment.name,
                kind = %deployment.kind,
                alerts = alerts.len(),
                "denying admission request"
            );
            let message = render_rejection(&alerts, !state.cluster_config.disable_bypass);
            review::fail(request, message)
        };

        self.send_alerts(MODULE_ADMISSION_CONTROL, Some(request.uid.clone()), alerts);
        Ok(response)
    }

    /// 캐시에 없는 이미지를 스캔하며 제한 시간 동안 재평가합니다.
    ///
    /// 스캔은 별도 태스크에서 실행되며, 제한 시간 이후에 끝난 결과도 캐시에는 저장됩니다.
    async fn wait_for_scans(
        &self,
        client: &Arc<C::Client>,
        timeout: Duration,
        detector: &DeployTimeDetector,
        deployment: &Deployment,
        images: &mut [Option<Image>],
        mut alerts: Vec<Alert>,
    ) -> Result<Vec<Alert>, AdmissionError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let (tx, mut rx) = mpsc::channel(deployment.containers.len().max(1));

        let mut pending = 0usize;
        for (idx, container) in deployment.containers.iter().enumerate() {
            if images[idx].is_some() {
                continue;
            }
            let client = Arc::clone(client);
            let cache = Arc::clone(&self.shared.image_cache);
            let container = container.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = client.scan_image(&container).await;
                if let Ok(image) = &result {
                    cache.insert(&container, image.clone());
                }
                let _ = tx.send((idx, result)).await;
            });
            pending += 1;
        }
        drop(tx);

        while pending > 0 {
            let received = match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(_) => {
                    metrics::counter!(m::ADMISSION_SCAN_TIMEOUTS_TOTAL).increment(1);
                    warn!(
                        namespace = %deployment.namespace,
                        name = %deployment.name,
                        pending,
                        timeout_secs = timeout.as_secs(),
                        "timed out waiting for image scans"
                    );
                    break;
                }
            };
            pending -= 1;

            let (idx, result) = received;
            match result {
                Ok(image) => {
                    images[idx] = Some(image);
                    alerts = detect(detector, deployment, images)?;
                    if has_blocking_alert(&alerts) {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        namespace = %deployment.namespace,
                        name = %deployment.name,
                        container = %deployment.containers[idx].name,
                        error = %e,
                        "inline image scan failed"
                    );
                }
            }
        }
        Ok(alerts)
    }

    /// 런타임 프로세스 이벤트를 현재 런타임 정책으로 평가합니다.
    ///
    /// 알림이 하나라도 있으면 일부 정책의 평가 실패는 로그로만 남습니다.
    pub fn detect_runtime_process(
        &self,
        deployment: &Deployment,
        process: &ProcessIndicator,
    ) -> Result<Vec<Alert>, AdmissionError> {
        let state = self.current_state().ok_or(AdmissionError::Disabled)?;
        let detections = state.runtime_detector.detect_process(deployment, process);
        let alerts = detections.alerts;
        self.send_alerts(MODULE_RUNTIME_DETECTION, None, alerts.clone());
        match detections.error {
            Some(e) if alerts.is_empty() => Err(AdmissionError::detection(e, deployment)),
            _ => Ok(alerts),
        }
    }

    fn send_alerts(&self, source: &str, request_uid: Option<String>, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }
        let batch = AlertBatch::new(source, request_uid, alerts);
        if let Err(e) = self.shared.alert_tx.try_send(batch) {
            metrics::counter!(m::ADMISSION_ALERTS_DROPPED_TOTAL).increment(1);
            warn!(source, error = %e, "failed to forward alert batch");
        }
    }
}

/// 설정 감시 태스크
///
/// 설정은 이 태스크 하나에서만 적용되므로 업데이트 순서가 보장됩니다.
struct SettingsWatcher<C: CentralConnector> {
    shared: Arc<Shared<C>>,
    last_timestamp: Option<DateTime<Utc>>,
    client: Option<(String, Arc<C::Client>)>,
    cache_version: Option<String>,
}

impl<C: CentralConnector> SettingsWatcher<C> {
    fn new(shared: Arc<Shared<C>>) -> Self {
        Self {
            shared,
            last_timestamp: None,
            client: None,
            cache_version: None,
        }
    }

    async fn run(
        mut self,
        mut settings_rx: mpsc::Receiver<Option<AdmissionSettings>>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                update = settings_rx.recv() => match update {
                    Some(update) => self.apply(update).await,
                    None => {
                        info!("admission settings channel closed");
                        break;
                    }
                },
            }
        }
        self.apply(None).await;
        info!("admission settings watcher stopped");
    }

    async fn apply(&mut self, update: Option<AdmissionSettings>) {
        let Some(settings) = update else {
            self.last_timestamp = None;
            self.close_client();
            self.shared.state_tx.send_replace(None);
            metrics::gauge!(m::POLICY_COMPILED).set(0.0);
            metrics::counter!(m::ADMISSION_SETTINGS_UPDATES_TOTAL, m::LABEL_RESULT => "disabled")
                .increment(1);
            info!("admission control disabled");
            return;
        };

        if let Some(last) = self.last_timestamp
            && settings.timestamp <= last
        {
            metrics::counter!(m::ADMISSION_SETTINGS_UPDATES_TOTAL, m::LABEL_RESULT => "ignored")
                .increment(1);
            debug!(
                timestamp = %settings.timestamp,
                last_applied = %last,
                "ignoring stale admission settings"
            );
            return;
        }

        let was_disabled = self.shared.state_tx.borrow().is_none();
        let state = self.build_state(settings).await;
        self.last_timestamp = Some(state.timestamp);

        metrics::gauge!(m::POLICY_COMPILED).set(state.policy_count() as f64);
        metrics::counter!(m::ADMISSION_SETTINGS_UPDATES_TOTAL, m::LABEL_RESULT => "applied")
            .increment(1);
        info!(
            timestamp = %state.timestamp,
            policies = state.policy_count(),
            enforcing = state.deploy_detector.is_some(),
            scan_inline = state.can_scan_inline(),
            "{}",
            if was_disabled {
                "admission control enabled"
            } else {
                "admission settings updated"
            }
        );
        self.shared.state_tx.send_replace(Some(Arc::new(state)));
    }

    async fn build_state(&mut self, settings: AdmissionSettings) -> AdmissionState<C::Client> {
        let AdmissionSettings {
            timestamp,
            enforced_deploy_time_policies,
            runtime_policies,
            cluster_config,
            central_endpoint,
            cache_version,
        } = settings;

        let migrator = &self.shared.migrator;
        let deploy_detector = cluster_config.enabled.then(|| {
            let set = build_policy_set(
                migrator,
                &enforced_deploy_time_policies,
                !cluster_config.scan_inline,
            );
            DeployTimeDetector::new(Arc::new(set))
        });
        let runtime_detector =
            RuntimeDetector::new(Arc::new(build_policy_set(migrator, &runtime_policies, false)));
        let bypass = BypassRules::new(self.shared.own_namespace.clone(), &cluster_config);

        let endpoint = central_endpoint.trim().to_owned();
        let client = self.update_client(&endpoint).await;
        self.update_cache_version(&cache_version);

        AdmissionState {
            deploy_detector,
            runtime_detector,
            cluster_config,
            bypass,
            client,
            central_endpoint: endpoint,
            cache_version,
            timestamp,
        }
    }

    /// 엔드포인트가 같으면 기존 클라이언트를 재사용하고, 다르면 새로 연결합니다.
    async fn update_client(&mut self, endpoint: &str) -> Option<Arc<C::Client>> {
        if let Some((current, client)) = &self.client
            && current == endpoint
        {
            return Some(Arc::clone(client));
        }

        self.close_client();
        if endpoint.is_empty() {
            return None;
        }
        match self.shared.connector.connect(endpoint).await {
            Ok(client) => {
                info!(endpoint = %endpoint, "connected to central");
                let client = Arc::new(client);
                self.client = Some((endpoint.to_owned(), Arc::clone(&client)));
                Some(client)
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "failed to connect to central, inline scans unavailable");
                None
            }
        }
    }

    fn close_client(&mut self) {
        if let Some((endpoint, client)) = self.client.take() {
            tokio::spawn(async move {
                client.close().await;
                debug!(endpoint = %endpoint, "closed stale central client");
            });
        }
    }

    fn update_cache_version(&mut self, version: &str) {
        if self.cache_version.as_deref() == Some(version) {
            return;
        }
        if self.cache_version.is_some() {
            self.shared.image_cache.purge();
            info!(cache_version = %version, "image cache version changed, cache purged");
        }
        self.cache_version = Some(version.to_owned());
    }
}

/// 어드미션 매니저
///
/// # 사용 예시
/// ```ignore
/// use kubeward_admission::{AdmissionManagerBuilder, OfflineConnector};
///
/// let (mut manager, alert_rx) = AdmissionManagerBuilder::new()
///     .config(config)
///     .connector(OfflineConnector)
///     .build()?;
///
/// manager.start().await?;
/// manager.settings_sender().send(Some(settings)).await?;
/// let response = manager.handle().handle_review(&request).await?;
/// ```
pub struct AdmissionManager<C: CentralConnector> {
    config: AdmissionControlConfig,
    state: ManagerState,
    handle: AdmissionHandle<C>,
    settings_tx: mpsc::Sender<Option<AdmissionSettings>>,
    settings_rx: Option<mpsc::Receiver<Option<AdmissionSettings>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl<C: CentralConnector> AdmissionManager<C> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ManagerState::Initialized => "initialized",
            ManagerState::Running => "running",
            ManagerState::Stopped => "stopped",
        }
    }

    /// 매니저 설정
    pub fn config(&self) -> &AdmissionControlConfig {
        &self.config
    }

    /// 동시 리뷰용 핸들을 반환합니다.
    pub fn handle(&self) -> AdmissionHandle<C> {
        self.handle.clone()
    }

    /// 설정 업데이트 채널. `None`을 보내면 비활성화됩니다.
    pub fn settings_sender(&self) -> mpsc::Sender<Option<AdmissionSettings>> {
        self.settings_tx.clone()
    }

    /// 상태 변경을 구독합니다.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot<C::Client>> {
        self.handle.subscribe()
    }

    /// 현재 상태 스냅샷
    pub fn current_state(&self) -> StateSnapshot<C::Client> {
        self.handle.current_state()
    }

    /// 어드미션 요청을 평가합니다. [`AdmissionHandle::handle_review`] 참고.
    pub async fn handle_review(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionResponse, AdmissionError> {
        self.handle.handle_review(request).await
    }

    /// 런타임 프로세스 이벤트를 평가합니다.
    pub fn detect_runtime_process(
        &self,
        deployment: &Deployment,
        process: &ProcessIndicator,
    ) -> Result<Vec<Alert>, AdmissionError> {
        self.handle.detect_runtime_process(deployment, process)
    }
}

impl<C: CentralConnector> Pipeline for AdmissionManager<C> {
    async fn start(&mut self) -> Result<(), KubewardError> {
        if self.state == ManagerState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let settings_rx = self.settings_rx.take().ok_or_else(|| {
            KubewardError::Pipeline(PipelineError::InitFailed(
                "settings receiver already consumed, rebuild the manager to restart".to_owned(),
            ))
        })?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(namespace = %self.config.namespace, "starting admission manager");
        let watcher = SettingsWatcher::new(Arc::clone(&self.handle.shared));
        self.watcher = Some(tokio::spawn(watcher.run(settings_rx, shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
        self.state = ManagerState::Running;
        info!("admission manager started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), KubewardError> {
        if self.state != ManagerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping admission manager");
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(watcher) = self.watcher.take()
            && let Err(e) = watcher.await
        {
            warn!(error = %e, "admission settings watcher terminated abnormally");
        }
        self.state = ManagerState::Stopped;
        info!("admission manager stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ManagerState::Running => {
                if self.current_state().is_some() {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded("no admission settings applied".to_owned())
                }
            }
            ManagerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ManagerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 어드미션 매니저 빌더
pub struct AdmissionManagerBuilder<C: CentralConnector> {
    config: AdmissionControlConfig,
    connector: Option<C>,
    alert_tx: Option<mpsc::Sender<AlertBatch>>,
    migrator: Option<PolicyVersionMigrator>,
}

impl<C: CentralConnector> Default for AdmissionManagerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CentralConnector> AdmissionManagerBuilder<C> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: AdmissionControlConfig::default(),
            connector: None,
            alert_tx: None,
            migrator: None,
        }
    }

    /// 매니저 설정을 지정합니다.
    pub fn config(mut self, config: AdmissionControlConfig) -> Self {
        self.config = config;
        self
    }

    /// 컨트롤 플레인 커넥터를 설정합니다.
    pub fn connector(mut self, connector: C) -> Self {
        self.connector = Some(connector);
        self
    }

    /// 외부 알림 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn alert_sender(mut self, tx: mpsc::Sender<AlertBatch>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    /// 정책 버전 변환기를 교체합니다.
    pub fn migrator(mut self, migrator: PolicyVersionMigrator) -> Self {
        self.migrator = Some(migrator);
        self
    }

    /// 매니저를 빌드합니다.
    ///
    /// # Returns
    /// - `AdmissionManager`: 매니저 인스턴스
    /// - `Option<mpsc::Receiver<AlertBatch>>`: 알림 수신 채널
    ///   (외부 alert_sender를 설정한 경우 None)
    ///
    /// # Errors
    ///
    /// 설정 검증에 실패하거나 커넥터가 없으면 `AdmissionError::Config`를 반환합니다.
    pub fn build(
        self,
    ) -> Result<(AdmissionManager<C>, Option<mpsc::Receiver<AlertBatch>>), AdmissionError> {
        self.config.validate()?;
        let connector = self.connector.ok_or_else(|| AdmissionError::Config {
            field: "connector".to_owned(),
            reason: "central connector is required".to_owned(),
        })?;

        let (alert_tx, alert_rx) = match self.alert_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.alert_channel_capacity);
                (tx, Some(rx))
            }
        };
        let (settings_tx, settings_rx) = mpsc::channel(self.config.settings_channel_capacity);
        let (state_tx, _) = watch::channel(None);

        let shared = Arc::new(Shared {
            connector,
            own_namespace: self.config.namespace.clone(),
            max_scan_timeout_secs: self.config.max_scan_timeout_secs,
            migrator: self.migrator.unwrap_or_default(),
            state_tx,
            image_cache: Arc::new(ImageCache::new(
                self.config.image_cache_max_bytes,
                self.config.image_cache_max_item_bytes,
                self.config.flatten_image_data,
            )),
            alert_tx,
        });

        let manager = AdmissionManager {
            config: self.config,
            state: ManagerState::Initialized,
            handle: AdmissionHandle { shared },
            settings_tx,
            settings_rx: Some(settings_rx),
            shutdown_tx: None,
            watcher: None,
        };
        Ok((manager, alert_rx))
    }
}
