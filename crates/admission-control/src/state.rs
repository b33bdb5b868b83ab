//! 결정 상태 스냅샷
//!
//! 설정 업데이트마다 새 [`AdmissionState`]가 만들어져 통째로 교체됩니다.
//! 리뷰는 시작 시점의 스냅샷 하나만 사용하므로 도중에 설정이 바뀌어도 영향을 받지 않습니다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use kubeward_core::types::Policy;
use kubeward_policy::{
    DeployTimeDetector, PolicySet, PolicyVersionMigrator, RuntimeDetector,
    policy_requires_image_scan,
};

use crate::bypass::BypassRules;
use crate::settings::ClusterConfig;

/// 결정 상태 스냅샷
pub struct AdmissionState<R> {
    /// 배포 시점 탐지기 (`cluster_config.enabled`일 때만 존재)
    pub deploy_detector: Option<DeployTimeDetector>,
    /// 런타임 탐지기
    pub runtime_detector: RuntimeDetector,
    /// 클러스터 설정
    pub cluster_config: ClusterConfig,
    /// 우회 규칙
    pub bypass: BypassRules,
    /// 컨트롤 플레인 클라이언트
    pub client: Option<Arc<R>>,
    /// 컨트롤 플레인 엔드포인트
    pub central_endpoint: String,
    /// 이미지 캐시 버전 토큰
    pub cache_version: String,
    /// 적용된 설정의 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl<R> AdmissionState<R> {
    /// 캐시에 없는 이미지를 요청 처리 중 스캔할 수 있는지 확인합니다.
    pub fn can_scan_inline(&self) -> bool {
        self.cluster_config.scan_inline
            && self.client.is_some()
            && self.cluster_config.timeout_seconds > 0
    }

    /// 스캔 대기 시간. `max_secs`로 상한을 둡니다.
    pub fn scan_timeout(&self, max_secs: u64) -> Duration {
        Duration::from_secs(u64::from(self.cluster_config.timeout_seconds).min(max_secs))
    }

    /// 로드된 정책 수 (배포 시점 + 런타임)
    pub fn policy_count(&self) -> usize {
        let deploy = self
            .deploy_detector
            .as_ref()
            .map_or(0, |d| d.policy_set().len());
        deploy + self.runtime_detector.policy_set().len()
    }
}

impl<R> fmt::Debug for AdmissionState<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionState")
            .field("deploy_detector", &self.deploy_detector)
            .field("runtime_detector", &self.runtime_detector)
            .field("cluster_config", &self.cluster_config)
            .field("has_client", &self.client.is_some())
            .field("central_endpoint", &self.central_endpoint)
            .field("cache_version", &self.cache_version)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// 정책 목록을 최신 버전으로 올려 레지스트리를 만듭니다.
///
/// 변환이나 컴파일에 실패한 정책은 경고를 남기고 건너뜁니다.
/// `skip_scan_required`이면 이미지 스캔 결과가 필요한 정책도 건너뜁니다.
pub fn build_policy_set(
    migrator: &PolicyVersionMigrator,
    policies: &[Policy],
    skip_scan_required: bool,
) -> PolicySet {
    let set = PolicySet::default();
    for policy in policies {
        let mut policy = policy.clone();
        if let Err(e) = migrator.ensure_converted_to_latest(&mut policy) {
            warn!(policy_id = %policy.id, policy = %policy.name, error = %e, "failed to upgrade policy, skipping");
            continue;
        }
        if skip_scan_required && policy_requires_image_scan(&policy) {
            warn!(
                policy_id = %policy.id,
                policy = %policy.name,
                "policy requires image scans but inline scanning is disabled, skipping"
            );
            continue;
        }
        // 실패는 upsert_policy 내부에서 기록됨
        let _ = set.upsert_policy(&policy);
    }
    set
}
