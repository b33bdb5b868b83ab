//! 이벤트 — 모듈 간 통신의 기본 단위
//!
//! 어드미션 컨트롤러는 생성한 알림을 [`AlertBatch`]로 묶어
//! 채널로 전송하고, 데몬이 이를 수신해 컨트롤 플레인으로 전달합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::Alert;

/// 어드미션 컨트롤 모듈명
pub const MODULE_ADMISSION_CONTROL: &str = "admission-control";
/// 런타임 탐지 모듈명
pub const MODULE_RUNTIME_DETECTION: &str = "runtime-detection";

/// 알림 배치 이벤트 타입
pub const EVENT_TYPE_ALERT_BATCH: &str = "alert_batch";

/// 이벤트 메타데이터. 모든 이벤트에 공통으로 포함되는 추적 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 분산 추적 ID
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id로 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self::new(source_module, uuid::Uuid::new_v4().to_string())
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널 전송이 가능합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명
    fn event_type(&self) -> &str;
}

/// 단일 결정(어드미션 요청 또는 프로세스 이벤트)에서 발생한 알림 묶음
#[derive(Debug, Clone)]
pub struct AlertBatch {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 원인 요청 UID (어드미션 요청인 경우)
    pub request_uid: Option<String>,
    /// 알림 목록
    pub alerts: Vec<Alert>,
}

impl AlertBatch {
    /// 새 trace를 시작하는 알림 배치를 생성합니다.
    pub fn new(
        source_module: impl Into<String>,
        request_uid: Option<String>,
        alerts: Vec<Alert>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(source_module),
            request_uid,
            alerts,
        }
    }
}

impl Event for AlertBatch {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_ALERT_BATCH
    }
}

impl fmt::Display for AlertBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AlertBatch[{}] source={} request={} alerts={}",
            &self.id[..8.min(self.id.len())],
            self.metadata.source_module,
            self.request_uid.as_deref().unwrap_or("-"),
            self.alerts.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertEntity, DeploymentRef, LifecycleStage, Policy, Violation};

    fn sample_alert() -> Alert {
        Alert::new(
            Policy::new("p1", "no latest"),
            LifecycleStage::Deploy,
            AlertEntity::Deployment(DeploymentRef {
                id: "d1".to_owned(),
                name: "web".to_owned(),
                namespace: "default".to_owned(),
                cluster_id: "c1".to_owned(),
            }),
            vec![Violation::new("image tag is latest")],
        )
    }

    #[test]
    fn metadata_new_trace_is_unique() {
        let a = EventMetadata::with_new_trace(MODULE_ADMISSION_CONTROL);
        let b = EventMetadata::with_new_trace(MODULE_ADMISSION_CONTROL);
        assert_ne!(a.trace_id, b.trace_id);
    }

    #[test]
    fn alert_batch_implements_event() {
        let batch = AlertBatch::new(
            MODULE_ADMISSION_CONTROL,
            Some("uid-1".to_owned()),
            vec![sample_alert()],
        );
        assert_eq!(batch.event_type(), EVENT_TYPE_ALERT_BATCH);
        assert_eq!(batch.metadata().source_module, MODULE_ADMISSION_CONTROL);
        assert!(!batch.event_id().is_empty());
    }

    #[test]
    fn alert_batch_display() {
        let batch = AlertBatch::new(MODULE_RUNTIME_DETECTION, None, vec![sample_alert()]);
        let display = batch.to_string();
        assert!(display.contains("request=-"));
        assert!(display.contains("alerts=1"));
    }

    #[test]
    fn alert_batch_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<AlertBatch>();
    }
}
