//! 컨트롤 플레인이 푸시하는 어드미션 설정
//!
//! 설정은 타임스탬프가 증가하는 순서로만 적용되며, `None`은 비활성화를 뜻합니다.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kubeward_core::types::Policy;

use crate::error::AdmissionError;

/// 스캔 대기 시간 기본값 (초)
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 20;

/// 클러스터 단위 어드미션 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// 배포 시점 정책 집행 여부
    pub enabled: bool,
    /// 수정(Update) 요청도 집행할지 여부
    pub enforce_on_updates: bool,
    /// 미스캔 이미지를 요청 처리 중 스캔할지 여부
    pub scan_inline: bool,
    /// break-glass 어노테이션 우회 금지
    pub disable_bypass: bool,
    /// 스캔 결과 대기 시간 (초, 0이면 대기하지 않음)
    pub timeout_seconds: u32,
    /// 우회가 허용된 사용자
    pub bypass_users: Vec<String>,
    /// 우회가 허용된 그룹
    pub bypass_groups: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enforce_on_updates: true,
            scan_inline: false,
            disable_bypass: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            bypass_users: Vec::new(),
            bypass_groups: Vec::new(),
        }
    }
}

/// 어드미션 설정 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionSettings {
    /// 설정 생성 시각 (단조 증가)
    pub timestamp: DateTime<Utc>,
    /// 배포 시점에 집행할 정책
    #[serde(default)]
    pub enforced_deploy_time_policies: Vec<Policy>,
    /// 런타임 정책
    #[serde(default)]
    pub runtime_policies: Vec<Policy>,
    /// 클러스터 설정
    #[serde(default)]
    pub cluster_config: ClusterConfig,
    /// 컨트롤 플레인 엔드포인트 (비어 있으면 연결하지 않음)
    #[serde(default)]
    pub central_endpoint: String,
    /// 이미지 캐시 버전 토큰 (바뀌면 캐시 비움)
    #[serde(default)]
    pub cache_version: String,
}

impl AdmissionSettings {
    /// 빈 정책 목록과 기본 클러스터 설정으로 생성합니다.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            enforced_deploy_time_policies: Vec::new(),
            runtime_policies: Vec::new(),
            cluster_config: ClusterConfig::default(),
            central_endpoint: String::new(),
            cache_version: String::new(),
        }
    }

    /// JSON 문자열에서 설정을 파싱합니다.
    pub fn parse(json: &str) -> Result<Self, AdmissionError> {
        serde_json::from_str(json).map_err(|e| AdmissionError::Config {
            field: "settings".to_owned(),
            reason: e.to_string(),
        })
    }

    /// JSON 파일에서 설정을 읽습니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AdmissionError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AdmissionError::Config {
                    field: "settings_path".to_owned(),
                    reason: format!("{}: {e}", path.display()),
                })?;
        Self::parse(&content)
    }
}
