//! 설정 관리 — kubeward.toml 파싱 및 런타임 설정
//!
//! [`KubewardConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`KUBEWARD_ADMISSION_NAMESPACE=stackrox` 형식)
//! 3. 설정 파일 (`kubeward.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), kubeward_core::error::KubewardError> {
//! use kubeward_core::config::KubewardConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = KubewardConfig::load("kubeward.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = KubewardConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, KubewardError};

/// kubeward 통합 설정
///
/// `kubeward.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubewardConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 어드미션 컨트롤 설정
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl KubewardConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, KubewardError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, KubewardError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KubewardError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                KubewardError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, KubewardError> {
        toml::from_str(toml_str).map_err(|e| {
            KubewardError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `KUBEWARD_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "KUBEWARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "KUBEWARD_GENERAL_LOG_FORMAT");

        // Admission
        override_bool(&mut self.admission.enabled, "KUBEWARD_ADMISSION_ENABLED");
        override_string(
            &mut self.admission.namespace,
            "KUBEWARD_ADMISSION_NAMESPACE",
        );
        override_string(
            &mut self.admission.settings_path,
            "KUBEWARD_ADMISSION_SETTINGS_PATH",
        );
        override_usize(
            &mut self.admission.alert_channel_capacity,
            "KUBEWARD_ADMISSION_ALERT_CHANNEL_CAPACITY",
        );
        override_usize(
            &mut self.admission.settings_channel_capacity,
            "KUBEWARD_ADMISSION_SETTINGS_CHANNEL_CAPACITY",
        );
        override_u64(
            &mut self.admission.image_cache_max_bytes,
            "KUBEWARD_ADMISSION_IMAGE_CACHE_MAX_BYTES",
        );
        override_u64(
            &mut self.admission.image_cache_max_item_bytes,
            "KUBEWARD_ADMISSION_IMAGE_CACHE_MAX_ITEM_BYTES",
        );
        override_bool(
            &mut self.admission.flatten_image_data,
            "KUBEWARD_ADMISSION_FLATTEN_IMAGE_DATA",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "KUBEWARD_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "KUBEWARD_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "KUBEWARD_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), KubewardError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.admission.enabled && self.admission.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "admission.namespace".to_owned(),
                reason: "namespace must not be empty when admission control is enabled"
                    .to_owned(),
            }
            .into());
        }

        if self.admission.image_cache_max_item_bytes > self.admission.image_cache_max_bytes {
            return Err(ConfigError::InvalidValue {
                field: "admission.image_cache_max_item_bytes".to_owned(),
                reason: "must not exceed image_cache_max_bytes".to_owned(),
            }
            .into());
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "port must be non-zero when metrics are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 어드미션 컨트롤 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 플랫폼 자체 네임스페이스 (항상 통과)
    pub namespace: String,
    /// 정책 설정 JSON 파일 경로
    pub settings_path: String,
    /// 알림 채널 용량
    pub alert_channel_capacity: usize,
    /// 설정 업데이트 채널 용량
    pub settings_channel_capacity: usize,
    /// 이미지 캐시 최대 크기 (바이트)
    pub image_cache_max_bytes: u64,
    /// 이미지 캐시 항목당 최대 크기 (바이트)
    pub image_cache_max_item_bytes: u64,
    /// 이미지 캐시 키에 이름을 포함할지 여부
    pub flatten_image_data: bool,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "stackrox".to_owned(),
            settings_path: "/etc/kubeward/settings.json".to_owned(),
            alert_channel_capacity: 256,
            settings_channel_capacity: 16,
            image_cache_max_bytes: 200 * 1024 * 1024,
            image_cache_max_item_bytes: 1024 * 1024,
            flatten_image_data: false,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
