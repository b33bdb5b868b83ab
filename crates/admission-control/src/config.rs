//! 어드미션 컨트롤 설정
//!
//! [`AdmissionControlConfig`]는 core의 [`AdmissionConfig`](kubeward_core::config::AdmissionConfig)를
//! 기반으로 결정 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use kubeward_core::config::KubewardConfig;
//! use kubeward_admission::config::AdmissionControlConfig;
//!
//! let core_config = KubewardConfig::default();
//! let config = AdmissionControlConfig::from_core(&core_config.admission);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AdmissionError;

/// 어드미션 컨트롤 설정
///
/// core의 `AdmissionConfig`에서 파생되며, 엔진 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionControlConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 플랫폼 자체 네임스페이스
    pub namespace: String,
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

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 클러스터 설정의 스캔 대기 시간 상한 (초)
    pub max_scan_timeout_secs: u64,
}

impl Default for AdmissionControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "stackrox".to_owned(),
            alert_channel_capacity: 256,
            settings_channel_capacity: 16,
            image_cache_max_bytes: 200 * 1024 * 1024,
            image_cache_max_item_bytes: 1024 * 1024,
            flatten_image_data: false,
            max_scan_timeout_secs: 25,
        }
    }
}

/// 설정 상한값 상수
const MAX_CHANNEL_CAPACITY: usize = 65_536;
const MAX_SCAN_TIMEOUT_SECS: u64 = 25;

impl AdmissionControlConfig {
    /// core의 `AdmissionConfig`에서 엔진 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &kubeward_core::config::AdmissionConfig) -> Self {
        Self {
            enabled: core.enabled,
            namespace: core.namespace.clone(),
            alert_channel_capacity: core.alert_channel_capacity,
            settings_channel_capacity: core.settings_channel_capacity,
            image_cache_max_bytes: core.image_cache_max_bytes,
            image_cache_max_item_bytes: core.image_cache_max_item_bytes,
            flatten_image_data: core.flatten_image_data,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.enabled && self.namespace.is_empty() {
            return Err(AdmissionError::Config {
                field: "namespace".to_owned(),
                reason: "namespace must not be empty when enabled".to_owned(),
            });
        }

        if self.alert_channel_capacity == 0 || self.alert_channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(AdmissionError::Config {
                field: "alert_channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        if self.settings_channel_capacity == 0
            || self.settings_channel_capacity > MAX_CHANNEL_CAPACITY
        {
            return Err(AdmissionError::Config {
                field: "settings_channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        if self.image_cache_max_bytes == 0 {
            return Err(AdmissionError::Config {
                field: "image_cache_max_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.image_cache_max_item_bytes > self.image_cache_max_bytes {
            return Err(AdmissionError::Config {
                field: "image_cache_max_item_bytes".to_owned(),
                reason: "must not exceed image_cache_max_bytes".to_owned(),
            });
        }

        if self.max_scan_timeout_secs == 0 || self.max_scan_timeout_secs > MAX_SCAN_TIMEOUT_SECS {
            return Err(AdmissionError::Config {
                field: "max_scan_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_SCAN_TIMEOUT_SECS}"),
            });
        }

        Ok(())
    }
}

/// 어드미션 컨트롤 설정 빌더
#[derive(Default)]
pub struct AdmissionControlConfigBuilder {
    config: AdmissionControlConfig,
}

impl AdmissionControlConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 활성화 여부를 설정합니다.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 플랫폼 자체 네임스페이스를 설정합니다.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// 알림 채널 용량을 설정합니다.
    pub fn alert_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.alert_channel_capacity = capacity;
        self
    }

    /// 설정 업데이트 채널 용량을 설정합니다.
    pub fn settings_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.settings_channel_capacity = capacity;
        self
    }

    /// 이미지 캐시 예산을 설정합니다.
    pub fn image_cache(mut self, max_bytes: u64, max_item_bytes: u64) -> Self {
        self.config.image_cache_max_bytes = max_bytes;
        self.config.image_cache_max_item_bytes = max_item_bytes;
        self
    }

    /// 이미지 캐시 키에 이름을 포함할지 설정합니다.
    pub fn flatten_image_data(mut self, flatten: bool) -> Self {
        self.config.flatten_image_data = flatten;
        self
    }

    /// 스캔 대기 시간 상한(초)을 설정합니다.
    pub fn max_scan_timeout_secs(mut self, secs: u64) -> Self {
        self.config.max_scan_timeout_secs = secs;
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<AdmissionControlConfig, AdmissionError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
