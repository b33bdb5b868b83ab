//! 어드미션 컨트롤 에러 타입
//!
//! [`AdmissionError`]는 결정 경로와 설정 적용 중 발생하는 에러를 표현합니다.
//! `From<AdmissionError> for KubewardError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 결정 경로 에러는 웹훅 호출자에게 그대로 전달되며, fail-open/fail-closed 판단은
//! 호출자의 몫입니다.

use kubeward_core::error::{
    ConfigError, DecisionError, DetectionError, KubewardError, PipelineError,
};
use kubeward_core::workload::Deployment;
use kubeward_policy::PolicyError;

/// 어드미션 컨트롤 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// 설정이 없어 비활성 상태
    #[error("admission control is disabled")]
    Disabled,

    /// 지원하지 않는 종류이거나 형식이 잘못된 객체
    #[error("decode error: {0}")]
    Decode(String),

    /// 객체를 배포 표현으로 변환하지 못함
    #[error("conversion error: {0}")]
    Conversion(String),

    /// 정책 평가 실패
    #[error("detection failed for {namespace}/{name} (policy '{policy}'): {reason}")]
    Detection {
        /// 실패한 정책 이름 (여러 개면 쉼표로 구분)
        policy: String,
        /// 배포 네임스페이스
        namespace: String,
        /// 배포 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 컨트롤 플레인 연결/스캔 실패
    #[error("central connection error: {0}")]
    Connection(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl AdmissionError {
    /// 탐지기 에러를 배포 정보와 함께 감쌉니다.
    pub fn detection(err: PolicyError, deployment: &Deployment) -> Self {
        let policy = match &err {
            PolicyError::Evaluation { policy, .. } => policy.clone(),
            PolicyError::Aggregate(errors) => errors
                .iter()
                .filter_map(|e| match e {
                    PolicyError::Evaluation { policy, .. } => Some(policy.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        };
        Self::Detection {
            policy,
            namespace: deployment.namespace.clone(),
            name: deployment.name.clone(),
            reason: err.to_string(),
        }
    }
}

impl From<AdmissionError> for KubewardError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Disabled => KubewardError::Decision(DecisionError::Disabled),
            AdmissionError::Decode(msg) => KubewardError::Decision(DecisionError::Decode(msg)),
            AdmissionError::Conversion(msg) => {
                KubewardError::Decision(DecisionError::Conversion(msg))
            }
            AdmissionError::Connection(msg) => {
                KubewardError::Decision(DecisionError::Connection(msg))
            }
            AdmissionError::Detection { .. } => {
                KubewardError::Detection(DetectionError::Evaluation(err.to_string()))
            }
            AdmissionError::Config { field, reason } => {
                KubewardError::Config(ConfigError::InvalidValue { field, reason })
            }
            AdmissionError::Channel(msg) => KubewardError::Pipeline(PipelineError::ChannelSend(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> Deployment {
        Deployment {
            name: "web".to_owned(),
            namespace: "prod".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn detection_error_display_names_deployment() {
        let err = AdmissionError::Detection {
            policy: "latest tag".to_owned(),
            namespace: "prod".to_owned(),
            name: "web".to_owned(),
            reason: "boom".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("prod/web"));
        assert!(msg.contains("latest tag"));
    }

    #[test]
    fn detection_from_aggregate_lists_policies() {
        let evaluation = |policy: &str| PolicyError::Evaluation {
            policy: policy.to_owned(),
            namespace: "prod".to_owned(),
            name: "web".to_owned(),
            reason: "container missing".to_owned(),
        };
        let err = AdmissionError::detection(
            PolicyError::Aggregate(vec![evaluation("a"), evaluation("b")]),
            &deployment(),
        );
        let AdmissionError::Detection { policy, namespace, .. } = err else {
            panic!("expected detection error");
        };
        assert_eq!(policy, "a, b");
        assert_eq!(namespace, "prod");
    }

    #[test]
    fn converts_to_kubeward_error_disabled() {
        let err: KubewardError = AdmissionError::Disabled.into();
        assert!(matches!(err, KubewardError::Decision(DecisionError::Disabled)));
    }

    #[test]
    fn converts_to_kubeward_error_decode() {
        let err: KubewardError = AdmissionError::Decode("bad kind".to_owned()).into();
        assert!(matches!(err, KubewardError::Decision(DecisionError::Decode(_))));
    }

    #[test]
    fn converts_to_kubeward_error_config() {
        let err: KubewardError = AdmissionError::Config {
            field: "namespace".to_owned(),
            reason: "empty".to_owned(),
        }
        .into();
        assert!(matches!(err, KubewardError::Config(_)));
    }

    #[test]
    fn converts_to_kubeward_error_detection() {
        let err: KubewardError =
            AdmissionError::detection(PolicyError::NotFound { id: "p".to_owned() }, &deployment())
                .into();
        assert!(matches!(err, KubewardError::Detection(_)));
    }
}
