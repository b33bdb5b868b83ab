//! 정책 엔진 에러 타입
//!
//! [`PolicyError`]는 컴파일, 레지스트리 조회, 평가 에러를 표현하고
//! [`VersionError`]는 정책 스키마 버전 변환 에러를 표현합니다.
//! 두 타입 모두 `KubewardError`로 변환되어 `?`로 전파됩니다.

use kubeward_core::error::{DetectionError, KubewardError};

/// 정책 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// 패턴(정규식) 컴파일 실패
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// 원본 패턴
        pattern: String,
        /// 실패 사유
        reason: String,
    },

    /// 정책 컴파일 실패 (잘못된 스코프/예외/조건)
    #[error("policy '{policy_id}' failed to compile: {reason}")]
    Compile {
        /// 정책 ID
        policy_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 등록되지 않은 정책
    #[error("policy '{id}' not found")]
    NotFound {
        /// 조회한 정책 ID
        id: String,
    },

    /// 정책 평가 실패
    #[error("policy '{policy}' failed on {namespace}/{name}: {reason}")]
    Evaluation {
        /// 정책 이름
        policy: String,
        /// 대상 네임스페이스
        namespace: String,
        /// 대상 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 정책 버전 변환 실패
    #[error(transparent)]
    Version(#[from] VersionError),

    /// 여러 정책에서 발생한 에러 묶음
    #[error("{} policy errors: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<PolicyError>),
}

impl PolicyError {
    /// 에러를 특정 정책의 컴파일 에러로 감쌉니다.
    pub(crate) fn for_policy(self, policy_id: &str) -> Self {
        match self {
            Self::Compile { .. } => self,
            other => Self::Compile {
                policy_id: policy_id.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

fn join_errors(errors: &[PolicyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 정책 스키마 버전 변환 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// 알 수 없는 버전 문자열
    #[error("unknown policy version '{0}'")]
    UnknownVersion(String),

    /// 상위 버전에서 하위 버전으로의 암묵적 변환 요청
    #[error("cannot implicitly downgrade policy from version {from} to {to}")]
    ImplicitDowngrade {
        /// 현재 버전
        from: String,
        /// 요청한 버전
        to: String,
    },

    /// 업그레이드 단계 누락
    #[error("policy version {from} is not upgradable to {to}")]
    NotUpgradable {
        /// 업그레이드할 수 없는 버전
        from: String,
        /// 다음 단계 버전
        to: String,
    },

    /// 다운그레이드 단계 누락
    #[error("policy version {from} is not downgradable to {to}")]
    NotDowngradable {
        /// 다운그레이드할 수 없는 버전
        from: String,
        /// 이전 단계 버전
        to: String,
    },

    /// 변환 후 버전 불일치
    #[error("policy ended at version {actual}, expected {expected}")]
    Mismatch {
        /// 기대한 버전
        expected: String,
        /// 실제 버전
        actual: String,
    },
}

impl From<PolicyError> for KubewardError {
    fn from(err: PolicyError) -> Self {
        let detection = match &err {
            PolicyError::InvalidPattern { .. }
            | PolicyError::Compile { .. }
            | PolicyError::Aggregate(_) => DetectionError::Compile(err.to_string()),
            PolicyError::NotFound { id } => DetectionError::NotFound(id.clone()),
            PolicyError::Evaluation { .. } => DetectionError::Evaluation(err.to_string()),
            PolicyError::Version(_) => DetectionError::Version(err.to_string()),
        };
        KubewardError::Detection(detection)
    }
}

impl From<VersionError> for KubewardError {
    fn from(err: VersionError) -> Self {
        KubewardError::Detection(DetectionError::Version(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display() {
        let err = PolicyError::Compile {
            policy_id: "policy-001".to_owned(),
            reason: "bad regex".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("policy-001"));
        assert!(msg.contains("bad regex"));
    }

    #[test]
    fn not_found_names_the_id() {
        let err = PolicyError::NotFound {
            id: "missing".to_owned(),
        };
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn aggregate_lists_every_error() {
        let err = PolicyError::Aggregate(vec![
            PolicyError::NotFound { id: "a".to_owned() },
            PolicyError::NotFound { id: "b".to_owned() },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 policy errors"));
        assert!(msg.contains("'a'"));
        assert!(msg.contains("'b'"));
    }

    #[test]
    fn for_policy_wraps_pattern_error() {
        let err = PolicyError::InvalidPattern {
            pattern: "(".to_owned(),
            reason: "unclosed group".to_owned(),
        }
        .for_policy("p1");
        assert!(matches!(err, PolicyError::Compile { ref policy_id, .. } if policy_id == "p1"));
    }

    #[test]
    fn version_error_display() {
        let err = VersionError::NotUpgradable {
            from: "1".to_owned(),
            to: "1.1".to_owned(),
        };
        assert_eq!(err.to_string(), "policy version 1 is not upgradable to 1.1");
    }

    #[test]
    fn converts_to_kubeward_error() {
        let err: KubewardError = PolicyError::NotFound { id: "x".to_owned() }.into();
        assert!(matches!(
            err,
            KubewardError::Detection(DetectionError::NotFound(_))
        ));

        let err: KubewardError = VersionError::UnknownVersion("9".to_owned()).into();
        assert!(matches!(
            err,
            KubewardError::Detection(DetectionError::Version(_))
        ));
    }
}
