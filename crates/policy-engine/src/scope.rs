//! 스코프 컴파일러 — 클러스터/네임스페이스/라벨 조건을 미리 컴파일된 매처로 변환
//!
//! 네임스페이스 패턴은 정규식으로 한 번만 컴파일되고, 이후 매칭은
//! 할당 없이 수행됩니다. 패턴은 전체 일치(`^(?:pattern)$`)로 고정됩니다.

use std::collections::BTreeMap;

use regex::Regex;

use kubeward_core::types::{Scope, ScopeLabel};
use kubeward_core::workload::Deployment;

use crate::error::PolicyError;

/// 패턴을 전체 일치 정규식으로 컴파일합니다.
pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex, PolicyError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| PolicyError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}

/// 컴파일된 스코프
///
/// 비어있는 조건은 모든 대상에 매칭됩니다.
#[derive(Debug, Clone)]
pub struct CompiledScope {
    cluster: Option<String>,
    namespace: Option<Regex>,
    label: Option<ScopeLabel>,
}

/// 스코프를 컴파일합니다.
///
/// 네임스페이스 패턴이 잘못되었으면 [`PolicyError::InvalidPattern`]을 반환합니다.
pub fn compile_scope(scope: &Scope) -> Result<CompiledScope, PolicyError> {
    let namespace = match scope.namespace.as_deref() {
        Some(pattern) if !pattern.is_empty() => Some(compile_anchored(pattern)?),
        _ => None,
    };

    Ok(CompiledScope {
        cluster: scope.cluster.clone().filter(|c| !c.is_empty()),
        namespace,
        label: scope.label.clone().filter(|l| !l.key.is_empty()),
    })
}

impl CompiledScope {
    /// 클러스터 ID가 일치하는지 확인합니다.
    pub fn matches_cluster(&self, cluster_id: &str) -> bool {
        self.cluster.as_deref().is_none_or(|c| c == cluster_id)
    }

    /// 네임스페이스가 패턴과 일치하는지 확인합니다.
    pub fn matches_namespace(&self, namespace: &str) -> bool {
        self.namespace
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(namespace))
    }

    /// 라벨 집합에 셀렉터와 일치하는 항목이 있는지 확인합니다 (대소문자 무시).
    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        self.label.as_ref().is_none_or(|selector| {
            labels.iter().any(|(key, value)| {
                key.eq_ignore_ascii_case(&selector.key)
                    && value.eq_ignore_ascii_case(&selector.value)
            })
        })
    }

    /// 배포가 스코프 안에 있는지 확인합니다.
    pub fn matches_deployment(&self, deployment: &Deployment) -> bool {
        self.matches_cluster(&deployment.cluster_id)
            && self.matches_namespace(&deployment.namespace)
            && self.matches_labels(&deployment.labels)
    }

    /// 네임스페이스 패턴이 설정되어 있는지 확인합니다.
    pub fn has_namespace(&self) -> bool {
        self.namespace.is_some()
    }

    /// 라벨 셀렉터가 설정되어 있는지 확인합니다.
    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }
}
