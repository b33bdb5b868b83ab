//! 우회 규칙 — 객체를 디코딩하기 전에 평가 없이 허용할 요청을 판별
//!
//! 규칙은 순서대로 검사하며 처음 일치한 사유가 반환됩니다.

use std::collections::HashSet;

use crate::review::{AdmissionRequest, Operation, RequestExt};
use crate::settings::ClusterConfig;

/// 시스템 네임스페이스
pub const SYSTEM_NAMESPACES: &[&str] = &["kube-system", "kube-public", "istio-system"];

/// 시스템 네임스페이스 접두어
pub const SYSTEM_NAMESPACE_PREFIX: &str = "openshift-";

/// 항상 허용하는 컨트롤 플레인 사용자
pub const ALWAYS_ALLOWED_USERS: &[&str] = &[
    "system:kube-proxy",
    "system:kube-scheduler",
    "system:kube-controller-manager",
    "system:serviceaccount:kube-system:replicaset-controller",
    "system:serviceaccount:kube-system:replication-controller",
    "system:serviceaccount:kube-system:deployment-controller",
    "system:serviceaccount:kube-system:statefulset-controller",
    "system:serviceaccount:kube-system:daemon-set-controller",
    "system:serviceaccount:kube-system:cronjob-controller",
    "system:serviceaccount:kube-system:job-controller",
    "system:serviceaccount:kube-system:generic-garbage-collector",
];

const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";

/// 네임스페이스가 시스템 네임스페이스인지 확인합니다.
pub fn is_system_namespace(namespace: &str) -> bool {
    SYSTEM_NAMESPACES.contains(&namespace) || namespace.starts_with(SYSTEM_NAMESPACE_PREFIX)
}

/// 우회 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// 배포 시점 탐지기 없음
    NoDetector,
    /// 플랫폼 자체 네임스페이스
    OwnNamespace,
    /// 시스템 네임스페이스
    SystemNamespace,
    /// 하위 리소스 요청
    SubResource,
    /// 집행 대상이 아닌 작업
    OperationNotEnforced,
    /// 허용된 사용자 또는 그룹
    AllowedUser,
    /// 시스템 네임스페이스의 서비스 어카운트
    SystemServiceAccount,
    /// break-glass 어노테이션
    BreakGlass,
    /// 컨트롤러가 관리하는 객체
    Owned,
}

impl BypassReason {
    /// 메트릭 레이블용 고정 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDetector => "no_detector",
            Self::OwnNamespace => "own_namespace",
            Self::SystemNamespace => "system_namespace",
            Self::SubResource => "sub_resource",
            Self::OperationNotEnforced => "operation_not_enforced",
            Self::AllowedUser => "allowed_user",
            Self::SystemServiceAccount => "system_service_account",
            Self::BreakGlass => "break_glass",
            Self::Owned => "owned",
        }
    }
}

impl std::fmt::Display for BypassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 설정 스냅샷에서 만든 우회 규칙
#[derive(Debug, Clone)]
pub struct BypassRules {
    own_namespace: String,
    users: HashSet<String>,
    groups: HashSet<String>,
    enforced_operations: Vec<Operation>,
}

impl BypassRules {
    /// 클러스터 설정으로부터 규칙을 만듭니다.
    ///
    /// 집행 대상 작업은 항상 `CREATE`이며, `enforce_on_updates`이면 `UPDATE`가 추가됩니다.
    pub fn new(own_namespace: impl Into<String>, cluster_config: &ClusterConfig) -> Self {
        let mut enforced_operations = vec![Operation::Create];
        if cluster_config.enforce_on_updates {
            enforced_operations.push(Operation::Update);
        }
        Self {
            own_namespace: own_namespace.into(),
            users: cluster_config.bypass_users.iter().cloned().collect(),
            groups: cluster_config.bypass_groups.iter().cloned().collect(),
            enforced_operations,
        }
    }

    /// 집행 대상 작업인지 확인합니다.
    pub fn enforces(&self, operation: Operation) -> bool {
        self.enforced_operations.contains(&operation)
    }

    /// 요청이 우회 대상이면 사유를 반환합니다.
    pub fn check(&self, request: &AdmissionRequest, has_detector: bool) -> Option<BypassReason> {
        if !has_detector {
            return Some(BypassReason::NoDetector);
        }
        let namespace = request.namespace();
        if namespace == self.own_namespace {
            return Some(BypassReason::OwnNamespace);
        }
        if is_system_namespace(namespace) {
            return Some(BypassReason::SystemNamespace);
        }
        if request.sub_resource.as_deref().is_some_and(|s| !s.is_empty()) {
            return Some(BypassReason::SubResource);
        }
        if !self.enforces(request.operation.clone()) {
            return Some(BypassReason::OperationNotEnforced);
        }

        let username = request.username();
        if ALWAYS_ALLOWED_USERS.contains(&username)
            || self.users.contains(username)
            || request.groups().iter().any(|g| self.groups.contains(g))
        {
            return Some(BypassReason::AllowedUser);
        }

        if let Some(account) = username.strip_prefix(SERVICE_ACCOUNT_PREFIX)
            && let Some((namespace, _)) = account.split_once(':')
            && is_system_namespace(namespace)
        {
            return Some(BypassReason::SystemServiceAccount);
        }
        None
    }
}
