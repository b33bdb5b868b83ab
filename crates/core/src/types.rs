//! 정책 도메인 타입 — 정책, 스코프, 예외, 알림
//!
//! 컨트롤 플레인이 전달하는 정책 레코드와, 정책 평가 결과로 생성되는
//! 알림을 정의합니다. 모든 크레이트가 이 타입들을 공유합니다.
//!
//! 와이어 형식은 JSON(snake_case 필드)이며, 레거시 `whitelists` 필드는
//! 역직렬화 시 `exclusions`로 통합됩니다. 직렬화 시에는 정책 버전이 레거시("1")이면
//! `whitelists`, 그 외에는 `exclusions` 이름을 씁니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::workload::{Deployment, ImageName};

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다 (대소문자 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "Info",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        write!(f, "{s}")
    }
}

/// 정책 생명주기 단계
///
/// 어떤 단계에 속하느냐에 따라 정책이 갖는 predicate 종류가 결정됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    /// 이미지 빌드 시점
    Build,
    /// 배포 생성/수정 시점
    Deploy,
    /// 실행 중 (프로세스 이벤트)
    Runtime,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Deploy => write!(f, "deploy"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// 정책 위반 시 수행할 집행 액션
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnforcementAction {
    /// 미지정 (정책 버전 1.2부터 제거됨)
    #[default]
    Unset,
    /// 레플리카를 0으로 축소
    ScaleToZero,
    /// 스케줄링 불가능한 노드 제약 추가
    UnsatisfiableNodeConstraint,
    /// 파드 종료 (런타임)
    KillPod,
    /// 빌드 실패 처리
    FailBuild,
    /// 배포 생성 거부
    FailDeploymentCreate,
    /// 배포 수정 거부
    FailDeploymentUpdate,
}

impl EnforcementAction {
    /// 배포 시점 집행기가 이해하는 액션인지 확인합니다.
    pub fn is_deploy_time(&self) -> bool {
        matches!(self, Self::ScaleToZero | Self::UnsatisfiableNodeConstraint)
    }

    /// 메트릭 레이블용 고정 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::ScaleToZero => "scale_to_zero",
            Self::UnsatisfiableNodeConstraint => "unsatisfiable_node_constraint",
            Self::KillPod => "kill_pod",
            Self::FailBuild => "fail_build",
            Self::FailDeploymentCreate => "fail_deployment_create",
            Self::FailDeploymentUpdate => "fail_deployment_update",
        }
    }
}

impl fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정책 그룹 내 값들의 결합 연산자
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOperator {
    /// 하나라도 만족하면 참
    #[default]
    Or,
    /// 모두 만족해야 참
    And,
}

/// 단일 필드 조건 그룹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyGroup {
    /// 조건 필드명 (예: `"Image Tag"`)
    pub field_name: String,
    /// 값 결합 연산자
    #[serde(default)]
    pub boolean_operator: BooleanOperator,
    /// 결과 반전 여부
    #[serde(default)]
    pub negate: bool,
    /// 비교 값 목록
    #[serde(default)]
    pub values: Vec<String>,
}

/// 정책 섹션 (그룹들의 AND 결합)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySection {
    /// 섹션 이름 (표시용)
    #[serde(default)]
    pub section_name: String,
    /// 조건 그룹 목록
    #[serde(default)]
    pub policy_groups: Vec<PolicyGroup>,
}

/// 스코프 라벨 셀렉터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeLabel {
    /// 라벨 키
    pub key: String,
    /// 라벨 값
    pub value: String,
}

/// 정책 적용 범위
///
/// 모든 필드는 선택적이며, 비어있는 필드는 모든 대상에 매칭됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// 클러스터 ID (정확히 일치)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    /// 네임스페이스 패턴 (정규식, 전체 일치)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// 라벨 셀렉터 (대소문자 무시 일치)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ScopeLabel>,
}

/// 배포 대상 예외
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentExclusion {
    /// 배포 이름 패턴
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 예외 범위
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

/// 이미지 대상 예외
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExclusion {
    /// 이미지 이름 접두어 (레지스트리/저장소 단위 예외 가능)
    pub name: String,
}

/// 예외 대상
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionTarget {
    /// 배포 단위 예외
    Deployment(DeploymentExclusion),
    /// 이미지 단위 예외
    Image(ImageExclusion),
}

/// 정책 예외 (레거시 명칭: whitelist)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// 예외 이름
    #[serde(default)]
    pub name: String,
    /// 예외 대상
    #[serde(flatten)]
    pub target: ExclusionTarget,
    /// 만료 시각 (없으면 만료되지 않음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Exclusion {
    /// 주어진 시각에 예외가 유효한지 확인합니다.
    ///
    /// 만료 시각이 `now`보다 이전이면 비활성입니다.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_none_or(|expiration| expiration >= now)
    }
}

/// 레거시(버전 "1") 이미지 이름 조건
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyImageNamePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// 레거시(버전 "1") 수치 비교 조건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyNumericalPolicy {
    /// 비교 연산자 (`">"`, `">="`, `"<"`, `"<="`, `"="`)
    pub op: String,
    /// 기준 값
    pub value: f32,
}

/// 레거시(버전 "1") 정책 조건 블록
///
/// 버전 1.1 업그레이드 시 정책 섹션으로 변환됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyPolicyFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<LegacyImageNamePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss: Option<LegacyNumericalPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_scan_exists: Option<bool>,
}

impl LegacyPolicyFields {
    /// 설정된 조건이 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// 보안 정책
///
/// 컨트롤 플레인이 소유하며 설정 푸시로 전달됩니다.
/// 컴파일 전에 복제되므로 레지스트리는 원본과 가변 상태를 공유하지 않습니다.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Policy {
    /// 정책 고유 ID
    pub id: String,
    /// 정책 이름
    pub name: String,
    /// 설명
    #[serde(default)]
    pub description: String,
    /// 근거
    #[serde(default)]
    pub rationale: String,
    /// 조치 방법
    #[serde(default)]
    pub remediation: String,
    /// 심각도
    #[serde(default)]
    pub severity: Severity,
    /// 카테고리
    #[serde(default)]
    pub categories: Vec<String>,
    /// 적용 생명주기 단계
    #[serde(default)]
    pub lifecycle_stages: Vec<LifecycleStage>,
    /// 조건 섹션 (OR 결합)
    #[serde(default)]
    pub policy_sections: Vec<PolicySection>,
    /// 적용 범위 (하나라도 일치하면 적용)
    #[serde(default)]
    pub scope: Vec<Scope>,
    /// 예외 목록
    #[serde(default, alias = "whitelists")]
    pub exclusions: Vec<Exclusion>,
    /// 집행 액션
    #[serde(default)]
    pub enforcement_actions: Vec<EnforcementAction>,
    /// 비활성화 여부
    #[serde(default)]
    pub disabled: bool,
    /// 스키마 버전 (빈 문자열은 레거시 "1")
    #[serde(default)]
    pub policy_version: String,
    /// 레거시 조건 블록
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<LegacyPolicyFields>,
}

/// 정책 직렬화 형식. 예외 목록은 버전에 따라 둘 중 하나의 이름으로만 나갑니다.
#[derive(Serialize)]
struct PolicyWire<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    rationale: &'a str,
    remediation: &'a str,
    severity: Severity,
    categories: &'a [String],
    lifecycle_stages: &'a [LifecycleStage],
    policy_sections: &'a [PolicySection],
    scope: &'a [Scope],
    #[serde(skip_serializing_if = "Option::is_none")]
    whitelists: Option<&'a [Exclusion]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusions: Option<&'a [Exclusion]>,
    enforcement_actions: &'a [EnforcementAction],
    disabled: bool,
    policy_version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a LegacyPolicyFields>,
}

impl Serialize for Policy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let exclusions = self.exclusions.as_slice();
        let (whitelists, exclusions) = if self.uses_legacy_schema() {
            (Some(exclusions), None)
        } else {
            (None, Some(exclusions))
        };
        PolicyWire {
            id: &self.id,
            name: &self.name,
            description: &self.description,
            rationale: &self.rationale,
            remediation: &self.remediation,
            severity: self.severity,
            categories: &self.categories,
            lifecycle_stages: &self.lifecycle_stages,
            policy_sections: &self.policy_sections,
            scope: &self.scope,
            whitelists,
            exclusions,
            enforcement_actions: &self.enforcement_actions,
            disabled: self.disabled,
            policy_version: &self.policy_version,
            fields: self.fields.as_ref(),
        }
        .serialize(serializer)
    }
}

impl Policy {
    /// 최소 필드만 채운 정책을 생성합니다.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rationale: String::new(),
            remediation: String::new(),
            severity: Severity::default(),
            categories: Vec::new(),
            lifecycle_stages: Vec::new(),
            policy_sections: Vec::new(),
            scope: Vec::new(),
            exclusions: Vec::new(),
            enforcement_actions: Vec::new(),
            disabled: false,
            policy_version: String::new(),
            fields: None,
        }
    }

    /// 레거시 스키마("1" 또는 빈 문자열) 정책인지 확인합니다.
    pub fn uses_legacy_schema(&self) -> bool {
        matches!(self.policy_version.as_str(), "" | "1")
    }

    /// 해당 생명주기 단계를 포함하는지 확인합니다.
    pub fn has_stage(&self, stage: LifecycleStage) -> bool {
        self.lifecycle_stages.contains(&stage)
    }

    /// 정책에서 사용하는 모든 조건 필드명을 순회합니다.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.policy_sections
            .iter()
            .flat_map(|section| section.policy_groups.iter())
            .map(|group| group.field_name.as_str())
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// 위반 상세
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// 사람이 읽을 수 있는 위반 메시지
    pub message: String,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 알림 대상 배포 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub cluster_id: String,
}

impl From<&Deployment> for DeploymentRef {
    fn from(deployment: &Deployment) -> Self {
        Self {
            id: deployment.id.clone(),
            name: deployment.name.clone(),
            namespace: deployment.namespace.clone(),
            cluster_id: deployment.cluster_id.clone(),
        }
    }
}

/// 알림 대상
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEntity {
    /// 배포
    Deployment(DeploymentRef),
    /// 이미지
    Image(ImageName),
}

/// 정책 위반 알림
///
/// 탐지기가 정책 위반을 발견하면 생성합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID (UUID v4)
    pub id: String,
    /// 위반된 정책 (복제본)
    pub policy: Policy,
    /// 탐지 단계
    pub lifecycle_stage: LifecycleStage,
    /// 대상
    pub entity: AlertEntity,
    /// 위반 목록
    pub violations: Vec<Violation>,
    /// 적용할 집행 액션
    pub enforcement: Option<EnforcementAction>,
    /// 생성 시각
    pub time: DateTime<Utc>,
}

impl Alert {
    /// 새 알림을 생성합니다.
    pub fn new(
        policy: Policy,
        lifecycle_stage: LifecycleStage,
        entity: AlertEntity,
        violations: Vec<Violation>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            policy,
            lifecycle_stage,
            entity,
            violations,
            enforcement: None,
            time: Utc::now(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} violations, stage: {})",
            self.policy.severity,
            self.policy.name,
            self.violations.len(),
            self.lifecycle_stage,
        )
    }
}
