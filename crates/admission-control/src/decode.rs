//! 요청 객체 디코딩 — 쿠버네티스 워크로드를 내부 배포 표현으로 변환
//!
//! 지원하는 종류는 닫힌 집합입니다 ([`WorkloadKind`]). 컨트롤러가 관리하는 객체
//! (`ownerReferences`에 `controller: true`)는 상위 객체에서 이미 평가되었으므로 `None`을 반환합니다.

use std::fmt;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment as K8sDeployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Pod, PodSpec, PodTemplateSpec, ReplicationController};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use kubeward_core::workload::{Container, Deployment, ImageName};

use crate::error::AdmissionError;
use crate::review::{AdmissionRequest, RequestExt};

/// 지원하는 워크로드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Pod,
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicationController,
    ReplicaSet,
    CronJob,
    Job,
    DeploymentConfig,
}

impl WorkloadKind {
    /// 쿠버네티스 kind 이름으로 찾습니다.
    pub fn from_kind(kind: &str) -> Option<Self> {
        Some(match kind {
            "Pod" => Self::Pod,
            "Deployment" => Self::Deployment,
            "StatefulSet" => Self::StatefulSet,
            "DaemonSet" => Self::DaemonSet,
            "ReplicationController" => Self::ReplicationController,
            "ReplicaSet" => Self::ReplicaSet,
            "CronJob" => Self::CronJob,
            "Job" => Self::Job,
            "DeploymentConfig" => Self::DeploymentConfig,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::ReplicationController => "ReplicationController",
            Self::ReplicaSet => "ReplicaSet",
            Self::CronJob => "CronJob",
            Self::Job => "Job",
            Self::DeploymentConfig => "DeploymentConfig",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenShift `apps.openshift.io/v1` DeploymentConfig
#[derive(Debug, Deserialize)]
struct DeploymentConfig {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: Option<DeploymentConfigSpec>,
}

#[derive(Debug, Deserialize)]
struct DeploymentConfigSpec {
    #[serde(default)]
    template: Option<PodTemplateSpec>,
}

fn parse<T: DeserializeOwned>(
    kind: WorkloadKind,
    object: &serde_json::Value,
) -> Result<T, AdmissionError> {
    T::deserialize(object).map_err(|e| AdmissionError::Decode(format!("invalid {kind} object: {e}")))
}

fn template_spec(template: Option<PodTemplateSpec>) -> Option<PodSpec> {
    template.and_then(|t| t.spec)
}

/// 종류별로 메타데이터와 파드 스펙을 꺼냅니다.
fn pod_template(
    kind: WorkloadKind,
    object: &serde_json::Value,
) -> Result<(ObjectMeta, Option<PodSpec>), AdmissionError> {
    Ok(match kind {
        WorkloadKind::Pod => {
            let pod: Pod = parse(kind, object)?;
            (pod.metadata, pod.spec)
        }
        WorkloadKind::Deployment => {
            let d: K8sDeployment = parse(kind, object)?;
            (d.metadata, template_spec(d.spec.map(|s| s.template)))
        }
        WorkloadKind::StatefulSet => {
            let s: StatefulSet = parse(kind, object)?;
            (s.metadata, template_spec(s.spec.map(|s| s.template)))
        }
        WorkloadKind::DaemonSet => {
            let d: DaemonSet = parse(kind, object)?;
            (d.metadata, template_spec(d.spec.map(|s| s.template)))
        }
        WorkloadKind::ReplicationController => {
            let rc: ReplicationController = parse(kind, object)?;
            (rc.metadata, template_spec(rc.spec.and_then(|s| s.template)))
        }
        WorkloadKind::ReplicaSet => {
            let rs: ReplicaSet = parse(kind, object)?;
            (rs.metadata, template_spec(rs.spec.and_then(|s| s.template)))
        }
        WorkloadKind::CronJob => {
            let cj: CronJob = parse(kind, object)?;
            let template = cj
                .spec
                .and_then(|s| s.job_template.spec)
                .map(|j| j.template);
            (cj.metadata, template_spec(template))
        }
        WorkloadKind::Job => {
            let job: Job = parse(kind, object)?;
            (job.metadata, template_spec(job.spec.map(|s| s.template)))
        }
        WorkloadKind::DeploymentConfig => {
            let dc: DeploymentConfig = parse(kind, object)?;
            (dc.metadata, template_spec(dc.spec.and_then(|s| s.template)))
        }
    })
}

fn is_controller_owned(metadata: &ObjectMeta) -> bool {
    metadata
        .owner_references
        .iter()
        .flatten()
        .any(|owner| owner.controller == Some(true))
}

fn convert_container(
    container: k8s_openapi::api::core::v1::Container,
) -> Result<Container, AdmissionError> {
    let reference = container.image.unwrap_or_default();
    let (image, image_digest) = ImageName::parse(&reference).ok_or_else(|| {
        AdmissionError::Conversion(format!(
            "container '{}' has invalid image reference '{reference}'",
            container.name
        ))
    })?;
    let privileged = container
        .security_context
        .and_then(|ctx| ctx.privileged)
        .unwrap_or(false);
    Ok(Container {
        name: container.name,
        image,
        image_digest,
        privileged,
    })
}

/// 요청 객체를 배포 표현으로 변환합니다.
///
/// 컨트롤러가 관리하는 객체이면 `Ok(None)`을 반환합니다.
///
/// # Errors
///
/// - 지원하지 않는 kind, 객체 없음, 형식 오류: `AdmissionError::Decode`
/// - 잘못된 이미지 참조: `AdmissionError::Conversion`
pub fn decode_deployment(request: &AdmissionRequest) -> Result<Option<Deployment>, AdmissionError> {
    let kind = WorkloadKind::from_kind(&request.kind.kind).ok_or_else(|| {
        AdmissionError::Decode(format!("unsupported kind '{}'", request.kind.kind))
    })?;
    let object = request
        .object
        .as_ref()
        .ok_or_else(|| AdmissionError::Decode(format!("{kind} request without object")))?;
    let object = serde_json::to_value(object)
        .map_err(|e| AdmissionError::Decode(format!("invalid {kind} object: {e}")))?;

    let (metadata, spec) = pod_template(kind, &object)?;
    if is_controller_owned(&metadata) {
        return Ok(None);
    }

    // 일반 컨테이너 다음에 init 컨테이너
    let containers = spec
        .map(|spec| {
            let init = spec.init_containers.unwrap_or_default();
            spec.containers.into_iter().chain(init)
        })
        .into_iter()
        .flatten()
        .map(convert_container)
        .collect::<Result<Vec<_>, _>>()?;

    let name = metadata
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| request.name.clone());
    let namespace = metadata
        .namespace
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| request.namespace().to_owned());

    Ok(Some(Deployment {
        id: metadata.uid.unwrap_or_default(),
        name,
        namespace,
        cluster_id: String::new(),
        kind: kind.to_string(),
        labels: metadata.labels.unwrap_or_default(),
        annotations: metadata.annotations.unwrap_or_default(),
        containers,
    }))
}
