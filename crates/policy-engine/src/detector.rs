//! 탐지기 — 정책 레지스트리 전체를 대상에 대해 평가하고 알림을 생성
//!
//! 단계별로 하나의 탐지기가 있습니다.
//! - [`DeployTimeDetector`]: 배포 + 컨테이너 이미지
//! - [`RuntimeDetector`]: 배포 안에서 실행된 프로세스
//! - [`BuildTimeDetector`]: 단일 이미지
//!
//! 비활성화된 정책과 해당 단계를 포함하지 않는 정책은 건너뜁니다.
//! 정책별 평가 에러는 순회를 멈추지 않고 모아서 로그로 남기며,
//! 다른 정책에서 나온 알림과 함께 [`Detections`]로 반환됩니다.

use std::sync::Arc;

use tracing::{debug, warn};

use kubeward_core::metrics as m;
use kubeward_core::types::{
    Alert, AlertEntity, DeploymentRef, EnforcementAction, LifecycleStage, Violation,
};
use kubeward_core::workload::{Deployment, Image, ProcessIndicator};

use crate::compiled::CompiledPolicy;
use crate::error::PolicyError;
use crate::policy_set::PolicySet;

fn is_active_for(compiled: &CompiledPolicy, stage: LifecycleStage) -> bool {
    let policy = compiled.policy();
    !policy.disabled && policy.has_stage(stage)
}

fn build_alert(
    compiled: &CompiledPolicy,
    stage: LifecycleStage,
    entity: AlertEntity,
    violations: Vec<Violation>,
    enforcement: Option<EnforcementAction>,
) -> Alert {
    metrics::counter!(m::POLICY_ALERTS_TOTAL, m::LABEL_STAGE => stage.to_string()).increment(1);
    let mut alert = Alert::new(compiled.policy().clone(), stage, entity, violations);
    alert.enforcement = enforcement;
    alert
}

/// 탐지 결과
///
/// 일부 정책의 평가가 실패해도 나머지 정책의 알림은 유지됩니다.
#[derive(Debug, Default)]
pub struct Detections {
    /// 생성된 알림
    pub alerts: Vec<Alert>,
    /// 실패한 정책들의 에러 ([`PolicyError::Aggregate`])
    pub error: Option<PolicyError>,
}

impl Detections {
    fn collect(stage: LifecycleStage, alerts: Vec<Alert>, result: Result<(), PolicyError>) -> Self {
        let error = result.err();
        if let Some(e) = &error {
            warn!(stage = %stage, alerts = alerts.len(), error = %e, "policy evaluation failed");
        }
        Self { alerts, error }
    }

    /// 에러가 있으면 알림을 버리고 에러를 반환합니다.
    pub fn into_result(self) -> Result<Vec<Alert>, PolicyError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.alerts),
        }
    }
}

/// 배포 시점 탐지기
#[derive(Debug, Clone)]
pub struct DeployTimeDetector {
    policies: Arc<PolicySet>,
}

impl DeployTimeDetector {
    pub fn new(policies: Arc<PolicySet>) -> Self {
        Self { policies }
    }

    /// 평가 대상 정책 레지스트리
    pub fn policy_set(&self) -> &Arc<PolicySet> {
        &self.policies
    }

    /// 배포와 컨테이너 이미지들을 평가합니다.
    ///
    /// `images[i]`는 `deployment.containers[i]`에 대응하며 `None`은 미해결 이미지입니다.
    /// 알림의 집행 액션은 정책의 첫 번째 배포 시점 액션입니다.
    pub fn detect(&self, deployment: &Deployment, images: &[Option<Image>]) -> Detections {
        let mut alerts = Vec::new();
        let result = self.policies.for_each(|compiled| {
            if !is_active_for(compiled, LifecycleStage::Deploy)
                || !compiled.applies_to_deployment(deployment)
            {
                return Ok(());
            }
            let violations = compiled.matcher().match_deployment(deployment, images)?;
            if violations.is_empty() {
                return Ok(());
            }
            let enforcement = compiled
                .policy()
                .enforcement_actions
                .iter()
                .copied()
                .find(EnforcementAction::is_deploy_time);
            alerts.push(build_alert(
                compiled,
                LifecycleStage::Deploy,
                AlertEntity::Deployment(DeploymentRef::from(deployment)),
                violations,
                enforcement,
            ));
            Ok(())
        });

        debug!(
            deployment = %deployment.name,
            namespace = %deployment.namespace,
            alerts = alerts.len(),
            "deploy-time detection finished"
        );
        Detections::collect(LifecycleStage::Deploy, alerts, result)
    }
}

/// 런타임 탐지기
#[derive(Debug, Clone)]
pub struct RuntimeDetector {
    policies: Arc<PolicySet>,
}

impl RuntimeDetector {
    pub fn new(policies: Arc<PolicySet>) -> Self {
        Self { policies }
    }

    pub fn policy_set(&self) -> &Arc<PolicySet> {
        &self.policies
    }

    /// 배포 안에서 실행된 프로세스를 평가합니다.
    ///
    /// 정책에 `KillPod` 액션이 있으면 알림에 집행 액션으로 설정됩니다.
    pub fn detect_process(&self, deployment: &Deployment, process: &ProcessIndicator) -> Detections {
        metrics::counter!(m::RUNTIME_PROCESSES_EVALUATED_TOTAL).increment(1);

        let mut alerts = Vec::new();
        let result = self.policies.for_each(|compiled| {
            if !is_active_for(compiled, LifecycleStage::Runtime)
                || !compiled.applies_to_deployment(deployment)
            {
                return Ok(());
            }
            let violations = compiled.matcher().match_process(deployment, process)?;
            if violations.is_empty() {
                return Ok(());
            }
            let enforcement = compiled
                .policy()
                .enforcement_actions
                .contains(&EnforcementAction::KillPod)
                .then_some(EnforcementAction::KillPod);
            alerts.push(build_alert(
                compiled,
                LifecycleStage::Runtime,
                AlertEntity::Deployment(DeploymentRef::from(deployment)),
                violations,
                enforcement,
            ));
            Ok(())
        });
        Detections::collect(LifecycleStage::Runtime, alerts, result)
    }
}

/// 빌드 시점 탐지기
#[derive(Debug, Clone)]
pub struct BuildTimeDetector {
    policies: Arc<PolicySet>,
}

impl BuildTimeDetector {
    pub fn new(policies: Arc<PolicySet>) -> Self {
        Self { policies }
    }

    /// 단일 이미지를 평가합니다.
    pub fn detect_image(&self, image: &Image) -> Detections {
        let mut alerts = Vec::new();
        let result = self.policies.for_each(|compiled| {
            if !is_active_for(compiled, LifecycleStage::Build) || !compiled.applies_to_image(image)
            {
                return Ok(());
            }
            let violations = compiled.matcher().match_image(image);
            if violations.is_empty() {
                return Ok(());
            }
            let enforcement = compiled
                .policy()
                .enforcement_actions
                .contains(&EnforcementAction::FailBuild)
                .then_some(EnforcementAction::FailBuild);
            alerts.push(build_alert(
                compiled,
                LifecycleStage::Build,
                AlertEntity::Image(image.name.clone()),
                violations,
                enforcement,
            ));
            Ok(())
        });
        Detections::collect(LifecycleStage::Build, alerts, result)
    }
}
