//! 정책 컴파일러 — 정책을 스코프/예외/조건 매처와 predicate 목록으로 컴파일
//!
//! 생명주기 단계에 따라 predicate가 결정됩니다.
//!
//! | 단계 | predicate |
//! |------|-----------|
//! | Deploy, Runtime | [`Predicate::Deployment`] |
//! | Build | [`Predicate::Image`] |
//!
//! [`CompiledPolicy::applies_to`]는 대상 종류에 맞는 predicate 중 하나라도
//! 참이면 참입니다. 해당 종류의 predicate가 없으면 거짓입니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use kubeward_core::types::{LifecycleStage, Policy};
use kubeward_core::workload::{Cluster, Deployment, Image, Namespace};

use crate::criteria::Matcher;
use crate::error::PolicyError;
use crate::exclusion::{CompiledExclusion, compile_exclusion};
use crate::scope::{CompiledScope, compile_scope};

/// 정책 컴파일러
///
/// `PolicySet`은 이 trait을 통해 정책을 컴파일합니다.
pub trait PolicyCompiler: Send + Sync {
    /// 정책을 복제하여 컴파일합니다.
    fn compile_policy(&self, policy: &Policy) -> Result<CompiledPolicy, PolicyError>;
}

/// 기본 정책 컴파일러
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyCompiler;

impl PolicyCompiler for DefaultPolicyCompiler {
    fn compile_policy(&self, policy: &Policy) -> Result<CompiledPolicy, PolicyError> {
        CompiledPolicy::compile(policy)
    }
}

/// predicate 평가 대상
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// 배포
    Deployment(&'a Deployment),
    /// 이미지
    Image(&'a Image),
}

/// 배포 predicate: 스코프 안에 있고 유효한 배포 예외에 해당하지 않으면 적용
#[derive(Debug, Clone)]
pub struct DeploymentPredicate {
    scopes: Arc<[CompiledScope]>,
    exclusions: Arc<[CompiledExclusion]>,
}

impl DeploymentPredicate {
    /// 배포에 정책이 적용되는지 확인합니다.
    pub fn applies_to(&self, deployment: &Deployment, now: DateTime<Utc>) -> bool {
        let in_scope =
            self.scopes.is_empty() || self.scopes.iter().any(|s| s.matches_deployment(deployment));
        in_scope
            && !self
                .exclusions
                .iter()
                .any(|e| e.is_active_at(now) && e.matches_deployment(deployment))
    }
}

/// 이미지 predicate: 유효한 이미지 예외 접두어에 해당하지 않으면 적용
#[derive(Debug, Clone)]
pub struct ImagePredicate {
    exclusions: Arc<[CompiledExclusion]>,
}

impl ImagePredicate {
    /// 이미지에 정책이 적용되는지 확인합니다.
    pub fn applies_to(&self, image: &Image, now: DateTime<Utc>) -> bool {
        !self
            .exclusions
            .iter()
            .any(|e| e.is_active_at(now) && e.matches_image(&image.name.full_name))
    }
}

/// 대상 종류별 적용 여부 판단
#[derive(Debug, Clone)]
pub enum Predicate {
    /// 배포 대상
    Deployment(DeploymentPredicate),
    /// 이미지 대상
    Image(ImagePredicate),
}

impl Predicate {
    /// 대상 종류가 맞으면 적용 여부를, 아니면 `None`을 반환합니다.
    pub fn applies_to(&self, entity: Entity<'_>, now: DateTime<Utc>) -> Option<bool> {
        match (self, entity) {
            (Self::Deployment(p), Entity::Deployment(d)) => Some(p.applies_to(d, now)),
            (Self::Image(p), Entity::Image(i)) => Some(p.applies_to(i, now)),
            _ => None,
        }
    }
}

/// 컴파일된 정책
///
/// 원본 정책의 복제본과 컴파일된 매처를 소유합니다. 복제 비용은 `Arc` 증가뿐입니다.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    policy: Arc<Policy>,
    scopes: Arc<[CompiledScope]>,
    exclusions: Arc<[CompiledExclusion]>,
    matcher: Arc<Matcher>,
    predicates: Vec<Predicate>,
}

impl CompiledPolicy {
    /// 정책을 컴파일합니다.
    pub fn compile(policy: &Policy) -> Result<Self, PolicyError> {
        let policy = Arc::new(policy.clone());

        let scopes: Arc<[CompiledScope]> = policy
            .scope
            .iter()
            .map(compile_scope)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.for_policy(&policy.id))?
            .into();
        let exclusions: Arc<[CompiledExclusion]> = policy
            .exclusions
            .iter()
            .map(compile_exclusion)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.for_policy(&policy.id))?
            .into();
        let matcher = Arc::new(Matcher::compile(&policy)?);

        let mut predicates = Vec::with_capacity(2);
        if policy.has_stage(LifecycleStage::Deploy) || policy.has_stage(LifecycleStage::Runtime) {
            predicates.push(Predicate::Deployment(DeploymentPredicate {
                scopes: Arc::clone(&scopes),
                exclusions: Arc::clone(&exclusions),
            }));
        }
        if policy.has_stage(LifecycleStage::Build) {
            predicates.push(Predicate::Image(ImagePredicate {
                exclusions: Arc::clone(&exclusions),
            }));
        }

        Ok(Self {
            policy,
            scopes,
            exclusions,
            matcher,
            predicates,
        })
    }

    /// 원본 정책
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// 정책 ID
    pub fn id(&self) -> &str {
        &self.policy.id
    }

    /// 정책 이름
    pub fn name(&self) -> &str {
        &self.policy.name
    }

    /// 조건 매처
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// predicate 목록
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// 대상에 정책이 적용되는지 확인합니다.
    pub fn applies_to(&self, entity: Entity<'_>) -> bool {
        self.applies_to_at(entity, Utc::now())
    }

    /// 주어진 시각 기준으로 대상에 정책이 적용되는지 확인합니다.
    pub fn applies_to_at(&self, entity: Entity<'_>, now: DateTime<Utc>) -> bool {
        self.predicates
            .iter()
            .filter_map(|p| p.applies_to(entity, now))
            .any(|applies| applies)
    }

    /// 배포에 정책이 적용되는지 확인합니다.
    pub fn applies_to_deployment(&self, deployment: &Deployment) -> bool {
        self.applies_to(Entity::Deployment(deployment))
    }

    /// 이미지에 정책이 적용되는지 확인합니다.
    pub fn applies_to_image(&self, image: &Image) -> bool {
        self.applies_to(Entity::Image(image))
    }

    /// 클러스터에 정책이 적용될 수 있는지 확인합니다.
    ///
    /// 스코프가 있으면 그 중 하나가 클러스터와 일치해야 합니다. 이름 패턴 없는
    /// 유효한 배포 예외가 클러스터 전체를 제외하면 적용되지 않습니다.
    pub fn is_applicable_to_cluster(&self, cluster: &Cluster, namespaces: &[Namespace]) -> bool {
        self.is_applicable_to_cluster_at(cluster, namespaces, Utc::now())
    }

    /// 주어진 시각 기준으로 [`is_applicable_to_cluster`](Self::is_applicable_to_cluster)를 판단합니다.
    pub fn is_applicable_to_cluster_at(
        &self,
        cluster: &Cluster,
        namespaces: &[Namespace],
        now: DateTime<Utc>,
    ) -> bool {
        if !self.scopes.is_empty() && !self.scopes.iter().any(|s| s.matches_cluster(&cluster.id))
        {
            return false;
        }
        !self
            .exclusions
            .iter()
            .any(|e| e.is_active_at(now) && e.excludes_cluster(cluster, namespaces))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use kubeward_core::types::{
        DeploymentExclusion, Exclusion, ExclusionTarget, ImageExclusion, Scope,
    };
    use kubeward_core::workload::ImageName;

    use super::*;

    fn policy(stages: &[LifecycleStage]) -> Policy {
        let mut policy = Policy::new("p1", "policy one");
        policy.lifecycle_stages = stages.to_vec();
        policy
    }

    fn deployment(cluster: &str, namespace: &str, name: &str) -> Deployment {
        Deployment {
            id: format!("{namespace}/{name}"),
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            cluster_id: cluster.to_owned(),
            ..Default::default()
        }
    }

    fn image(reference: &str) -> Image {
        let (name, _) = ImageName::parse(reference).unwrap();
        Image {
            id: None,
            name,
            scan: None,
            not_pullable: false,
        }
    }

    fn ns_scope(namespace: &str) -> Scope {
        Scope {
            namespace: Some(namespace.to_owned()),
            ..Default::default()
        }
    }

    fn name_exclusion(name: &str, expiration: Option<DateTime<Utc>>) -> Exclusion {
        Exclusion {
            name: "skip".to_owned(),
            target: ExclusionTarget::Deployment(DeploymentExclusion {
                name: Some(name.to_owned()),
                scope: None,
            }),
            expiration,
        }
    }

    #[test]
    fn predicates_follow_lifecycle_stages() {
        let compiled = CompiledPolicy::compile(&policy(&[LifecycleStage::Deploy])).unwrap();
        assert!(matches!(compiled.predicates(), [Predicate::Deployment(_)]));

        let compiled = CompiledPolicy::compile(&policy(&[
            LifecycleStage::Build,
            LifecycleStage::Runtime,
        ]))
        .unwrap();
        assert_eq!(compiled.predicates().len(), 2);

        let compiled = CompiledPolicy::compile(&policy(&[])).unwrap();
        assert!(compiled.predicates().is_empty());
    }

    #[test]
    fn scope_namespace_applicability() {
        let mut p = policy(&[LifecycleStage::Deploy]);
        p.scope = vec![ns_scope("ns1")];
        let compiled = CompiledPolicy::compile(&p).unwrap();
        assert!(compiled.applies_to_deployment(&deployment("c1", "ns1", "web")));
        assert!(!compiled.applies_to_deployment(&deployment("c1", "ns2", "web")));
    }

    #[test]
    fn any_scope_is_enough() {
        let mut p = policy(&[LifecycleStage::Deploy]);
        p.scope = vec![ns_scope("ns1"), ns_scope("ns2")];
        let compiled = CompiledPolicy::compile(&p).unwrap();
        assert!(compiled.applies_to_deployment(&deployment("c1", "ns2", "web")));
        assert!(!compiled.applies_to_deployment(&deployment("c1", "ns3", "web")));
    }

    #[test]
    fn exclusion_expiration_toggles_applicability() {
        let now = Utc::now();
        let target = deployment("c1", "default", "web");
        let mut p = policy(&[LifecycleStage::Deploy]);

        p.exclusions = vec![name_exclusion("web", None)];
        assert!(!CompiledPolicy::compile(&p).unwrap().applies_to_at(Entity::Deployment(&target), now));

        p.exclusions = vec![name_exclusion("web", Some(now - Duration::days(1)))];
        assert!(CompiledPolicy::compile(&p).unwrap().applies_to_at(Entity::Deployment(&target), now));

        p.exclusions = vec![name_exclusion("web", Some(now + Duration::days(1)))];
        assert!(!CompiledPolicy::compile(&p).unwrap().applies_to_at(Entity::Deployment(&target), now));
    }

    #[test]
    fn image_predicate_uses_prefix_exclusion() {
        let mut p = policy(&[LifecycleStage::Build]);
        p.exclusions = vec![Exclusion {
            name: "trusted".to_owned(),
            target: ExclusionTarget::Image(ImageExclusion {
                name: "quay.io/".to_owned(),
            }),
            expiration: None,
        }];
        let compiled = CompiledPolicy::compile(&p).unwrap();
        assert!(!compiled.applies_to_image(&image("quay.io/org/app:1")));
        assert!(compiled.applies_to_image(&image("nginx")));
    }

    #[test]
    fn entity_without_matching_predicate_is_not_applicable() {
        let compiled = CompiledPolicy::compile(&policy(&[LifecycleStage::Build])).unwrap();
        assert!(!compiled.applies_to_deployment(&deployment("c1", "ns1", "web")));

        let compiled = CompiledPolicy::compile(&policy(&[LifecycleStage::Deploy])).unwrap();
        assert!(!compiled.applies_to_image(&image("nginx")));
    }

    #[test]
    fn invalid_scope_pattern_is_compile_error_for_policy() {
        let mut p = policy(&[LifecycleStage::Deploy]);
        p.scope = vec![ns_scope("ns(")];
        let err = CompiledPolicy::compile(&p).unwrap_err();
        assert!(matches!(err, PolicyError::Compile { ref policy_id, .. } if policy_id == "p1"));
    }

    #[test]
    fn cluster_scope_and_namespace_exclusion() {
        let mut p = policy(&[LifecycleStage::Deploy]);
        p.scope = vec![Scope {
            cluster: Some("cluster1".to_owned()),
            ..Default::default()
        }];
        p.exclusions = vec![Exclusion {
            name: "all ns".to_owned(),
            target: ExclusionTarget::Deployment(DeploymentExclusion {
                name: None,
                scope: Some(ns_scope("ns.*")),
            }),
            expiration: None,
        }];
        let compiled = CompiledPolicy::compile(&p).unwrap();
        let cluster = Cluster {
            id: "cluster1".to_owned(),
            name: "cluster1".to_owned(),
        };
        let namespaces = [Namespace {
            cluster_id: "cluster1".to_owned(),
            name: "ns1".to_owned(),
            ..Default::default()
        }];
        assert!(!compiled.is_applicable_to_cluster(&cluster, &namespaces));

        let other = Cluster {
            id: "cluster2".to_owned(),
            name: "cluster2".to_owned(),
        };
        assert!(!compiled.is_applicable_to_cluster(&other, &[]));
    }

    #[test]
    fn compiled_policy_is_independent_of_source() {
        let mut p = policy(&[LifecycleStage::Deploy]);
        let compiled = CompiledPolicy::compile(&p).unwrap();
        p.name = "renamed".to_owned();
        assert_eq!(compiled.name(), "policy one");
    }

    #[test]
    fn default_compiler_delegates() {
        let compiled = DefaultPolicyCompiler
            .compile_policy(&policy(&[LifecycleStage::Runtime]))
            .unwrap();
        assert_eq!(compiled.id(), "p1");
        assert!(compiled.matcher().is_empty());
    }
}
