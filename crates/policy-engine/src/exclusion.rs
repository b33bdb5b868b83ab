//! 예외 컴파일러 — 배포/이미지 예외를 미리 컴파일된 매처로 변환
//!
//! 배포 예외는 이름 패턴과 스코프를, 이미지 예외는 이미지 이름 접두어를 가집니다.
//! 만료된 예외는 매칭에서 제외됩니다.

use chrono::{DateTime, Utc};
use regex::Regex;

use kubeward_core::types::{Exclusion, ExclusionTarget};
use kubeward_core::workload::{Cluster, Deployment, Namespace};

use crate::error::PolicyError;
use crate::scope::{CompiledScope, compile_anchored, compile_scope};

/// 컴파일된 예외 대상
#[derive(Debug, Clone)]
enum CompiledTarget {
    Deployment {
        name: Option<Regex>,
        scope: Option<CompiledScope>,
    },
    Image {
        prefix: String,
    },
}

/// 컴파일된 예외
#[derive(Debug, Clone)]
pub struct CompiledExclusion {
    name: String,
    target: CompiledTarget,
    expiration: Option<DateTime<Utc>>,
}

/// 예외를 컴파일합니다.
///
/// 배포 예외는 스코프가 있을 때만 스코프를 컴파일합니다.
pub fn compile_exclusion(exclusion: &Exclusion) -> Result<CompiledExclusion, PolicyError> {
    let target = match &exclusion.target {
        ExclusionTarget::Deployment(deployment) => CompiledTarget::Deployment {
            name: deployment
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(compile_anchored)
                .transpose()?,
            scope: deployment.scope.as_ref().map(compile_scope).transpose()?,
        },
        ExclusionTarget::Image(image) => CompiledTarget::Image {
            prefix: image.name.clone(),
        },
    };

    Ok(CompiledExclusion {
        name: exclusion.name.clone(),
        target,
        expiration: exclusion.expiration,
    })
}

impl CompiledExclusion {
    /// 예외 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 주어진 시각에 예외가 유효한지 확인합니다.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_none_or(|expiration| expiration >= now)
    }

    /// 배포 예외인지 확인합니다.
    pub fn is_deployment_exclusion(&self) -> bool {
        matches!(self.target, CompiledTarget::Deployment { .. })
    }

    /// 배포가 이 예외에 해당하는지 확인합니다 (만료 여부는 확인하지 않음).
    pub fn matches_deployment(&self, deployment: &Deployment) -> bool {
        match &self.target {
            CompiledTarget::Deployment { name, scope } => {
                name.as_ref().is_none_or(|n| n.is_match(&deployment.name))
                    && scope.as_ref().is_none_or(|s| s.matches_deployment(deployment))
            }
            CompiledTarget::Image { .. } => false,
        }
    }

    /// 전체 이미지 이름이 예외 접두어로 시작하는지 확인합니다.
    pub fn matches_image(&self, full_name: &str) -> bool {
        match &self.target {
            CompiledTarget::Image { prefix } => !prefix.is_empty() && full_name.starts_with(prefix),
            CompiledTarget::Deployment { .. } => false,
        }
    }

    /// 이 예외가 클러스터 전체를 제외하는지 확인합니다.
    ///
    /// 이름 패턴이 있는 예외는 특정 배포만 대상으로 하므로 클러스터를 제외하지 않습니다.
    /// 네임스페이스 패턴이 있으면 해당 클러스터의 **모든** 네임스페이스가 일치해야 합니다.
    pub fn excludes_cluster(&self, cluster: &Cluster, namespaces: &[Namespace]) -> bool {
        let CompiledTarget::Deployment { name: None, scope } = &self.target else {
            return false;
        };
        let Some(scope) = scope else {
            return true;
        };
        if !scope.matches_cluster(&cluster.id) || scope.has_label() {
            return false;
        }
        if !scope.has_namespace() {
            return true;
        }
        namespaces
            .iter()
            .filter(|ns| ns.cluster_id == cluster.id)
            .all(|ns| scope.matches_namespace(&ns.name))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use kubeward_core::types::{DeploymentExclusion, ImageExclusion, Scope};

    use super::*;

    fn deployment_exclusion(name: Option<&str>, scope: Option<Scope>) -> Exclusion {
        Exclusion {
            name: "exclusion".to_owned(),
            target: ExclusionTarget::Deployment(DeploymentExclusion {
                name: name.map(str::to_owned),
                scope,
            }),
            expiration: None,
        }
    }

    fn ns_scope(cluster: Option<&str>, namespace: &str) -> Scope {
        Scope {
            cluster: cluster.map(str::to_owned),
            namespace: Some(namespace.to_owned()),
            label: None,
        }
    }

    fn ns(cluster_id: &str, name: &str) -> Namespace {
        Namespace {
            cluster_id: cluster_id.to_owned(),
            name: name.to_owned(),
            ..Default::default()
        }
    }

    fn cluster(id: &str) -> Cluster {
        Cluster {
            id: id.to_owned(),
            name: id.to_owned(),
        }
    }

    #[test]
    fn deployment_name_pattern() {
        let compiled = compile_exclusion(&deployment_exclusion(Some("web-.*"), None)).unwrap();
        let mut deployment = Deployment {
            name: "web-frontend".to_owned(),
            ..Default::default()
        };
        assert!(compiled.matches_deployment(&deployment));
        deployment.name = "db".to_owned();
        assert!(!compiled.matches_deployment(&deployment));
    }

    #[test]
    fn deployment_name_and_scope_both_required() {
        let compiled = compile_exclusion(&deployment_exclusion(
            Some("web"),
            Some(ns_scope(None, "prod")),
        ))
        .unwrap();
        let deployment = Deployment {
            name: "web".to_owned(),
            namespace: "dev".to_owned(),
            ..Default::default()
        };
        assert!(!compiled.matches_deployment(&deployment));
    }

    #[test]
    fn invalid_name_pattern_fails() {
        let err = compile_exclusion(&deployment_exclusion(Some("["), None)).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPattern { .. }));
    }

    #[test]
    fn image_prefix_match() {
        let compiled = compile_exclusion(&Exclusion {
            name: "registry".to_owned(),
            target: ExclusionTarget::Image(ImageExclusion {
                name: "quay.io/stackrox".to_owned(),
            }),
            expiration: None,
        })
        .unwrap();
        assert!(compiled.matches_image("quay.io/stackrox/main:4.0"));
        assert!(!compiled.matches_image("docker.io/library/nginx:latest"));
        assert!(!compiled.matches_deployment(&Deployment::default()));
    }

    #[test]
    fn expiration_controls_activity() {
        let now = Utc::now();
        let mut exclusion = deployment_exclusion(None, None);
        exclusion.expiration = Some(now - Duration::hours(1));
        assert!(!compile_exclusion(&exclusion).unwrap().is_active_at(now));
        exclusion.expiration = Some(now + Duration::hours(1));
        assert!(compile_exclusion(&exclusion).unwrap().is_active_at(now));
    }

    #[test]
    fn cluster_excluded_when_all_namespaces_match() {
        let compiled =
            compile_exclusion(&deployment_exclusion(None, Some(ns_scope(None, "ns.*")))).unwrap();
        let namespaces = [ns("c1", "ns1"), ns("c1", "ns2"), ns("c2", "other")];
        assert!(compiled.excludes_cluster(&cluster("c1"), &namespaces));
    }

    #[test]
    fn cluster_not_excluded_when_one_namespace_differs() {
        let compiled =
            compile_exclusion(&deployment_exclusion(None, Some(ns_scope(None, "ns.*")))).unwrap();
        let namespaces = [ns("c1", "ns1"), ns("c1", "kube-system")];
        assert!(!compiled.excludes_cluster(&cluster("c1"), &namespaces));
    }

    #[test]
    fn cluster_exclusion_requires_cluster_match() {
        let compiled = compile_exclusion(&deployment_exclusion(
            None,
            Some(Scope {
                cluster: Some("c2".to_owned()),
                ..Default::default()
            }),
        ))
        .unwrap();
        assert!(!compiled.excludes_cluster(&cluster("c1"), &[]));
        assert!(compiled.excludes_cluster(&cluster("c2"), &[]));
    }

    #[test]
    fn named_exclusion_never_excludes_cluster() {
        let compiled = compile_exclusion(&deployment_exclusion(Some("web"), None)).unwrap();
        assert!(!compiled.excludes_cluster(&cluster("c1"), &[]));
    }
}
