//! 워크로드 타입 — 배포, 컨테이너, 이미지, 클러스터, 프로세스
//!
//! 쿠버네티스 객체를 변환한 내부 표현입니다. 정책 평가는 항상 이 타입들을
//! 대상으로 수행되며, 쿠버네티스 API 타입에 직접 의존하지 않습니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 기본 레지스트리
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// 기본 태그
pub const DEFAULT_TAG: &str = "latest";

/// 정규화된 이미지 이름
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageName {
    /// 레지스트리 (예: `docker.io`)
    pub registry: String,
    /// 저장소 경로 (예: `library/nginx`)
    pub remote: String,
    /// 태그
    pub tag: String,
    /// `registry/remote:tag` 형식의 전체 이름
    pub full_name: String,
}

impl ImageName {
    /// 구성 요소로부터 이미지 이름을 생성합니다.
    pub fn new(
        registry: impl Into<String>,
        remote: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        let registry = registry.into();
        let remote = remote.into();
        let tag = tag.into();
        let full_name = format!("{registry}/{remote}:{tag}");
        Self {
            registry,
            remote,
            tag,
            full_name,
        }
    }

    /// 이미지 참조 문자열을 파싱합니다.
    ///
    /// `nginx`, `nginx:1.25`, `quay.io/org/app:v1`, `localhost:5000/app@sha256:...`
    /// 형식을 지원합니다. 다이제스트가 있으면 함께 반환합니다.
    /// 빈 문자열이나 형식이 잘못된 참조는 `None`을 반환합니다.
    pub fn parse(reference: &str) -> Option<(Self, Option<String>)> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let (name_part, digest) = match reference.split_once('@') {
            Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_owned())),
            Some(_) => return None,
            None => (reference, None),
        };

        let (registry, rest) = match name_part.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first.to_owned(), rest)
            }
            _ => (DEFAULT_REGISTRY.to_owned(), name_part),
        };

        // 태그는 마지막 '/' 이후의 ':'만 인정 (레지스트리 포트와 구분)
        let last_slash = rest.rfind('/').map_or(0, |idx| idx + 1);
        let (remote, tag) = match rest[last_slash..].rfind(':') {
            Some(idx) => {
                let split = last_slash + idx;
                (&rest[..split], &rest[split + 1..])
            }
            None => (rest, DEFAULT_TAG),
        };

        if remote.is_empty() || tag.is_empty() {
            return None;
        }

        let remote = if registry == DEFAULT_REGISTRY && !remote.contains('/') {
            format!("library/{remote}")
        } else {
            remote.to_owned()
        };

        Some((Self::new(registry, remote, tag), digest))
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// 컨테이너
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// 컨테이너 이름
    pub name: String,
    /// 이미지 이름
    pub image: ImageName,
    /// 이미지 다이제스트 (참조에 포함된 경우)
    #[serde(default)]
    pub image_digest: Option<String>,
    /// 특권 모드 여부
    #[serde(default)]
    pub privileged: bool,
}

/// 배포 (내부 표현)
///
/// 파드, 디플로이먼트, 스테이트풀셋 등 모든 최상위 워크로드가 이 형태로 변환됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub cluster_id: String,
    /// 원본 쿠버네티스 kind
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.namespace, self.name, self.kind)
    }
}

/// 취약점
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// CVE 식별자
    pub cve: String,
    /// CVSS 점수
    pub cvss: f32,
}

/// 이미지 구성 요소 (패키지)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageComponent {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub vulns: Vec<Vulnerability>,
}

/// 이미지 스캔 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageScan {
    /// 스캔 시각
    pub scan_time: DateTime<Utc>,
    /// 구성 요소 목록
    #[serde(default)]
    pub components: Vec<ImageComponent>,
}

impl ImageScan {
    /// 모든 취약점을 순회합니다.
    pub fn vulnerabilities(&self) -> impl Iterator<Item = &Vulnerability> {
        self.components.iter().flat_map(|c| c.vulns.iter())
    }
}

/// 이미지 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// 이미지 다이제스트
    #[serde(default)]
    pub id: Option<String>,
    /// 이미지 이름
    pub name: ImageName,
    /// 스캔 결과 (없으면 미스캔)
    #[serde(default)]
    pub scan: Option<ImageScan>,
    /// 레지스트리에서 가져올 수 없는 이미지
    #[serde(default)]
    pub not_pullable: bool,
}

impl Image {
    /// 컨테이너 정보만으로 미스캔 이미지를 만듭니다.
    pub fn unscanned(container: &Container) -> Self {
        Self {
            id: container.image_digest.clone(),
            name: container.image.clone(),
            scan: None,
            not_pullable: false,
        }
    }

    /// 캐시 예산 계산용 근사 크기 (바이트)
    pub fn approx_size(&self) -> u64 {
        let name = &self.name;
        let mut size = name.registry.len()
            + name.remote.len()
            + name.tag.len()
            + name.full_name.len()
            + self.id.as_ref().map_or(0, String::len);
        if let Some(scan) = &self.scan {
            for component in &scan.components {
                size += component.name.len() + component.version.len();
                size += component
                    .vulns
                    .iter()
                    .map(|v| v.cve.len() + std::mem::size_of::<f32>())
                    .sum::<usize>();
            }
        }
        size as u64
    }
}

/// 클러스터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
}

/// 네임스페이스
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub cluster_id: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// 런타임 프로세스 이벤트
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIndicator {
    pub deployment_id: String,
    pub container_name: String,
    /// 프로세스 이름
    pub name: String,
    pub exec_file_path: String,
    #[serde(default)]
    pub args: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_name_defaults_registry_and_tag() {
        let (name, digest) = ImageName::parse("nginx").unwrap();
        assert_eq!(name.registry, "docker.io");
        assert_eq!(name.remote, "library/nginx");
        assert_eq!(name.tag, "latest");
        assert_eq!(name.full_name, "docker.io/library/nginx:latest");
        assert!(digest.is_none());
    }

    #[test]
    fn parse_registry_with_port() {
        let (name, _) = ImageName::parse("localhost:5000/team/app:v2").unwrap();
        assert_eq!(name.registry, "localhost:5000");
        assert_eq!(name.remote, "team/app");
        assert_eq!(name.tag, "v2");
    }

    #[test]
    fn parse_with_digest() {
        let (name, digest) = ImageName::parse("quay.io/org/app@sha256:abc").unwrap();
        assert_eq!(name.registry, "quay.io");
        assert_eq!(name.remote, "org/app");
        assert_eq!(name.tag, "latest");
        assert_eq!(digest.as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn parse_docker_hub_org() {
        let (name, _) = ImageName::parse("stackrox/main:4.0").unwrap();
        assert_eq!(name.full_name, "docker.io/stackrox/main:4.0");
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(ImageName::parse("").is_none());
        assert!(ImageName::parse("nginx@").is_none());
        assert!(ImageName::parse("nginx:").is_none());
    }

    #[test]
    fn approx_size_grows_with_scan() {
        let (name, _) = ImageName::parse("nginx:1.25").unwrap();
        let mut image = Image {
            id: Some("sha256:1".to_owned()),
            name,
            scan: None,
            not_pullable: false,
        };
        let unscanned = image.approx_size();
        image.scan = Some(ImageScan {
            scan_time: Utc::now(),
            components: vec![ImageComponent {
                name: "openssl".to_owned(),
                version: "1.1.1".to_owned(),
                vulns: vec![Vulnerability {
                    cve: "CVE-2023-0001".to_owned(),
                    cvss: 9.8,
                }],
            }],
        });
        assert!(image.approx_size() > unscanned);
    }
}
