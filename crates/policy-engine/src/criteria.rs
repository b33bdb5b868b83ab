//! 정책 조건 매처 — 정책 섹션을 배포/이미지/프로세스 평가기로 컴파일
//!
//! 정책은 섹션의 OR, 섹션은 그룹의 AND, 그룹은 값들의 OR/AND로 평가됩니다.
//! 그룹 결과에는 `negate`가 적용됩니다.
//!
//! 지원 필드는 [`PolicyField`]로 닫혀 있으며, 알 수 없는 필드명은 컴파일 에러입니다.
//! 런타임 필드(`Process Name`)를 포함하는 섹션은 프로세스 이벤트에서만,
//! 그렇지 않은 섹션은 배포/이미지 평가에서만 매칭됩니다.

use std::fmt;

use regex::Regex;

use kubeward_core::types::{BooleanOperator, Policy, PolicyGroup, PolicySection, Violation};
use kubeward_core::workload::{
    Container, Deployment, Image, ImageName, ImageScan, ProcessIndicator, Vulnerability,
};

use crate::error::PolicyError;
use crate::scope::compile_anchored;

/// 지원하는 정책 조건 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyField {
    /// 이미지 태그 (정규식)
    ImageTag,
    /// 이미지 레지스트리 (정규식)
    ImageRegistry,
    /// 이미지 저장소 경로 (정규식)
    ImageRemote,
    /// 특권 컨테이너 여부
    PrivilegedContainer,
    /// 이미지 미스캔 여부
    UnscannedImage,
    /// CVE 식별자 (정규식)
    Cve,
    /// CVSS 점수 비교
    Cvss,
    /// 실행된 프로세스 이름 (정규식)
    ProcessName,
}

impl PolicyField {
    /// 모든 필드
    pub const ALL: [PolicyField; 8] = [
        Self::ImageTag,
        Self::ImageRegistry,
        Self::ImageRemote,
        Self::PrivilegedContainer,
        Self::UnscannedImage,
        Self::Cve,
        Self::Cvss,
        Self::ProcessName,
    ];

    /// 와이어 필드명으로부터 필드를 찾습니다.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// 와이어 필드명
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImageTag => "Image Tag",
            Self::ImageRegistry => "Image Registry",
            Self::ImageRemote => "Image Remote",
            Self::PrivilegedContainer => "Privileged Container",
            Self::UnscannedImage => "Unscanned Image",
            Self::Cve => "CVE",
            Self::Cvss => "CVSS",
            Self::ProcessName => "Process Name",
        }
    }

    /// 이미지 스캔 결과가 있어야 의미가 있는 필드인지 확인합니다.
    pub fn requires_image_scan(&self) -> bool {
        matches!(self, Self::UnscannedImage | Self::Cve | Self::Cvss)
    }

    /// 런타임 이벤트에서만 평가되는 필드인지 확인합니다.
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::ProcessName)
    }
}

impl fmt::Display for PolicyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 정책이 이미지 스캔 결과에 의존하는지 확인합니다.
pub fn policy_requires_image_scan(policy: &Policy) -> bool {
    policy
        .field_names()
        .filter_map(PolicyField::from_name)
        .any(|field| field.requires_image_scan())
}

/// 정책이 오직 "이미지 미스캔" 조건만으로 구성되어 있는지 확인합니다.
pub fn is_missing_scan_policy(policy: &Policy) -> bool {
    let mut fields = policy.field_names().peekable();
    fields.peek().is_some()
        && fields.all(|name| PolicyField::from_name(name) == Some(PolicyField::UnscannedImage))
}

/// CVSS 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
}

impl Comparator {
    /// `">= 7.0"` 형식에서 연산자와 나머지를 분리합니다. 연산자가 없으면 `=`입니다.
    fn split(raw: &str) -> (Self, &str) {
        let raw = raw.trim();
        for (prefix, op) in [
            (">=", Self::GreaterOrEqual),
            ("<=", Self::LessOrEqual),
            (">", Self::Greater),
            ("<", Self::Less),
            ("=", Self::Equal),
        ] {
            if let Some(rest) = raw.strip_prefix(prefix) {
                return (op, rest.trim());
            }
        }
        (Self::Equal, raw)
    }

    fn holds(self, actual: f32, threshold: f32) -> bool {
        match self {
            Self::Greater => actual > threshold,
            Self::GreaterOrEqual => actual >= threshold,
            Self::Less => actual < threshold,
            Self::LessOrEqual => actual <= threshold,
            Self::Equal => (actual - threshold).abs() < f32::EPSILON,
        }
    }
}

#[derive(Debug, Clone)]
enum ValueMatcher {
    Pattern(Regex),
    Flag(bool),
    Numeric { op: Comparator, threshold: f32 },
}

/// 평가 대상: 컨테이너 하나와 그 이미지, 선택적으로 프로세스
struct Subject<'a> {
    container: Option<&'a Container>,
    image_name: &'a ImageName,
    image: Option<&'a Image>,
    process: Option<&'a ProcessIndicator>,
}

impl<'a> Subject<'a> {
    fn is_unscanned(&self) -> bool {
        self.image.is_none_or(|image| image.scan.is_none())
    }

    fn vulnerabilities(&self) -> impl Iterator<Item = &'a Vulnerability> + 'a {
        self.image
            .and_then(|image| image.scan.as_ref())
            .into_iter()
            .flat_map(ImageScan::vulnerabilities)
    }

    fn label(&self) -> String {
        match self.container {
            Some(container) => format!("Container '{}'", container.name),
            None => format!("Image '{}'", self.image_name),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledGroup {
    field: PolicyField,
    operator: BooleanOperator,
    negate: bool,
    raw_values: Vec<String>,
    values: Vec<ValueMatcher>,
}

impl CompiledGroup {
    fn compile(policy_id: &str, group: &PolicyGroup) -> Result<Self, PolicyError> {
        let compile_err = |reason: String| PolicyError::Compile {
            policy_id: policy_id.to_owned(),
            reason,
        };

        let field = PolicyField::from_name(&group.field_name)
            .ok_or_else(|| compile_err(format!("unknown field '{}'", group.field_name)))?;
        if group.values.is_empty() {
            return Err(compile_err(format!("field '{field}' has no values")));
        }

        let values = group
            .values
            .iter()
            .map(|raw| match field {
                PolicyField::PrivilegedContainer | PolicyField::UnscannedImage => {
                    match raw.trim().to_ascii_lowercase().as_str() {
                        "true" => Ok(ValueMatcher::Flag(true)),
                        "false" => Ok(ValueMatcher::Flag(false)),
                        _ => Err(compile_err(format!(
                            "field '{field}' expects true or false, got '{raw}'"
                        ))),
                    }
                }
                PolicyField::Cvss => {
                    let (op, number) = Comparator::split(raw);
                    number
                        .parse::<f32>()
                        .ok()
                        .filter(|n| n.is_finite())
                        .map(|threshold| ValueMatcher::Numeric { op, threshold })
                        .ok_or_else(|| {
                            compile_err(format!("field '{field}' has invalid score '{raw}'"))
                        })
                }
                _ => compile_anchored(raw)
                    .map(ValueMatcher::Pattern)
                    .map_err(|e| e.for_policy(policy_id)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            field,
            operator: group.boolean_operator,
            negate: group.negate,
            raw_values: group.values.clone(),
            values,
        })
    }

    fn value_matches(&self, value: &ValueMatcher, subject: &Subject<'_>) -> bool {
        match (self.field, value) {
            (PolicyField::ImageTag, ValueMatcher::Pattern(re)) => {
                re.is_match(&subject.image_name.tag)
            }
            (PolicyField::ImageRegistry, ValueMatcher::Pattern(re)) => {
                re.is_match(&subject.image_name.registry)
            }
            (PolicyField::ImageRemote, ValueMatcher::Pattern(re)) => {
                re.is_match(&subject.image_name.remote)
            }
            (PolicyField::PrivilegedContainer, ValueMatcher::Flag(flag)) => subject
                .container
                .is_some_and(|container| container.privileged == *flag),
            (PolicyField::UnscannedImage, ValueMatcher::Flag(flag)) => {
                subject.is_unscanned() == *flag
            }
            (PolicyField::Cve, ValueMatcher::Pattern(re)) => {
                subject.vulnerabilities().any(|v| re.is_match(&v.cve))
            }
            (PolicyField::Cvss, ValueMatcher::Numeric { op, threshold }) => subject
                .vulnerabilities()
                .any(|v| op.holds(v.cvss, *threshold)),
            (PolicyField::ProcessName, ValueMatcher::Pattern(re)) => {
                subject.process.is_some_and(|p| re.is_match(&p.name))
            }
            _ => false,
        }
    }

    /// 그룹이 매칭되면 위반 설명을 반환합니다.
    fn evaluate(&self, subject: &Subject<'_>) -> Option<String> {
        let hit = |value: &ValueMatcher| self.value_matches(value, subject);
        let matched = match self.operator {
            BooleanOperator::Or => self.values.iter().any(hit),
            BooleanOperator::And => self.values.iter().all(hit),
        };
        (matched != self.negate).then(|| self.describe(subject))
    }

    fn describe(&self, subject: &Subject<'_>) -> String {
        let label = subject.label();
        if self.negate {
            return format!(
                "{label} {} does not match {}",
                self.field,
                self.raw_values.join(", ")
            );
        }

        let name = subject.image_name;
        match self.field {
            PolicyField::ImageTag => format!("{label} has image tag '{}'", name.tag),
            PolicyField::ImageRegistry => {
                format!("{label} uses image registry '{}'", name.registry)
            }
            PolicyField::ImageRemote => format!("{label} uses image remote '{}'", name.remote),
            PolicyField::PrivilegedContainer => {
                if subject.container.is_some_and(|c| c.privileged) {
                    format!("{label} is privileged")
                } else {
                    format!("{label} is not privileged")
                }
            }
            PolicyField::UnscannedImage => {
                if subject.is_unscanned() {
                    format!("Image '{name}' in {label} has not been scanned")
                } else {
                    format!("Image '{name}' in {label} has been scanned")
                }
            }
            PolicyField::Cve => {
                let cves: Vec<&str> = subject
                    .vulnerabilities()
                    .filter(|v| {
                        self.values
                            .iter()
                            .any(|value| matches!(value, ValueMatcher::Pattern(re) if re.is_match(&v.cve)))
                    })
                    .map(|v| v.cve.as_str())
                    .collect();
                format!("Image '{name}' in {label} contains {}", cves.join(", "))
            }
            PolicyField::Cvss => {
                let findings: Vec<String> = subject
                    .vulnerabilities()
                    .filter(|v| {
                        self.values.iter().any(|value| {
                            matches!(value, ValueMatcher::Numeric { op, threshold } if op.holds(v.cvss, *threshold))
                        })
                    })
                    .map(|v| format!("{} (CVSS {:.1})", v.cve, v.cvss))
                    .collect();
                format!("Image '{name}' in {label} contains {}", findings.join(", "))
            }
            PolicyField::ProcessName => {
                let process = subject.process.map_or("", |p| p.name.as_str());
                format!("Process '{process}' executed in {label}")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledSection {
    groups: Vec<CompiledGroup>,
    runtime: bool,
}

impl CompiledSection {
    fn compile(policy_id: &str, section: &PolicySection) -> Result<Self, PolicyError> {
        let groups = section
            .policy_groups
            .iter()
            .map(|group| CompiledGroup::compile(policy_id, group))
            .collect::<Result<Vec<_>, _>>()?;
        let runtime = groups.iter().any(|g| g.field.is_runtime());
        Ok(Self { groups, runtime })
    }

    fn evaluate(&self, subject: &Subject<'_>, runtime: bool) -> Option<Violation> {
        if self.runtime != runtime || self.groups.is_empty() {
            return None;
        }
        let details = self
            .groups
            .iter()
            .map(|group| group.evaluate(subject))
            .collect::<Option<Vec<_>>>()?;
        Some(Violation::new(details.join("; ")))
    }
}

/// 컴파일된 정책 조건
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    policy_name: String,
    sections: Vec<CompiledSection>,
}

impl Matcher {
    /// 정책의 섹션들을 컴파일합니다.
    pub fn compile(policy: &Policy) -> Result<Self, PolicyError> {
        let sections = policy
            .policy_sections
            .iter()
            .map(|section| CompiledSection::compile(&policy.id, section))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            policy_name: policy.name.clone(),
            sections,
        })
    }

    /// 조건 섹션이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// 배포의 각 컨테이너를 평가합니다.
    ///
    /// `images[i]`는 `deployment.containers[i]`의 이미지이며, `None`이면 미해결입니다.
    pub fn match_deployment(
        &self,
        deployment: &Deployment,
        images: &[Option<Image>],
    ) -> Result<Vec<Violation>, PolicyError> {
        if images.len() > deployment.containers.len() {
            return Err(self.evaluation_error(
                deployment,
                format!(
                    "{} images supplied for {} containers",
                    images.len(),
                    deployment.containers.len()
                ),
            ));
        }

        let mut violations = Vec::new();
        for (idx, container) in deployment.containers.iter().enumerate() {
            let subject = Subject {
                container: Some(container),
                image_name: &container.image,
                image: images.get(idx).and_then(Option::as_ref),
                process: None,
            };
            violations.extend(self.sections.iter().filter_map(|s| s.evaluate(&subject, false)));
        }
        Ok(violations)
    }

    /// 컨테이너와 무관하게 이미지만 평가합니다.
    pub fn match_image(&self, image: &Image) -> Vec<Violation> {
        let subject = Subject {
            container: None,
            image_name: &image.name,
            image: Some(image),
            process: None,
        };
        self.sections
            .iter()
            .filter_map(|s| s.evaluate(&subject, false))
            .collect()
    }

    /// 프로세스 이벤트를 평가합니다.
    pub fn match_process(
        &self,
        deployment: &Deployment,
        process: &ProcessIndicator,
    ) -> Result<Vec<Violation>, PolicyError> {
        // 배포 정보가 프로세스보다 늦게 들어오면 컨테이너가 아직 없을 수 있음
        let Some(container) = deployment
            .containers
            .iter()
            .find(|c| c.name == process.container_name)
        else {
            return Ok(Vec::new());
        };

        let subject = Subject {
            container: Some(container),
            image_name: &container.image,
            image: None,
            process: Some(process),
        };
        Ok(self
            .sections
            .iter()
            .filter_map(|s| s.evaluate(&subject, true))
            .collect())
    }

    fn evaluation_error(&self, deployment: &Deployment, reason: String) -> PolicyError {
        PolicyError::Evaluation {
            policy: self.policy_name.clone(),
            namespace: deployment.namespace.clone(),
            name: deployment.name.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kubeward_core::workload::ImageComponent;

    use super::*;

    fn group(field: &str, values: &[&str]) -> PolicyGroup {
        PolicyGroup {
            field_name: field.to_owned(),
            boolean_operator: BooleanOperator::Or,
            negate: false,
            values: values.iter().map(|v| (*v).to_owned()).collect(),
        }
    }

    fn policy_with(groups: Vec<PolicyGroup>) -> Policy {
        let mut policy = Policy::new("p1", "test policy");
        policy.policy_sections = vec![PolicySection {
            section_name: "s1".to_owned(),
            policy_groups: groups,
        }];
        policy
    }

    fn container(name: &str, image: &str, privileged: bool) -> Container {
        let (image, digest) = ImageName::parse(image).unwrap();
        Container {
            name: name.to_owned(),
            image,
            image_digest: digest,
            privileged,
        }
    }

    fn deployment(containers: Vec<Container>) -> Deployment {
        Deployment {
            id: "d1".to_owned(),
            name: "web".to_owned(),
            namespace: "default".to_owned(),
            containers,
            ..Default::default()
        }
    }

    fn scanned(container: &Container, vulns: &[(&str, f32)]) -> Image {
        let mut image = Image::unscanned(container);
        image.scan = Some(ImageScan {
            scan_time: Utc::now(),
            components: vec![ImageComponent {
                name: "openssl".to_owned(),
                version: "1.1.1".to_owned(),
                vulns: vulns
                    .iter()
                    .map(|(cve, cvss)| Vulnerability {
                        cve: (*cve).to_owned(),
                        cvss: *cvss,
                    })
                    .collect(),
            }],
        });
        image
    }

    #[test]
    fn field_names_roundtrip() {
        for field in PolicyField::ALL {
            assert_eq!(PolicyField::from_name(field.name()), Some(field));
        }
        assert_eq!(PolicyField::from_name("Image Registry Name"), None);
    }

    #[test]
    fn unknown_field_is_compile_error() {
        let err = Matcher::compile(&policy_with(vec![group("Volume Name", &["x"])])).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn empty_values_is_compile_error() {
        let err = Matcher::compile(&policy_with(vec![group("Image Tag", &[])])).unwrap_err();
        assert!(matches!(err, PolicyError::Compile { .. }));
    }

    #[test]
    fn invalid_flag_is_compile_error() {
        let err = Matcher::compile(&policy_with(vec![group("Privileged Container", &["yes"])]))
            .unwrap_err();
        assert!(err.to_string().contains("true or false"));
    }

    #[test]
    fn image_tag_violation_per_container() {
        let matcher = Matcher::compile(&policy_with(vec![group("Image Tag", &["latest"])])).unwrap();
        let d = deployment(vec![
            container("web", "nginx", false),
            container("sidecar", "envoy:1.28", false),
        ]);
        let violations = matcher.match_deployment(&d, &[]).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Container 'web' has image tag 'latest'"
        );
    }

    #[test]
    fn groups_in_section_are_anded() {
        let matcher = Matcher::compile(&policy_with(vec![
            group("Image Tag", &["latest"]),
            group("Privileged Container", &["true"]),
        ]))
        .unwrap();
        let unprivileged = deployment(vec![container("web", "nginx", false)]);
        assert!(matcher.match_deployment(&unprivileged, &[]).unwrap().is_empty());

        let privileged = deployment(vec![container("web", "nginx", true)]);
        let violations = matcher.match_deployment(&privileged, &[]).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("is privileged"));
    }

    #[test]
    fn and_operator_requires_all_values() {
        let mut g = group("Image Remote", &["library/.*", ".*nginx"]);
        g.boolean_operator = BooleanOperator::And;
        let matcher = Matcher::compile(&policy_with(vec![g])).unwrap();
        assert_eq!(
            matcher
                .match_deployment(&deployment(vec![container("web", "nginx", false)]), &[])
                .unwrap()
                .len(),
            1
        );
        assert!(
            matcher
                .match_deployment(&deployment(vec![container("web", "redis", false)]), &[])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn negate_inverts_group() {
        let mut g = group("Image Registry", &["quay\\.io"]);
        g.negate = true;
        let matcher = Matcher::compile(&policy_with(vec![g])).unwrap();
        let violations = matcher
            .match_deployment(&deployment(vec![container("web", "nginx", false)]), &[])
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("does not match"));
    }

    #[test]
    fn unscanned_image_matches_unresolved_images() {
        let matcher =
            Matcher::compile(&policy_with(vec![group("Unscanned Image", &["true"])])).unwrap();
        let c = container("web", "nginx", false);
        let d = deployment(vec![c.clone()]);
        assert_eq!(matcher.match_deployment(&d, &[None]).unwrap().len(), 1);
        assert!(
            matcher
                .match_deployment(&d, &[Some(scanned(&c, &[]))])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn cve_and_cvss_need_scan() {
        let c = container("web", "nginx", false);
        let d = deployment(vec![c.clone()]);
        let image = scanned(&c, &[("CVE-2023-0001", 9.8), ("CVE-2022-1234", 4.0)]);

        let cve = Matcher::compile(&policy_with(vec![group("CVE", &["CVE-2023-.*"])])).unwrap();
        assert!(cve.match_deployment(&d, &[None]).unwrap().is_empty());
        let violations = cve.match_deployment(&d, &[Some(image.clone())]).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("CVE-2023-0001"));
        assert!(!violations[0].message.contains("CVE-2022-1234"));

        let cvss = Matcher::compile(&policy_with(vec![group("CVSS", &[">= 7"])])).unwrap();
        let violations = cvss.match_deployment(&d, &[Some(image)]).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("CVSS 9.8"));
    }

    #[test]
    fn comparator_parsing() {
        assert_eq!(Comparator::split(">= 7").0, Comparator::GreaterOrEqual);
        assert_eq!(Comparator::split("<5").0, Comparator::Less);
        assert_eq!(Comparator::split("7.5"), (Comparator::Equal, "7.5"));
        assert!(Comparator::Greater.holds(9.0, 7.0));
        assert!(!Comparator::LessOrEqual.holds(9.0, 7.0));
    }

    #[test]
    fn too_many_images_is_evaluation_error() {
        let matcher = Matcher::compile(&policy_with(vec![group("Image Tag", &["latest"])])).unwrap();
        let err = matcher
            .match_deployment(&deployment(vec![]), &[None])
            .unwrap_err();
        assert!(matches!(err, PolicyError::Evaluation { .. }));
    }

    #[test]
    fn process_sections_only_match_at_runtime() {
        let matcher =
            Matcher::compile(&policy_with(vec![group("Process Name", &["bash|sh"])])).unwrap();
        let d = deployment(vec![container("web", "nginx", false)]);
        assert!(matcher.match_deployment(&d, &[]).unwrap().is_empty());

        let process = ProcessIndicator {
            deployment_id: "d1".to_owned(),
            container_name: "web".to_owned(),
            name: "bash".to_owned(),
            exec_file_path: "/bin/bash".to_owned(),
            args: String::new(),
        };
        let violations = matcher.match_process(&d, &process).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Process 'bash' executed in Container 'web'"
        );
    }

    #[test]
    fn process_in_unknown_container_has_no_violation() {
        let matcher =
            Matcher::compile(&policy_with(vec![group("Process Name", &["bash"])])).unwrap();
        let process = ProcessIndicator {
            container_name: "ghost".to_owned(),
            name: "bash".to_owned(),
            ..Default::default()
        };
        assert!(matcher.match_process(&deployment(vec![]), &process).unwrap().is_empty());
        let d = deployment(vec![container("web", "nginx", false)]);
        assert!(matcher.match_process(&d, &process).unwrap().is_empty());
    }

    #[test]
    fn match_image_without_container() {
        let matcher = Matcher::compile(&policy_with(vec![group("Image Tag", &["latest"])])).unwrap();
        let c = container("web", "nginx", false);
        let violations = matcher.match_image(&Image::unscanned(&c));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.starts_with("Image 'docker.io/library/nginx:latest'"));
    }

    #[test]
    fn scan_requirement_detection() {
        assert!(policy_requires_image_scan(&policy_with(vec![group("CVE", &["x"])])));
        assert!(!policy_requires_image_scan(&policy_with(vec![group("Image Tag", &["x"])])));
        assert!(is_missing_scan_policy(&policy_with(vec![group(
            "Unscanned Image",
            &["true"]
        )])));
        assert!(!is_missing_scan_policy(&policy_with(vec![
            group("Unscanned Image", &["true"]),
            group("Image Tag", &["latest"]),
        ])));
        assert!(!is_missing_scan_policy(&Policy::new("p", "empty")));
    }
}
