//! 정책 스키마 버전 마이그레이션
//!
//! 버전은 순위가 매겨진 고정 배열이며, 인접 버전 간 변환 함수만 존재합니다.
//!
//! ```text
//! "1" ──upgrade──▶ "1.1" ──upgrade──▶ "1.2"
//!                  "1.1" ◀─downgrade── "1.2"
//! ```
//!
//! 빈 문자열은 레거시 버전 "1"을 뜻합니다. 단, 이미 정책 섹션을 가진
//! 레거시 정책은 업그레이드 없이 "1.1"로 취급합니다.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use kubeward_core::types::{
    BooleanOperator, EnforcementAction, LegacyPolicyFields, Policy, PolicyGroup, PolicySection,
};

use crate::error::VersionError;

/// 정책을 인접 버전으로 변환하는 함수
pub type Migration = fn(&mut Policy);

/// 레거시 버전
pub const LEGACY_VERSION: &str = "1";

/// 지원하는 정책 버전 (오름차순)
pub const VERSIONS: [&str; 3] = ["1", "1.1", "1.2"];

/// 1.2에서 이름이 바뀐 조건 필드 (이전 이름, 새 이름)
const RENAMED_FIELDS: [(&str, &str); 2] = [
    ("Image Registry Name", "Image Registry"),
    ("CVSS Score", "CVSS"),
];

/// 버전 마이그레이터
///
/// 버전 배열과 버전별 업그레이드/다운그레이드 함수 표를 가집니다.
/// 표에 없는 단계는 불가능한 변환입니다.
#[derive(Debug, Clone)]
pub struct PolicyVersionMigrator {
    versions: Vec<&'static str>,
    upgraders: HashMap<&'static str, Migration>,
    downgraders: HashMap<&'static str, Migration>,
}

impl Default for PolicyVersionMigrator {
    fn default() -> Self {
        Self::new(
            VERSIONS.to_vec(),
            [
                ("1", upgrade_1_to_1_1 as Migration),
                ("1.1", upgrade_1_1_to_1_2 as Migration),
            ],
            [("1.2", downgrade_1_2_to_1_1 as Migration)],
        )
    }
}

impl PolicyVersionMigrator {
    /// 버전 배열과 변환 표로 마이그레이터를 생성합니다.
    ///
    /// `versions`는 순위 순서(오름차순)여야 합니다.
    pub fn new(
        versions: Vec<&'static str>,
        upgraders: impl IntoIterator<Item = (&'static str, Migration)>,
        downgraders: impl IntoIterator<Item = (&'static str, Migration)>,
    ) -> Self {
        Self {
            versions,
            upgraders: upgraders.into_iter().collect(),
            downgraders: downgraders.into_iter().collect(),
        }
    }

    /// 지원하는 버전 목록
    pub fn versions(&self) -> &[&'static str] {
        &self.versions
    }

    /// 현재(최신) 버전
    pub fn current_version(&self) -> &'static str {
        self.versions.last().copied().unwrap_or(LEGACY_VERSION)
    }

    /// 버전의 순위를 반환합니다. 빈 문자열은 레거시 버전입니다.
    pub fn rank(&self, version: &str) -> Result<usize, VersionError> {
        let version = if version.is_empty() {
            LEGACY_VERSION
        } else {
            version
        };
        self.versions
            .iter()
            .position(|v| *v == version)
            .ok_or_else(|| VersionError::UnknownVersion(version.to_owned()))
    }

    /// 두 버전을 비교합니다.
    pub fn compare(&self, a: &str, b: &str) -> Result<Ordering, VersionError> {
        Ok(self.rank(a)?.cmp(&self.rank(b)?))
    }

    /// 정책의 실제 버전 순위를 계산합니다 (레거시 섹션 보정 포함).
    fn effective_rank(&self, policy: &Policy) -> Result<usize, VersionError> {
        if policy.policy_version.is_empty() && !policy.policy_sections.is_empty() {
            return self.rank("1.1");
        }
        self.rank(&policy.policy_version)
    }

    /// 정책을 대상 버전까지 업그레이드합니다.
    ///
    /// 대상이 현재 버전보다 낮으면 [`VersionError::ImplicitDowngrade`]를 반환합니다.
    /// 중간 단계가 없으면 그 지점에서 [`VersionError::NotUpgradable`]로 중단합니다.
    pub fn ensure_converted_to(
        &self,
        policy: &mut Policy,
        target: &str,
    ) -> Result<(), VersionError> {
        let target_rank = self.rank(target)?;
        let mut rank = self.effective_rank(policy)?;

        if target_rank < rank {
            return Err(VersionError::ImplicitDowngrade {
                from: self.versions[rank].to_owned(),
                to: target.to_owned(),
            });
        }

        while rank < target_rank {
            let from = self.versions[rank];
            let to = self.versions[rank + 1];
            let upgrade = self
                .upgraders
                .get(from)
                .ok_or_else(|| VersionError::NotUpgradable {
                    from: from.to_owned(),
                    to: to.to_owned(),
                })?;
            upgrade(policy);
            policy.policy_version = to.to_owned();
            debug!(policy_id = %policy.id, from, to, "policy upgraded");
            rank += 1;
        }

        let actual = self.effective_rank(policy)?;
        if actual != target_rank {
            return Err(VersionError::Mismatch {
                expected: target.to_owned(),
                actual: self.versions[actual].to_owned(),
            });
        }
        if policy.policy_version != target {
            policy.policy_version = target.to_owned();
        }
        Ok(())
    }

    /// 정책을 최신 버전으로 업그레이드합니다.
    pub fn ensure_converted_to_latest(&self, policy: &mut Policy) -> Result<(), VersionError> {
        self.ensure_converted_to(policy, self.current_version())
    }

    /// 정책을 대상 버전으로 다운그레이드합니다.
    ///
    /// 전체 단계가 존재하는지 먼저 확인한 뒤 변환하므로, 실패 시 정책은 변경되지 않습니다.
    pub fn downgrade_policy_to(
        &self,
        policy: &mut Policy,
        target: &str,
    ) -> Result<(), VersionError> {
        let target_rank = self.rank(target)?;
        let rank = self.effective_rank(policy)?;

        if target_rank > rank {
            return Err(VersionError::NotDowngradable {
                from: self.versions[rank].to_owned(),
                to: target.to_owned(),
            });
        }

        let steps = (target_rank + 1..=rank)
            .rev()
            .map(|r| {
                let from = self.versions[r];
                self.downgraders
                    .get(from)
                    .map(|downgrade| (*downgrade, self.versions[r - 1]))
                    .ok_or_else(|| VersionError::NotDowngradable {
                        from: from.to_owned(),
                        to: self.versions[r - 1].to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (downgrade, to) in steps {
            downgrade(policy);
            policy.policy_version = to.to_owned();
            debug!(policy_id = %policy.id, to, "policy downgraded");
        }
        if policy.policy_version != target {
            policy.policy_version = target.to_owned();
        }
        Ok(())
    }
}

/// "1" → "1.1": 레거시 `fields` 블록을 정책 섹션으로 변환합니다.
fn upgrade_1_to_1_1(policy: &mut Policy) {
    let Some(fields) = policy.fields.take() else {
        return;
    };
    if fields.is_empty() {
        return;
    }
    policy.policy_sections.push(PolicySection {
        section_name: String::new(),
        policy_groups: legacy_groups(&fields),
    });
}

fn legacy_groups(fields: &LegacyPolicyFields) -> Vec<PolicyGroup> {
    let group = |field_name: &str, value: String| PolicyGroup {
        field_name: field_name.to_owned(),
        boolean_operator: BooleanOperator::Or,
        negate: false,
        values: vec![value],
    };

    let mut groups = Vec::new();
    if let Some(image_name) = &fields.image_name {
        if let Some(registry) = &image_name.registry {
            groups.push(group("Image Registry Name", registry.clone()));
        }
        if let Some(remote) = &image_name.remote {
            groups.push(group("Image Remote", remote.clone()));
        }
        if let Some(tag) = &image_name.tag {
            groups.push(group("Image Tag", tag.clone()));
        }
    }
    if let Some(privileged) = fields.privileged {
        groups.push(group("Privileged Container", privileged.to_string()));
    }
    if let Some(process_name) = &fields.process_name {
        groups.push(group("Process Name", process_name.clone()));
    }
    if let Some(cve) = &fields.cve {
        groups.push(group("CVE", cve.clone()));
    }
    if let Some(cvss) = &fields.cvss {
        groups.push(group("CVSS Score", format!("{} {}", cvss.op, cvss.value)));
    }
    if let Some(no_scan) = fields.no_scan_exists {
        groups.push(group("Unscanned Image", no_scan.to_string()));
    }
    groups
}

/// "1.1" → "1.2": 조건 필드명을 변경하고 `Unset` 집행 액션을 제거합니다.
fn upgrade_1_1_to_1_2(policy: &mut Policy) {
    rename_fields(policy, |(old, new)| (old, new));
    policy
        .enforcement_actions
        .retain(|action| *action != EnforcementAction::Unset);
}

/// "1.2" → "1.1": 조건 필드명을 이전 이름으로 되돌립니다.
fn downgrade_1_2_to_1_1(policy: &mut Policy) {
    rename_fields(policy, |(old, new)| (new, old));
}

fn rename_fields(
    policy: &mut Policy,
    direction: fn((&'static str, &'static str)) -> (&'static str, &'static str),
) {
    for group in policy
        .policy_sections
        .iter_mut()
        .flat_map(|section| section.policy_groups.iter_mut())
    {
        if let Some((_, to)) = RENAMED_FIELDS
            .into_iter()
            .map(direction)
            .find(|(from, _)| *from == group.field_name)
        {
            group.field_name = to.to_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use kubeward_core::types::{LegacyImageNamePolicy, LegacyNumericalPolicy};

    use super::*;

    fn legacy_policy() -> Policy {
        let mut policy = Policy::new("p1", "legacy");
        policy.fields = Some(LegacyPolicyFields {
            image_name: Some(LegacyImageNamePolicy {
                registry: Some("docker\\.io".to_owned()),
                remote: None,
                tag: Some("latest".to_owned()),
            }),
            cvss: Some(LegacyNumericalPolicy {
                op: ">=".to_owned(),
                value: 7.0,
            }),
            ..Default::default()
        });
        policy.enforcement_actions = vec![EnforcementAction::Unset, EnforcementAction::ScaleToZero];
        policy
    }

    fn field_names(policy: &Policy) -> Vec<&str> {
        policy.field_names().collect()
    }

    #[test]
    fn versions_strictly_ascending() {
        let migrator = PolicyVersionMigrator::default();
        let versions = migrator.versions();
        for pair in versions.windows(2) {
            assert_eq!(migrator.compare(pair[0], pair[1]).unwrap(), Ordering::Less);
        }
        assert_eq!(migrator.current_version(), *versions.last().unwrap());
    }

    #[test]
    fn compare_is_antisymmetric() {
        let migrator = PolicyVersionMigrator::default();
        for a in VERSIONS {
            for b in VERSIONS {
                let ab = migrator.compare(a, b).unwrap();
                let ba = migrator.compare(b, a).unwrap();
                assert_eq!(ab, ba.reverse());
            }
        }
    }

    #[test]
    fn empty_version_is_legacy() {
        let migrator = PolicyVersionMigrator::default();
        assert_eq!(migrator.rank("").unwrap(), 0);
        assert_eq!(migrator.compare("", "1").unwrap(), Ordering::Equal);
    }

    #[test]
    fn unknown_version_is_error() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = Policy::new("p", "p");
        assert_eq!(
            migrator.ensure_converted_to(&mut policy, "9.9"),
            Err(VersionError::UnknownVersion("9.9".to_owned()))
        );
        policy.policy_version = "0.5".to_owned();
        assert!(matches!(
            migrator.ensure_converted_to_latest(&mut policy),
            Err(VersionError::UnknownVersion(_))
        ));
    }

    #[test]
    fn legacy_policy_upgrades_to_latest() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = legacy_policy();
        migrator.ensure_converted_to_latest(&mut policy).unwrap();

        assert_eq!(policy.policy_version, "1.2");
        assert!(policy.fields.is_none());
        assert_eq!(
            field_names(&policy),
            vec!["Image Registry", "Image Tag", "CVSS"]
        );
        assert_eq!(policy.policy_sections[0].policy_groups[2].values, vec![">= 7"]);
        assert_eq!(policy.enforcement_actions, vec![EnforcementAction::ScaleToZero]);
    }

    #[test]
    fn upgrade_at_target_is_noop() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = legacy_policy();
        migrator.ensure_converted_to_latest(&mut policy).unwrap();
        let before = policy.clone();
        migrator.ensure_converted_to_latest(&mut policy).unwrap();
        assert_eq!(policy, before);
    }

    #[test]
    fn implicit_downgrade_is_rejected() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = Policy::new("p", "p");
        policy.policy_version = "1.2".to_owned();
        assert!(matches!(
            migrator.ensure_converted_to(&mut policy, "1.1"),
            Err(VersionError::ImplicitDowngrade { .. })
        ));
        assert_eq!(policy.policy_version, "1.2");
    }

    #[test]
    fn legacy_sections_skip_first_upgrade() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = Policy::new("p", "p");
        policy.policy_sections = vec![PolicySection {
            section_name: String::new(),
            policy_groups: vec![PolicyGroup {
                field_name: "CVSS Score".to_owned(),
                boolean_operator: BooleanOperator::Or,
                negate: false,
                values: vec!["> 5".to_owned()],
            }],
        }];
        policy.fields = Some(LegacyPolicyFields {
            privileged: Some(true),
            ..Default::default()
        });

        migrator.ensure_converted_to_latest(&mut policy).unwrap();
        assert_eq!(field_names(&policy), vec!["CVSS"]);
        // 1 → 1.1 변환을 건너뛰었으므로 레거시 블록은 섹션으로 합쳐지지 않음
        assert!(policy.fields.is_some());
    }

    #[test]
    fn missing_upgrader_stops_at_gap() {
        let migrator = PolicyVersionMigrator::new(
            vec!["1", "1.1", "1.2", "1.3"],
            [
                ("1", upgrade_1_to_1_1 as Migration),
                ("1.2", upgrade_1_1_to_1_2 as Migration),
            ],
            Vec::<(&'static str, Migration)>::new(),
        );
        let mut policy = legacy_policy();
        let err = migrator.ensure_converted_to(&mut policy, "1.3").unwrap_err();
        assert_eq!(
            err,
            VersionError::NotUpgradable {
                from: "1.1".to_owned(),
                to: "1.2".to_owned(),
            }
        );
        // 마지막으로 성공한 단계까지만 반영됨
        assert_eq!(policy.policy_version, "1.1");
        assert_eq!(
            field_names(&policy),
            vec!["Image Registry Name", "Image Tag", "CVSS Score"]
        );
    }

    #[test]
    fn downgrade_reverses_renames() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = legacy_policy();
        migrator.ensure_converted_to_latest(&mut policy).unwrap();
        migrator.downgrade_policy_to(&mut policy, "1.1").unwrap();
        assert_eq!(policy.policy_version, "1.1");
        assert_eq!(
            field_names(&policy),
            vec!["Image Registry Name", "Image Tag", "CVSS Score"]
        );
    }

    #[test]
    fn downgrade_gap_leaves_policy_untouched() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = legacy_policy();
        migrator.ensure_converted_to_latest(&mut policy).unwrap();
        let before = policy.clone();

        let err = migrator.downgrade_policy_to(&mut policy, "1").unwrap_err();
        assert_eq!(
            err,
            VersionError::NotDowngradable {
                from: "1.1".to_owned(),
                to: "1".to_owned(),
            }
        );
        assert_eq!(policy, before);
    }

    #[test]
    fn downgrade_at_target_is_noop() {
        let migrator = PolicyVersionMigrator::default();
        let mut policy = Policy::new("p", "p");
        policy.policy_version = "1.1".to_owned();
        let before = policy.clone();
        migrator.downgrade_policy_to(&mut policy, "1.1").unwrap();
        assert_eq!(policy, before);
    }
}
