//! 정책 레지스트리 — 정책 ID별 컴파일된 정책의 동시성 안전 저장소
//!
//! 쓰기 경로는 [`PolicySet::upsert_policy`]와 [`PolicySet::remove_policy`]뿐이며,
//! 읽기 경로는 짧은 읽기 락 아래에서 `Arc` 스냅샷을 떠서 락 밖에서 순회합니다.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use kubeward_core::metrics as m;
use kubeward_core::types::Policy;

use crate::compiled::{CompiledPolicy, DefaultPolicyCompiler, PolicyCompiler};
use crate::error::PolicyError;

/// 정책 레지스트리
pub struct PolicySet {
    compiler: Arc<dyn PolicyCompiler>,
    policies: RwLock<HashMap<String, Arc<CompiledPolicy>>>,
}

impl PolicySet {
    /// 주어진 컴파일러로 빈 레지스트리를 생성합니다.
    pub fn new(compiler: Arc<dyn PolicyCompiler>) -> Self {
        Self {
            compiler,
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// 정책을 컴파일하여 등록하거나 교체합니다.
    ///
    /// 컴파일에 실패하면 기존 항목은 그대로 유지됩니다.
    pub fn upsert_policy(&self, policy: &Policy) -> Result<(), PolicyError> {
        let compiled = match self.compiler.compile_policy(policy) {
            Ok(compiled) => compiled,
            Err(e) => {
                metrics::counter!(m::POLICY_COMPILE_ERRORS_TOTAL).increment(1);
                warn!(policy_id = %policy.id, policy = %policy.name, error = %e, "failed to compile policy");
                return Err(e);
            }
        };

        self.policies
            .write()
            .insert(policy.id.clone(), Arc::new(compiled));
        debug!(policy_id = %policy.id, "policy upserted");
        Ok(())
    }

    /// 정책을 제거합니다. 없는 ID도 에러가 아닙니다.
    ///
    /// 실제로 제거되었으면 `true`를 반환합니다.
    pub fn remove_policy(&self, id: &str) -> bool {
        self.policies.write().remove(id).is_some()
    }

    /// 등록된 정책 스냅샷을 이름, ID 순으로 반환합니다.
    fn snapshot(&self) -> Vec<Arc<CompiledPolicy>> {
        let mut snapshot: Vec<_> = self.policies.read().values().cloned().collect();
        snapshot.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
        snapshot
    }

    /// 모든 정책을 순회합니다.
    ///
    /// 방문 에러가 발생해도 순회를 멈추지 않고, 모든 에러를
    /// [`PolicyError::Aggregate`]로 묶어 반환합니다.
    pub fn for_each<F>(&self, mut visit: F) -> Result<(), PolicyError>
    where
        F: FnMut(&CompiledPolicy) -> Result<(), PolicyError>,
    {
        let errors: Vec<PolicyError> = self
            .snapshot()
            .iter()
            .filter_map(|compiled| visit(compiled.as_ref()).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PolicyError::Aggregate(errors))
        }
    }

    /// 단일 정책을 방문합니다.
    pub fn for_one<F, T>(&self, id: &str, visit: F) -> Result<T, PolicyError>
    where
        F: FnOnce(&CompiledPolicy) -> Result<T, PolicyError>,
    {
        let compiled = self.get(id).ok_or_else(|| PolicyError::NotFound { id: id.to_owned() })?;
        visit(compiled.as_ref())
    }

    /// 정책을 조회합니다.
    pub fn get(&self, id: &str) -> Option<Arc<CompiledPolicy>> {
        self.policies.read().get(id).cloned()
    }

    /// 등록된 정책 ID 목록 (정렬됨)
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.policies.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// 등록된 정책 수
    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    /// 등록된 정책이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::new(Arc::new(DefaultPolicyCompiler))
    }
}

impl std::fmt::Debug for PolicySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySet")
            .field("policies", &self.ids())
            .finish()
    }
}
