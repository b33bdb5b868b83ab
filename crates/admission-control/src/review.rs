//! 어드미션 리뷰 와이어 모델 (`admission.k8s.io/v1`)
//!
//! 봉투와 요청/응답은 `kube::core::admission` 타입을 그대로 사용합니다.
//! 요청 객체는 [`DynamicObject`]로 받고, 종류별 디코딩은 [`decode`](crate::decode)가 담당합니다.

use kube::core::DynamicObject;
use kube::core::admission;

pub use kube::core::admission::{AdmissionResponse, Operation};

/// 어드미션 요청
pub type AdmissionRequest = admission::AdmissionRequest<DynamicObject>;

/// AdmissionReview 봉투
pub type AdmissionReview = admission::AdmissionReview<DynamicObject>;

/// 정책 위반 거부 시 응답 사유
pub const REJECTION_REASON: &str = "Failed currently enforced policies";

/// 요청 필드 조회 헬퍼
pub trait RequestExt {
    /// 네임스페이스 (클러스터 범위 객체는 빈 문자열)
    fn namespace(&self) -> &str;
    /// 요청자 사용자명
    fn username(&self) -> &str;
    /// 요청자 그룹 목록
    fn groups(&self) -> &[String];
}

impl RequestExt for AdmissionRequest {
    fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    fn username(&self) -> &str {
        self.user_info.username.as_deref().unwrap_or_default()
    }

    fn groups(&self) -> &[String] {
        self.user_info.groups.as_deref().unwrap_or_default()
    }
}

/// 허용 응답
pub fn pass(request: &AdmissionRequest) -> AdmissionResponse {
    AdmissionResponse::from(request)
}

/// 정책 위반 거부 응답
pub fn fail(request: &AdmissionRequest, message: impl ToString) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result.reason = REJECTION_REASON.to_owned();
    response
}
