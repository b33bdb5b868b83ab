//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `kubeward_`
//! - 모듈명: `policy_`, `admission_`, `runtime_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(kubeward_core::metrics::ADMISSION_REVIEWS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결정 레이블 키 (allowed, denied)
pub const LABEL_DECISION: &str = "decision";

/// 우회 사유 레이블 키
pub const LABEL_REASON: &str = "reason";

/// 집행 액션 레이블 키
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (hit, miss)
pub const LABEL_RESULT: &str = "result";

/// 생명주기 단계 레이블 키 (Build, Deploy, Runtime)
pub const LABEL_STAGE: &str = "stage";

// ─── Policy 메트릭 ─────────────────────────────────────────────────

/// Policy: 컴파일된 정책 수 (gauge)
pub const POLICY_COMPILED: &str = "kubeward_policy_compiled";

/// Policy: 컴파일 실패 수 (counter)
pub const POLICY_COMPILE_ERRORS_TOTAL: &str = "kubeward_policy_compile_errors_total";

/// Policy: 생성된 알림 수 (counter)
pub const POLICY_ALERTS_TOTAL: &str = "kubeward_policy_alerts_total";

// ─── Admission 메트릭 ──────────────────────────────────────────────

/// Admission: 처리한 리뷰 수 (counter, label: decision)
pub const ADMISSION_REVIEWS_TOTAL: &str = "kubeward_admission_reviews_total";

/// Admission: 평가 없이 허용된 리뷰 수 (counter, label: reason)
pub const ADMISSION_BYPASSED_TOTAL: &str = "kubeward_admission_bypassed_total";

/// Admission: 리뷰 처리 시간 (histogram, 초)
pub const ADMISSION_REVIEW_DURATION_SECONDS: &str = "kubeward_admission_review_duration_seconds";

/// Admission: 이미지 캐시 조회 수 (counter, label: result)
pub const ADMISSION_IMAGE_CACHE_LOOKUPS_TOTAL: &str =
    "kubeward_admission_image_cache_lookups_total";

/// Admission: 스캔 대기 시간 초과 수 (counter)
pub const ADMISSION_SCAN_TIMEOUTS_TOTAL: &str = "kubeward_admission_scan_timeouts_total";

/// Admission: 설정 업데이트 적용 수 (counter)
pub const ADMISSION_SETTINGS_UPDATES_TOTAL: &str = "kubeward_admission_settings_updates_total";

/// Admission: 전송 실패로 버려진 알림 배치 수 (counter)
pub const ADMISSION_ALERTS_DROPPED_TOTAL: &str = "kubeward_admission_alerts_dropped_total";

// ─── Runtime 메트릭 ────────────────────────────────────────────────

/// Runtime: 평가한 프로세스 이벤트 수 (counter)
pub const RUNTIME_PROCESSES_EVALUATED_TOTAL: &str = "kubeward_runtime_processes_evaluated_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "kubeward_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1)
pub const DAEMON_BUILD_INFO: &str = "kubeward_daemon_build_info";

/// 리뷰 처리 시간 히스토그램 버킷 (초)
///
/// 인라인 스캔 대기가 있으면 수 초까지 늘어날 수 있습니다.
pub const REVIEW_DURATION_BUCKETS: [f64; 10] =
    [0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 레코더 설치 후 한 번 호출합니다. 레코더가 없으면 아무 동작도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Policy
    describe_gauge!(POLICY_COMPILED, "Number of compiled policies currently loaded");
    describe_counter!(
        POLICY_COMPILE_ERRORS_TOTAL,
        "Total number of policies rejected at compile time"
    );
    describe_counter!(POLICY_ALERTS_TOTAL, "Total number of policy alerts generated");

    // Admission
    describe_counter!(
        ADMISSION_REVIEWS_TOTAL,
        "Admission reviews processed, by decision (allowed, denied)"
    );
    describe_counter!(
        ADMISSION_BYPASSED_TOTAL,
        "Admission reviews allowed without evaluation, by reason"
    );
    describe_histogram!(
        ADMISSION_REVIEW_DURATION_SECONDS,
        "Admission review handling latency in seconds"
    );
    describe_counter!(
        ADMISSION_IMAGE_CACHE_LOOKUPS_TOTAL,
        "Image cache lookups, by result (hit, miss)"
    );
    describe_counter!(
        ADMISSION_SCAN_TIMEOUTS_TOTAL,
        "Reviews whose inline image scans did not finish before the deadline"
    );
    describe_counter!(
        ADMISSION_SETTINGS_UPDATES_TOTAL,
        "Settings updates applied to the admission state"
    );
    describe_counter!(
        ADMISSION_ALERTS_DROPPED_TOTAL,
        "Alert batches dropped because the alert channel was full or closed"
    );

    // Runtime
    describe_counter!(
        RUNTIME_PROCESSES_EVALUATED_TOTAL,
        "Process indicators evaluated against runtime policies"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_gauge!(DAEMON_BUILD_INFO, "Daemon build information (always 1)");
}
