//! 에러 타입 — 도메인별 에러 정의
//!
//! 각 라이브러리 크레이트는 자체 도메인 에러를 정의하고
//! `From<…> for KubewardError`를 구현하여 상위 레이어로 `?` 전파합니다.

/// kubeward 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum KubewardError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인(생명주기/채널) 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 정책 컴파일/평가 에러
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// 어드미션 결정 에러
    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline not running")]
    NotRunning,
}

/// 정책 컴파일/평가 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 스코프/예외/조건 컴파일 실패
    #[error("compile failed: {0}")]
    Compile(String),

    /// 정책 버전 변환 실패
    #[error("version error: {0}")]
    Version(String),

    /// 등록되지 않은 정책
    #[error("not found: {0}")]
    NotFound(String),

    /// 정책 평가 실패
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// 어드미션 결정 에러
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// 어드미션 컨트롤 비활성 상태
    #[error("admission control is disabled")]
    Disabled,

    /// 객체 디코딩 실패
    #[error("decode failed: {0}")]
    Decode(String),

    /// 내부 배포 표현으로 변환 실패
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// 컨트롤 플레인 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),
}
