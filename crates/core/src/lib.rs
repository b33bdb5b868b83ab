#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;
pub mod workload;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, DecisionError, DetectionError, KubewardError, PipelineError};

// 설정
pub use config::KubewardConfig;

// 이벤트
pub use event::{AlertBatch, Event, EventMetadata};

// 파이프라인 trait
pub use pipeline::{HealthStatus, Pipeline};

// 도메인 타입
pub use types::{
    Alert, AlertEntity, EnforcementAction, Exclusion, ExclusionTarget, LifecycleStage, Policy,
    Scope, Severity, Violation,
};
pub use workload::{Cluster, Container, Deployment, Image, ImageName, Namespace, ProcessIndicator};
