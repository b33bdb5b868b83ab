#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`AdmissionError`)
//! - [`config`]: Engine configuration (`AdmissionControlConfig`, builder)
//! - [`settings`]: Pushed settings (`AdmissionSettings`, `ClusterConfig`)
//! - [`review`]: Admission review wire model (`kube::core::admission` types over `DynamicObject`)
//! - [`bypass`]: Pre-decoding bypass rules (`BypassRules`, `BypassReason`)
//! - [`decode`]: Workload decoding (`WorkloadKind`, `decode_deployment`)
//! - [`lru`]: Size-bounded LRU (`SizedLruCache`)
//! - [`image_cache`]: Image lookup cache (`ImageCache`)
//! - [`central`]: Control-plane client abstraction (`CentralConnector`, `ImageResolver`)
//! - [`message`]: Rejection message rendering
//! - [`state`]: Decision state snapshot (`AdmissionState`)
//! - [`manager`]: Main orchestrator (`AdmissionManager`, `AdmissionHandle`, builder)
//!
//! # Architecture
//!
//! ```text
//! AdmissionSettings --mpsc--> SettingsWatcher --send_replace--> watch<State>
//!                                                                   |
//! AdmissionRequest --> AdmissionHandle.handle_review() <-- snapshot -+
//!                          |
//!                     bypass -> decode -> image cache -> DeployTimeDetector
//!                          |
//!                     AdmissionResponse  +  AlertBatch --mpsc--> downstream
//! ```

pub mod bypass;
pub mod central;
pub mod config;
pub mod decode;
pub mod error;
pub mod image_cache;
pub mod lru;
pub mod manager;
pub mod message;
pub mod review;
pub mod settings;
pub mod state;

// --- Public API Re-exports ---

// Manager (main orchestrator)
pub use manager::{AdmissionHandle, AdmissionManager, AdmissionManagerBuilder, StateSnapshot};

// Configuration
pub use config::{AdmissionControlConfig, AdmissionControlConfigBuilder};
pub use settings::{AdmissionSettings, ClusterConfig};

// Error
pub use error::AdmissionError;

// Wire model
pub use review::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, Operation, REJECTION_REASON, RequestExt,
};

// Control plane
pub use central::{CentralConnector, ImageResolver, OfflineConnector, OfflineResolver};

// Decision building blocks
pub use bypass::{BypassReason, BypassRules};
pub use decode::{WorkloadKind, decode_deployment};
pub use image_cache::ImageCache;
pub use lru::{CacheStats, SizedLruCache};
pub use message::{BREAK_GLASS_ANNOTATION, render_rejection};
pub use state::AdmissionState;
