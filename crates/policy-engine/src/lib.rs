#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`PolicyError`, `VersionError`)
//! - [`scope`]: Scope compilation (`CompiledScope`)
//! - [`exclusion`]: Exclusion compilation (`CompiledExclusion`)
//! - [`criteria`]: Policy criteria (`PolicyField`, `Matcher`)
//! - [`compiled`]: Policy compilation (`PolicyCompiler`, `CompiledPolicy`, `Predicate`)
//! - [`policy_set`]: Concurrent policy registry (`PolicySet`)
//! - [`version`]: Policy schema migration (`PolicyVersionMigrator`)
//! - [`detector`]: Deploy/runtime/build detectors
//!
//! # Architecture
//!
//! ```text
//! Policy --migrate--> Policy(latest)
//!                        |
//!                  PolicyCompiler.compile_policy()
//!                        |
//!                  PolicySet (id -> CompiledPolicy)
//!                        |
//!                  Detector.detect() --> Detections { alerts, error }
//! ```

pub mod compiled;
pub mod criteria;
pub mod detector;
pub mod error;
pub mod exclusion;
pub mod policy_set;
pub mod scope;
pub mod version;

// --- Public API Re-exports ---

// Error
pub use error::{PolicyError, VersionError};

// Compilation
pub use compiled::{
    CompiledPolicy, DefaultPolicyCompiler, DeploymentPredicate, Entity, ImagePredicate,
    PolicyCompiler, Predicate,
};
pub use exclusion::{CompiledExclusion, compile_exclusion};
pub use scope::{CompiledScope, compile_scope};

// Criteria
pub use criteria::{Matcher, PolicyField, is_missing_scan_policy, policy_requires_image_scan};

// Registry
pub use policy_set::PolicySet;

// Migration
pub use version::PolicyVersionMigrator;

// Detection
pub use detector::{BuildTimeDetector, DeployTimeDetector, Detections, RuntimeDetector};
