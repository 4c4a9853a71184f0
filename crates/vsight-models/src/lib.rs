//! Shared data models for the VSight analysis orchestrator.
//!
//! This crate provides Serde-serializable types for:
//! - Camera view configuration and its detection features
//! - The detection vocabulary sent to the analysis engine
//! - Company capabilities
//! - Scene change (tampering) decisions, references and events
//! - Client request options

pub mod capability;
pub mod detection;
pub mod error;
pub mod features;
pub mod options;
pub mod tampering;
pub mod view;

pub use capability::{Capability, CapabilitySet};
pub use detection::{ChipTarget, DetectionConfig, DetectionKind, DetectionSet, EmbeddingsVersion};
pub use error::ModelError;
pub use features::{
    transform_from_features, AdvancedRule, AdvancedRuleKind, Features, ObjectDetection,
    ViewAnalyticsStatus,
};
pub use options::{AnalyzeOptions, RawOptions, SceneChangeOptions};
pub use tampering::{
    DayPeriod, NotEligible, ReferencePair, ReferenceRef, SceneChangeStatus, StoredReference,
    TamperingDecision, TamperingEvent, TamperingEventStatus, WithChecks,
};
pub use view::{CheckWindow, ClockTime, CompanyInfo, SiteInfo, ViewConfig};
