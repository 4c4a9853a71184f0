//! Shaping of analysis engine replies.
//!
//! This crate provides:
//! - Confidence tuple unpacking
//! - Per-category shapers (vehicle, person, face, classification, risks)
//! - The response normalizer and validity summary

pub mod attribute;
pub mod category;
pub mod classification;
pub mod error;
pub mod face;
pub mod normalizer;
pub mod person;
pub mod risk;
pub mod vehicle;

pub use attribute::{unpack, Attribute, Quality};
pub use category::{Category, CategoryBody, ShapedCategory, Validity};
pub use error::{ShapeError, ShapeResult};
pub use normalizer::{normalize, AnalysisResult, ShapingContext, TamperingOutcome};
