//! FHIR invariant data model
//!
//! This crate provides:
//! - Constraint request/result types exchanged with batch producers
//! - FHIR version selection for the expression engine type model
//! - StructureDefinition types and a definition registry
//! - Constraint collection from a resource and its definitions

pub mod collector;
pub mod constraint;
pub mod fhir;
pub mod registry;
pub mod structure_definition;

pub use collector::*;
pub use constraint::*;
pub use fhir::FhirVersion;
pub use registry::*;
pub use structure_definition::*;
