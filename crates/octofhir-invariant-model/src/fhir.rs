//! FHIR version selection
//!
//! The expression engine resolves element types against a FHIR model. Every
//! engine call names the model explicitly.

use octofhir_invariant_diagnostics::{INV0303, InvariantError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FHIR release used as the engine type model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FhirVersion {
    /// FHIR R4 (4.0.1)
    #[default]
    R4,
    /// FHIR R4B (4.3.0)
    R4B,
    /// FHIR R5 (5.0.0)
    R5,
}

impl FhirVersion {
    /// Model name as understood by the engine
    pub const fn as_str(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "r4",
            FhirVersion::R4B => "r4b",
            FhirVersion::R5 => "r5",
        }
    }

    /// Published version number
    pub const fn version(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R4B => "4.3.0",
            FhirVersion::R5 => "5.0.0",
        }
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FhirVersion {
    type Err = InvariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r4" | "4.0" | "4.0.1" => Ok(FhirVersion::R4),
            "r4b" | "4.3" | "4.3.0" => Ok(FhirVersion::R4B),
            "r5" | "5.0" | "5.0.0" => Ok(FhirVersion::R5),
            other => Err(InvariantError::model(
                INV0303,
                format!("Unknown FHIR version '{}' (expected r4, r4b or r5)", other),
            )),
        }
    }
}
